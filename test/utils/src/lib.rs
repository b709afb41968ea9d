use serde_json::json;

/// A single Gemini `GenerateContentResponse` carrying one text part.
pub fn gemini_response_json(text: &str) -> String {
    return json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP"
        }]
    })
    .to_string();
}

/// A `streamGenerateContent?alt=sse` body emitting one event per fragment.
pub fn gemini_sse_body(fragments: &[&str]) -> String {
    return fragments
        .iter()
        .map(|fragment| {
            return format!("data: {}\r\n\r\n", gemini_response_json(fragment));
        })
        .collect::<Vec<String>>()
        .join("");
}

pub fn gemini_error_json(code: u16, status: &str, message: &str) -> String {
    return json!({
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    })
    .to_string();
}
