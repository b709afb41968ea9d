#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Role;
use super::Turn;
use super::TurnBody;
use super::TurnStatus;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64 encoded payload.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

fn provider_role(role: Role) -> &'static str {
    match role {
        Role::User => return "user",
        Role::Assistant => return "model",
    }
}

fn to_part(turn: &Turn) -> Option<Part> {
    if turn.status == TurnStatus::Failed {
        return None;
    }

    match &turn.body {
        TurnBody::Text(text) => {
            if text.is_empty() {
                return None;
            }
            return Some(Part::Text(text.to_string()));
        }
        TurnBody::Image(image) => {
            return image
                .inline_data
                .as_ref()
                .map(|blob| return Part::InlineData(blob.clone()));
        }
    }
}

/// Projects a transcript snapshot into the provider's request shape.
/// Consecutive turns of the same role share one content entry.
pub fn provider_history(turns: &[Turn]) -> Vec<Content> {
    let mut contents: Vec<Content> = vec![];

    for turn in turns {
        let part = match to_part(turn) {
            Some(part) => part,
            None => continue,
        };

        let role = provider_role(turn.role);
        if let Some(last) = contents.last_mut() {
            if last.role == role {
                last.parts.push(part);
                continue;
            }
        }

        contents.push(Content {
            role: role.to_string(),
            parts: vec![part],
        });
    }

    return contents;
}
