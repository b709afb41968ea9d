#[cfg(test)]
#[path = "turn_test.rs"]
mod tests;

use std::fmt;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Blob;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnKind {
    Text,
    Image,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    /// Assistant placeholder still receiving chunks for the given request.
    Streaming(RequestId),
    Complete,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub media_ref: String,
    pub inline_data: Option<Blob>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnBody {
    Text(String),
    Image(ImageRef),
}

/// One message of the transcript. Turns are values: a streaming assistant
/// turn is swapped out for a new one on every chunk rather than edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub body: TurnBody,
    pub status: TurnStatus,
}

impl Turn {
    pub fn user_text(text: &str) -> Turn {
        return Turn {
            role: Role::User,
            body: TurnBody::Text(text.to_string()),
            status: TurnStatus::Complete,
        };
    }

    pub fn user_image(media_ref: &str, inline_data: Option<Blob>) -> Turn {
        return Turn {
            role: Role::User,
            body: TurnBody::Image(ImageRef {
                media_ref: media_ref.to_string(),
                inline_data,
            }),
            status: TurnStatus::Complete,
        };
    }

    pub fn assistant_streaming(id: RequestId, text: &str) -> Turn {
        return Turn {
            role: Role::Assistant,
            body: TurnBody::Text(text.to_string()),
            status: TurnStatus::Streaming(id),
        };
    }

    pub fn assistant_finished(text: &str, status: TurnStatus) -> Turn {
        return Turn {
            role: Role::Assistant,
            body: TurnBody::Text(text.to_string()),
            status,
        };
    }

    pub fn kind(&self) -> TurnKind {
        match self.body {
            TurnBody::Text(_) => return TurnKind::Text,
            TurnBody::Image(_) => return TurnKind::Image,
        }
    }

    /// Text payload, empty for image turns.
    pub fn content(&self) -> &str {
        match &self.body {
            TurnBody::Text(text) => return text,
            TurnBody::Image(_) => return "",
        }
    }

    pub fn media_ref(&self) -> Option<&str> {
        match &self.body {
            TurnBody::Text(_) => return None,
            TurnBody::Image(image) => return Some(&image.media_ref),
        }
    }

    pub fn streaming_id(&self) -> Option<RequestId> {
        if let TurnStatus::Streaming(id) = self.status {
            return Some(id);
        }

        return None;
    }

    pub fn is_streaming(&self, id: RequestId) -> bool {
        return self.role == Role::Assistant && self.streaming_id() == Some(id);
    }
}
