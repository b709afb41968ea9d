#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use tokio_util::sync::CancellationToken;

use crate::domain::models::provider_history;
use crate::domain::models::Content;
use crate::domain::models::ContentGenerator;
use crate::domain::models::GenerationError;
use crate::domain::models::RequestId;
use crate::domain::models::Turn;
use crate::domain::models::TurnStatus;
use crate::domain::models::UploadResult;

pub const GENERATION_ERROR_TEXT: &str = "Error generating content";

/// A generation the conversation is waiting on. `history` is the snapshot
/// taken when the user turn landed, placeholder excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub id: RequestId,
    pub history: Vec<Content>,
}

/// Replaces the last turn with the cumulative text, provided it is still the
/// placeholder for `id`. Chunks for any other request are dropped.
fn replace_streaming_turn(turns: &mut [Turn], id: RequestId, cumulative: &str) -> bool {
    let last = match turns.last_mut() {
        Some(last) => last,
        None => return false,
    };

    if !last.is_streaming(id) {
        tracing::debug!(request_id = %id, "Dropping chunk for a stale request");
        return false;
    }

    *last = Turn::assistant_streaming(id, cumulative);
    return true;
}

/// Owns the transcript for one chat session.
#[derive(Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    last_request_id: u64,
}

impl Conversation {
    pub fn turns(&self) -> &[Turn] {
        return &self.turns;
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        return self.turns.last();
    }

    /// Id of the placeholder currently receiving chunks, if any.
    pub fn pending_request(&self) -> Option<RequestId> {
        return self.turns.last().and_then(|turn| return turn.streaming_id());
    }

    /// Appends the uploaded image as a user turn. Generation waits for the
    /// next text submission.
    pub fn submit_image(&mut self, upload: UploadResult) -> bool {
        let path = match upload.path() {
            Some(path) => path.to_string(),
            None => {
                tracing::warn!("Upload result has no file path, ignoring");
                return false;
            }
        };

        self.turns.push(Turn::user_image(&path, upload.inline_data));
        return true;
    }

    /// Appends the user turn and its assistant placeholder. Returns `None`
    /// for empty input.
    pub fn begin_text(&mut self, text: &str) -> Option<PendingGeneration> {
        if text.is_empty() {
            return None;
        }

        self.last_request_id += 1;
        let id = RequestId(self.last_request_id);

        self.turns.push(Turn::user_text(text));
        let history = provider_history(&self.turns);
        self.turns.push(Turn::assistant_streaming(id, ""));

        tracing::debug!(request_id = %id, turns = self.turns.len(), "Began generation");
        return Some(PendingGeneration { id, history });
    }

    pub fn apply_chunk(&mut self, id: RequestId, cumulative: &str) -> bool {
        return replace_streaming_turn(&mut self.turns, id, cumulative);
    }

    pub fn complete(&mut self, id: RequestId) -> bool {
        return self.finish(id, TurnStatus::Complete, None);
    }

    /// Keeps whatever text already streamed in.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        return self.finish(id, TurnStatus::Cancelled, None);
    }

    pub fn fail(&mut self, id: RequestId) -> bool {
        return self.finish(id, TurnStatus::Failed, Some(GENERATION_ERROR_TEXT));
    }

    fn finish(&mut self, id: RequestId, status: TurnStatus, text: Option<&str>) -> bool {
        let turn = match self.turns.iter_mut().rev().find(|turn| return turn.is_streaming(id)) {
            Some(turn) => turn,
            None => return false,
        };

        let text = text.unwrap_or(turn.content()).to_string();
        *turn = Turn::assistant_finished(&text, status);
        return true;
    }

    /// Runs one whole user turn against `generator`: appends the turns,
    /// streams the answer into the placeholder and finalizes it. Failures end
    /// up in the transcript, never in the caller.
    pub async fn submit_text(
        &mut self,
        generator: &(dyn ContentGenerator + Send + Sync),
        text: &str,
        cancel: &CancellationToken,
    ) -> Option<RequestId> {
        let pending = self.begin_text(text)?;
        let id = pending.id;

        let turns = &mut self.turns;
        let mut on_chunk = |cumulative: &str| {
            replace_streaming_turn(turns, id, cumulative);
        };

        let res = generator
            .generate_stream(&pending.history, cancel, &mut on_chunk)
            .await;

        match res {
            Ok(_) => {
                self.complete(id);
            }
            Err(GenerationError::Cancelled) => {
                self.cancel(id);
            }
            Err(err) => {
                tracing::error!(request_id = %id, error = %err, "Generation failed");
                self.fail(id);
            }
        }

        return Some(id);
    }
}
