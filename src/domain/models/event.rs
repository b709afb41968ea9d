use super::GenerationError;
use super::RequestId;
use super::UploadError;
use super::UploadResult;

/// Reported by background workers to the chat loop.
pub enum Event {
    GenerationChunk(RequestId, String),
    GenerationDone(RequestId),
    GenerationFailed(RequestId, GenerationError),
    GenerationCancelled(RequestId),
    UploadFinished(UploadResult),
    UploadFailed(UploadError),
}
