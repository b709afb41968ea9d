use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Content;
use super::GenerationError;

#[async_trait]
pub trait ContentGenerator {
    /// Single request/response call. Transient provider failures are retried
    /// according to the generator's retry policy.
    async fn generate(&self, history: &[Content]) -> Result<String, GenerationError>;

    /// Streams a response, handing `on_chunk` the cumulative text after every
    /// non-empty fragment. Never retried. Partial text already delivered
    /// stands when the stream fails part way.
    ///
    /// Once `cancel` fires no further chunks are delivered and the call
    /// resolves to `GenerationError::Cancelled`.
    ///
    /// Returns the full accumulated text.
    async fn generate_stream<'a>(
        &self,
        history: &[Content],
        cancel: &CancellationToken,
        on_chunk: &'a mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, GenerationError>;
}
