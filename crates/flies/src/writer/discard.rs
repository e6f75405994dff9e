use async_trait::async_trait;

use crate::protocol::{CapturedRequest, WriteError};
use crate::writer::RequestWriter;

/// Accepts every request and writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardWriter;

#[async_trait]
impl RequestWriter for DiscardWriter {
    async fn render(&self, _request: &mut CapturedRequest) -> Result<(), WriteError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testing::{FailingBody, sample_request};

    #[tokio::test]
    async fn always_succeeds() {
        let writer = DiscardWriter;
        writer.init().await.unwrap();
        writer.render(&mut sample_request()).await.unwrap();

        // the body is never read
        let mut broken = CapturedRequest::new(sample_request().head().clone(), FailingBody);
        writer.render(&mut broken).await.unwrap();
        assert!(broken.body().is_live());
    }
}
