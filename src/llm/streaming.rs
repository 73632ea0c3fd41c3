//! Streaming response handling

use crate::llm::TokenStream;
use crate::Result;

/// Streaming answer delivered token by token
pub struct StreamingAnswer {
    stream: TokenStream,
}

impl StreamingAnswer {
    pub fn new(stream: TokenStream) -> Self {
        Self { stream }
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        use futures::StreamExt;
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }

    /// Get the underlying stream
    pub fn into_stream(self) -> TokenStream {
        self.stream
    }
}
