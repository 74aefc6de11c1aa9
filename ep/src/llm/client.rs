//! LlmClient trait definition

use async_trait::async_trait;

use super::{GenerateRequest, LlmError, RawResponse};

/// Stateless plan service client - each call is independent
///
/// Implementations carry no conversation state between calls. A reroute is
/// therefore only as good as what the prompt itself says.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and wait for the complete response
    async fn generate(&self, request: GenerateRequest) -> Result<RawResponse, LlmError>;

    /// Provider/model label for logs and status lines
    fn describe(&self) -> String;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// One scripted reply: how long to take and what to return
    pub struct MockReply {
        pub delay: Duration,
        pub result: Result<RawResponse, LlmError>,
    }

    impl MockReply {
        pub fn ok(text: impl Into<String>) -> Self {
            Self {
                delay: Duration::ZERO,
                result: Ok(RawResponse::text(text)),
            }
        }

        pub fn err(error: LlmError) -> Self {
            Self {
                delay: Duration::ZERO,
                result: Err(error),
            }
        }

        pub fn response(response: RawResponse) -> Self {
            Self {
                delay: Duration::ZERO,
                result: Ok(response),
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    /// Mock plan service for unit tests
    pub struct MockLlmClient {
        replies: Mutex<VecDeque<MockReply>>,
        prompts: Mutex<Vec<String>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(replies: Vec<MockReply>) -> Self {
            debug!(reply_count = %replies.len(), "MockLlmClient::new: called");
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Prompts received so far, in call order
        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, request: GenerateRequest) -> Result<RawResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::generate: called");
            self.prompts.lock().unwrap().push(request.prompt);

            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(reply) => {
                    if !reply.delay.is_zero() {
                        tokio::time::sleep(reply.delay).await;
                    }
                    reply.result
                }
                None => {
                    debug!("MockLlmClient::generate: no more mock replies");
                    Err(LlmError::InvalidResponse("No more mock responses".to_string()))
                }
            }
        }

        fn describe(&self) -> String {
            "mock".to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_replies_in_order() {
            let client = MockLlmClient::new(vec![MockReply::ok("Response 1"), MockReply::ok("Response 2")]);

            let resp1 = client.generate(GenerateRequest::new("a", None)).await.unwrap();
            assert_eq!(resp1.text, "Response 1");

            let resp2 = client.generate(GenerateRequest::new("b", None)).await.unwrap();
            assert_eq!(resp2.text, "Response 2");

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.prompts(), vec!["a", "b"]);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.generate(GenerateRequest::new("a", None)).await;
            assert!(result.is_err());
        }
    }
}
