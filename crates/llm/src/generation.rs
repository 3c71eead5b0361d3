//! Generation client with rate-limit backoff.
//!
//! Drives the [`RetryPolicy`] state machine around a single-attempt
//! [`LlmClient`]. Attempts are strictly sequential.

use crate::client::{AttemptFailure, LlmClient, LlmResponse};
use crate::retry::{RetryEvent, RetryPolicy, RetryState, Sleeper, TokioSleeper};
use crate::types::{GenerationRequest, GenerationResult};
use askstore_core::{AppError, AppResult};
use std::sync::Arc;

/// Generation client used by the pipeline.
#[derive(Clone)]
pub struct GenerationClient {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
    /// Create a client with the default policy (3 attempts, 1s then 2s).
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the sleeper (tests use one that records delays).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Generate an answer, retrying while the service is rate limiting.
    ///
    /// `fragments_used` is reported back unchanged in the result.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        model: &str,
        fragments_used: usize,
    ) -> AppResult<GenerationResult> {
        let mut state = self.policy.start();
        let mut response: Option<LlmResponse> = None;
        let mut failure: Option<AppError> = None;
        let mut rate_limit_message = String::new();

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    tracing::debug!(
                        "Generation attempt {}/{} with model {}",
                        attempt,
                        self.policy.max_attempts,
                        model
                    );

                    let event = match self.client.attempt(request, model).await {
                        Ok(ok) => {
                            response = Some(ok);
                            RetryEvent::Succeeded
                        }
                        Err(AttemptFailure::RateLimited { message }) => {
                            rate_limit_message = message;
                            RetryEvent::RateLimited
                        }
                        Err(AttemptFailure::Failed(err)) => {
                            failure = Some(err);
                            RetryEvent::Failed
                        }
                    };

                    self.policy.next(state, event)
                }
                RetryState::BackoffWait { attempt, delay } => {
                    tracing::warn!(
                        "429 from generation service, retry {}/{} after {:?}",
                        attempt,
                        self.policy.max_attempts,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    self.policy.next(state, RetryEvent::WaitElapsed)
                }
                RetryState::Succeeded { attempt } => {
                    let response = response.take().ok_or_else(|| {
                        AppError::Other("Generation succeeded without a response".to_string())
                    })?;
                    return extract_answer(response, model, fragments_used, attempt);
                }
                RetryState::Aborted { attempt } => {
                    let err = failure.take().unwrap_or_else(|| {
                        AppError::upstream("Generation", None, "attempt failed")
                    });
                    tracing::error!("Generation failed on attempt {}: {}", attempt, err);
                    return Err(err);
                }
                RetryState::Exhausted { attempts } => {
                    tracing::error!("Generation still rate limited after {} attempts", attempts);
                    return Err(AppError::RateLimited {
                        attempts,
                        message: rate_limit_message,
                    });
                }
            };
        }
    }
}

/// Take the first candidate's text.
fn extract_answer(
    response: LlmResponse,
    model: &str,
    fragments_used: usize,
    attempts: u32,
) -> AppResult<GenerationResult> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NoCandidateGenerated {
            model: model.to_string(),
        })?;

    tracing::info!(
        "Generated answer with {} ({} chars, {} attempts)",
        model,
        candidate.text.len(),
        attempts
    );

    Ok(GenerationResult {
        text: candidate.text,
        fragments_used,
        model: model.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askstore_core::ConversationTurn;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Client returning a scripted sequence of outcomes.
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<LlmResponse, AttemptFailure>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<LlmResponse, AttemptFailure>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn attempt(
            &self,
            _request: &GenerationRequest,
            _model: &str,
        ) -> Result<LlmResponse, AttemptFailure> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> Result<LlmResponse, AttemptFailure> {
        Err(AttemptFailure::RateLimited {
            message: "quota exceeded".to_string(),
        })
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(vec![ConversationTurn::user("Q")])
    }

    fn setup(
        script: Vec<Result<LlmResponse, AttemptFailure>>,
    ) -> (GenerationClient, Arc<ScriptedClient>, Arc<RecordingSleeper>) {
        let scripted = ScriptedClient::new(script);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = GenerationClient::new(scripted.clone()).with_sleeper(sleeper.clone());
        (client, scripted, sleeper)
    }

    #[tokio::test]
    async fn test_succeeds_after_two_rate_limits() {
        let (client, scripted, sleeper) = setup(vec![
            rate_limited(),
            rate_limited(),
            Ok(LlmResponse::single("third time")),
        ]);

        let result = client.generate(&request(), "model-x", 2).await.unwrap();

        assert_eq!(result.text, "third time");
        assert_eq!(result.attempts, 3);
        assert_eq!(result.fragments_used, 2);
        assert_eq!(scripted.calls(), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_exhausts_after_three_rate_limits() {
        let (client, scripted, sleeper) = setup(vec![rate_limited(), rate_limited(), rate_limited()]);

        let err = client.generate(&request(), "model-x", 0).await.unwrap_err();

        match err {
            AppError::RateLimited { attempts, message } => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
        assert_eq!(scripted.calls(), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_rate_limit_failure_is_immediate() {
        let (client, scripted, sleeper) = setup(vec![Err(AttemptFailure::Failed(
            AppError::upstream("Generation", Some(500), "boom"),
        ))]);

        let err = client.generate(&request(), "model-x", 0).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::UpstreamUnavailable {
                status: Some(500),
                ..
            }
        ));
        assert_eq!(scripted.calls(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_candidates() {
        let (client, _, _) = setup(vec![Ok(LlmResponse::default())]);

        let err = client.generate(&request(), "model-x", 0).await.unwrap_err();

        assert!(matches!(err, AppError::NoCandidateGenerated { model } if model == "model-x"));
    }

    #[tokio::test]
    async fn test_first_candidate_wins() {
        let (client, _, _) = setup(vec![Ok(LlmResponse {
            candidates: vec![
                crate::client::Candidate {
                    text: "first".to_string(),
                },
                crate::client::Candidate {
                    text: "second".to_string(),
                },
            ],
        })]);

        let result = client.generate(&request(), "model-x", 0).await.unwrap();
        assert_eq!(result.text, "first");
        assert_eq!(result.attempts, 1);
    }
}
