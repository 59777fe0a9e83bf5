use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use snapsolve_core::{
    spawn_with_deadline, CapturedImage, DeadlineError, ManualInput, OcrProvider, OcrProviderError, OcrResult,
    MIN_OCR_TEXT_CHARS,
};

use crate::text::clean_extracted_text;

/// Default per-provider deadline.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// `OcrResult::source` for text the user typed.
pub const MANUAL_SOURCE: &str = "manual";

/// One provider invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrAttempt {
    pub provider: String,
    pub elapsed: Duration,
    /// `None` when this attempt produced the accepted text.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub result: OcrResult,
    pub attempts: Vec<OcrAttempt>,
    /// Whether the user was asked to type the question.
    pub manual_requested: bool,
}

/// Ordered OCR fallback chain.
pub struct OcrChain {
    providers: Vec<Arc<dyn OcrProvider>>,
    provider_timeout: Duration,
}

impl OcrChain {
    pub fn new(providers: Vec<Arc<dyn OcrProvider>>) -> Self {
        Self {
            providers,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn OcrProvider>] {
        &self.providers
    }

    /// Try each provider in order until one yields usable text.
    ///
    /// Later providers are never invoked once one succeeds. A provider that
    /// errors, times out, panics or returns fewer than two characters counts
    /// as a failure and the chain moves on.
    pub async fn run(&self, image: &CapturedImage) -> ChainOutcome {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name().to_string();
            let started = Instant::now();
            let verdict = self.attempt(Arc::clone(provider), image.clone()).await;
            let elapsed = started.elapsed();

            match verdict {
                Ok(text) => {
                    info!(provider = %name, chars = text.chars().count(), elapsed_ms = elapsed.as_millis() as u64, "OCR succeeded");
                    attempts.push(OcrAttempt {
                        provider: name.clone(),
                        elapsed,
                        error: None,
                    });
                    return ChainOutcome {
                        result: OcrResult::text(name, text),
                        attempts,
                        manual_requested: false,
                    };
                }
                Err(reason) => {
                    warn!(provider = %name, error = %reason, "OCR provider failed, trying next");
                    attempts.push(OcrAttempt {
                        provider: name,
                        elapsed,
                        error: Some(reason),
                    });
                }
            }
        }

        let summary = if attempts.is_empty() {
            "no OCR providers configured".to_string()
        } else {
            attempts
                .iter()
                .filter_map(|a| a.error.as_deref())
                .collect::<Vec<_>>()
                .join("; ")
        };
        ChainOutcome {
            result: OcrResult::failure("chain", summary),
            attempts,
            manual_requested: false,
        }
    }

    /// Run the chain and, if it fails, ask the user exactly once.
    ///
    /// Typed text is accepted when non-empty after trimming. A dismissed or
    /// blank prompt leaves the outcome failed.
    pub async fn run_with_manual_fallback(&self, image: &CapturedImage, manual: &dyn ManualInput) -> ChainOutcome {
        let mut outcome = self.run(image).await;
        if outcome.result.success {
            return outcome;
        }

        let reason = outcome.result.error.clone().unwrap_or_default();
        info!(reason = %reason, "Asking the user to type the question");
        outcome.manual_requested = true;

        let typed = manual
            .request_text(&reason)
            .await
            .map(|t| clean_extracted_text(&t))
            .filter(|t| !t.is_empty());
        outcome.result = match typed {
            Some(text) => OcrResult::text(MANUAL_SOURCE, text),
            None => OcrResult::failure(MANUAL_SOURCE, format!("{reason}; manual entry cancelled")),
        };
        outcome
    }

    async fn attempt(&self, provider: Arc<dyn OcrProvider>, image: CapturedImage) -> Result<String, String> {
        let name = provider.name().to_string();
        let outcome = spawn_with_deadline(self.provider_timeout, async move { provider.try_extract(&image).await }).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(DeadlineError::Elapsed(after)) => {
                return Err(OcrProviderError::Timeout { provider: name, after }.to_string())
            }
            Err(DeadlineError::Panicked(message)) => {
                return Err(OcrProviderError::Aborted { provider: name, message }.to_string())
            }
        };

        if !result.success {
            let detail = result.error.unwrap_or_else(|| "reported failure".to_string());
            return Err(format!("{name}: {detail}"));
        }
        let cleaned = result.extracted_text.as_deref().map(clean_extracted_text).unwrap_or_default();
        if cleaned.chars().count() < MIN_OCR_TEXT_CHARS {
            return Err(format!("{name}: no text detected"));
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snapsolve_core::{DeclineManualInput, ImageEncoding};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Script {
        Text(&'static str),
        Fail,
        Hang,
        Panic,
    }

    struct ScriptedProvider {
        name: &'static str,
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, script: Script) -> (Arc<dyn OcrProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Arc::new(Self {
                name,
                script,
                calls: Arc::clone(&calls),
            });
            (provider, calls)
        }
    }

    #[async_trait]
    impl OcrProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn try_extract(&self, _image: &CapturedImage) -> Result<OcrResult, OcrProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Text(t) => Ok(OcrResult::text(self.name, t)),
                Script::Fail => Err(OcrProviderError::transport(self.name, "connection refused")),
                Script::Hang => std::future::pending().await,
                Script::Panic => panic!("decoder exploded"),
            }
        }
    }

    struct ScriptedManual {
        reply: Option<&'static str>,
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ManualInput for ScriptedManual {
        async fn request_text(&self, reason: &str) -> Option<String> {
            self.asked.lock().unwrap().push(reason.to_string());
            self.reply.map(str::to_string)
        }
    }

    fn image() -> CapturedImage {
        CapturedImage::new(vec![0; 8], ImageEncoding::Png, 200, 80)
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let (a, a_calls) = ScriptedProvider::new("a", Script::Text("What is the capital of France?"));
        let (b, b_calls) = ScriptedProvider::new("b", Script::Text("unused"));
        let outcome = OcrChain::new(vec![a, b]).run(&image()).await;

        assert!(outcome.result.success);
        assert_eq!(outcome.result.source.as_deref(), Some("a"));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_short_text_falls_through_to_next_provider() {
        let (a, _) = ScriptedProvider::new("a", Script::Text(" x "));
        let (b, _) = ScriptedProvider::new("b", Script::Fail);
        let (c, _) = ScriptedProvider::new("c", Script::Text("2  +\n2 = ?"));
        let outcome = OcrChain::new(vec![a, b, c]).run(&image()).await;

        assert_eq!(outcome.result.extracted_text.as_deref(), Some("2 + 2 = ?"));
        assert_eq!(outcome.result.source.as_deref(), Some("c"));
        let errors: Vec<_> = outcome.attempts.iter().map(|a| a.error.is_some()).collect();
        assert_eq!(errors, vec![true, true, false]);
        assert_eq!(outcome.attempts[0].error.as_deref(), Some("a: no text detected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_is_abandoned_after_deadline() {
        let (a, _) = ScriptedProvider::new("a", Script::Hang);
        let (b, _) = ScriptedProvider::new("b", Script::Text("hello"));
        let outcome = OcrChain::new(vec![a, b]).run(&image()).await;

        assert_eq!(outcome.result.source.as_deref(), Some("b"));
        assert_eq!(outcome.attempts[0].error.as_deref(), Some("a: timed out after 8000ms"));
    }

    #[tokio::test]
    async fn test_panicking_provider_does_not_stop_chain() {
        let (a, _) = ScriptedProvider::new("a", Script::Panic);
        let (b, _) = ScriptedProvider::new("b", Script::Text("hello"));
        let outcome = OcrChain::new(vec![a, b]).run(&image()).await;

        assert!(outcome.result.success);
        assert!(outcome.attempts[0].error.as_ref().unwrap().contains("decoder exploded"));
    }

    #[tokio::test]
    async fn test_all_fail_reports_each_reason() {
        let (a, _) = ScriptedProvider::new("a", Script::Fail);
        let (b, _) = ScriptedProvider::new("b", Script::Text(""));
        let outcome = OcrChain::new(vec![a, b]).run(&image()).await;

        assert!(!outcome.result.success);
        let error = outcome.result.error.unwrap();
        assert!(error.contains("a: request failed: connection refused"));
        assert!(error.contains("b: no text detected"));
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let outcome = OcrChain::new(Vec::new()).run(&image()).await;
        assert_eq!(outcome.result.error.as_deref(), Some("no OCR providers configured"));
    }

    #[tokio::test]
    async fn test_manual_input_asked_once_after_exhaustion() {
        let (a, _) = ScriptedProvider::new("a", Script::Fail);
        let manual = ScriptedManual {
            reply: Some("  What is 2+2? "),
            asked: Mutex::new(Vec::new()),
        };
        let outcome = OcrChain::new(vec![a]).run_with_manual_fallback(&image(), &manual).await;

        assert!(outcome.manual_requested);
        assert_eq!(outcome.result, OcrResult::text(MANUAL_SOURCE, "What is 2+2?"));
        assert_eq!(manual.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_input_not_asked_on_success() {
        let (a, _) = ScriptedProvider::new("a", Script::Text("hello"));
        let manual = ScriptedManual {
            reply: Some("ignored"),
            asked: Mutex::new(Vec::new()),
        };
        let outcome = OcrChain::new(vec![a]).run_with_manual_fallback(&image(), &manual).await;

        assert!(!outcome.manual_requested);
        assert!(manual.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_or_dismissed_manual_entry_fails() {
        let (a, _) = ScriptedProvider::new("a", Script::Fail);
        let chain = OcrChain::new(vec![a]);

        let blank = ScriptedManual {
            reply: Some("   "),
            asked: Mutex::new(Vec::new()),
        };
        let outcome = chain.run_with_manual_fallback(&image(), &blank).await;
        assert!(!outcome.result.success);

        let outcome = chain.run_with_manual_fallback(&image(), &DeclineManualInput).await;
        assert!(!outcome.result.success);
        assert!(outcome.result.error.unwrap().ends_with("manual entry cancelled"));
    }
}
