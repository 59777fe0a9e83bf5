use std::collections::HashMap;
use std::sync::Arc;

use snapsolve_core::{AiBackend, AiError, ProviderKind};

use crate::backends::{GeminiBackend, GroqBackend, HuggingFaceBackend, OllamaBackend, OpenAiCompatibleBackend};
use crate::http::RetryPolicy;

/// Maps each provider tag to its backend. Resolved once per run.
pub struct BackendRegistry {
    backends: HashMap<ProviderKind, Arc<dyn AiBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Every built-in backend, sharing one retry policy.
    pub fn with_defaults(retry: RetryPolicy) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HuggingFaceBackend::new().with_retry(retry)));
        registry.register(Arc::new(GroqBackend::new().with_retry(retry)));
        registry.register(Arc::new(OllamaBackend::new().with_retry(retry)));
        registry.register(Arc::new(GeminiBackend::new().with_retry(retry)));
        registry.register(Arc::new(OpenAiCompatibleBackend::new().with_retry(retry)));
        registry
    }

    /// Register a backend under its own kind, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn AiBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn AiBackend>, AiError> {
        self.backends.get(&kind).cloned().ok_or(AiError::UnknownProvider(kind))
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.backends.contains_key(k))
            .collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_provider() {
        let registry = BackendRegistry::default();
        assert_eq!(registry.kinds(), ProviderKind::ALL.to_vec());
        for kind in ProviderKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_unknown_provider() {
        let registry = BackendRegistry::new();
        assert!(matches!(
            registry.get(ProviderKind::Groq),
            Err(AiError::UnknownProvider(ProviderKind::Groq))
        ));
    }
}
