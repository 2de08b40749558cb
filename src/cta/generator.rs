//! Call-to-action label generation.
//!
//! [`CtaGenerator`] serves labels from the [`GenerationCache`] when it can,
//! otherwise streams one from the inference engine, forwarding the label
//! as it grows. Every failure degrades to [`FALLBACK_CTA`]; only labels that
//! actually came out of the model are cached.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;

use super::cache::GenerationCache;
use super::engine::{EngineError, EngineService};
use super::extract::{CtaResponse, PartialFieldExtractor, StreamAccumulator};
use super::prompts::{RepoContext, build_request};

/// Label shown when nothing better is available.
pub const FALLBACK_CTA: &str = "View on GitHub";

/// Result of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCta {
    /// Label to display.
    pub cta: String,
    /// Model's explanation, when it gave one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Served from the cache.
    pub from_cache: bool,
    /// Produced by the model in this call.
    pub generated: bool,
}

impl GeneratedCta {
    fn fallback() -> Self {
        Self {
            cta: FALLBACK_CTA.to_string(),
            reasoning: None,
            from_cache: false,
            generated: false,
        }
    }

    fn cached(cta: String) -> Self {
        Self {
            cta,
            reasoning: None,
            from_cache: true,
            generated: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum GenerationError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("model returned an empty response")]
    Empty,

    #[error("model response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cta extractor unavailable")]
    Extractor,
}

/// Produces labels for repository cards.
#[derive(Debug)]
pub struct CtaGenerator {
    engine: Arc<EngineService>,
    cache: Arc<GenerationCache>,
}

impl CtaGenerator {
    /// Creates a generator over a shared engine and cache.
    #[must_use]
    pub fn new(engine: Arc<EngineService>, cache: Arc<GenerationCache>) -> Self {
        Self { engine, cache }
    }

    /// Label for `repo`, without progress updates.
    pub async fn generate(&self, repo: &RepoContext) -> GeneratedCta {
        self.generate_streaming(repo, |_| {}).await
    }

    /// Label for `repo`.
    ///
    /// `on_token` receives the partial label each time it changes while the
    /// model streams, and the final label if it differs from the last
    /// partial one. It is not called for cache hits or fallbacks.
    pub async fn generate_streaming<F>(&self, repo: &RepoContext, mut on_token: F) -> GeneratedCta
    where
        F: FnMut(&str) + Send,
    {
        let description = repo.description.as_deref();
        if let Some(cached) = self
            .cache
            .get(&repo.name, description)
            .filter(|cta| !cta.is_empty())
        {
            return GeneratedCta::cached(cached);
        }

        if !self.engine.is_supported() {
            return GeneratedCta::fallback();
        }

        let (response, last_emitted) = match self.run(repo, &mut on_token).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(repo = %repo.name, error = %e, "cta generation failed");
                return GeneratedCta::fallback();
            }
        };

        let cta = response
            .cta
            .as_deref()
            .map(str::trim)
            .filter(|cta| !cta.is_empty())
            .unwrap_or(FALLBACK_CTA)
            .to_string();
        if last_emitted.as_deref() != Some(cta.as_str()) {
            on_token(&cta);
        }

        self.cache.set(&repo.name, description, &cta);
        tracing::debug!(repo = %repo.name, cta = %cta, "generated cta");

        GeneratedCta {
            cta,
            reasoning: response.reasoning,
            from_cache: false,
            generated: true,
        }
    }

    /// Labels for every repository, keyed by name, generated one at a time.
    pub async fn generate_batch(&self, repos: &[RepoContext]) -> Vec<(String, String)> {
        let mut labels = Vec::with_capacity(repos.len());
        for repo in repos {
            let generated = self.generate(repo).await;
            labels.push((repo.name.clone(), generated.cta));
        }
        labels
    }

    async fn run<F>(
        &self,
        repo: &RepoContext,
        on_token: &mut F,
    ) -> Result<(CtaResponse, Option<String>), GenerationError>
    where
        F: FnMut(&str) + Send,
    {
        let extractor = PartialFieldExtractor::cta().ok_or(GenerationError::Extractor)?;
        let engine = self.engine.initialize().await?;
        let mut stream = engine.stream_chat(build_request(repo)).await?;

        let mut accumulator = StreamAccumulator::new();
        while let Some(delta) = stream.next().await {
            if let Some(partial) = accumulator.push(&delta?, extractor) {
                on_token(&partial);
            }
        }

        if accumulator.buffer().is_empty() {
            return Err(GenerationError::Empty);
        }
        let response = accumulator.finish()?;
        Ok((response, accumulator.last_emitted().map(str::to_string)))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::cta::cache::CACHE_KEY;
    use crate::cta::engine::EngineBackend;
    use crate::cta::storage::{KeyValueStorage, MemoryStorage};
    use crate::test_support::ScriptedBackend;

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        storage: Arc<MemoryStorage>,
        generator: CtaGenerator,
    }

    fn fixture(backend: ScriptedBackend) -> Fixture {
        let backend = Arc::new(backend);
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(EngineService::new(
            Arc::clone(&backend) as Arc<dyn EngineBackend>
        ));
        let cache = Arc::new(GenerationCache::new(
            Arc::clone(&storage) as Arc<dyn KeyValueStorage>
        ));
        Fixture {
            backend,
            storage,
            generator: CtaGenerator::new(engine, cache),
        }
    }

    fn repo() -> RepoContext {
        RepoContext {
            name: "hydra".to_string(),
            description: Some("AMM gateway".to_string()),
            language: Some("Rust".to_string()),
            topics: vec!["amm".to_string()],
        }
    }

    #[tokio::test]
    async fn streams_partials_then_caches() {
        let f = fixture(ScriptedBackend::new(vec![
            r#"{"cta": "Sw"#,
            "ap",
            r#" Now", "#,
            r#""reasoning": "it swaps"}"#,
        ]));
        let mut partials = Vec::new();
        let result = f
            .generator
            .generate_streaming(&repo(), |p| partials.push(p.to_string()))
            .await;

        assert_eq!(result.cta, "Swap Now");
        assert_eq!(result.reasoning.as_deref(), Some("it swaps"));
        assert!(result.generated && !result.from_cache);
        assert_eq!(partials, vec!["Sw", "Swap", "Swap Now"]);

        let cached = f.generator.generate(&repo()).await;
        assert_eq!(cached.cta, "Swap Now");
        assert!(cached.from_cache);
        assert_eq!(f.backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn final_label_is_trimmed_and_reported() {
        let f = fixture(ScriptedBackend::new(vec![r#"{"cta": "  Play It  "}"#]));
        let mut partials = Vec::new();
        let result = f
            .generator
            .generate_streaming(&repo(), |p| partials.push(p.to_string()))
            .await;
        assert_eq!(result.cta, "Play It");
        assert_eq!(partials, vec!["  Play It  ", "Play It"]);
    }

    #[tokio::test]
    async fn request_describes_the_repository() {
        let f = fixture(ScriptedBackend::new(vec![r#"{"cta": "Go"}"#]));
        let _ = f.generator.generate(&repo()).await;
        let requests = f.backend.requests();
        let Some(user) = requests.first().and_then(|r| r.messages.last()) else {
            panic!("no request recorded");
        };
        assert!(user.content.contains("Repository: hydra"));
        assert!(user.content.contains("Topics: amm"));
    }

    #[tokio::test]
    async fn unsupported_engine_falls_back_without_loading() {
        let f = fixture(ScriptedBackend::unsupported());
        let result = f.generator.generate(&repo()).await;
        assert_eq!(result, GeneratedCta::fallback());
        assert_eq!(f.backend.load_count(), 0);
    }

    #[tokio::test]
    async fn empty_output_falls_back_uncached() {
        let f = fixture(ScriptedBackend::new(vec![]));
        let result = f.generator.generate(&repo()).await;
        assert_eq!(result.cta, FALLBACK_CTA);
        assert!(!result.generated);
        assert_eq!(f.storage.get(CACHE_KEY), Ok(None));
    }

    #[tokio::test]
    async fn invalid_json_falls_back_uncached() {
        let f = fixture(ScriptedBackend::new(vec![r#"{"cta": "Half"#]));
        let mut partials = Vec::new();
        let result = f
            .generator
            .generate_streaming(&repo(), |p| partials.push(p.to_string()))
            .await;
        assert_eq!(result, GeneratedCta::fallback());
        assert_eq!(partials, vec!["Half"]);
        assert_eq!(f.storage.get(CACHE_KEY), Ok(None));
    }

    #[tokio::test]
    async fn broken_stream_falls_back() {
        let f = fixture(ScriptedBackend::broken_stream(vec![r#"{"cta": "Go"}"#]));
        let result = f.generator.generate(&repo()).await;
        assert_eq!(result, GeneratedCta::fallback());
    }

    #[tokio::test]
    async fn failed_load_falls_back_then_recovers() {
        let f = fixture(ScriptedBackend::failing_once(vec![r#"{"cta": "Go"}"#]));
        assert_eq!(f.generator.generate(&repo()).await, GeneratedCta::fallback());
        assert_eq!(f.generator.generate(&repo()).await.cta, "Go");
        assert_eq!(f.backend.load_count(), 2);
    }

    #[tokio::test]
    async fn blank_label_becomes_fallback_and_is_cached() {
        let f = fixture(ScriptedBackend::new(vec![r#"{"cta": "   "}"#]));
        let result = f.generator.generate(&repo()).await;
        assert_eq!(result.cta, FALLBACK_CTA);
        assert!(result.generated);
        let Ok(Some(raw)) = f.storage.get(CACHE_KEY) else {
            panic!("label not cached");
        };
        assert!(raw.contains(FALLBACK_CTA));
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let f = fixture(ScriptedBackend::new(vec![r#"{"cta": "Go"}"#]));
        let repos = vec![RepoContext::named("b"), RepoContext::named("a")];
        let labels = f.generator.generate_batch(&repos).await;
        assert_eq!(
            labels,
            vec![
                ("b".to_string(), "Go".to_string()),
                ("a".to_string(), "Go".to_string())
            ]
        );
        assert_eq!(f.backend.requests().len(), 2);
        assert_eq!(f.backend.load_count(), 1);
    }
}
