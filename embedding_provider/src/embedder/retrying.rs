use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use super::{Embedder, EmbedderError, EmbedderInfo};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_INPUT_CHARS: usize = 25_000;

/// Wraps any [`Embedder`] with the retry/truncate/fallback policy the indexing
/// stage expects: up to three attempts with exponential backoff, inputs longer
/// than 25,000 characters truncated before the call, and a zero vector (with a
/// logged warning and a bumped fallback counter) if every attempt still fails.
/// Empty or whitespace-only text short-circuits to a zero vector without
/// touching the wrapped embedder at all.
pub struct RetryingEmbedder<E> {
    inner: E,
    fallback_count: AtomicU64,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Number of calls that exhausted all retries and fell back to a zero vector.
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    fn truncated(text: &str) -> Cow<'_, str> {
        if text.chars().count() <= MAX_INPUT_CHARS {
            return Cow::Borrowed(text);
        }
        tracing::warn!(
            original_chars = text.chars().count(),
            limit = MAX_INPUT_CHARS,
            "truncating input before embedding"
        );
        Cow::Owned(text.chars().take(MAX_INPUT_CHARS).collect())
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let truncated = Self::truncated(text);
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.inner.embed(&truncated) {
                Ok(vector) => return vector,
                Err(err) => {
                    if attempt == MAX_ATTEMPTS {
                        self.fallback_count.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            attempts = attempt,
                            error = %err,
                            "embedding failed after all retries, falling back to zero vector"
                        );
                        return vec![0.0; self.inner.info().dimension];
                    }
                    tracing::warn!(
                        attempt,
                        error = %err,
                        backoff_secs = backoff.as_secs(),
                        "embedding attempt failed, retrying"
                    );
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        unreachable!("loop always returns by the final attempt")
    }
}

impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.inner.info().dimension]);
        }
        Ok(self.embed_one(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn info(&self) -> &EmbedderInfo {
        self.inner.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FlakyEmbedder {
        info: EmbedderInfo,
        failures_left: AtomicUsize,
    }

    impl Embedder for FlakyEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
            if self.failures_left.load(Ordering::Relaxed) > 0 {
                self.failures_left.fetch_sub(1, Ordering::Relaxed);
                return Err(EmbedderError::ProviderFailure {
                    message: "simulated transient failure".into(),
                });
            }
            Ok(vec![text.len() as f32; self.info.dimension])
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn info(&self) -> &EmbedderInfo {
            &self.info
        }
    }

    fn info() -> EmbedderInfo {
        EmbedderInfo {
            provider: super::super::ProviderKind::OnnxHttp,
            embedding_model_id: "test-model".into(),
            dimension: 4,
            text_repr_version: "v1".into(),
        }
    }

    #[test]
    fn empty_text_short_circuits_to_zero_vector() {
        let embedder = RetryingEmbedder::new(FlakyEmbedder {
            info: info(),
            failures_left: AtomicUsize::new(0),
        });
        let vector = embedder.embed("   ").unwrap();
        assert_eq!(vector, vec![0.0; 4]);
        assert_eq!(embedder.fallback_count(), 0);
    }

    #[test]
    fn recovers_after_transient_failures_within_attempt_budget() {
        let embedder = RetryingEmbedder::new(FlakyEmbedder {
            info: info(),
            failures_left: AtomicUsize::new(1),
        });
        let vector = embedder.embed("hello").unwrap();
        assert_eq!(vector.len(), 4);
        assert!(vector.iter().all(|&c| c == 5.0));
        assert_eq!(embedder.fallback_count(), 0);
    }

    #[test]
    fn exhausting_retries_falls_back_to_zero_vector_and_counts_it() {
        let embedder = RetryingEmbedder::new(FlakyEmbedder {
            info: info(),
            failures_left: AtomicUsize::new(10),
        });
        let vector = embedder.embed("hello").unwrap();
        assert_eq!(vector, vec![0.0; 4]);
        assert_eq!(embedder.fallback_count(), 1);
    }

    #[test]
    fn truncates_overlong_input_before_delegating() {
        struct LengthCapturingEmbedder {
            info: EmbedderInfo,
            seen_len: AtomicUsize,
        }
        impl Embedder for LengthCapturingEmbedder {
            fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
                self.seen_len.store(text.chars().count(), Ordering::Relaxed);
                Ok(vec![0.0; self.info.dimension])
            }
            fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
                texts.iter().map(|t| self.embed(t)).collect()
            }
            fn info(&self) -> &EmbedderInfo {
                &self.info
            }
        }

        let long_text = "a".repeat(MAX_INPUT_CHARS + 500);
        let embedder = RetryingEmbedder::new(LengthCapturingEmbedder {
            info: info(),
            seen_len: AtomicUsize::new(0),
        });
        embedder.embed(&long_text).unwrap();
        assert_eq!(embedder.inner.seen_len.load(Ordering::Relaxed), MAX_INPUT_CHARS);
    }
}
