use crate::services::TextScorer;

/// Cosine similarity between two embedding vectors, in [-1, 1]
///
/// Zero-length or zero-norm vectors yield 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Semantic relevance of a trial's text against a pre-computed patient
/// embedding.
///
/// Returns `(score, degraded_note)`. Empty trial text scores a neutral 0.0
/// without invoking the capability. A capability failure degrades to `None`
/// with the failure text for the explanation; relevance is a soft signal and
/// never aborts the pipeline for one trial.
pub async fn score_relevance(
    patient_embedding: &[f32],
    trial_text: &str,
    scorer: &dyn TextScorer,
) -> (Option<f64>, Option<String>) {
    if trial_text.trim().is_empty() {
        return (Some(0.0), None);
    }

    match scorer.embed(trial_text).await {
        Ok(trial_embedding) => {
            let similarity = cosine_similarity(patient_embedding, &trial_embedding);
            (Some(similarity), None)
        }
        Err(e) => {
            tracing::warn!("Embedding failed for trial text, degrading relevance: {}", e);
            (None, Some(format!("relevance unavailable: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CapabilityError;
    use async_trait::async_trait;

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl TextScorer for FixedScorer {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl TextScorer for FailingScorer {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CapabilityError> {
            Err(CapabilityError::Api("timeout".to_string()))
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.2, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_empty_trial_text_is_neutral_without_call() {
        struct PanickingScorer;

        #[async_trait]
        impl TextScorer for PanickingScorer {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, CapabilityError> {
                panic!("embed must not be called for empty text");
            }
        }

        let (score, note) = score_relevance(&[1.0, 0.0], "  ", &PanickingScorer).await;
        assert_eq!(score, Some(0.0));
        assert!(note.is_none());
    }

    #[tokio::test]
    async fn test_capability_failure_degrades() {
        let (score, note) = score_relevance(&[1.0, 0.0], "trial text", &FailingScorer).await;
        assert!(score.is_none());
        assert!(note.unwrap().contains("relevance unavailable"));
    }

    #[tokio::test]
    async fn test_relevance_uses_cosine() {
        let scorer = FixedScorer(vec![1.0, 0.0]);
        let (score, note) = score_relevance(&[1.0, 0.0], "trial text", &scorer).await;
        assert!((score.unwrap() - 1.0).abs() < 1e-9);
        assert!(note.is_none());
    }
}
