use finrag_core::{AggregatedResult, ScoredHit};

/// Merges hits gathered from several namespaces.
///
/// `hits` must arrive in (namespace order, rank) order; equal confidences keep
/// that order. The average is taken over every hit, before the threshold
/// filter is applied.
pub fn aggregate(mut hits: Vec<ScoredHit>, threshold: f32) -> AggregatedResult {
    if hits.is_empty() {
        return AggregatedResult { results: Vec::new(), avg_confidence: 0.0, below_threshold: threshold > 0.0, top_result: None };
    }
    // sort_by is stable
    hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let avg_confidence = hits.iter().map(|h| h.confidence).sum::<f32>() / hits.len() as f32;
    let results: Vec<ScoredHit> = hits.into_iter().filter(|h| h.confidence >= threshold).collect();
    let top_result = results.first().cloned();
    AggregatedResult { results, avg_confidence, below_threshold: avg_confidence < threshold, top_result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::Metadata;

    fn hit(namespace: &str, content: &str, confidence: f32) -> ScoredHit {
        ScoredHit {
            content: content.to_string(),
            metadata: Metadata::new(),
            namespace: namespace.to_string(),
            score: (100.0 - confidence) / 10.0,
            confidence,
        }
    }

    #[test]
    fn sort_is_stable_across_namespaces() {
        let hits = vec![hit("news", "n1", 80.0), hit("earnings", "e1", 95.0), hit("news", "n2", 80.0)];
        let out = aggregate(hits, 70.0);
        let order: Vec<&str> = out.results.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(order, vec!["e1", "n1", "n2"]);
        assert_eq!(out.top_result.as_ref().map(|h| h.content.as_str()), Some("e1"));
        assert!(!out.below_threshold);
    }

    #[test]
    fn average_includes_filtered_hits() {
        let out = aggregate(vec![hit("news", "a", 90.0), hit("sentiment", "b", 30.0)], 70.0);
        assert_eq!(out.results.len(), 1);
        assert!((out.avg_confidence - 60.0).abs() < 1e-4);
        assert!(out.below_threshold);
        assert_eq!(out.top_result.map(|h| h.content), Some("a".to_string()));
    }

    #[test]
    fn nothing_passes_the_threshold() {
        let out = aggregate(vec![hit("news", "a", 40.0)], 70.0);
        assert!(out.results.is_empty());
        assert!(out.top_result.is_none());
        assert!(out.below_threshold);
    }

    #[test]
    fn empty_input() {
        let out = aggregate(Vec::new(), 70.0);
        assert_eq!(out.avg_confidence, 0.0);
        assert!(out.below_threshold);
        assert!(out.results.is_empty() && out.top_result.is_none());
        assert!(!aggregate(Vec::new(), 0.0).below_threshold);
    }
}
