use crate::models::api::MatchResult;
use crate::models::image::{product_url, ImageRecord};

/// Cosine similarity between two vectors.
///
/// Total function: empty inputs, mismatched lengths, and zero-norm vectors
/// all score exactly 0.0. Comparability is a caller precondition, not an
/// error here.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Score a candidate pool against a query embedding and keep the top `n`.
///
/// Records whose embedding length differs from the query's are excluded
/// rather than scored; an empty pool (or an empty query) yields no matches.
pub fn top_matches(query: &[f32], records: &[ImageRecord], n: usize) -> Vec<MatchResult> {
    let mut scored: Vec<MatchResult> = records
        .iter()
        .filter(|r| !r.embedding.is_empty() && r.embedding.len() == query.len())
        .map(|r| MatchResult {
            id: r.id.clone(),
            image_url: r.source_url.clone(),
            link: product_url(&r.shop, &r.handle),
            score: cosine_similarity(query, &r.embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            shop: "demo.myshopify.com".to_string(),
            product_id: format!("gid://shopify/Product/{id}"),
            label: id.to_string(),
            handle: id.to_string(),
            source_url: format!("https://cdn.example.com/{id}.jpg"),
            embedding,
            created_at: None,
        }
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);

        let b = vec![0.3, -0.7, 2.5, 0.01];
        assert!((cosine_similarity(&b, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_known_angle() {
        let a = vec![1.0, 1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((cosine_similarity(&a, &b) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        let a = vec![0.2, -1.3, 0.8];
        let b = vec![1.1, 0.4, -0.5];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_opposite_vectors_score_negative_one() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_matches_ordering_and_truncation() {
        let query = vec![1.0, 0.0];
        let records: Vec<ImageRecord> = (0..8)
            .map(|i| {
                let x = 1.0 - (i as f32) * 0.1;
                record(&format!("r{i}"), vec![x, 1.0 - x])
            })
            .collect();

        let matches = top_matches(&query, &records, 5);
        assert_eq!(matches.len(), 5);
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(matches[0].id, "r0");
    }

    #[test]
    fn test_top_matches_excludes_length_mismatch() {
        let query = vec![1.0, 0.0, 0.0];
        let records = vec![
            record("ok", vec![1.0, 0.0, 0.0]),
            record("short", vec![1.0, 0.0]),
            record("empty", vec![]),
        ];
        let matches = top_matches(&query, &records, 5);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "ok");
        assert!((matches[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_matches_empty_pool() {
        let matches = top_matches(&[1.0, 0.0], &[], 5);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_top_matches_builds_link_from_handle() {
        let records = vec![record("r1", vec![1.0, 0.0])];
        let matches = top_matches(&[1.0, 0.0], &records, 5);
        assert_eq!(matches[0].link, "https://demo.myshopify.com/products/r1");
    }
}
