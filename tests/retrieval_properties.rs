//! Property tests for index ranking

use proptest::prelude::*;
use symptom_rag::retrieval::EmbeddingIndex;

const DIM: usize = 8;
const TOLERANCE: f32 = 1e-5;

fn vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-10.0f32..10.0, DIM)
}

fn index_and_query() -> impl Strategy<Value = (Vec<Vec<f32>>, Vec<f32>)> {
    (prop::collection::vec(vector(), 0..40), vector())
}

fn build(vectors: Vec<Vec<f32>>) -> EmbeddingIndex {
    let ids = (1..=vectors.len() as i64).collect();
    EmbeddingIndex::from_parts(vectors, ids).unwrap()
}

proptest! {
    #[test]
    fn search_returns_min_k_n((vectors, query) in index_and_query(), k in 0usize..50) {
        let n = vectors.len();
        let hits = build(vectors).search(&query, k).unwrap();
        prop_assert_eq!(hits.len(), k.min(n));
    }

    #[test]
    fn search_scores_descend_within_bounds((vectors, query) in index_and_query(), k in 1usize..50) {
        let hits = build(vectors).search(&query, k).unwrap();
        for (_, score) in &hits {
            prop_assert!(*score >= -1.0 - TOLERANCE && *score <= 1.0 + TOLERANCE);
        }
        for pair in hits.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn search_is_repeatable((vectors, query) in index_and_query(), k in 0usize..50) {
        let index = build(vectors);
        let first = index.search(&query, k).unwrap();
        let second = index.search(&query, k).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn search_ids_are_distinct_and_known((vectors, query) in index_and_query()) {
        let n = vectors.len();
        let index = build(vectors);
        let hits = index.search(&query, n).unwrap();

        let mut ids: Vec<i64> = hits.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), n);
        prop_assert!(ids.iter().all(|id| index.ids().contains(id)));
    }
}
