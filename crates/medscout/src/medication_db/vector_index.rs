//! In-memory vector index with HNSW approximate search
use std::cmp::Ordering;
use std::collections::HashMap;

use hora::core::ann_index::ANNIndex;
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Mirror of one vector column, keyed by row id. The HNSW graph is rebuilt
/// lazily after writes, on the next approximate search.
pub struct VectorIndex {
    dimension: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
    hnsw: Option<HNSWIndex<f32, usize>>,
    dirty: bool,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
            hnsw: None,
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Insert or replace the vector stored for `id`
    pub fn upsert(&mut self, id: &str, vector: Vec<f32>) -> StoreResult<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        match self.positions.get(id) {
            Some(&pos) => self.vectors[pos] = vector,
            None => {
                self.positions.insert(id.to_string(), self.ids.len());
                self.ids.push(id.to_string());
                self.vectors.push(vector);
            }
        }
        self.dirty = true;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&pos| self.vectors[pos].as_slice())
    }

    fn rebuild(&mut self) -> StoreResult<()> {
        let params = HNSWParams::<f32> {
            n_neighbor: 16,
            ef_build: 100,
            ef_search: 50,
            ..Default::default()
        };
        let mut index = HNSWIndex::<f32, usize>::new(self.dimension, &params);
        for (pos, vector) in self.vectors.iter().enumerate() {
            index
                .add(&normalized(vector), pos)
                .map_err(|e| StoreError::Index(format!("failed to add vector: {}", e)))?;
        }
        index
            .build(Metric::Euclidean)
            .map_err(|e| StoreError::Index(format!("failed to build index: {}", e)))?;

        debug!("Rebuilt HNSW index over {} vectors", self.vectors.len());
        self.hnsw = Some(index);
        self.dirty = false;
        Ok(())
    }

    /// Approximate nearest-neighbour ids, unscored
    pub fn nearest_ids(&mut self, query: &[f32], limit: usize) -> StoreResult<Vec<String>> {
        if self.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        if self.dirty || self.hnsw.is_none() {
            self.rebuild()?;
        }
        let Some(index) = self.hnsw.as_ref() else {
            return Ok(Vec::new());
        };
        Ok(index
            .search(&normalized(query), limit)
            .into_iter()
            .filter_map(|pos| self.ids.get(pos).cloned())
            .collect())
    }

    /// Top `limit` ids by exact cosine similarity, descending. With
    /// `approximate`, candidates come from the HNSW graph first and are
    /// then rescored exactly.
    pub fn search(
        &mut self,
        query: &[f32],
        limit: usize,
        approximate: bool,
    ) -> StoreResult<Vec<(String, f32)>> {
        let mut scored: Vec<(String, f32)> = if approximate {
            self.nearest_ids(query, limit)?
                .into_iter()
                .filter_map(|id| {
                    let sim = cosine_similarity(query, self.get(&id)?);
                    Some((id, sim))
                })
                .collect()
        } else {
            self.ids
                .iter()
                .zip(self.vectors.iter())
                .map(|(id, vector)| (id.clone(), cosine_similarity(query, vector)))
                .collect()
        };
        sort_by_similarity(&mut scored, |(_, sim)| *sim);
        scored.truncate(limit);
        Ok(scored)
    }
}

// Euclidean distance between unit vectors is monotone in cosine similarity
fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector.to_vec()
    } else {
        vector.iter().map(|x| x / norm).collect()
    }
}

/// Stable descending sort on a similarity key
pub fn sort_by_similarity<T>(items: &mut [T], key: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Cosine similarity in [-1, 1]; zero for mismatched or zero-norm vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_identical_and_opposite() {
        let v = [1.0, 2.0, 3.0];
        let neg = [-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_upsert_replaces_existing_vector() {
        let mut index = VectorIndex::new(2);
        index.upsert("a", vec![1.0, 0.0]).unwrap();
        index.upsert("a", vec![0.0, 1.0]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a"), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_upsert_rejects_wrong_dimension() {
        let mut index = VectorIndex::new(3);
        let err = index.upsert("a", vec![1.0]).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 3, actual: 1 }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_exact_search_orders_and_limits() {
        let mut index = VectorIndex::new(2);
        index.upsert("far", vec![-1.0, 0.0]).unwrap();
        index.upsert("near", vec![1.0, 0.1]).unwrap();
        index.upsert("mid", vec![1.0, 1.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 2, false).unwrap();
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }

    #[test]
    fn test_approximate_search_finds_exact_match() {
        let mut index = VectorIndex::new(4);
        for i in 0..20 {
            let angle = i as f32 * 0.3;
            index
                .upsert(&format!("v{}", i), vec![angle.cos(), angle.sin(), 0.5, 0.1])
                .unwrap();
        }
        let query = index.get("v7").unwrap().to_vec();
        let results = index.search(&query, 3, true).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "v7");
        assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let mut index = VectorIndex::new(2);
        assert!(index.search(&[1.0, 0.0], 5, true).unwrap().is_empty());
        assert!(index.nearest_ids(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_cosine_is_bounded(
            a in proptest::collection::vec(-100.0f32..100.0, 8),
            b in proptest::collection::vec(-100.0f32..100.0, 8),
        ) {
            let sim = cosine_similarity(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&sim));
        }

        #[test]
        fn prop_cosine_is_symmetric(
            a in proptest::collection::vec(-10.0f32..10.0, 4),
            b in proptest::collection::vec(-10.0f32..10.0, 4),
        ) {
            prop_assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);
        }
    }
}
