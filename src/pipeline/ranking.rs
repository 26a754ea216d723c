//! Ordered (feature, score) lists

use serde::Serialize;

/// A feature and the score it was ranked by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeature {
    pub feature: String,
    pub score: f64,
}

/// Features sorted by score descending, ties broken by name ascending.
///
/// Non-finite scores never enter a ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    entries: Vec<RankedFeature>,
}

impl Ranking {
    pub fn from_scores(scores: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut entries: Vec<RankedFeature> = scores
            .into_iter()
            .filter(|(_, score)| score.is_finite())
            .map(|(feature, score)| RankedFeature { feature, score })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
        });

        Self { entries }
    }

    pub fn entries(&self) -> &[RankedFeature] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First `k` entries as a new ranking
    pub fn top(&self, k: usize) -> Ranking {
        Ranking {
            entries: self.entries.iter().take(k).cloned().collect(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.feature.clone()).collect()
    }

    pub fn score_of(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| e.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_descending_with_name_tiebreak() {
        let ranking = Ranking::from_scores(vec![
            ("b".to_string(), 0.5),
            ("a".to_string(), 0.5),
            ("c".to_string(), 0.9),
            ("d".to_string(), -0.2),
        ]);
        assert_eq!(ranking.names(), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_non_finite_scores_excluded() {
        let ranking = Ranking::from_scores(vec![
            ("a".to_string(), f64::NAN),
            ("b".to_string(), 1.0),
            ("c".to_string(), f64::INFINITY),
        ]);
        assert_eq!(ranking.names(), vec!["b"]);
    }

    #[test]
    fn test_top_k() {
        let ranking = Ranking::from_scores((0..10).map(|i| (format!("f{}", i), i as f64)));
        let top = ranking.top(3);
        assert_eq!(top.names(), vec!["f9", "f8", "f7"]);
        assert_eq!(ranking.top(50).len(), 10);
    }
}
