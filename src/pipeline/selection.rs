//! Union of the top-ranked features from every ranking

use std::collections::HashSet;

use tracing::debug;

use super::matrix::FeatureMatrix;
use super::ranking::Ranking;

/// Merge the top `top_k` names of each ranking into one feature subset.
///
/// The result contains each name once, keeps only columns of `features`,
/// and follows the matrix column order, so it does not depend on the
/// order the rankings are passed in.
pub fn select_features(rankings: &[&Ranking], top_k: usize, features: &FeatureMatrix) -> Vec<String> {
    let wanted: HashSet<String> = rankings
        .iter()
        .flat_map(|r| r.top(top_k).names())
        .collect();

    let selected: Vec<String> = features
        .column_names()
        .iter()
        .filter(|name| wanted.contains(*name))
        .cloned()
        .collect();

    let unknown = wanted.len() - selected.len();
    if unknown > 0 {
        debug!("{} ranked name(s) not in the feature matrix were ignored", unknown);
    }
    debug!("Selected {} of {} features", selected.len(), features.ncols());

    selected
}
