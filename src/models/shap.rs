//! Exact path-dependent TreeSHAP for a single regression tree
//!
//! For every row the returned contributions satisfy
//! `tree.expected_value() + sum(phi) == tree.predict_row(row)`.
//! Node covers recorded at training time stand in for the background
//! distribution, so no reference dataset is needed.

use super::tree::{RegressionTree, TreeNode};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` only for the root placeholder
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add the SHAP values of `tree` for `row` into `phi` (one slot per feature)
pub fn tree_shap(tree: &RegressionTree, row: &[f64], phi: &mut [f64]) {
    if tree.nodes().is_empty() {
        return;
    }
    recurse(tree.nodes(), 0, row, phi, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    nodes: &[TreeNode],
    index: usize,
    row: &[f64],
    phi: &mut [f64],
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match &nodes[index] {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += weight * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split_feature,
            threshold,
            left,
            right,
            cover,
            ..
        } => {
            let (hot, cold) = if row[*split_feature] <= *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_zero_fraction = nodes[hot].cover() / cover;
            let cold_zero_fraction = nodes[cold].cover() / cover;

            let mut incoming_zero_fraction = 1.0;
            let mut incoming_one_fraction = 1.0;

            // A feature seen earlier on the path is unwound and re-added here
            if let Some(pos) = path
                .iter()
                .position(|el| el.feature == Some(*split_feature))
            {
                incoming_zero_fraction = path[pos].zero_fraction;
                incoming_one_fraction = path[pos].one_fraction;
                unwind_path(&mut path, pos);
            }

            recurse(
                nodes,
                hot,
                row,
                phi,
                &path,
                hot_zero_fraction * incoming_zero_fraction,
                incoming_one_fraction,
                Some(*split_feature),
            );
            recurse(
                nodes,
                cold,
                row,
                phi,
                &path,
                cold_zero_fraction * incoming_zero_fraction,
                0.0,
                Some(*split_feature),
            );
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, path_index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    // Weights stay in place, element identities shift down
    for i in path_index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], path_index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            total += path[i].pweight / zero_fraction / ((depth - i) as f64 / denom);
        }
    }

    total
}
