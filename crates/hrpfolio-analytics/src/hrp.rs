//! Hierarchical Risk Parity: single-linkage clustering, quasi-diagonal
//! ordering, and recursive-bisection allocation.
//!
//! Weight allocation uses the classic diagonal inverse-variance proxy for
//! cluster variance (no cross-covariance term), so no matrix inversion is
//! involved anywhere.

use serde::{Deserialize, Serialize};

use hrpfolio_core::{AnalyticsError, Symbol};

use crate::correlation::DistanceMatrix;

/// Variance floor guarding against division by a degenerate variance.
const MIN_VARIANCE: f64 = 1e-12;

/// Node in the cluster arena. Leaves carry the symbol index; internal nodes
/// carry child arena indices and the merge distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterNode {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub leaf: Option<usize>,
    pub distance: f64,
}

impl ClusterNode {
    fn leaf(index: usize) -> Self {
        Self {
            left: None,
            right: None,
            leaf: Some(index),
            distance: 0.0,
        }
    }

    fn merge(left: usize, right: usize, distance: f64) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
            leaf: None,
            distance,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }
}

/// Binary merge tree over symbol indices, stored as an index-addressed arena.
///
/// The first `n` nodes are the leaves in input order; internal nodes follow in
/// merge order, so merge distances are non-decreasing along the arena suffix
/// (single-linkage ultrametric property).
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTree {
    nodes: Vec<ClusterNode>,
    n_leaves: usize,
    root: usize,
}

/// One merge step rendered with resolved symbol names, for response payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMerge {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub distance: f64,
}

impl ClusterTree {
    /// Single-linkage agglomerative clustering over a distance matrix.
    ///
    /// Ties are broken toward the pair containing the lexicographically
    /// smallest symbol index, so identical inputs always produce the same
    /// tree.
    pub fn build(distance: &DistanceMatrix) -> Result<Self, AnalyticsError> {
        let n = distance.size();
        if n == 0 {
            return Err(AnalyticsError::insufficient_data(
                "no symbols available for clustering",
            ));
        }

        let mut nodes: Vec<ClusterNode> = (0..n).map(ClusterNode::leaf).collect();
        // Active clusters: arena node index plus member symbol indices.
        let mut active: Vec<(usize, Vec<usize>)> = (0..n).map(|i| (i, vec![i])).collect();

        while active.len() > 1 {
            let mut best: Option<(f64, usize, usize, usize, usize)> = None;
            for a in 0..active.len() {
                for b in (a + 1)..active.len() {
                    let d = linkage_distance(distance, &active[a].1, &active[b].1);
                    let min_a = active[a].1.iter().copied().min().unwrap_or(usize::MAX);
                    let min_b = active[b].1.iter().copied().min().unwrap_or(usize::MAX);
                    let key = (d, min_a.min(min_b), min_a.max(min_b));
                    let better = match best {
                        None => true,
                        Some((bd, bk1, bk2, _, _)) => key < (bd, bk1, bk2),
                    };
                    if better {
                        best = Some((d, key.1, key.2, a, b));
                    }
                }
            }

            let (d, _, _, a, b) = best.expect("at least two active clusters remain");
            let (node_b, members_b) = active.remove(b);
            let (node_a, members_a) = active.remove(a);

            let mut merged = members_a;
            merged.extend(members_b);
            nodes.push(ClusterNode::merge(node_a, node_b, d));
            active.push((nodes.len() - 1, merged));
        }

        let root = active[0].0;
        Ok(Self {
            nodes,
            n_leaves: n,
            root,
        })
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.n_leaves
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Symbol indices under `node`, left subtree before right (merge order).
    pub fn leaves_under(&self, node: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        self.collect_leaves(node, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, node: usize, out: &mut Vec<usize>) {
        let n = &self.nodes[node];
        if let Some(index) = n.leaf {
            out.push(index);
            return;
        }
        if let Some(left) = n.left {
            self.collect_leaves(left, out);
        }
        if let Some(right) = n.right {
            self.collect_leaves(right, out);
        }
    }

    /// Quasi-diagonal ordering: the permutation of symbol indices obtained by
    /// flattening the tree left-to-right, placing correlated assets adjacent.
    pub fn leaf_order(&self) -> Vec<usize> {
        self.leaves_under(self.root)
    }

    /// Render the merge steps bottom-up with resolved symbol names.
    pub fn describe(&self, symbols: &[Symbol]) -> Vec<ClusterMerge> {
        self.nodes[self.n_leaves..]
            .iter()
            .map(|node| {
                let resolve = |child: Option<usize>| -> Vec<String> {
                    child
                        .map(|c| {
                            self.leaves_under(c)
                                .into_iter()
                                .map(|i| symbols[i].to_string())
                                .collect()
                        })
                        .unwrap_or_default()
                };
                ClusterMerge {
                    left: resolve(node.left),
                    right: resolve(node.right),
                    distance: node.distance,
                }
            })
            .collect()
    }
}

fn linkage_distance(distance: &DistanceMatrix, a: &[usize], b: &[usize]) -> f64 {
    let mut min = f64::INFINITY;
    for &i in a {
        for &j in b {
            let d = distance.get(i, j);
            if d < min {
                min = d;
            }
        }
    }
    min
}

/// Final weights over surviving symbols: non-negative, summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    entries: Vec<(Symbol, f64)>,
}

impl PortfolioWeights {
    pub fn entries(&self) -> &[(Symbol, f64)] {
        &self.entries
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inverse-variance cluster variance: `1 / sum(1 / var_i)` over members.
fn cluster_variance(variances: &[f64], members: &[usize]) -> f64 {
    let inv_sum: f64 = members
        .iter()
        .map(|&i| 1.0 / variances[i].max(MIN_VARIANCE))
        .sum();
    1.0 / inv_sum
}

/// Recursive bisection down the cluster tree.
///
/// Each split allocates `alpha = 1 - varL / (varL + varR)` of the current
/// budget to the left subtree; a leaf's weight is the product of allocation
/// factors along its path from the root.
fn bisect(
    tree: &ClusterTree,
    variances: &[f64],
    node: usize,
    budget: f64,
    weights: &mut [f64],
) {
    let n = &tree.nodes()[node];
    if let Some(index) = n.leaf {
        weights[index] = budget;
        return;
    }

    // Internal nodes always have both children.
    let (left, right) = match (n.left, n.right) {
        (Some(l), Some(r)) => (l, r),
        _ => return,
    };

    let var_left = cluster_variance(variances, &tree.leaves_under(left));
    let var_right = cluster_variance(variances, &tree.leaves_under(right));
    let alpha = 1.0 - var_left / (var_left + var_right);

    bisect(tree, variances, left, budget * alpha, weights);
    bisect(tree, variances, right, budget * (1.0 - alpha), weights);
}

/// Allocate normalized weights over the tree's leaves.
///
/// `variances[i]` is the return variance of symbol index `i`.
pub fn allocate(tree: &ClusterTree, variances: &[f64]) -> Vec<f64> {
    let mut weights = vec![0.0; tree.leaf_count()];
    bisect(tree, variances, tree.root(), 1.0, &mut weights);

    // Correct floating-point drift so the weights sum to exactly 1.
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    }
    weights
}

/// Full HRP pass: cluster, order, bisect, normalize.
///
/// A single symbol trivially receives weight 1.0; an empty input fails with
/// `insufficient_data`.
pub fn optimize(
    symbols: &[Symbol],
    distance: &DistanceMatrix,
    variances: &[f64],
) -> Result<PortfolioWeights, AnalyticsError> {
    if symbols.is_empty() {
        return Err(AnalyticsError::insufficient_data(
            "no symbols available for allocation",
        ));
    }

    let tree = ClusterTree::build(distance)?;
    let weights = allocate(&tree, variances);
    let order = tree.leaf_order();

    Ok(PortfolioWeights {
        entries: order
            .into_iter()
            .map(|i| (symbols[i].clone(), weights[i]))
            .collect(),
    })
}

/// Weights in quasi-diagonal order for `symbols`, given a prebuilt tree.
pub fn weights_from_tree(
    symbols: &[Symbol],
    tree: &ClusterTree,
    variances: &[f64],
) -> PortfolioWeights {
    let weights = allocate(tree, variances);
    PortfolioWeights {
        entries: tree
            .leaf_order()
            .into_iter()
            .map(|i| (symbols[i].clone(), weights[i]))
            .collect(),
    }
}
