//! Binary decision trees shared by the gradient-boosted and random-forest
//! backends.
//!
//! A tree is grown from two per-sample statistics `a` and `b` whose sums
//! describe a node. For Gini trees `a` is the label and `b` is 1, so a node
//! holds (positives, count). For boosting `a` is the gradient and `b` the
//! hessian of the logistic loss. The split objective turns those sums into a
//! node score; the gain of a split is `score(left) + score(right) - score(parent)`
//! and is accumulated per feature as the tree's importance.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::math::Array2;

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SplitObjective {
    /// Count-weighted Gini impurity over 0/1 labels.
    Gini,
    /// Second-order logistic-loss objective with L2 leaf penalty.
    Newton {
        lambda: f64,
        gamma: f64,
        min_child_weight: f64,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    a: f64,
    b: f64,
}

impl std::ops::Sub for NodeStats {
    type Output = NodeStats;

    fn sub(self, rhs: NodeStats) -> NodeStats {
        NodeStats {
            a: self.a - rhs.a,
            b: self.b - rhs.b,
        }
    }
}

impl SplitObjective {
    fn score(&self, s: NodeStats) -> f64 {
        match *self {
            // -(count * gini) = (pos^2 + neg^2) / count - count
            SplitObjective::Gini => {
                if s.b <= 0.0 {
                    return 0.0;
                }
                let neg = s.b - s.a;
                (s.a * s.a + neg * neg) / s.b - s.b
            }
            SplitObjective::Newton { lambda, .. } => s.a * s.a / (s.b + lambda),
        }
    }

    fn leaf_value(&self, s: NodeStats) -> f64 {
        match *self {
            SplitObjective::Gini => {
                if s.b > 0.0 {
                    s.a / s.b
                } else {
                    0.0
                }
            }
            SplitObjective::Newton { lambda, .. } => -s.a / (s.b + lambda),
        }
    }

    fn min_gain(&self) -> f64 {
        match *self {
            SplitObjective::Gini => MIN_GAIN,
            SplitObjective::Newton { gamma, .. } => gamma.max(MIN_GAIN),
        }
    }

    fn admissible_child(&self, s: NodeStats) -> bool {
        match *self {
            SplitObjective::Gini => s.b >= 1.0,
            SplitObjective::Newton {
                min_child_weight, ..
            } => s.b >= min_child_weight,
        }
    }

    fn is_pure(&self, s: NodeStats) -> bool {
        match *self {
            SplitObjective::Gini => s.a <= 0.0 || s.a >= s.b,
            SplitObjective::Newton { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<u32>,
    pub min_samples_split: usize,
    /// Number of features drawn per split; `None` examines all of them.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Route a row to its leaf. Rows with `row[feature] <= threshold` go left.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Multiply every leaf value by `factor` (boosting shrinkage).
    pub(crate) fn scale_leaves(&mut self, factor: f64) {
        for node in self.nodes.iter_mut() {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    a: &'a [f64],
    b: &'a [f64],
    objective: SplitObjective,
    params: TreeParams,
    rng: &'a mut ChaCha8Rng,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

/// Grow one tree over `samples` (row indices, duplicates allowed).
///
/// Returns the tree and the split gain accumulated per feature.
pub(crate) fn grow(
    x: &Array2<f64>,
    a: &[f64],
    b: &[f64],
    samples: Vec<usize>,
    objective: SplitObjective,
    params: TreeParams,
    rng: &mut ChaCha8Rng,
) -> (DecisionTree, Vec<f64>) {
    let mut builder = TreeBuilder {
        x,
        a,
        b,
        objective,
        params,
        rng,
        nodes: Vec::new(),
        importance: vec![0.0; x.ncols()],
    };
    builder.build(&samples, 0);
    (
        DecisionTree {
            nodes: builder.nodes,
        },
        builder.importance,
    )
}

impl<'a> TreeBuilder<'a> {
    fn stats(&self, samples: &[usize]) -> NodeStats {
        samples.iter().fold(NodeStats::default(), |acc, &i| NodeStats {
            a: acc.a + self.a[i],
            b: acc.b + self.b[i],
        })
    }

    fn build(&mut self, samples: &[usize], depth: u32) -> usize {
        let stats = self.stats(samples);
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.objective.leaf_value(stats),
        });

        let depth_reached = self.params.max_depth.map_or(false, |max| depth >= max);
        if depth_reached
            || samples.len() < self.params.min_samples_split
            || self.objective.is_pure(stats)
        {
            return node_id;
        }

        let Some(best) = self.best_split(samples, stats) else {
            return node_id;
        };
        self.importance[best.feature] += best.gain;

        let x = self.x;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| x[(i, best.feature)] <= best.threshold);
        let left_id = self.build(&left, depth + 1);
        let right_id = self.build(&right, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_id,
            right: right_id,
        };
        node_id
    }

    /// Feature visiting order for one node: all features, shuffled when only
    /// a subset is required per split.
    fn feature_order(&mut self) -> (Vec<usize>, usize) {
        let n_features = self.x.ncols();
        let mut order: Vec<usize> = (0..n_features).collect();
        match self.params.max_features {
            Some(k) if k < n_features => {
                order.shuffle(&mut *self.rng);
                (order, k)
            }
            _ => (order, n_features),
        }
    }

    /// Search splits feature by feature. Constant features do not count
    /// towards `max_features`, and the search keeps drawing past it until an
    /// admissible split turns up or the features run out.
    fn best_split(&mut self, samples: &[usize], parent: NodeStats) -> Option<BestSplit> {
        if samples.len() < 2 {
            return None;
        }
        let parent_score = self.objective.score(parent);
        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(samples.len());
        let (order, k) = self.feature_order();
        let mut informative = 0;

        for feature in order {
            if informative >= k && best.is_some() {
                break;
            }
            sorted.clear();
            sorted.extend(samples.iter().map(|&i| (self.x[(i, feature)], i)));
            sorted.sort_by(|l, r| l.0.total_cmp(&r.0));
            if sorted[0].0 >= sorted[sorted.len() - 1].0 {
                continue;
            }
            informative += 1;

            let mut left = NodeStats::default();
            for w in 0..sorted.len() - 1 {
                let (value, i) = sorted[w];
                left.a += self.a[i];
                left.b += self.b[i];

                let next = sorted[w + 1].0;
                if next <= value {
                    continue;
                }
                let right = parent - left;
                if !self.objective.admissible_child(left)
                    || !self.objective.admissible_child(right)
                {
                    continue;
                }

                let gain =
                    self.objective.score(left) + self.objective.score(right) - parent_score;
                if gain > self.objective.min_gain()
                    && best.as_ref().map_or(true, |b| gain > b.gain)
                {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
