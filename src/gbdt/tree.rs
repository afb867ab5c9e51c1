use serde::{Deserialize, Serialize};

/// Flat pre-order node. Children always sit at higher indices than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// `row[feature] <= threshold` goes left, everything else (NaN included) right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Caller guarantees `row` is at least as wide as the largest split feature.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Validates indices of a deserialized tree so `predict` cannot loop or
    /// index out of bounds.
    pub(crate) fn check_structure(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature} of {n_features}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has non-finite threshold"));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub learning_rate: f64,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

const MIN_GAIN: f64 = 1e-12;

/// Greedy exact-split CART over first/second order gradients.
pub(crate) struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    columns: &'a [usize],
    params: &'a TreeParams,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        grad: &'a [f64],
        hess: &'a [f64],
        columns: &'a [usize],
        params: &'a TreeParams,
    ) -> Self {
        Self {
            features,
            grad,
            hess,
            columns,
            params,
            nodes: Vec::new(),
        }
    }

    pub fn build(mut self, rows: Vec<usize>) -> RegressionTree {
        self.grow(rows, 0);
        RegressionTree::new(self.nodes)
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let (g, h) = rows
            .iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]));

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.features[r][best.feature] <= best.threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<Candidate> {
        let parent = self.score(g_total, h_total);
        let mut best: Option<Candidate> = None;
        let mut order = rows.to_vec();

        for &f in self.columns {
            order.copy_from_slice(rows);
            order.sort_by(|&a, &b| self.features[a][f].total_cmp(&self.features[b][f]));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pair in order.windows(2) {
                let (r, next) = (pair[0], pair[1]);
                gl += self.grad[r];
                hl += self.hess[r];

                let value = self.features[r][f];
                if value == self.features[next][f] {
                    continue;
                }
                let (gr, hr) = (g_total - gl, h_total - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let gain =
                    0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
                if gain > best.as_ref().map_or(MIN_GAIN, |b| b.gain) {
                    best = Some(Candidate {
                        feature: f,
                        threshold: value,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.lambda) * self.params.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_child_weight: 1.0,
            lambda: 0.0,
            gamma: 0.0,
            learning_rate: 1.0,
        }
    }

    #[test]
    fn hand_built_tree_routes_on_threshold() {
        let tree = RegressionTree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 50.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 100.0 },
            Node::Leaf { value: 200.0 },
        ]);
        assert_eq!(tree.predict(&[30.0]), 100.0);
        assert_eq!(tree.predict(&[50.0]), 100.0);
        assert_eq!(tree.predict(&[60.0]), 200.0);
        assert_eq!(tree.predict(&[f64::NAN]), 200.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn builder_recovers_step_function() {
        // residual gradient g = pred - y with pred = 0
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 7.0]).collect();
        let labels: Vec<f64> = (0..10).map(|i| if i < 5 { 10.0 } else { 30.0 }).collect();
        let grad: Vec<f64> = labels.iter().map(|y| -y).collect();
        let hess = vec![1.0; 10];
        let p = params(3);

        let tree = TreeBuilder::new(&features, &grad, &hess, &[0, 1], &p).build((0..10).collect());

        match &tree.nodes()[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 4.0);
            }
            other => panic!("expected split at root, got {other:?}"),
        }
        assert_eq!(tree.predict(&[2.0, 7.0]), 10.0);
        assert_eq!(tree.predict(&[8.0, 7.0]), 30.0);
    }

    #[test]
    fn constant_feature_never_splits() {
        let features: Vec<Vec<f64>> = (0..6).map(|_| vec![1.0]).collect();
        let grad = vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0];
        let hess = vec![1.0; 6];
        let p = params(4);
        let tree = TreeBuilder::new(&features, &grad, &hess, &[0], &p).build((0..6).collect());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict(&[1.0]), 3.5);
    }

    #[test]
    fn structure_check_catches_bad_children() {
        let tree = RegressionTree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 1,
            },
            Node::Leaf { value: 1.0 },
        ]);
        assert!(tree.check_structure(1).is_err());

        let tree = RegressionTree::new(vec![Node::Leaf { value: 1.0 }]);
        assert!(tree.check_structure(1).is_ok());
    }
}
