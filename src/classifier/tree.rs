//! Bagged decision-tree forest
//!
//! Trees are stored in the parallel-array layout used by common tree
//! learners: node `i` is a leaf when `children_left[i] == -1`, otherwise it
//! sends a sample left when `x[feature[i]] <= threshold[i]`. Leaf `value`
//! rows hold per-class weights and are normalised into distributions at
//! load time.

use serde::{Deserialize, Serialize};

use super::ensemble::Estimator;
use super::features::NUM_FEATURES;
use crate::error::{Artifact, ArtifactError};

const LEAF: i64 = -1;

/// On-disk shape of one tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
    pub n_node_samples: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        distribution: Vec<f64>,
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// A validated decision tree. Children always have larger indices than
/// their parent, so every walk from the root terminates.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub(crate) fn from_arrays(arrays: TreeArrays, n_classes: usize) -> Result<Self, ArtifactError> {
        let n = arrays.children_left.len();
        let invalid = |msg: String| ArtifactError::invalid(Artifact::Ensemble, msg);

        if n == 0 {
            return Err(invalid("tree has no nodes".into()));
        }
        if [
            arrays.children_right.len(),
            arrays.feature.len(),
            arrays.threshold.len(),
            arrays.value.len(),
            arrays.n_node_samples.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(invalid("tree arrays differ in length".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let cover = arrays.n_node_samples[i];
            if !(cover.is_finite() && cover > 0.0) {
                return Err(invalid(format!("node {i} has non-positive sample weight")));
            }
            let (left, right) = (arrays.children_left[i], arrays.children_right[i]);

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(invalid(format!("node {i} has exactly one child")));
                }
                let row = &arrays.value[i];
                if row.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {i} has {} class weights, expected {n_classes}",
                        row.len()
                    )));
                }
                if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(invalid(format!("leaf {i} has a negative class weight")));
                }
                let total: f64 = row.iter().sum();
                if total <= 0.0 {
                    return Err(invalid(format!("leaf {i} has zero total weight")));
                }
                nodes.push(Node::Leaf {
                    distribution: row.iter().map(|v| v / total).collect(),
                    cover,
                });
                continue;
            }

            let child_ok = |c: i64| c > i as i64 && (c as usize) < n;
            if !child_ok(left) || !child_ok(right) || left == right {
                return Err(invalid(format!("node {i} has out-of-order children")));
            }
            let feature = arrays.feature[i];
            if feature < 0 || feature as usize >= NUM_FEATURES {
                return Err(invalid(format!(
                    "node {i} splits on feature {feature}, expected 0..{NUM_FEATURES}"
                )));
            }
            let threshold = arrays.threshold[i];
            if !threshold.is_finite() {
                return Err(invalid(format!("node {i} has a non-finite threshold")));
            }
            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left: left as usize,
                right: right as usize,
                cover,
            });
        }
        Ok(Self { nodes })
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of the nodes visited from the root to the leaf `x` reaches.
    pub fn decision_path(&self, x: &[f64]) -> Vec<usize> {
        let mut path = Vec::new();
        let mut i = 0;
        while let Some(node) = self.nodes.get(i) {
            path.push(i);
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => i = if x[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { .. } => break,
            }
        }
        path
    }

    /// Normalised class distribution of the leaf `x` reaches.
    pub fn leaf_distribution(&self, x: &[f64]) -> &[f64] {
        match self
            .decision_path(x)
            .last()
            .and_then(|&i| self.nodes.get(i))
        {
            Some(Node::Leaf { distribution, .. }) => distribution,
            _ => &[],
        }
    }
}

/// Random-forest style member: the mean of per-tree leaf distributions.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl Forest {
    pub(crate) fn new(trees: Vec<DecisionTree>, n_classes: usize) -> Result<Self, ArtifactError> {
        if trees.is_empty() {
            return Err(ArtifactError::invalid(Artifact::Ensemble, "forest has no trees"));
        }
        Ok(Self { trees, n_classes })
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Estimator for Forest {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.leaf_distribution(x)) {
                *p += v;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    fn raw_estimators(&self) -> Option<&Forest> {
        Some(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Depth-1 stump on `feature`: left leaf favours class 0, right class 1.
    pub(crate) fn stump(feature: i64, threshold: f64, n_classes: usize) -> TreeArrays {
        let mut left = vec![1.0; n_classes];
        left[0] = 7.0;
        let mut right = vec![1.0; n_classes];
        right[1] = 7.0;
        TreeArrays {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![vec![1.0; n_classes], left, right],
            n_node_samples: vec![20.0, 12.0, 8.0],
        }
    }

    #[test]
    fn test_walk_and_distribution() {
        let tree = DecisionTree::from_arrays(stump(0, 0.5, 3), 3).unwrap();
        let mut x = [0.0; NUM_FEATURES];
        assert_eq!(tree.decision_path(&x), vec![0, 1]);
        let d = tree.leaf_distribution(&x);
        assert!((d[0] - 7.0 / 9.0).abs() < 1e-12);
        // threshold is inclusive on the left
        x[0] = 0.5;
        assert_eq!(tree.decision_path(&x), vec![0, 1]);
        x[0] = 0.51;
        assert_eq!(tree.decision_path(&x), vec![0, 2]);
    }

    #[test]
    fn test_forest_averages_trees() {
        let a = DecisionTree::from_arrays(stump(0, 0.0, 2), 2).unwrap();
        let b = DecisionTree::from_arrays(stump(1, 0.0, 2), 2).unwrap();
        let forest = Forest::new(vec![a, b], 2).unwrap();
        let mut x = [0.0; NUM_FEATURES];
        x[1] = 1.0;
        // tree a -> left [7/8, 1/8], tree b -> right [1/8, 7/8]
        let p = forest.predict_proba(&x);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut backwards = stump(0, 0.0, 2);
        backwards.children_left[0] = 0;
        assert!(DecisionTree::from_arrays(backwards, 2).is_err());

        let mut bad_feature = stump(0, 0.0, 2);
        bad_feature.feature[0] = NUM_FEATURES as i64;
        assert!(DecisionTree::from_arrays(bad_feature, 2).is_err());

        let mut ragged = stump(0, 0.0, 2);
        ragged.threshold.pop();
        assert!(DecisionTree::from_arrays(ragged, 2).is_err());

        // leaf width must match the class count
        assert!(DecisionTree::from_arrays(stump(0, 0.0, 3), 2).is_err());

        let mut one_child = stump(0, 0.0, 2);
        one_child.children_right[0] = -1;
        assert!(DecisionTree::from_arrays(one_child, 2).is_err());

        let mut zero_cover = stump(0, 0.0, 2);
        zero_cover.n_node_samples[2] = 0.0;
        assert!(DecisionTree::from_arrays(zero_cover, 2).is_err());

        assert!(Forest::new(vec![], 2).is_err());
    }
}
