//! Exact path-dependent TreeSHAP over the forest member
//!
//! Polynomial-time Shapley values for tree ensembles (Lundberg et al.,
//! "Consistent Individualized Feature Attribution for Tree Ensembles",
//! Algorithm 2). Missing features follow the training cover down both
//! branches, so the attributions satisfy
//!
//! ```text
//! expected_value + Σ values = forest probability of the class
//! ```
//!
//! with `expected_value` the cover-weighted mean leaf value.

use crate::classifier::{Forest, Node, FEATURE_NAMES, NUM_FEATURES};
use crate::error::ExplainError;

/// Shapley values for one class of one input.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapValues {
    pub expected_value: f64,
    pub values: [f64; NUM_FEATURES],
}

impl ShapValues {
    pub fn total(&self) -> f64 {
        self.expected_value + self.values.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

/// Remove element `index`, undoing its `extend`.
fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[index];
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                tmp - path[i].pweight * zero_fraction * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - i as f64));
        }
    }
    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` unwound.
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[index];
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (d - i as f64) / (d + 1.0);
        } else if zero_fraction != 0.0 {
            total += path[i].pweight / zero_fraction / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}

struct TreeWalk<'a> {
    forest: &'a Forest,
    tree: usize,
    x: &'a [f64],
    class: usize,
    phi: &'a mut [f64; NUM_FEATURES],
}

impl TreeWalk<'_> {
    fn node(&self, index: usize) -> Result<&Node, ExplainError> {
        self.forest.trees()[self.tree]
            .node(index)
            .ok_or(ExplainError::MalformedTree {
                tree: self.tree,
                node: index,
            })
    }

    fn recurse(
        &mut self,
        index: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) -> Result<(), ExplainError> {
        extend(&mut path, zero_fraction, one_fraction, feature);

        match self.node(index)?.clone() {
            Node::Leaf { distribution, .. } => {
                let value = distribution
                    .get(self.class)
                    .copied()
                    .ok_or(ExplainError::MalformedTree {
                        tree: self.tree,
                        node: index,
                    })?;
                for i in 1..path.len() {
                    let w = unwound_sum(&path, i);
                    let el = path[i];
                    if let Some(f) = el.feature {
                        self.phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = if self.x[split] <= threshold {
                    (left, right)
                } else {
                    (right, left)
                };
                let hot_cover = self.node(hot)?.cover();
                let cold_cover = self.node(cold)?.cover();

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(split)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind(&mut path, k);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    hot_cover / cover * incoming_zero,
                    incoming_one,
                    Some(split),
                )?;
                self.recurse(
                    cold,
                    path,
                    cold_cover / cover * incoming_zero,
                    0.0,
                    Some(split),
                )?;
            }
        }
        Ok(())
    }

    /// Value of the tree with every feature missing.
    fn expected(&self, index: usize) -> Result<f64, ExplainError> {
        match self.node(index)? {
            Node::Leaf { distribution, .. } => Ok(distribution.get(self.class).copied().unwrap_or(0.0)),
            Node::Split {
                left, right, cover, ..
            } => {
                let (l, r) = (*left, *right);
                let cover = *cover;
                let lw = self.node(l)?.cover() / cover;
                let rw = self.node(r)?.cover() / cover;
                Ok(lw * self.expected(l)? + rw * self.expected(r)?)
            }
        }
    }
}

/// SHAP values of `class` for the scaled row `x`, averaged over the forest.
pub fn tree_shap(forest: &Forest, x: &[f64], class: usize) -> Result<ShapValues, ExplainError> {
    let n_trees = forest.trees().len();
    if n_trees == 0 {
        return Err(ExplainError::NoTreeEnsemble);
    }

    let mut phi = [0.0; NUM_FEATURES];
    let mut expected_value = 0.0;
    for tree in 0..n_trees {
        let mut walk = TreeWalk {
            forest,
            tree,
            x,
            class,
            phi: &mut phi,
        };
        expected_value += walk.expected(0)?;
        walk.recurse(0, Vec::new(), 1.0, 1.0, None)?;
    }

    let n = n_trees as f64;
    phi.iter_mut().for_each(|v| *v /= n);
    expected_value /= n;

    if let Some(i) = phi.iter().position(|v| !v.is_finite()) {
        return Err(ExplainError::NonFiniteAttribution {
            feature: FEATURE_NAMES[i],
        });
    }
    Ok(ShapValues {
        expected_value,
        values: phi,
    })
}
