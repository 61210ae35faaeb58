//! Random forest classifier for triage levels
//!
//! Each tree is a CART classifier grown on a bootstrap sample, splitting on
//! Gini impurity over a random subset of features at every node. The forest
//! predicts the class with the highest mean leaf probability across trees.
//!
//! Trees are fitted in parallel. Tree `i` draws from its own generator seeded
//! with `seed + i`, so a seeded forest is identical whatever the thread count.

use itertools::Itertools;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::ForestParams;
use crate::error::{Result, TriageError};
use crate::schema::{FeatureVector, N_FEATURES};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar, hidden_progress_bar};

/// A classifier over encoded feature vectors
pub trait TriageClassifier {
    /// Fit on feature vectors and their labels
    fn fit(&mut self, features: &[FeatureVector], labels: &[i32]) -> Result<()>;

    /// Predict the label of one feature vector
    fn predict_one(&self, features: &FeatureVector) -> Result<i32>;

    /// Predict labels for many feature vectors
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<i32>> {
        features.iter().map(|x| self.predict_one(x)).collect()
    }

    /// Share of correctly predicted labels
    fn score(&self, features: &[FeatureVector], labels: &[i32]) -> Result<f64> {
        check_shapes(features, labels)?;
        let predicted = self.predict(features)?;
        let correct = predicted.iter().zip(labels).filter(|(p, y)| p == y).count();
        Ok(correct as f64 / labels.len() as f64)
    }
}

fn check_shapes(features: &[FeatureVector], labels: &[i32]) -> Result<()> {
    if features.len() != labels.len() {
        return Err(TriageError::Model(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if features.is_empty() {
        return Err(TriageError::Model("no rows to fit or score".to_string()));
    }
    Ok(())
}

/// A node of a fitted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal node: rows with `x[feature] <= threshold` go left
    Split {
        /// Feature index into the model input vector
        feature: usize,
        /// Split point
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node with the class distribution of its training rows
    Leaf {
        /// Probability per class index
        proba: Vec<f64>,
    },
}

/// Gini impurity of a class histogram over `n` rows
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

struct TreeBuilder<'a, R> {
    x: &'a [FeatureVector],
    y: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    max_features: usize,
    rng: &'a mut R,
    nodes: Vec<Node>,
}

impl<R: Rng> TreeBuilder<'_, R> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn push_leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let proba = counts.iter().map(|&c| c as f64 / n as f64).collect();
        self.nodes.push(Node::Leaf { proba });
        self.nodes.len() - 1
    }

    fn build(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let counts = self.class_counts(samples);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_deep = self.params.max_depth.is_some_and(|max| depth >= max);
        let too_small =
            n < self.params.min_samples_split || n < 2 * self.params.min_samples_leaf;
        if pure || too_deep || too_small {
            return self.push_leaf(&counts, n);
        }

        let Some(split) = self.best_split(samples, &counts) else {
            return self.push_leaf(&counts, n);
        };

        let mut mid = 0;
        for k in 0..n {
            if self.x[samples[k]][split.feature] <= split.threshold {
                samples.swap(mid, k);
                mid += 1;
            }
        }

        // Reserve the slot so the parent precedes its children
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: Vec::new() });

        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);

        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    /// Best split over a random feature subset.
    ///
    /// Constant features do not count towards `max_features`, and the search
    /// keeps going past `max_features` until some valid split is found.
    fn best_split(&mut self, samples: &[usize], parent: &[usize]) -> Option<Split> {
        let n = samples.len();
        let parent_gini = gini(parent, n);
        let min_leaf = self.params.min_samples_leaf;

        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        features.shuffle(&mut *self.rng);

        let mut sorted = samples.to_vec();
        let mut best: Option<Split> = None;
        let mut visited = 0;

        for feature in features {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            let x = self.x;
            sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
            if x[sorted[0]][feature] == x[sorted[n - 1]][feature] {
                continue;
            }
            visited += 1;

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent.to_vec();
            for k in 0..n - 1 {
                let class = self.y[sorted[k]];
                left[class] += 1;
                right[class] -= 1;

                let value = x[sorted[k]][feature];
                let next = x[sorted[k + 1]][feature];
                if value == next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                let decrease = parent_gini - impurity;

                if best.is_none_or(|b| decrease > b.decrease) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

/// A fitted CART classification tree over class indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_classes: usize,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on the given sample indices (duplicates allowed)
    ///
    /// # Arguments
    /// * `x` - All feature rows
    /// * `y` - Class index of every row
    /// * `n_classes` - Number of classes
    /// * `params` - Stopping rules
    /// * `samples` - Rows this tree is grown on; reordered in place
    /// * `rng` - Source for feature subsampling
    pub fn grow<R: Rng>(
        x: &[FeatureVector],
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        samples: &mut [usize],
        rng: &mut R,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            params,
            max_features: params.max_features.resolve(N_FEATURES),
            rng,
            nodes: Vec::new(),
        };
        builder.build(samples, 0);
        Self {
            n_classes,
            nodes: builder.nodes,
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            match self.nodes.get(index) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Some(Node::Leaf { .. }) => deepest = deepest.max(depth),
                None => {}
            }
        }
        deepest
    }

    /// Class distribution of the leaf `x` falls into
    #[must_use]
    pub fn predict_proba(&self, x: &FeatureVector) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return proba,
            }
        }
    }

    /// Check the structure of a deserialized tree.
    ///
    /// Children always come after their parent, which rules out cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(TriageError::Model("tree has no nodes".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= N_FEATURES || !threshold.is_finite() {
                        return Err(TriageError::Model(format!("node {index} has an invalid split")));
                    }
                    for child in [left, right] {
                        if *child <= index || *child >= self.nodes.len() {
                            return Err(TriageError::Model(format!(
                                "node {index} points to invalid child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { proba } => {
                    if proba.len() != self.n_classes {
                        return Err(TriageError::Model(format!(
                            "leaf {index} has {} probabilities for {} classes",
                            proba.len(),
                            self.n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bootstrap-aggregated forest of CART trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: Option<u64>,
    classes: Vec<i32>,
    trees: Vec<DecisionTree>,
    #[serde(skip)]
    n_jobs: usize,
    #[serde(skip)]
    show_progress: bool,
}

impl RandomForest {
    /// Create an unfitted forest
    ///
    /// # Arguments
    /// * `params` - Forest hyperparameters
    /// * `seed` - Master seed; `None` draws one from OS entropy at fit time
    #[must_use]
    pub fn new(params: ForestParams, seed: Option<u64>) -> Self {
        Self {
            params,
            seed,
            classes: Vec::new(),
            trees: Vec::new(),
            n_jobs: 0,
            show_progress: false,
        }
    }

    /// Fit on this many threads; 0 uses every core
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Draw a progress bar while fitting
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Hyperparameters
    #[must_use]
    pub const fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Labels the forest can predict, ascending
    #[must_use]
    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    /// Fitted trees
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Whether the forest has been fitted
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty() && !self.classes.is_empty()
    }

    /// Mean class distribution across trees, ordered as [`Self::classes`]
    pub fn predict_proba(&self, x: &FeatureVector) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(TriageError::Model("forest is not fitted".to_string()));
        }
        let mut mean = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in mean.iter_mut().zip(tree.predict_proba(x)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        mean.iter_mut().for_each(|p| *p /= n_trees);
        Ok(mean)
    }

    /// Check a deserialized forest is usable
    pub fn validate(&self) -> Result<()> {
        if !self.is_fitted() {
            return Err(TriageError::Model("forest has no trees or classes".to_string()));
        }
        if self.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TriageError::Model("forest classes are not sorted".to_string()));
        }
        for tree in &self.trees {
            if tree.n_classes != self.classes.len() {
                return Err(TriageError::Model("tree class count disagrees with forest".to_string()));
            }
            tree.validate()?;
        }
        Ok(())
    }
}

impl TriageClassifier for RandomForest {
    fn fit(&mut self, features: &[FeatureVector], labels: &[i32]) -> Result<()> {
        check_shapes(features, labels)?;
        if self.params.n_estimators == 0 {
            return Err(TriageError::Model("forest needs at least one tree".to_string()));
        }

        let classes: Vec<i32> = labels.iter().copied().sorted_unstable().dedup().collect();
        let class_index: FxHashMap<i32, usize> =
            classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let y: Vec<usize> = labels.iter().map(|label| class_index[label]).collect();

        let n_rows = features.len();
        let n_classes = classes.len();
        let params = self.params;
        let base_seed = self.seed.unwrap_or_else(|| rand::rng().random());

        log::info!(
            "Fitting {} trees on {} rows with {} classes",
            params.n_estimators,
            n_rows,
            n_classes
        );

        let pb = if self.show_progress {
            create_main_progress_bar(params.n_estimators as u64, Some("Fitting trees"))
        } else {
            hidden_progress_bar(params.n_estimators as u64)
        };

        let fit_tree = |i: usize| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
            let mut samples: Vec<usize> = if params.bootstrap {
                (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
            } else {
                (0..n_rows).collect()
            };
            let tree = DecisionTree::grow(features, &y, n_classes, &params, &mut samples, &mut rng);
            pb.inc(1);
            tree
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_jobs)
            .build()
            .map_err(|e| TriageError::Model(format!("failed to start worker pool: {e}")))?;
        let trees: Vec<DecisionTree> = pool.install(|| {
            (0..params.n_estimators)
                .into_par_iter()
                .map(fit_tree)
                .collect()
        });

        finish_progress_bar(&pb, Some("Forest fitted"));
        log::debug!(
            "Mean tree depth {:.1}",
            trees.iter().map(DecisionTree::depth).sum::<usize>() as f64 / trees.len() as f64
        );

        self.classes = classes;
        self.trees = trees;
        Ok(())
    }

    fn predict_one(&self, features: &FeatureVector) -> Result<i32> {
        let proba = self.predict_proba(features)?;
        // Ties go to the first (most urgent) class
        let best = proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| if p > bp { (i, p) } else { (bi, bp) })
            .0;
        Ok(self.classes[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(a: f64, b: f64) -> FeatureVector {
        [a, b, 0.0, 37.0, 80.0, 98.0, 120.0]
    }

    /// Label depends only on the first two features
    fn toy_data(n: usize, seed: u64) -> (Vec<FeatureVector>, Vec<i32>) {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let a: f64 = rng.random_range(0.0..10.0);
                let b: f64 = rng.random_range(0.0..10.0);
                let label = if a < 3.0 { 1 } else if b < 5.0 { 3 } else { 5 };
                (row(a, b), label)
            })
            .unzip()
    }

    fn forest(trees: usize, seed: u64) -> RandomForest {
        let params = ForestParams {
            n_estimators: trees,
            ..ForestParams::default()
        };
        RandomForest::new(params, Some(seed)).with_n_jobs(2)
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_tree_fits_training_data() {
        let (x, labels) = toy_data(300, 1);
        let y: Vec<usize> = labels.iter().map(|&l| ((l - 1) / 2) as usize).collect();
        let params = ForestParams {
            max_features: crate::config::MaxFeatures::All,
            ..ForestParams::default()
        };
        let mut samples: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::grow(&x, &y, 3, &params, &mut samples, &mut rng);

        assert!(tree.validate().is_ok());
        assert!(tree.depth() >= 2);
        assert_eq!(tree.n_leaves(), tree.n_nodes() / 2 + 1);
        for (xi, yi) in x.iter().zip(&y) {
            let proba = tree.predict_proba(xi);
            assert_eq!(proba[*yi], 1.0);
        }
    }

    #[test]
    fn test_max_depth_is_respected() {
        let (x, labels) = toy_data(300, 2);
        let y: Vec<usize> = labels.iter().map(|&l| ((l - 1) / 2) as usize).collect();
        let params = ForestParams {
            max_depth: Some(1),
            ..ForestParams::default()
        };
        let mut samples: Vec<usize> = (0..x.len()).collect();
        let tree = DecisionTree::grow(&x, &y, 3, &params, &mut samples, &mut StdRng::seed_from_u64(0));
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_forest_generalizes() {
        let (x_train, y_train) = toy_data(600, 3);
        let (x_test, y_test) = toy_data(200, 4);
        let mut model = forest(30, 42);
        model.fit(&x_train, &y_train).unwrap();

        assert_eq!(model.classes(), &[1, 3, 5]);
        assert_eq!(model.trees().len(), 30);
        let accuracy = model.score(&x_test, &y_test).unwrap();
        assert!(accuracy > 0.9, "accuracy {accuracy}");
    }

    #[test]
    fn test_seeded_fit_is_reproducible_across_thread_counts() {
        let (x, y) = toy_data(200, 5);
        let mut a = forest(10, 7).with_n_jobs(1);
        let mut b = forest(10, 7).with_n_jobs(4);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.trees(), b.trees());
    }

    #[test]
    fn test_serde_round_trip_predicts_the_same() {
        let (x, y) = toy_data(200, 6);
        let mut model = forest(5, 1);
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let loaded: RandomForest = serde_json::from_str(&json).unwrap();
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn test_single_class() {
        let x = vec![row(1.0, 1.0), row(2.0, 2.0)];
        let mut model = forest(3, 1);
        model.fit(&x, &[4, 4]).unwrap();
        assert_eq!(model.predict_one(&row(9.0, 9.0)).unwrap(), 4);
    }

    #[test]
    fn test_shape_errors() {
        let mut model = forest(3, 1);
        assert!(model.fit(&[row(1.0, 1.0)], &[1, 2]).is_err());
        assert!(model.fit(&[], &[]).is_err());
        assert!(model.predict_one(&row(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_corrupt_tree_is_rejected() {
        let tree = DecisionTree {
            n_classes: 2,
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 5,
            }],
        };
        assert!(tree.validate().is_err());

        let leaf = DecisionTree {
            n_classes: 2,
            nodes: vec![Node::Leaf { proba: vec![1.0] }],
        };
        assert!(leaf.validate().is_err());
    }
}
