//! Fitted churn classifiers

use crate::error::{ArtifactSlot, ChurnError, Result};
use crate::types::prediction::Label;
use serde::{Deserialize, Serialize};

/// A fitted binary decision function over encoded feature vectors
pub trait Classifier: Send + Sync {
    /// Input width the classifier was fitted on
    fn n_features(&self) -> usize;

    /// Probability of the churn class
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;

    /// Label with the higher class probability; ties go to `Stay`
    fn predict(&self, features: &[f64]) -> Result<Label> {
        self.predict_proba(features).map(Label::from_probability)
    }

    fn check_dimension(&self, features: &[f64]) -> Result<()> {
        if features.len() != self.n_features() {
            return Err(ChurnError::DimensionMismatch {
                expected: self.n_features(),
                found: features.len(),
            });
        }
        Ok(())
    }
}

/// How tree outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voting {
    /// Average of per-tree class distributions
    #[default]
    Soft,
    /// Fraction of trees whose leaf majority is churn
    Hard,
}

/// Decision tree stored as parallel node arrays.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Internal nodes send a
/// sample left when `x[feature[i]] <= threshold[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i32>,
    pub children_right: Vec<i32>,
    pub feature: Vec<i32>,
    pub threshold: Vec<f64>,
    /// Per-node class counts `[stay, churn]`
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn num_nodes(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        let n = self.num_nodes();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("node arrays differ in length".to_string());
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == -1 {
                if right != -1 {
                    return Err(format!("node {} has only one child", i));
                }
                let [stay, churn] = self.value[i];
                if !(stay.is_finite() && churn.is_finite()) || stay < 0.0 || churn < 0.0 {
                    return Err(format!("leaf {} has invalid class counts", i));
                }
                if stay + churn <= 0.0 {
                    return Err(format!("leaf {} has no class counts", i));
                }
                continue;
            }
            // children always come after their parent
            for child in [left, right] {
                if child <= i as i32 || child as usize >= n {
                    return Err(format!("node {} has invalid child {}", i, child));
                }
            }
            let feature = self.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on invalid feature {}", i, feature));
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f64]) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let x = features[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Normalized `[stay, churn]` distribution at the sample's leaf
    pub fn predict_distribution(&self, features: &[f64]) -> [f64; 2] {
        let [stay, churn] = self.value[self.leaf(features)];
        let total = stay + churn;
        [stay / total, churn / total]
    }
}

/// Random-forest style ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    #[serde(default)]
    pub voting: Voting,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Deserialize a forest artifact and check every tree
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let forest: RandomForest = serde_json::from_slice(bytes)
            .map_err(|e| ChurnError::corrupt(ArtifactSlot::Classifier, e.to_string()))?;

        if forest.trees.is_empty() {
            return Err(ChurnError::corrupt(
                ArtifactSlot::Classifier,
                "forest has no trees",
            ));
        }
        for (idx, tree) in forest.trees.iter().enumerate() {
            tree.validate(forest.n_features).map_err(|reason| {
                ChurnError::corrupt(ArtifactSlot::Classifier, format!("tree {}: {}", idx, reason))
            })?;
        }
        Ok(forest)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        self.check_dimension(features)?;

        let total: f64 = match self.voting {
            Voting::Soft => self
                .trees
                .iter()
                .map(|tree| tree.predict_distribution(features)[1])
                .sum(),
            Voting::Hard => self
                .trees
                .iter()
                .filter(|tree| {
                    let [stay, churn] = tree.predict_distribution(features);
                    churn > stay
                })
                .count() as f64,
        };
        Ok(total / self.trees.len() as f64)
    }
}
