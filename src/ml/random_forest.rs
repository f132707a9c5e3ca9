//! ランダムフォレスト分類器の推論
//!
//! 各木の葉のクラス分布を平均し、最も確率の高い位置の `classes` を返します
//! （同値の場合は先頭）。rf_model.json から復元します。

use serde::{Deserialize, Serialize};

use crate::ml::decision_tree::{argmax, DecisionTree, TreeArrays};
use crate::ml::stages::Classifier;

/// rf_model.json の内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    /// 学習時の特徴量数
    pub n_features: usize,
    /// 確率ベクトルの各位置に対応するクラスインデックス
    pub classes: Vec<usize>,
    pub trees: Vec<TreeArrays>,
}

/// 投票の詳細付き予測結果
#[derive(Debug, Clone, PartialEq)]
pub struct ForestPrediction {
    /// 予測クラスインデックス
    pub class: usize,
    /// `classes` の順に並んだ平均確率
    pub probabilities: Vec<f64>,
    /// 予測クラスの平均確率
    pub confidence: f64,
}

/// 学習済みランダムフォレスト
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    classes: Vec<usize>,
    n_features: usize,
}

impl RandomForest {
    pub fn from_artifact(artifact: &ForestArtifact) -> Result<Self, String> {
        if artifact.trees.is_empty() {
            return Err("empty forest".into());
        }
        if artifact.classes.is_empty() {
            return Err("forest has no classes".into());
        }
        let n_classes = artifact.classes.len();
        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(i, arrays)| {
                DecisionTree::from_arrays(arrays, artifact.n_features, n_classes)
                    .map_err(|e| format!("tree {}: {}", i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            classes: artifact.classes.clone(),
            n_features: artifact.n_features,
        })
    }

    /// 1サンプルを確率付きで予測
    pub fn predict_with_proba(&self, features: &[f64]) -> ForestPrediction {
        let mut probabilities = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in probabilities.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        for p in &mut probabilities {
            *p /= n_trees;
        }

        let best = argmax(&probabilities);
        ForestPrediction {
            class: self.classes[best],
            confidence: probabilities[best],
            probabilities,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    /// 森全体の平均深さ
    pub fn avg_depth(&self) -> f64 {
        let total: usize = self.trees.iter().map(DecisionTree::depth).sum();
        total as f64 / self.trees.len() as f64
    }

    /// 全ノード数
    pub fn total_nodes(&self) -> usize {
        self.trees.iter().map(DecisionTree::n_nodes).sum()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> usize {
        self.predict_with_proba(features).class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_on(feature: i64) -> TreeArrays {
        // f[feature] <= 0.5 → 位置0, else → 位置1
        TreeArrays {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![1.0, 1.0], vec![3.0, 0.0], vec![0.0, 3.0]],
        }
    }

    fn always(position: usize) -> TreeArrays {
        let mut value = vec![0.0, 0.0];
        value[position] = 5.0;
        TreeArrays {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![value],
        }
    }

    fn forest(trees: Vec<TreeArrays>, classes: Vec<usize>) -> RandomForest {
        RandomForest::from_artifact(&ForestArtifact {
            n_features: 2,
            classes,
            trees,
        })
        .unwrap()
    }

    #[test]
    fn test_unanimous_vote() {
        let rf = forest(vec![split_on(0), split_on(1), always(1)], vec![0, 1]);
        let pred = rf.predict_with_proba(&[0.9, 0.9]);
        assert_eq!(pred.class, 1);
        assert!((pred.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_majority_vote() {
        let rf = forest(vec![split_on(0), split_on(1), always(1)], vec![0, 1]);
        // 木A→0, 木B→0, 木C→1
        let pred = rf.predict_with_proba(&[0.1, 0.1]);
        assert_eq!(pred.class, 0);
        assert!((pred.probabilities[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_first_position() {
        let rf = forest(vec![always(0), always(1)], vec![0, 1]);
        assert_eq!(rf.predict(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_classes_map_positions() {
        // 確率ベクトルの位置1はクラスインデックス7を表す
        let rf = forest(vec![always(1)], vec![3, 7]);
        assert_eq!(rf.predict(&[0.0, 0.0]), 7);
        assert_eq!(rf.classes(), &[3, 7]);
    }

    #[test]
    fn test_forest_stats() {
        let rf = forest(vec![split_on(0), always(0)], vec![0, 1]);
        assert_eq!(rf.n_trees(), 2);
        assert_eq!(rf.total_nodes(), 4);
        assert!((rf.avg_depth() - 0.5).abs() < 1e-12);
        assert_eq!(Classifier::n_features(&rf), 2);
    }

    #[test]
    fn test_rejects_empty_forest() {
        let artifact = ForestArtifact {
            n_features: 2,
            classes: vec![0, 1],
            trees: Vec::new(),
        };
        assert!(RandomForest::from_artifact(&artifact).is_err());
    }

    #[test]
    fn test_reports_bad_tree_index() {
        let mut bad = split_on(0);
        bad.feature[0] = 5;
        let artifact = ForestArtifact {
            n_features: 2,
            classes: vec![0, 1],
            trees: vec![always(0), bad],
        };
        let err = RandomForest::from_artifact(&artifact).unwrap_err();
        assert!(err.starts_with("tree 1:"));
    }
}
