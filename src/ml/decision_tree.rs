//! 決定木の推論
//!
//! 学習ライブラリの木構造（`children_left` / `children_right` / `feature` /
//! `threshold` / `value` の並列配列）をそのまま保持し、ルートから葉まで辿って
//! 葉のクラス分布を返します。学習は行いません。

use serde::{Deserialize, Serialize};

/// 葉ノードの子インデックス
pub const TREE_LEAF: i64 = -1;

/// rf_model.json 内の1本の木（並列配列形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    /// 分割に使う特徴量（葉では負の値）
    pub feature: Vec<i64>,
    /// 分割閾値（特徴量 <= 閾値 なら左）
    pub threshold: Vec<f64>,
    /// 各ノードのクラス分布（件数または割合）
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// 合計1に正規化したクラス分布
        distribution: Vec<f64>,
    },
}

/// 学習済みの決定木分類器
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// 並列配列から木を構築
    ///
    /// 配列長の不一致、範囲外の子インデックス、親より前を指す子
    /// （循環の原因になる）、クラス数と合わない葉の分布はエラーになります。
    pub fn from_arrays(arrays: &TreeArrays, n_features: usize, n_classes: usize) -> Result<Self, String> {
        let n = arrays.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if arrays.children_right.len() != n
            || arrays.feature.len() != n
            || arrays.threshold.len() != n
            || arrays.value.len() != n
        {
            return Err("inconsistent array lengths".into());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = arrays.children_left[i];
            let right = arrays.children_right[i];

            if left == TREE_LEAF && right == TREE_LEAF {
                let counts = &arrays.value[i];
                if counts.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class values, expected {}",
                        i,
                        counts.len(),
                        n_classes
                    ));
                }
                nodes.push(Node::Leaf {
                    distribution: normalize(counts),
                });
                continue;
            }

            let child = |c: i64| -> Result<usize, String> {
                if c <= i as i64 || c >= n as i64 {
                    return Err(format!("node {} has invalid child index {}", i, c));
                }
                Ok(c as usize)
            };
            let left = child(left)?;
            let right = child(right)?;

            let feature = arrays.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on invalid feature {}", i, feature));
            }
            let threshold = arrays.threshold[i];
            if threshold.is_nan() {
                return Err(format!("node {} has a NaN threshold", i));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left,
                right,
            });
        }

        Ok(Self {
            nodes,
            n_features,
            n_classes,
        })
    }

    /// 1サンプルの葉のクラス分布を返す
    ///
    /// 学習ライブラリは特徴量を単精度に変換してから閾値と比較するため、
    /// ここでも同じ精度で比較します。
    pub fn predict_proba(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0) as f32;
                    idx = if f64::from(value) <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// 最も確率の高いクラスの位置
    pub fn predict(&self, features: &[f64]) -> usize {
        argmax(self.predict_proba(features))
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

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// 木の深さ（ルートから最も遠い葉までの分割数）
    ///
    /// 子は必ず親より後ろにあるため、先頭から1回走査すれば深さが決まる。
    pub fn depth(&self) -> usize {
        let mut depths: Vec<Option<usize>> = vec![None; self.nodes.len()];
        depths[0] = Some(0);
        let mut deepest = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let Some(depth) = depths[idx] else {
                continue;
            };
            match node {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    for child in [*left, *right] {
                        let slot = &mut depths[child];
                        *slot = Some(slot.map_or(depth + 1, |d| d.max(depth + 1)));
                    }
                }
            }
        }
        deepest
    }
}

fn normalize(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        counts.to_vec()
    }
}

/// 最大値の位置（同値なら先頭）
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
