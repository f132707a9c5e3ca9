//! 推論パイプラインの各段の能力インターフェース
//!
//! スケーラー・分類器・ラベルデコーダーは学習済みの不透明なオブジェクトとして扱い、
//! ここで定義する最小限の操作だけを通して利用します。

/// 生の特徴量を正規化する段
pub trait FeatureScaler: Send + Sync {
    /// 入力の次元数
    fn n_features(&self) -> usize;

    /// 正規化した特徴量を返す
    fn transform(&self, features: &[f64]) -> Vec<f64>;
}

/// 正規化済み特徴量からクラスインデックスを予測する段
pub trait Classifier: Send + Sync {
    /// 入力の次元数
    fn n_features(&self) -> usize;

    /// クラスインデックスを予測
    fn predict(&self, features: &[f64]) -> usize;
}

/// クラスインデックスを作物名に戻す段
pub trait LabelDecoder: Send + Sync {
    /// 既知のラベル数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// インデックスに対応するラベル（範囲外は None）
    fn decode(&self, index: usize) -> Option<&str>;
}
