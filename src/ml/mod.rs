pub mod stages;
pub mod scaler;
pub mod decision_tree;
pub mod random_forest;
pub mod label_encoder;
pub mod inference;

pub use stages::{Classifier, FeatureScaler, LabelDecoder};
pub use scaler::{MinMaxScaler, ScalerArtifact, StandardScaler};
pub use decision_tree::{DecisionTree, TreeArrays};
pub use random_forest::{ForestArtifact, ForestPrediction, RandomForest};
pub use label_encoder::LabelEncoder;
pub use inference::InferencePipeline;
