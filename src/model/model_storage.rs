//! 学習済みアーティファクトの読み込みと保存
//!
//! 起動時に一度だけ、スケーラー・分類器・ラベルエンコーダーを読み込みます。
//! 読み込み元はモデルディレクトリか、同じファイルをまとめたtar.gzバンドルです。
//!
//! ファイル構成（ディレクトリ、またはtar.gz内部）:
//! - scaler.json        - 特徴量スケーラー
//! - rf_model.json      - ランダムフォレスト
//! - label_encoder.json - ラベルエンコーダー
//! - metadata.json      - 版と特徴量順序（ディレクトリでは任意、バンドルでは必須）
//!
//! どれか1つでも欠けている・壊れている・互換性がない場合は起動エラーです。

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use tar::{Archive, Builder};

use crate::error::{ArtifactError, ArtifactKind};
use crate::ml::stages::{Classifier, FeatureScaler};
use crate::ml::{ForestArtifact, LabelEncoder, RandomForest, ScalerArtifact};
use crate::model::model_metadata::{ArtifactSummary, ModelMetadata};
use crate::types::NUM_FEATURES;

/// 必須アーティファクト（読み込み順）
const REQUIRED: [ArtifactKind; 3] = [
    ArtifactKind::Scaler,
    ArtifactKind::Classifier,
    ArtifactKind::LabelEncoder,
];

/// バンドル直下に置くエントリ
const BUNDLE_ENTRIES: [ArtifactKind; 4] = [
    ArtifactKind::Scaler,
    ArtifactKind::Classifier,
    ArtifactKind::LabelEncoder,
    ArtifactKind::Manifest,
];

/// 検証済みのアーティファクト一式
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub scaler: ScalerArtifact,
    pub classifier: RandomForest,
    pub encoder: LabelEncoder,
    pub metadata: ModelMetadata,
    pub source: PathBuf,
}

/// ファイル名 → 内容
struct RawArtifacts {
    origin: PathBuf,
    files: HashMap<ArtifactKind, Vec<u8>>,
}

impl RawArtifacts {
    fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.origin.join(kind.file_name())
    }

    fn require(&self, kind: ArtifactKind) -> Result<&[u8], ArtifactError> {
        self.files
            .get(&kind)
            .map(Vec::as_slice)
            .ok_or_else(|| ArtifactError::Missing {
                kind,
                path: self.path_of(kind),
            })
    }

    fn parse<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T, ArtifactError> {
        let bytes = self.require(kind)?;
        serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
            kind,
            path: self.path_of(kind),
            source,
        })
    }
}

/// tar.gzバンドルとして扱うパスか
pub fn is_bundle_path(path: &Path) -> bool {
    path.is_file() || path.extension().and_then(|s| s.to_str()) == Some("gz")
}

impl ArtifactSet {
    /// ディレクトリまたはバンドルから読み込む
    pub fn load(source: &Path) -> Result<Self, ArtifactError> {
        if is_bundle_path(source) {
            Self::load_bundle(source)
        } else {
            Self::load_dir(source)
        }
    }

    /// モデルディレクトリから読み込む
    pub fn load_dir(dir: &Path) -> Result<Self, ArtifactError> {
        tracing::debug!("モデルディレクトリを読み込み中: {}", dir.display());
        let mut files = HashMap::new();
        for kind in REQUIRED {
            files.insert(kind, read_artifact_file(dir, kind)?);
        }
        let manifest_path = dir.join(ArtifactKind::Manifest.file_name());
        if manifest_path.exists() {
            files.insert(
                ArtifactKind::Manifest,
                read_artifact_file(dir, ArtifactKind::Manifest)?,
            );
        }

        Self::from_raw(RawArtifacts {
            origin: dir.to_path_buf(),
            files,
        })
    }

    /// tar.gzバンドルから読み込む
    pub fn load_bundle(tar_gz_path: &Path) -> Result<Self, ArtifactError> {
        tracing::debug!("バンドルを読み込み中: {}", tar_gz_path.display());
        let bundle_err = |source| ArtifactError::Bundle {
            path: tar_gz_path.to_path_buf(),
            source,
        };

        let tar_gz_file = File::open(tar_gz_path).map_err(bundle_err)?;
        let decoder = GzDecoder::new(tar_gz_file);
        let mut archive = Archive::new(decoder);

        let mut files = HashMap::new();
        for entry in archive.entries().map_err(bundle_err)? {
            let mut entry = entry.map_err(bundle_err)?;
            // "./scaler.json" のような先頭の "./" だけ許容し、サブディレクトリ内は対象外
            let entry_path: PathBuf = entry
                .path()
                .map_err(bundle_err)?
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect();
            let Some(kind) = BUNDLE_ENTRIES
                .into_iter()
                .find(|k| entry_path == Path::new(k.file_name()))
            else {
                tracing::debug!("バンドル内の対象外エントリを無視: {}", entry_path.display());
                continue;
            };
            if files.contains_key(&kind) {
                return Err(ArtifactError::incompatible(
                    kind,
                    format!("bundle contains {} more than once", kind.file_name()),
                ));
            }

            let mut buffer = Vec::new();
            entry.read_to_end(&mut buffer).map_err(bundle_err)?;
            files.insert(kind, buffer);
        }

        let raw = RawArtifacts {
            origin: tar_gz_path.to_path_buf(),
            files,
        };
        // バンドルはメタデータ必須
        raw.require(ArtifactKind::Manifest)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawArtifacts) -> Result<Self, ArtifactError> {
        let scaler: ScalerArtifact = raw.parse(ArtifactKind::Scaler)?;
        scaler
            .validate(NUM_FEATURES)
            .map_err(|reason| ArtifactError::incompatible(ArtifactKind::Scaler, reason))?;

        let forest: ForestArtifact = raw.parse(ArtifactKind::Classifier)?;
        if forest.n_features != NUM_FEATURES {
            return Err(ArtifactError::incompatible(
                ArtifactKind::Classifier,
                format!("fitted on {} features, expected {}", forest.n_features, NUM_FEATURES),
            ));
        }
        let classifier = RandomForest::from_artifact(&forest)
            .map_err(|reason| ArtifactError::incompatible(ArtifactKind::Classifier, reason))?;

        let encoder: LabelEncoder = raw.parse(ArtifactKind::LabelEncoder)?;
        encoder
            .validate()
            .map_err(|reason| ArtifactError::incompatible(ArtifactKind::LabelEncoder, reason))?;

        if let Some(&unknown) = classifier
            .classes()
            .iter()
            .find(|&&c| c >= encoder.classes.len())
        {
            return Err(ArtifactError::incompatible(
                ArtifactKind::Classifier,
                format!(
                    "class index {} has no label ({} labels known)",
                    unknown,
                    encoder.classes.len()
                ),
            ));
        }

        let metadata = if raw.files.contains_key(&ArtifactKind::Manifest) {
            raw.parse(ArtifactKind::Manifest)?
        } else {
            ModelMetadata::default()
        };
        metadata
            .validate()
            .map_err(|reason| ArtifactError::incompatible(ArtifactKind::Manifest, reason))?;

        debug_assert_eq!(classifier.n_features(), scaler.n_features());

        Ok(Self {
            scaler,
            classifier,
            encoder,
            metadata,
            source: raw.origin,
        })
    }

    /// 概要を作成
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            source: self.source.display().to_string(),
            format_version: self.metadata.format_version,
            trained_at: self.metadata.trained_at.clone(),
            description: self.metadata.description.clone(),
            scaler_kind: self.scaler.kind_name().to_string(),
            n_trees: self.classifier.n_trees(),
            avg_tree_depth: self.classifier.avg_depth(),
            labels: self.encoder.classes.clone(),
        }
    }
}

fn read_artifact_file(dir: &Path, kind: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
    let path = dir.join(kind.file_name());
    std::fs::read(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing { kind, path }
        } else {
            ArtifactError::Io { kind, path, source }
        }
    })
}

/// モデルディレクトリを検証してtar.gzバンドルにまとめる
///
/// metadata.json がなければ現在時刻を記録したものを追加します。
/// 出力パスが .gz で終わらなければ拡張子 .tar.gz を付けます。
pub fn pack_bundle(model_dir: &Path, output_path: &Path) -> Result<PathBuf, ArtifactError> {
    // 壊れたアーティファクトを梱包しないよう先に検証する
    let validated = ArtifactSet::load_dir(model_dir)?;

    let tar_gz_path = if output_path.extension().and_then(|s| s.to_str()) == Some("gz") {
        output_path.to_path_buf()
    } else {
        output_path.with_extension("tar.gz")
    };
    let bundle_err = |source| ArtifactError::Bundle {
        path: tar_gz_path.clone(),
        source,
    };

    if let Some(parent) = tar_gz_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(bundle_err)?;
        }
    }

    let tar_gz_file = File::create(&tar_gz_path).map_err(bundle_err)?;
    let encoder = GzEncoder::new(tar_gz_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let manifest_path = model_dir.join(ArtifactKind::Manifest.file_name());
    let manifest_bytes = if manifest_path.exists() {
        read_artifact_file(model_dir, ArtifactKind::Manifest)?
    } else {
        let metadata = ModelMetadata {
            description: validated.metadata.description.clone(),
            ..ModelMetadata::stamped_now(None)
        };
        metadata
            .to_json_string()
            .map_err(|e| bundle_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?
            .into_bytes()
    };

    let mut entries = vec![(ArtifactKind::Manifest, manifest_bytes)];
    for kind in REQUIRED {
        entries.push((kind, read_artifact_file(model_dir, kind)?));
    }

    for (kind, bytes) in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(kind.file_name()).map_err(bundle_err)?;
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder
            .append(&header, bytes.as_slice())
            .map_err(bundle_err)?;
    }

    let encoder = tar_builder.into_inner().map_err(bundle_err)?;
    encoder.finish().map_err(bundle_err)?;

    tracing::info!(
        "バンドルを保存しました: {} ({}ラベル)",
        tar_gz_path.display(),
        validated.encoder.classes.len()
    );
    Ok(tar_gz_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::decision_tree::TreeArrays;
    use crate::ml::scaler::StandardScaler;

    fn write_json<T: serde::Serialize>(dir: &Path, kind: ArtifactKind, value: &T) {
        let json = serde_json::to_string_pretty(value).unwrap();
        std::fs::write(dir.join(kind.file_name()), json).unwrap();
    }

    fn stump(classes: usize) -> TreeArrays {
        // f[0] <= 0 → 位置0, else → 最後の位置
        let mut left = vec![0.0; classes];
        left[0] = 1.0;
        let mut right = vec![0.0; classes];
        right[classes - 1] = 1.0;
        TreeArrays {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.0, -2.0, -2.0],
            value: vec![vec![1.0; classes], left, right],
        }
    }

    fn write_valid_dir(dir: &Path) {
        write_json(
            dir,
            ArtifactKind::Scaler,
            &ScalerArtifact::Standard(StandardScaler::new(vec![0.0; 7], vec![1.0; 7])),
        );
        write_json(
            dir,
            ArtifactKind::Classifier,
            &ForestArtifact {
                n_features: 7,
                classes: vec![0, 1],
                trees: vec![stump(2)],
            },
        );
        write_json(
            dir,
            ArtifactKind::LabelEncoder,
            &LabelEncoder {
                classes: vec!["maize".into(), "rice".into()],
            },
        );
    }

    #[test]
    fn test_load_dir_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());
        let set = ArtifactSet::load(dir.path()).unwrap();
        assert_eq!(set.metadata, ModelMetadata::default());
        assert_eq!(set.summary().labels, vec!["maize", "rice"]);
        assert_eq!(set.summary().n_trees, 1);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());
        std::fs::remove_file(dir.path().join("label_encoder.json")).unwrap();
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Missing {
                kind: ArtifactKind::LabelEncoder,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());
        std::fs::write(dir.path().join("scaler.json"), b"{not json").unwrap();
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Parse {
                kind: ArtifactKind::Scaler,
                ..
            }
        ));
    }

    #[test]
    fn test_class_without_label_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());
        write_json(
            dir.path(),
            ArtifactKind::Classifier,
            &ForestArtifact {
                n_features: 7,
                classes: vec![0, 1, 2],
                trees: vec![stump(3)],
            },
        );
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Incompatible {
                kind: ArtifactKind::Classifier,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_feature_count_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());
        write_json(
            dir.path(),
            ArtifactKind::Scaler,
            &ScalerArtifact::Standard(StandardScaler::new(vec![0.0; 4], vec![1.0; 4])),
        );
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), Some(ArtifactKind::Scaler));
    }

    #[test]
    fn test_bundle_roundtrip_adds_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        std::fs::create_dir_all(&model_dir).unwrap();
        write_valid_dir(&model_dir);

        let bundle = pack_bundle(&model_dir, &dir.path().join("out/crop_model")).unwrap();
        assert!(bundle.to_string_lossy().ends_with("crop_model.tar.gz"));

        let set = ArtifactSet::load(&bundle).unwrap();
        assert!(set.metadata.trained_at.is_some());
        assert_eq!(set.encoder.classes, vec!["maize", "rice"]);
    }

    #[test]
    fn test_bundle_without_metadata_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_dir(dir.path());

        let bundle_path = dir.path().join("bare.tar.gz");
        let file = File::create(&bundle_path).unwrap();
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        for kind in REQUIRED {
            builder
                .append_path_with_name(dir.path().join(kind.file_name()), kind.file_name())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();

        let err = ArtifactSet::load(&bundle_path).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Missing {
                kind: ArtifactKind::Manifest,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_bundle_file() {
        let err = ArtifactSet::load(Path::new("does/not/exist.tar.gz")).unwrap_err();
        assert!(matches!(err, ArtifactError::Bundle { .. }));
    }

    /// 任意のエントリ名でバンドルを書き出す
    fn write_bundle(path: &Path, entries: &[(&str, Vec<u8>)]) {
        let file = File::create(path).unwrap();
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, bytes) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, bytes.as_slice()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn valid_entries(dir: &Path) -> Vec<(&'static str, Vec<u8>)> {
        write_valid_dir(dir);
        let manifest = ModelMetadata::default().to_json_string().unwrap().into_bytes();
        let mut entries = vec![(ArtifactKind::Manifest.file_name(), manifest)];
        for kind in REQUIRED {
            entries.push((kind.file_name(), std::fs::read(dir.join(kind.file_name())).unwrap()));
        }
        entries
    }

    #[test]
    fn test_nested_entry_does_not_replace_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = valid_entries(dir.path());
        entries.push((
            "old/backup/label_encoder.json",
            br#"{"classes":["x","y"]}"#.to_vec(),
        ));
        let bundle = dir.path().join("nested.tar.gz");
        write_bundle(&bundle, &entries);

        let set = ArtifactSet::load(&bundle).unwrap();
        assert_eq!(set.encoder.classes, vec!["maize", "rice"]);
    }

    #[test]
    fn test_duplicate_entry_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = valid_entries(dir.path());
        entries.push((
            "label_encoder.json",
            br#"{"classes":["x","y"]}"#.to_vec(),
        ));
        let bundle = dir.path().join("duplicate.tar.gz");
        write_bundle(&bundle, &entries);

        let err = ArtifactSet::load(&bundle).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Incompatible {
                kind: ArtifactKind::LabelEncoder,
                ..
            }
        ));
    }
}
