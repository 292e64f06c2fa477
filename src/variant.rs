use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::{PlantClassifierError, Result};
use crate::labels::{LabelTable, FINALE_ARTIFACT, PLANTS_MODEL_ARTIFACT, SCALAR_MODEL_ARTIFACT};
use crate::normalizer::{ChannelOrder, DEFAULT_TARGET_SIZE};

/// The model variants shipped with the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// PlantVillage disease classifier, channel-first input.
    Finale,
    /// Five-output `plants_model`, interleaved input. Labels are positional.
    Plants,
    /// Single float in, single float out. Takes no image.
    Scalar,
}

/// What the model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputLayout {
    Image {
        size: u32,
        channel_order: ChannelOrder,
    },
    Scalar,
}

impl InputLayout {
    pub fn shape(&self) -> Vec<usize> {
        match *self {
            Self::Image {
                size,
                channel_order,
            } => channel_order.shape(size as usize).to_vec(),
            Self::Scalar => vec![1, 1],
        }
    }
}

/// One model artifact together with everything needed to feed it and to
/// read its output: input layout and the label table its scores align to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVariant {
    kind: VariantKind,
    artifact: String,
    input: InputLayout,
    labels: LabelTable,
}

/// On-disk description of a variant, used to swap in a retrained artifact.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct VariantManifest {
    artifact: String,
    #[serde(default = "default_version")]
    version: u32,
    input: InputLayout,
    labels: Vec<String>,
}

const fn default_version() -> u32 {
    1
}

impl ModelVariant {
    pub fn new(
        kind: VariantKind,
        artifact: impl Into<String>,
        input: InputLayout,
        labels: LabelTable,
    ) -> Result<Self> {
        let variant = Self {
            kind,
            artifact: artifact.into(),
            input,
            labels,
        };
        variant.validate()?;
        Ok(variant)
    }

    pub fn builtin(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Finale => Self {
                kind,
                artifact: FINALE_ARTIFACT.to_string(),
                input: InputLayout::Image {
                    size: DEFAULT_TARGET_SIZE,
                    channel_order: ChannelOrder::ChannelFirst,
                },
                labels: LabelTable::plant_village(),
            },
            VariantKind::Plants => Self {
                kind,
                artifact: PLANTS_MODEL_ARTIFACT.to_string(),
                input: InputLayout::Image {
                    size: DEFAULT_TARGET_SIZE,
                    channel_order: ChannelOrder::Interleaved,
                },
                labels: LabelTable::plants_positional(),
            },
            VariantKind::Scalar => Self {
                kind,
                artifact: SCALAR_MODEL_ARTIFACT.to_string(),
                input: InputLayout::Scalar,
                labels: LabelTable::scalar(),
            },
        }
    }

    /// Loads a JSON manifest describing `kind`.
    pub fn from_manifest(kind: VariantKind, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PlantClassifierError::FileSystem {
            path: path.to_path_buf(),
            operation: "read variant manifest".to_string(),
            source: e,
        })?;
        Self::from_manifest_str(kind, &text)
    }

    pub fn from_manifest_str(kind: VariantKind, text: &str) -> Result<Self> {
        let manifest: VariantManifest = serde_json::from_str(text)?;
        let labels = LabelTable::new(manifest.artifact.clone(), manifest.version, manifest.labels);
        Self::new(kind, manifest.artifact, manifest.input, labels)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(PlantClassifierError::Configuration { message });

        if self.artifact.trim().is_empty() {
            return invalid("artifact id is empty".to_string());
        }
        if self.labels.is_empty() {
            return invalid(format!("{}: label table is empty", self.artifact));
        }
        if self.labels.artifact() != self.artifact {
            return invalid(format!(
                "{}: label table belongs to {}",
                self.artifact,
                self.labels.artifact()
            ));
        }
        match self.input {
            InputLayout::Image { size: 0, .. } => {
                invalid(format!("{}: input size must be greater than zero", self.artifact))
            }
            InputLayout::Image { .. } if self.kind == VariantKind::Scalar => invalid(format!(
                "{}: scalar variant cannot take image input",
                self.artifact
            )),
            InputLayout::Scalar if self.kind != VariantKind::Scalar => invalid(format!(
                "{}: image variant needs an image input layout",
                self.artifact
            )),
            _ => Ok(()),
        }
    }

    pub const fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub const fn input(&self) -> InputLayout {
        self.input
    }

    pub const fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn expected_class_count(&self) -> usize {
        self.labels.len()
    }

    pub fn model_file(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(format!("{}.onnx", self.artifact))
    }
}
