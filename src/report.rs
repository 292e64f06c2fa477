use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::Result;
use crate::ranker::{top_k, RankedPrediction};

/// What happened to one input file.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Classified {
        path: PathBuf,
        predictions: Vec<RankedPrediction>,
    },
    /// The file could not be read as an image.
    NoImage { path: PathBuf },
    Failed { path: PathBuf, error: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Classified { path, .. } | Self::NoImage { path } | Self::Failed { path, .. } => {
                path
            }
        }
    }

    pub fn truncated(self, limit: Option<usize>) -> Self {
        match (self, limit) {
            (Self::Classified { path, predictions }, Some(k)) => Self::Classified {
                path,
                predictions: top_k(&predictions, k).to_vec(),
            },
            (outcome, _) => outcome,
        }
    }
}

/// One `label: score` line per prediction.
pub fn render_text(predictions: &[RankedPrediction]) -> String {
    predictions
        .iter()
        .map(|prediction| format!("{}: {:.6}\n", prediction.label, prediction.score))
        .collect()
}

fn render_outcome(outcome: &FileOutcome) -> String {
    let path = outcome.path().display();
    match outcome {
        FileOutcome::Classified { predictions, .. } => {
            let mut out = format!("{path}\n");
            for line in render_text(predictions).lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
            out
        }
        FileOutcome::NoImage { .. } => format!("{path}\n  (no image)\n"),
        FileOutcome::Failed { error, .. } => {
            format!("{path}\n  classification unavailable: {error}\n")
        }
    }
}

pub fn render_outcomes_text(outcomes: &[FileOutcome]) -> String {
    outcomes.iter().map(render_outcome).collect()
}

pub fn render_json(outcomes: &[FileOutcome]) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcomes)?)
}
