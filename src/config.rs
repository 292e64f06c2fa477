use clap::Parser;
use std::path::PathBuf;

use crate::errors::Result;
use crate::variant::{ModelVariant, VariantKind};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Leaf photo, or a directory searched recursively for photos
    pub input: Option<PathBuf>,

    /// Directory holding `<artifact>.onnx` files
    #[arg(short, long, default_value = "models")]
    pub model_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = VariantKind::Finale)]
    pub variant: VariantKind,

    /// JSON manifest replacing the built-in artifact, input layout and labels
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Only print the best `k` predictions per image
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Input value for the scalar variant
    #[arg(long, default_value_t = 0.5)]
    pub value: f32,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Upper bound on model sessions alive at the same time
    #[arg(long, default_value_t = 1)]
    pub max_sessions: usize,

    #[arg(short, long, default_value_t = default_threads())]
    pub num_threads: usize,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    pub fn variant(&self) -> Result<ModelVariant> {
        match &self.manifest {
            Some(path) => ModelVariant::from_manifest(self.variant, path),
            None => Ok(ModelVariant::builtin(self.variant)),
        }
    }

    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
