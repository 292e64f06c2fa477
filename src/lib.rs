pub mod config;
pub mod errors;
pub mod image_source;
pub mod labels;
pub mod model;
pub mod normalizer;
pub mod ranker;
pub mod report;
pub mod semaphore;
pub mod traits;
pub mod variant;

pub mod mocks;

use image::DynamicImage;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use config::Config;
pub use errors::{PlantClassifierError, Result};
pub use labels::LabelTable;
pub use model::OrtBackend;
pub use normalizer::{normalize, ChannelOrder, NormalizedTensor};
pub use ranker::{rank, RankedPrediction, RankedPredictionList};
pub use report::FileOutcome;
pub use traits::*;
pub use variant::{InputLayout, ModelVariant, VariantKind};

#[cfg(test)]
pub use mocks::*;

/// Encodes `image` for `variant`, runs it through `backend` and ranks the
/// scores against the variant's own label table.
///
/// Any failure aborts the whole call; there are no partial results.
pub fn classify<B: InferenceBackend + ?Sized>(
    backend: &B,
    image: &DynamicImage,
    variant: &ModelVariant,
) -> Result<RankedPredictionList> {
    let InputLayout::Image {
        size,
        channel_order,
    } = variant.input()
    else {
        return Err(PlantClassifierError::Validation {
            field: format!("variant {}", variant.artifact()),
            reason: "takes no image input".to_string(),
        });
    };

    let tensor = normalize(image, size, channel_order)?;
    let scores = backend.infer(variant, &tensor)?;
    drop(tensor);
    debug!(
        artifact = variant.artifact(),
        classes = scores.len(),
        "inference finished"
    );
    rank(&scores, variant.labels())
}

pub struct Classifier<B: InferenceBackend> {
    backend: B,
    variant: ModelVariant,
    show_progress: bool,
}

impl<B: InferenceBackend> Classifier<B> {
    pub const fn new(backend: B, variant: ModelVariant) -> Self {
        Self {
            backend,
            variant,
            show_progress: false,
        }
    }

    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub const fn variant(&self) -> &ModelVariant {
        &self.variant
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn classify(&self, image: &DynamicImage) -> Result<RankedPredictionList> {
        classify(&self.backend, image, &self.variant)
    }

    /// Feeds a single value to a scalar variant.
    pub fn probe_scalar(&self, value: f32) -> Result<RankedPredictionList> {
        if self.variant.input() != InputLayout::Scalar {
            return Err(PlantClassifierError::Validation {
                field: format!("variant {}", self.variant.artifact()),
                reason: "expects an image, not a scalar".to_string(),
            });
        }
        let scores = self.backend.infer_scalar(&self.variant, value)?;
        rank(&scores, self.variant.labels())
    }

    /// Loads and classifies one file. `Ok(None)` means the file held no
    /// readable image.
    pub fn classify_file(&self, path: &Path) -> Result<Option<RankedPredictionList>> {
        match image_source::load_image(path) {
            Some(image) => self.classify(&image).map(Some),
            None => Ok(None),
        }
    }

    fn outcome(&self, path: &Path) -> FileOutcome {
        let path_buf = path.to_path_buf();
        match self.classify_file(path) {
            Ok(Some(predictions)) => FileOutcome::Classified {
                path: path_buf,
                predictions,
            },
            Ok(None) => FileOutcome::NoImage { path: path_buf },
            Err(e) => {
                let error = e.display_chain();
                warn!(path = %path.display(), %error, "classification unavailable");
                FileOutcome::Failed {
                    path: path_buf,
                    error,
                }
            }
        }
    }

    /// Classifies every file independently. One bad file does not stop the
    /// others; its failure is recorded in its outcome.
    pub fn classify_paths(&self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        let pb = if self.show_progress {
            ProgressBar::new(paths.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        let outcomes: Vec<FileOutcome> = paths
            .par_iter()
            .progress_with(pb.clone())
            .map(|path| self.outcome(path))
            .collect();

        pb.finish_and_clear();
        outcomes
    }

    pub fn classify_directory(&self, dir: &Path) -> Result<Vec<FileOutcome>> {
        if !dir.is_dir() {
            return Err(PlantClassifierError::FileSystem {
                path: dir.to_path_buf(),
                operation: "read input directory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        let files = image_source::collect_image_files(dir);
        if files.is_empty() {
            info!(dir = %dir.display(), "no images to classify");
            return Ok(Vec::new());
        }

        info!(count = files.len(), artifact = self.variant.artifact(), "classifying images");
        Ok(self.classify_paths(&files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn leaf(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 160, 60])))
    }

    #[test]
    fn classify_ranks_against_variant_table() -> Result<()> {
        let variant = ModelVariant::builtin(VariantKind::Plants);
        let backend = MockBackend::new(vec![0.1, 0.6, 0.05, 0.2, 0.05]);
        let ranked = classify(&backend, &leaf(400, 300), &variant)?;

        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].label, "class_1");
        assert_eq!(ranked[1].label, "class_3");
        Ok(())
    }

    #[test]
    fn backend_sees_variant_layout() -> Result<()> {
        let backend = MockBackend::uniform(38);
        let classifier = Classifier::new(&backend, ModelVariant::builtin(VariantKind::Finale));
        classifier.classify(&leaf(640, 480))?;

        let seen = backend.last_shape().ok_or_else(|| PlantClassifierError::Validation {
            field: "mock".to_string(),
            reason: "never called".to_string(),
        })?;
        assert_eq!(seen, [1, 3, 200, 200]);
        Ok(())
    }

    #[test]
    fn wrong_score_count_is_a_table_mismatch() {
        let backend = MockBackend::uniform(37);
        let classifier = Classifier::new(backend, ModelVariant::builtin(VariantKind::Finale));
        let err = classifier.classify(&leaf(10, 10)).unwrap_err();
        assert!(matches!(
            err,
            PlantClassifierError::TableMismatch {
                expected: 38,
                actual: 37,
                ..
            }
        ));
    }

    #[test]
    fn scalar_variant_rejects_images() {
        let classifier = Classifier::new(
            MockBackend::uniform(1),
            ModelVariant::builtin(VariantKind::Scalar),
        );
        assert!(matches!(
            classifier.classify(&leaf(5, 5)),
            Err(PlantClassifierError::Validation { .. })
        ));
    }

    #[test]
    fn probe_scalar_ranks_single_output() -> Result<()> {
        let classifier = Classifier::new(
            MockBackend::new(vec![0.42]),
            ModelVariant::builtin(VariantKind::Scalar),
        );
        assert_eq!(
            classifier.probe_scalar(0.5)?,
            vec![RankedPrediction::new("value", 0.42)]
        );

        let image_classifier = Classifier::new(
            MockBackend::uniform(38),
            ModelVariant::builtin(VariantKind::Finale),
        );
        assert!(image_classifier.probe_scalar(0.5).is_err());
        Ok(())
    }

    #[test]
    fn unreadable_file_is_no_image() -> Result<()> {
        let classifier = Classifier::new(
            MockBackend::uniform(5),
            ModelVariant::builtin(VariantKind::Plants),
        );
        assert_eq!(classifier.classify_file(Path::new("/nonexistent/leaf.jpg"))?, None);
        Ok(())
    }

    #[test]
    fn directory_outcomes_cover_every_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input_dir = temp_dir.path().join("input");
        fs::create_dir_all(input_dir.join("tomato"))?;
        RgbImage::from_pixel(30, 20, Rgb([1, 2, 3]))
            .save(input_dir.join("tomato/a.png"))
            .map_err(|e| PlantClassifierError::inference("write fixture", e))?;
        fs::write(input_dir.join("broken.png"), b"nope")?;

        let classifier = Classifier::new(
            MockBackend::uniform(5),
            ModelVariant::builtin(VariantKind::Plants),
        );
        let outcomes = classifier.classify_directory(&input_dir)?;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], FileOutcome::NoImage { .. }));
        assert!(matches!(outcomes[1], FileOutcome::Classified { .. }));
        Ok(())
    }

    #[test]
    fn failed_outcome_keeps_the_error_source() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let leaf_path = temp_dir.path().join("leaf.png");
        RgbImage::from_pixel(8, 8, Rgb([40, 160, 60]))
            .save(&leaf_path)
            .map_err(|e| PlantClassifierError::inference("write fixture", e))?;

        let classifier = Classifier::new(
            TrackingBackend::failing(),
            ModelVariant::builtin(VariantKind::Plants),
        );
        let outcomes = classifier.classify_paths(&[leaf_path]);

        match &outcomes[0] {
            FileOutcome::Failed { error, .. } => assert_eq!(
                error,
                "Inference error: mock process failed: model raised during process"
            ),
            other => panic!("expected a failure, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let classifier = Classifier::new(
            MockBackend::uniform(5),
            ModelVariant::builtin(VariantKind::Plants),
        );
        assert!(classifier
            .classify_directory(Path::new("/nonexistent/photos"))
            .is_err());
    }
}
