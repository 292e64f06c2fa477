use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use tracing::{debug, info};

use crate::{
    errors::{PlantClassifierError, Result},
    normalizer::NormalizedTensor,
    semaphore::SessionGate,
    traits::InferenceBackend,
    variant::ModelVariant,
};

/// ONNX Runtime backend.
///
/// Holds no session between calls. Every inference loads
/// `<model_dir>/<artifact>.onnx`, runs it once and drops it again, so native
/// memory is handed back even when the run fails. The gate caps how many
/// sessions exist at the same time across threads.
pub struct OrtBackend {
    model_dir: PathBuf,
    device_id: i32,
    gate: SessionGate,
}

impl OrtBackend {
    pub fn new(model_dir: &Path, device_id: i32, max_sessions: usize) -> Result<Self> {
        if max_sessions == 0 {
            return Err(PlantClassifierError::Validation {
                field: "max_sessions".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !model_dir.is_dir() {
            return Err(PlantClassifierError::FileSystem {
                path: model_dir.to_path_buf(),
                operation: "open model directory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model directory does not exist",
                ),
            });
        }

        Ok(Self {
            model_dir: model_dir.to_path_buf(),
            device_id,
            gate: SessionGate::new(max_sessions),
        })
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    fn load(&self, variant: &ModelVariant) -> Result<Session> {
        let model_path = variant.model_file(&self.model_dir);
        if !model_path.is_file() {
            return Err(PlantClassifierError::inference(
                format!("load model {}", model_path.display()),
                "model file not found",
            ));
        }

        let session = SessionBuilder::new()
            .map_err(|e| PlantClassifierError::inference("create session builder", e.to_string()))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(self.device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(self.device_id)
                    .build(),
            ])
            .map_err(|e| {
                PlantClassifierError::inference("register execution providers", e.to_string())
            })?
            .commit_from_file(&model_path)
            .map_err(|e| {
                PlantClassifierError::inference(
                    format!("load model {}", model_path.display()),
                    e.to_string(),
                )
            })?;

        check_input_shape(&session, variant)?;
        Ok(session)
    }

    fn with_session<T>(
        &self,
        variant: &ModelVariant,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        scoped(&self.gate, variant.artifact(), || self.load(variant), f)
    }
}

/// Runs `f` on a session obtained from `open` while holding a gate permit.
///
/// The session is dropped before the permit. Both are released on every
/// return path, including a failed `open`.
pub(crate) fn scoped<S, T>(
    gate: &SessionGate,
    artifact: &str,
    open: impl FnOnce() -> Result<S>,
    f: impl FnOnce(&mut S) -> Result<T>,
) -> Result<T> {
    let _permit = gate.acquire();
    let mut session = open()?;
    info!(artifact, "model session opened");

    let result = f(&mut session);

    drop(session);
    debug!(artifact, ok = result.is_ok(), "model session released");
    result
}

fn io_names(session: &Session) -> Result<(String, String)> {
    let input = session.inputs.first().ok_or_else(|| {
        PlantClassifierError::inference("read model inputs", "model declares no inputs")
    })?;
    let output = session.outputs.first().ok_or_else(|| {
        PlantClassifierError::inference("read model outputs", "model declares no outputs")
    })?;
    Ok((input.name.clone(), output.name.clone()))
}

/// Rejects models whose declared input shape disagrees with the variant.
/// Dynamic dimensions (negative values) match anything.
fn check_input_shape(session: &Session, variant: &ModelVariant) -> Result<()> {
    let Some(input) = session.inputs.first() else {
        return Ok(());
    };
    let Some(declared) = input.input_type.tensor_shape() else {
        return Ok(());
    };
    let declared: Vec<i64> = declared.iter().copied().collect();
    let expected = variant.input().shape();

    let matches = declared.len() == expected.len()
        && declared
            .iter()
            .zip(&expected)
            .all(|(&d, &e)| d < 0 || d as usize == e);
    if !matches {
        return Err(PlantClassifierError::inference(
            format!("check input shape of {}", variant.artifact()),
            format!("model expects {declared:?}, variant provides {expected:?}"),
        ));
    }
    Ok(())
}

fn run_session(session: &mut Session, input: TensorRef<'_, f32>) -> Result<Vec<f32>> {
    let (input_name, output_name) = io_names(session)?;
    let outputs = session.run(ort::inputs![input_name.as_str() => input])?;
    let scores = outputs[output_name.as_str()]
        .try_extract_array::<f32>()?
        .iter()
        .copied()
        .collect();
    Ok(scores)
}

impl InferenceBackend for OrtBackend {
    fn infer(&self, variant: &ModelVariant, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        let input = tensor.clone().into_array()?;
        self.with_session(variant, |session| {
            run_session(session, TensorRef::from_array_view(&input)?)
        })
    }

    fn infer_scalar(&self, variant: &ModelVariant, value: f32) -> Result<Vec<f32>> {
        let input = Array2::<f32>::from_elem((1, 1), value);
        self.with_session(variant, |session| {
            run_session(session, TensorRef::from_array_view(&input)?)
        })
    }
}
