use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::errors::{PlantClassifierError, Result};
use crate::normalizer::NormalizedTensor;
use crate::traits::InferenceBackend;
use crate::variant::ModelVariant;

/// Backend double for tests.
///
/// Always returns the same scores and records the shape of the last tensor
/// it received.
#[derive(Debug, Default)]
pub struct MockBackend {
    scores: Vec<f32>,
    last_shape: Mutex<Option<[usize; 4]>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            ..Self::default()
        }
    }

    /// `classes` equal scores.
    pub fn uniform(classes: usize) -> Self {
        Self::new(vec![1.0 / classes.max(1) as f32; classes])
    }

    pub fn last_shape(&self) -> Option<[usize; 4]> {
        *self.last_shape.lock()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&self, _variant: &ModelVariant, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_shape.lock() = Some(tensor.shape());
        Ok(self.scores.clone())
    }

    fn infer_scalar(&self, _variant: &ModelVariant, _value: f32) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

/// Backend double that counts session acquire and release.
///
/// With `fail` set, inference fails after the session is taken. Release
/// happens when the guard drops, so `open()` returns to 0 either way.
#[derive(Debug)]
pub struct TrackingBackend {
    scores: Vec<f32>,
    fail: bool,
    open: AtomicUsize,
    acquired: AtomicUsize,
}

struct TrackedSession<'a> {
    open: &'a AtomicUsize,
}

impl Drop for TrackedSession<'_> {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TrackingBackend {
    pub const fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            fail: false,
            open: AtomicUsize::new(0),
            acquired: AtomicUsize::new(0),
        }
    }

    pub const fn failing() -> Self {
        Self {
            scores: Vec::new(),
            fail: true,
            open: AtomicUsize::new(0),
            acquired: AtomicUsize::new(0),
        }
    }

    /// Sessions currently open.
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    fn session(&self) -> TrackedSession<'_> {
        self.open.fetch_add(1, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        TrackedSession { open: &self.open }
    }

    fn run(&self) -> Result<Vec<f32>> {
        let _session = self.session();
        if self.fail {
            return Err(PlantClassifierError::inference(
                "mock process",
                "model raised during process",
            ));
        }
        Ok(self.scores.clone())
    }
}

impl InferenceBackend for TrackingBackend {
    fn infer(&self, _variant: &ModelVariant, _tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        self.run()
    }

    fn infer_scalar(&self, _variant: &ModelVariant, _value: f32) -> Result<Vec<f32>> {
        self.run()
    }
}

/// Mock sized to `variant`'s label table.
pub fn create_mock_backend(variant: &ModelVariant) -> MockBackend {
    MockBackend::uniform(variant.expected_class_count())
}
