use serde::{Deserialize, Serialize};

/// Ordered class names of one model artifact.
///
/// Position `i` names the class scored by output `i`. A table is bound to
/// exactly one artifact id and version so that two models never share a
/// table by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    artifact: String,
    version: u32,
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(artifact: impl Into<String>, version: u32, labels: Vec<String>) -> Self {
        Self {
            artifact: artifact.into(),
            version,
            labels,
        }
    }

    fn from_static(artifact: &str, version: u32, labels: &[&str]) -> Self {
        Self::new(
            artifact,
            version,
            labels.iter().map(|label| label.to_string()).collect(),
        )
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub const fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// PlantVillage classes scored by the `finale` model.
    pub fn plant_village() -> Self {
        Self::from_static(FINALE_ARTIFACT, 1, &PLANT_VILLAGE_LABELS)
    }

    /// Positional names for the five outputs of `plants_model`.
    ///
    /// The artifact ships without class names. Override this table with a
    /// variant manifest to get meaningful labels.
    pub fn plants_positional() -> Self {
        Self::from_static(PLANTS_MODEL_ARTIFACT, 1, &PLANTS_POSITIONAL_LABELS)
    }

    /// The single output of the scalar `model` artifact.
    pub fn scalar() -> Self {
        Self::from_static(SCALAR_MODEL_ARTIFACT, 1, &["value"])
    }
}

pub const FINALE_ARTIFACT: &str = "finale";
pub const PLANTS_MODEL_ARTIFACT: &str = "plants_model";
pub const SCALAR_MODEL_ARTIFACT: &str = "model";

const PLANT_VILLAGE_LABELS: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Cherry_(including_sour)___healthy",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

const PLANTS_POSITIONAL_LABELS: [&str; 5] = ["class_0", "class_1", "class_2", "class_3", "class_4"];
