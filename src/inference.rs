// Bow position inference from normalized distances
//
// The session only sees the `Predictor` trait. `DenseModel` evaluates a
// feed-forward network exported from the trained model as JSON:
//
// {
//   "layers": [
//     { "kernel": [[...], ...], "bias": [...], "activation": "relu" },
//     ...
//   ]
// }
//
// `kernel` is laid out [inputs][outputs], as Keras `Dense.get_weights()`
// returns it.

use crate::streaming::record::NormalizedRecord;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Width of the model input (one value per distance sensor)
pub const MODEL_INPUT_LEN: usize = 4;

/// Width of the model output published on `/pred`
pub const MODEL_OUTPUT_LEN: usize = 2;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model shape: {0}")]
    Shape(String),

    #[error("Model produced a non-finite output")]
    NonFinite,
}

/// Maps a normalized record to the two predicted values
pub trait Predictor: Send + Sync {
    fn predict(&self, input: &NormalizedRecord) -> InferenceResult<[f32; MODEL_OUTPUT_LEN]>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    kernel: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default)]
    activation: Activation,
}

impl DenseLayer {
    fn input_len(&self) -> usize {
        self.kernel.len()
    }

    fn output_len(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output = self.bias.clone();
        for (x, row) in input.iter().zip(&self.kernel) {
            for (out, w) in output.iter_mut().zip(row) {
                *out += x * w;
            }
        }
        for out in output.iter_mut() {
            *out = self.activation.apply(*out);
        }
        output
    }
}

/// Feed-forward network of dense layers
#[derive(Debug, Clone, Deserialize)]
pub struct DenseModel {
    layers: Vec<DenseLayer>,
}

impl DenseModel {
    pub fn from_json(json: &str) -> InferenceResult<Self> {
        let model: DenseModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> InferenceResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| InferenceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_json(&json)?;
        log::info!(
            "Loaded model at {} ({} layers)",
            path.display(),
            model.layers.len()
        );
        Ok(model)
    }

    fn validate(&self) -> InferenceResult<()> {
        if self.layers.is_empty() {
            return Err(InferenceError::Shape("model has no layers".into()));
        }

        let mut width = MODEL_INPUT_LEN;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_len() != width {
                return Err(InferenceError::Shape(format!(
                    "layer {} expects {} inputs, previous width is {}",
                    i,
                    layer.input_len(),
                    width
                )));
            }
            if let Some(row) = layer.kernel.iter().find(|row| row.len() != layer.output_len()) {
                return Err(InferenceError::Shape(format!(
                    "layer {} kernel row has {} columns, bias has {}",
                    i,
                    row.len(),
                    layer.output_len()
                )));
            }
            width = layer.output_len();
        }

        if width != MODEL_OUTPUT_LEN {
            return Err(InferenceError::Shape(format!(
                "model outputs {} values, expected {}",
                width, MODEL_OUTPUT_LEN
            )));
        }
        Ok(())
    }
}

impl Predictor for DenseModel {
    fn predict(&self, input: &NormalizedRecord) -> InferenceResult<[f32; MODEL_OUTPUT_LEN]> {
        let output = self
            .layers
            .iter()
            .fold(input.values().to_vec(), |acc, layer| layer.forward(&acc));

        match output.as_slice() {
            [a, b] if a.is_finite() && b.is_finite() => Ok([*a, *b]),
            [_, _] => Err(InferenceError::NonFinite),
            other => Err(InferenceError::Shape(format!(
                "model produced {} values",
                other.len()
            ))),
        }
    }
}
