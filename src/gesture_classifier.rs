use crate::labels::LabelTable;
use crate::types::FeatureVector;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("Invalid input shape: {0}")]
    InvalidShape(String),

    #[error("Model returned an empty distribution")]
    EmptyOutput,

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },
}

/// Tensor de entrada rectangular: forma + datos en orden row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ModelInput {
    /// Ventana de secuencia con forma [1, capacity, feature_len]
    ///
    /// Todas las filas deben tener `feature_len` valores y debe haber
    /// exactamente `capacity` filas.
    pub fn from_sequence(
        window: &[FeatureVector],
        capacity: usize,
        feature_len: usize,
    ) -> Result<Self, ClassifierError> {
        if window.len() != capacity {
            return Err(ClassifierError::InvalidShape(format!(
                "expected {} rows, got {}",
                capacity,
                window.len()
            )));
        }

        let mut data = Vec::with_capacity(capacity * feature_len);
        for (row_idx, row) in window.iter().enumerate() {
            if row.len() != feature_len {
                return Err(ClassifierError::InvalidShape(format!(
                    "row {} has {} values, expected {}",
                    row_idx,
                    row.len(),
                    feature_len
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            shape: vec![1, capacity, feature_len],
            data,
        })
    }

    /// Imagen NHWC ya normalizada
    pub fn from_image(pixels: Vec<f32>, height: usize, width: usize, channels: usize) -> Result<Self, ClassifierError> {
        let expected = height * width * channels;
        if pixels.len() != expected {
            return Err(ClassifierError::InvalidShape(format!(
                "image tensor has {} values, expected {}",
                pixels.len(),
                expected
            )));
        }

        Ok(Self {
            shape: vec![1, height, width, channels],
            data: pixels,
        })
    }
}

/// Servicio de inferencia: recibe un tensor y devuelve la distribución
/// de probabilidades por clase
pub trait GestureModel {
    fn predict(&mut self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError>;
}

/// Modelo ONNX cargado con ONNX Runtime
pub struct OnnxModel {
    session: Session,
    input_name: String,
    prob_output_name: String,
}

impl OnnxModel {
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?.commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(ClassifierError::MissingIo { kind: "input" })?;

        let prob_output_name = session
            .outputs
            .iter()
            .find(|output| {
                matches!(
                    output.output_type,
                    ValueType::Tensor {
                        ty: TensorElementType::Float32,
                        ..
                    }
                )
            })
            .or_else(|| session.outputs.first())
            .map(|output| output.name.clone())
            .ok_or(ClassifierError::MissingIo { kind: "output" })?;

        tracing::info!(
            "[ONNX] Modelo cargado: {} (input: {}, output: {})",
            model_path.display(),
            input_name,
            prob_output_name
        );

        Ok(Self {
            session,
            input_name,
            prob_output_name,
        })
    }
}

impl GestureModel for OnnxModel {
    fn predict(&mut self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        // (Vec<usize>, Vec<f32>) como datos de tensor propios
        let input_value = Tensor::from_array((input.shape.clone(), input.data.clone()))?;

        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => &input_value,
        ])?;

        let (prob_shape, prob_data) =
            outputs[self.prob_output_name.as_str()].try_extract_tensor::<f32>()?;

        // Salida [1, num_classes] o [num_classes]
        let num_classes = prob_shape.last().map(|&d| d as usize).unwrap_or(0);
        Ok(prob_data.iter().take(num_classes).copied().collect())
    }
}

/// Resultado de una inferencia
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    /// None si el índice no existe en la tabla de etiquetas
    pub label: Option<String>,
    /// Probabilidad máxima × 100
    pub confidence: f32,
}

impl Prediction {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("undefined")
    }
}

/// Índice y valor del máximo; los NaN nunca ganan
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

/// Modelo + tabla de etiquetas
pub struct GestureClassifier {
    model: Box<dyn GestureModel>,
    labels: LabelTable,
    label_gap_reported: bool,
}

impl GestureClassifier {
    pub fn new(model: Box<dyn GestureModel>, labels: LabelTable) -> Self {
        Self {
            model,
            labels,
            label_gap_reported: false,
        }
    }

    pub fn load(model_path: impl AsRef<Path>, labels: LabelTable) -> Result<Self, ClassifierError> {
        let model = OnnxModel::load(model_path)?;
        tracing::info!("[ONNX] Clases: {:?}", labels.as_slice());
        Ok(Self::new(Box::new(model), labels))
    }

    /// Ejecuta el modelo y elige la clase de máxima probabilidad
    pub fn classify(&mut self, input: &ModelInput) -> Result<Prediction, ClassifierError> {
        let scores = self.model.predict(input)?;
        self.best_of(&scores)
    }

    /// Una sola inferencia: la predicción y todas las clases ordenadas de
    /// mayor a menor probabilidad
    pub fn classify_ranked(
        &mut self,
        input: &ModelInput,
    ) -> Result<(Prediction, Vec<(String, f32)>), ClassifierError> {
        let scores = self.model.predict(input)?;
        let prediction = self.best_of(&scores)?;

        let mut ranked: Vec<(String, f32)> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let name = self.labels.get(i).unwrap_or("undefined").to_string();
                (name, score)
            })
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        Ok((prediction, ranked))
    }

    fn best_of(&mut self, scores: &[f32]) -> Result<Prediction, ClassifierError> {
        let (index, prob) = argmax(scores).ok_or(ClassifierError::EmptyOutput)?;

        if scores.len() > self.labels.len() && !self.label_gap_reported {
            self.label_gap_reported = true;
            tracing::warn!(
                "Modelo con {} clases pero solo {} etiquetas",
                scores.len(),
                self.labels.len()
            );
        }

        Ok(Prediction {
            index,
            label: self.labels.get(index).map(str::to_string),
            confidence: prob * 100.0,
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedModel(Vec<f32>);

    impl GestureModel for FixedModel {
        fn predict(&mut self, _input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    fn labels(names: &[&str]) -> LabelTable {
        LabelTable::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_sequence_input_shape() {
        let window = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let input = ModelInput::from_sequence(&window, 2, 3).unwrap();
        assert_eq!(input.shape, vec![1, 2, 3]);
        assert_eq!(input.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sequence_input_rejects_bad_rows() {
        let short_row = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]];
        assert!(matches!(
            ModelInput::from_sequence(&short_row, 2, 3),
            Err(ClassifierError::InvalidShape(_))
        ));

        let missing_row = vec![vec![1.0, 2.0, 3.0]];
        assert!(ModelInput::from_sequence(&missing_row, 2, 3).is_err());
    }

    #[test]
    fn test_classify_picks_argmax() {
        let mut classifier = GestureClassifier::new(
            Box::new(FixedModel(vec![0.1, 0.7, 0.2])),
            labels(&["A", "B", "C"]),
        );
        let input = ModelInput::from_sequence(&[vec![0.0]], 1, 1).unwrap();

        let prediction = classifier.classify(&input).unwrap();
        assert_eq!(prediction.index, 1);
        assert_eq!(prediction.display_label(), "B");
        assert!((prediction.confidence - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_classify_index_beyond_labels() {
        let mut classifier = GestureClassifier::new(
            Box::new(FixedModel(vec![0.1, 0.2, 0.7])),
            labels(&["A"]),
        );
        let input = ModelInput::from_sequence(&[vec![0.0]], 1, 1).unwrap();

        let prediction = classifier.classify(&input).unwrap();
        assert_eq!(prediction.index, 2);
        assert_eq!(prediction.label, None);
        assert_eq!(prediction.display_label(), "undefined");
    }

    #[test]
    fn test_empty_output_is_error() {
        let mut classifier = GestureClassifier::new(Box::new(FixedModel(vec![])), labels(&["A"]));
        let input = ModelInput::from_sequence(&[vec![0.0]], 1, 1).unwrap();
        assert!(matches!(
            classifier.classify(&input),
            Err(ClassifierError::EmptyOutput)
        ));
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.2]), Some((1, 0.3)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_classify_ranked_runs_model_once() {
        struct Counting(Rc<RefCell<usize>>);

        impl GestureModel for Counting {
            fn predict(&mut self, _input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
                *self.0.borrow_mut() += 1;
                Ok(vec![0.2, 0.5, 0.3])
            }
        }

        let calls = Rc::new(RefCell::new(0));
        let mut classifier =
            GestureClassifier::new(Box::new(Counting(Rc::clone(&calls))), labels(&["A", "B"]));
        let input = ModelInput::from_sequence(&[vec![0.0]], 1, 1).unwrap();

        let (prediction, ranked) = classifier.classify_ranked(&input).unwrap();
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(prediction.display_label(), "B");
        assert!((prediction.confidence - 50.0).abs() < 1e-4);

        let names: Vec<&str> = ranked.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["B", "undefined", "A"]);
    }
}
