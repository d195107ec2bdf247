use crate::crop::{crop_and_resize, crop_rect, normalized_pixels, BoundingBox, CropError};
use crate::gesture_buffer::SequenceWindow;
use crate::gesture_classifier::{ClassifierError, GestureClassifier, ModelInput, Prediction};
use crate::types::Detection;
use serde::Deserialize;

/// Estrategia de predicción seleccionada por configuración
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Ventana temporal de landmarks
    Sequence,
    /// Recorte de la mano en cada frame
    Crop,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequence" => Ok(Strategy::Sequence),
            "crop" => Ok(Strategy::Crop),
            other => Err(format!("estrategia desconocida: {}", other)),
        }
    }
}

/// Qué pasó con un frame en modo predicción
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// Frame sin mano
    NoHand,
    /// Ventana aún incompleta (frames acumulados)
    Buffering(usize),
    /// Hay datos pero el modelo no está cargado
    ModelNotReady,
    /// La caja de la mano no permite recortar
    InvalidCrop(CropError),
    /// La inferencia falló; el texto anterior se mantiene
    Failed(String),
    Predicted(Prediction),
}

/// Predicción sobre la ventana deslizante de landmarks
pub struct SequencePredictor {
    window: SequenceWindow,
    feature_len: usize,
}

impl SequencePredictor {
    pub fn new(capacity: usize, feature_len: usize) -> Self {
        Self {
            window: SequenceWindow::new(capacity),
            feature_len,
        }
    }

    fn observe(
        &mut self,
        detection: &Detection,
        classifier: Option<&mut GestureClassifier>,
    ) -> PredictOutcome {
        let Some(hand) = detection.first_hand() else {
            // Hueco en la ventana, no se rellena con ceros
            return PredictOutcome::NoHand;
        };

        let ready = self.window.push_predict(hand.to_feature_vector());

        // Sin modelo la ventana se sigue llenando pero el estado lo indica
        let Some(classifier) = classifier else {
            return PredictOutcome::ModelNotReady;
        };
        if !ready {
            return PredictOutcome::Buffering(self.window.len());
        }

        let result = ModelInput::from_sequence(
            &self.window.snapshot(),
            self.window.capacity(),
            self.feature_len,
        )
        .and_then(|input| classifier.classify(&input));

        into_outcome(result)
    }
}

/// Predicción frame a frame sobre el recorte de la mano
pub struct CropPredictor {
    padding_ratio: f32,
    crop_size: u32,
}

impl CropPredictor {
    pub fn new(padding_ratio: f32, crop_size: u32) -> Self {
        Self {
            padding_ratio,
            crop_size,
        }
    }

    fn observe(
        &mut self,
        detection: &Detection,
        classifier: Option<&mut GestureClassifier>,
    ) -> PredictOutcome {
        let Some(classifier) = classifier else {
            return PredictOutcome::ModelNotReady;
        };
        let Some(hand) = detection.first_hand() else {
            return PredictOutcome::NoHand;
        };

        let bbox = BoundingBox::from_hand(hand);
        let image = &detection.image;
        let cropped = crop_rect(&bbox, image.width(), image.height(), self.padding_ratio)
            .and_then(|rect| crop_and_resize(image, &rect, self.crop_size));

        let cropped = match cropped {
            Ok(cropped) => cropped,
            Err(e) => return PredictOutcome::InvalidCrop(e),
        };

        let size = self.crop_size as usize;
        let result = ModelInput::from_image(normalized_pixels(&cropped), size, size, 3)
            .and_then(|input| classifier.classify(&input));

        into_outcome(result)
    }
}

fn into_outcome(result: Result<Prediction, ClassifierError>) -> PredictOutcome {
    match result {
        Ok(prediction) => PredictOutcome::Predicted(prediction),
        Err(e) => PredictOutcome::Failed(e.to_string()),
    }
}

/// Predictor con dos estrategias intercambiables
pub enum Predictor {
    Sequence(SequencePredictor),
    Crop(CropPredictor),
}

impl Predictor {
    pub fn strategy(&self) -> Strategy {
        match self {
            Predictor::Sequence(_) => Strategy::Sequence,
            Predictor::Crop(_) => Strategy::Crop,
        }
    }

    pub fn observe(
        &mut self,
        detection: &Detection,
        classifier: Option<&mut GestureClassifier>,
    ) -> PredictOutcome {
        match self {
            Predictor::Sequence(p) => p.observe(detection, classifier),
            Predictor::Crop(p) => p.observe(detection, classifier),
        }
    }

    /// Frames pendientes en la ventana (siempre 0 para el recorte)
    pub fn buffered(&self) -> usize {
        match self {
            Predictor::Sequence(p) => p.window.len(),
            Predictor::Crop(_) => 0,
        }
    }

    /// Descarta la ventana en curso
    pub fn reset(&mut self) {
        if let Predictor::Sequence(p) = self {
            p.window.clear();
        }
    }

    /// Texto de gesto para un resultado. None deja el texto como está
    pub fn gesture_text(&self, outcome: &PredictOutcome, current: &str) -> Option<String> {
        match (self, outcome) {
            (_, PredictOutcome::ModelNotReady) => Some("GESTURE: Model not loaded yet.".to_string()),
            (_, PredictOutcome::Failed(_)) => None,
            (Predictor::Sequence(_), PredictOutcome::Predicted(p)) => {
                Some(format!("GESTURE: {}", p.display_label()))
            }
            (Predictor::Sequence(_), PredictOutcome::Buffering(_)) => {
                Some(format!("GESTURE: {}", current))
            }
            (Predictor::Sequence(_), _) => None,
            (Predictor::Crop(_), PredictOutcome::Predicted(p)) => Some(format!(
                "GESTURE: {} ({:.2}%)",
                p.display_label(),
                p.confidence
            )),
            (Predictor::Crop(_), PredictOutcome::NoHand) => {
                Some("GESTURE: No hand detected.".to_string())
            }
            (Predictor::Crop(_), PredictOutcome::InvalidCrop(_)) => {
                Some("GESTURE: Hand detected but cannot crop.".to_string())
            }
            (Predictor::Crop(_), PredictOutcome::Buffering(_)) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture_classifier::GestureModel;
    use crate::labels::LabelTable;
    use crate::types::{Hand, Landmark};
    use image::RgbImage;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Modelo falso que guarda las formas recibidas
    struct ShapeRecorder {
        shapes: Rc<RefCell<Vec<Vec<usize>>>>,
        scores: Vec<f32>,
    }

    impl GestureModel for ShapeRecorder {
        fn predict(&mut self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
            self.shapes.borrow_mut().push(input.shape.clone());
            Ok(self.scores.clone())
        }
    }

    fn classifier(scores: Vec<f32>) -> (GestureClassifier, Rc<RefCell<Vec<Vec<usize>>>>) {
        let shapes = Rc::new(RefCell::new(Vec::new()));
        let model = ShapeRecorder {
            shapes: Rc::clone(&shapes),
            scores,
        };
        let labels = LabelTable::new(vec!["Hello".to_string(), "Yes".to_string()]);
        (GestureClassifier::new(Box::new(model), labels), shapes)
    }

    fn detection(hands: Vec<Hand>) -> Detection {
        Detection {
            frame_index: 0,
            image: RgbImage::new(640, 480),
            hands,
        }
    }

    fn spread_hand() -> Hand {
        Hand::new(vec![
            Landmark::new(0.4, 0.3, 0.0),
            Landmark::new(0.6, 0.5, 0.0),
            Landmark::new(0.5, 0.4, 0.1),
        ])
    }

    #[test]
    fn test_sequence_infers_every_frame_once_full() {
        let (mut clf, shapes) = classifier(vec![0.2, 0.8]);
        let mut predictor = Predictor::Sequence(SequencePredictor::new(3, 9));
        let det = detection(vec![spread_hand()]);

        assert_eq!(
            predictor.observe(&det, Some(&mut clf)),
            PredictOutcome::Buffering(1)
        );
        assert_eq!(
            predictor.observe(&det, Some(&mut clf)),
            PredictOutcome::Buffering(2)
        );
        for _ in 0..3 {
            match predictor.observe(&det, Some(&mut clf)) {
                PredictOutcome::Predicted(p) => assert_eq!(p.display_label(), "Yes"),
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(predictor.buffered(), 3);
        }

        assert_eq!(shapes.borrow().len(), 3);
        assert_eq!(shapes.borrow()[0], vec![1, 3, 9]);
    }

    #[test]
    fn test_sequence_gap_does_not_push() {
        let (mut clf, _) = classifier(vec![1.0]);
        let mut predictor = Predictor::Sequence(SequencePredictor::new(3, 9));

        predictor.observe(&detection(vec![spread_hand()]), Some(&mut clf));
        assert_eq!(
            predictor.observe(&detection(vec![]), Some(&mut clf)),
            PredictOutcome::NoHand
        );
        assert_eq!(predictor.buffered(), 1);
    }

    #[test]
    fn test_sequence_buffers_without_model() {
        let mut predictor = Predictor::Sequence(SequencePredictor::new(2, 9));
        let det = detection(vec![spread_hand()]);

        predictor.observe(&det, None);
        assert_eq!(predictor.observe(&det, None), PredictOutcome::ModelNotReady);
        assert_eq!(predictor.buffered(), 2);
    }

    #[test]
    fn test_sequence_without_model_never_shows_empty_gesture() {
        let mut predictor = Predictor::Sequence(SequencePredictor::new(3, 9));
        let det = detection(vec![spread_hand()]);

        for expected_len in 1..=3 {
            let outcome = predictor.observe(&det, None);
            assert_eq!(outcome, PredictOutcome::ModelNotReady);
            assert_eq!(predictor.buffered(), expected_len);
            assert_eq!(
                predictor.gesture_text(&outcome, "").as_deref(),
                Some("GESTURE: Model not loaded yet.")
            );
        }
    }

    #[test]
    fn test_sequence_wrong_feature_len_fails() {
        let (mut clf, shapes) = classifier(vec![1.0]);
        let mut predictor = Predictor::Sequence(SequencePredictor::new(1, 63));

        let outcome = predictor.observe(&detection(vec![spread_hand()]), Some(&mut clf));
        assert!(matches!(outcome, PredictOutcome::Failed(_)));
        assert!(shapes.borrow().is_empty());
        assert_eq!(predictor.gesture_text(&outcome, "Hello"), None);
    }

    #[test]
    fn test_crop_predicts_single_frame() {
        let (mut clf, shapes) = classifier(vec![0.9, 0.1]);
        let mut predictor = Predictor::Crop(CropPredictor::new(0.2, 224));

        let outcome = predictor.observe(&detection(vec![spread_hand()]), Some(&mut clf));
        let text = predictor.gesture_text(&outcome, "");
        assert_eq!(text.as_deref(), Some("GESTURE: Hello (90.00%)"));
        assert_eq!(shapes.borrow()[0], vec![1, 224, 224, 3]);
        assert_eq!(predictor.buffered(), 0);
    }

    #[test]
    fn test_crop_degenerate_hand_skips_inference() {
        let (mut clf, shapes) = classifier(vec![1.0]);
        let mut predictor = Predictor::Crop(CropPredictor::new(0.2, 224));
        let point = Hand::new(vec![Landmark::new(0.5, 0.5, 0.0); 21]);

        let outcome = predictor.observe(&detection(vec![point]), Some(&mut clf));
        assert!(matches!(outcome, PredictOutcome::InvalidCrop(_)));
        assert!(shapes.borrow().is_empty());
        assert_eq!(
            predictor.gesture_text(&outcome, "").as_deref(),
            Some("GESTURE: Hand detected but cannot crop.")
        );
    }

    #[test]
    fn test_crop_without_model() {
        let mut predictor = Predictor::Crop(CropPredictor::new(0.2, 224));
        let outcome = predictor.observe(&detection(vec![]), None);
        assert_eq!(outcome, PredictOutcome::ModelNotReady);
        assert_eq!(
            predictor.gesture_text(&outcome, "").as_deref(),
            Some("GESTURE: Model not loaded yet.")
        );
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Crop".parse::<Strategy>(), Ok(Strategy::Crop));
        assert_eq!("sequence".parse::<Strategy>(), Ok(Strategy::Sequence));
        assert!("lstm".parse::<Strategy>().is_err());
    }
}
