use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use thiserror::Error;

use crate::types::{Detection, Frame, Hand, Landmark, NUM_LANDMARKS};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector no disponible: {0}")]
    Unavailable(String),
}

/// Parámetros del detector de landmarks
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub max_hands: usize,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Detector de landmarks de mano: un frame entra, cero o más manos salen
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Detection, DetectorError>;
}

/// Mano leída del CSV antes de ordenar sus landmarks
#[derive(Default)]
struct RawHand {
    score: f32,
    points: BTreeMap<usize, Landmark>,
}

/// Detector que responde desde una grabación CSV con el formato
/// frame,hand,landmark,x,y,z[,score]
pub struct RecordedDetector {
    options: DetectorOptions,
    frames: BTreeMap<u64, Vec<Hand>>,
    frame_count: u64,
}

impl RecordedDetector {
    pub fn load_csv(path: impl AsRef<Path>, options: DetectorOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("No se pudo abrir la grabación {:?}", path))?;

        let mut raw: BTreeMap<u64, BTreeMap<usize, RawHand>> = BTreeMap::new();

        for (row_idx, result) in reader.records().enumerate() {
            let record =
                result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
            if record.len() < 6 {
                bail!("La fila {} no tiene 6 columnas", row_idx + 1);
            }

            let frame: u64 = record[0]
                .parse()
                .with_context(|| format!("frame inválido en fila {}", row_idx + 1))?;
            let hand: usize = record[1]
                .parse()
                .with_context(|| format!("hand inválido en fila {}", row_idx + 1))?;
            let landmark: usize = record[2]
                .parse()
                .with_context(|| format!("landmark inválido en fila {}", row_idx + 1))?;

            let x: f32 = record[3].parse()?;
            let y: f32 = record[4].parse()?;
            let z: f32 = record[5].parse()?;
            // Sin columna de score la mano se considera segura
            let score: f32 = match record.get(6) {
                Some(value) if !value.is_empty() => value.parse()?,
                _ => 1.0,
            };

            let entry = raw.entry(frame).or_default().entry(hand).or_default();
            entry.score = score;
            entry.points.insert(landmark, Landmark::new(x, y, z));
        }

        if raw.is_empty() {
            bail!("La grabación {:?} no contiene datos", path);
        }

        let frame_count = raw.keys().next_back().map(|&last| last + 1).unwrap_or(0);
        let frames = raw
            .into_iter()
            .map(|(frame, hands)| (frame, Self::select_hands(frame, hands, &options)))
            .collect();

        tracing::info!(
            "📼 Grabación cargada: {:?} ({} frames, max_hands={}, complexity={}, det={:.2}, track={:.2})",
            path,
            frame_count,
            options.max_hands,
            options.model_complexity,
            options.min_detection_confidence,
            options.min_tracking_confidence
        );

        Ok(Self {
            options,
            frames,
            frame_count,
        })
    }

    /// Filtra por confianza y limita a `max_hands`, en orden de mano.
    /// Una mano sin exactamente los landmarks 0..NUM_LANDMARKS se descarta
    fn select_hands(
        frame: u64,
        hands: BTreeMap<usize, RawHand>,
        options: &DetectorOptions,
    ) -> Vec<Hand> {
        hands
            .into_iter()
            .filter(|(hand_idx, hand)| {
                let complete = hand.points.len() == NUM_LANDMARKS
                    && hand.points.keys().copied().eq(0..NUM_LANDMARKS);
                if !complete {
                    tracing::warn!(
                        "⚠️  Frame {} mano {}: {} landmarks, se esperaban {}; mano descartada",
                        frame,
                        hand_idx,
                        hand.points.len(),
                        NUM_LANDMARKS
                    );
                }
                complete
            })
            .map(|(_, hand)| hand)
            .filter(|hand| hand.score >= options.min_detection_confidence)
            .take(options.max_hands)
            .map(|hand| Hand::new(hand.points.into_values().collect()))
            .collect()
    }

    /// Número de frames de la grabación (último índice + 1)
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }
}

impl LandmarkDetector for RecordedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Detection, DetectorError> {
        if frame.index >= self.frame_count {
            return Err(DetectorError::Unavailable(format!(
                "frame {} fuera de la grabación ({} frames)",
                frame.index, self.frame_count
            )));
        }

        // Frames sin filas en el CSV son frames sin manos
        let hands = self.frames.get(&frame.index).cloned().unwrap_or_default();

        Ok(Detection {
            frame_index: frame.index,
            image: frame.image.clone(),
            hands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_LEN;
    use image::RgbImage;
    use std::io::Write;

    const HEADER: &str = "frame,hand,landmark,x,y,z,score\n";

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// Filas de una mano completa; x = base + landmark / 100
    fn hand_rows(frame: u64, hand: usize, base: f32, score: f32) -> String {
        (0..NUM_LANDMARKS)
            .map(|lm| {
                format!(
                    "{},{},{},{},{},{},{}\n",
                    frame,
                    hand,
                    lm,
                    base + lm as f32 / 100.0,
                    0.5,
                    -(lm as f32) / 100.0,
                    score
                )
            })
            .collect()
    }

    fn frame(index: u64) -> Frame {
        Frame {
            index,
            image: RgbImage::new(4, 4),
        }
    }

    #[test]
    fn test_load_orders_landmarks() {
        // Filas desordenadas dentro de la mano
        let mut rows: Vec<String> = hand_rows(0, 0, 0.1, 1.0).lines().map(str::to_string).collect();
        rows.reverse();
        let content = format!("{}{}\n{}", HEADER, rows.join("\n"), hand_rows(2, 0, 0.3, 1.0));

        let file = write_csv(&content);
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();
        assert_eq!(detector.frame_count(), 3);

        let detection = detector.detect(&frame(0)).unwrap();
        assert_eq!(detection.hands.len(), 1);
        let features = detection.hands[0].to_feature_vector();
        assert_eq!(features.len(), FEATURE_LEN);
        assert_eq!(&features[0..3], &[0.1, 0.5, 0.0]);
        assert!((features[60] - 0.3).abs() < 1e-6);

        // Frame 1 no tiene filas: sin manos
        assert!(detector.detect(&frame(1)).unwrap().hands.is_empty());
    }

    #[test]
    fn test_score_column_optional() {
        let rows: String = hand_rows(0, 0, 0.1, 1.0)
            .lines()
            .map(|line| format!("{}\n", line.rsplit_once(',').unwrap().0))
            .collect();
        let file = write_csv(&format!("frame,hand,landmark,x,y,z\n{}", rows));
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();
        assert_eq!(detector.detect(&frame(0)).unwrap().hands.len(), 1);
    }

    #[test]
    fn test_max_hands_and_confidence() {
        let content = format!(
            "{}{}{}{}{}",
            HEADER,
            hand_rows(0, 0, 0.1, 0.9),
            hand_rows(0, 1, 0.2, 0.3),
            hand_rows(0, 2, 0.3, 0.8),
            hand_rows(0, 3, 0.4, 0.95)
        );
        let file = write_csv(&content);
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();

        let hands = detector.detect(&frame(0)).unwrap().hands;
        assert_eq!(hands.len(), 2);
        assert_eq!(hands[0].landmarks[0].x, 0.1);
        // La mano 1 (score 0.3) se descarta
        assert_eq!(hands[1].landmarks[0].x, 0.3);
    }

    #[test]
    fn test_hand_with_missing_landmark_dropped() {
        // Mano 0 sin el landmark 1; mano 1 completa
        let gapped: String = hand_rows(0, 0, 0.1, 1.0)
            .lines()
            .filter(|line| !line.starts_with("0,0,1,"))
            .map(|line| format!("{}\n", line))
            .collect();
        let content = format!("{}{}{}", HEADER, gapped, hand_rows(0, 1, 0.4, 1.0));

        let file = write_csv(&content);
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();

        let hands = detector.detect(&frame(0)).unwrap().hands;
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].landmarks[0].x, 0.4);
        assert_eq!(hands[0].to_feature_vector().len(), FEATURE_LEN);
    }

    #[test]
    fn test_sparse_landmark_indices_dropped() {
        // Solo landmarks 0 y 2: nunca debe salir un vector corto
        let file = write_csv(
            "frame,hand,landmark,x,y,z\n\
             0,0,0,0.1,0.2,0.3\n\
             0,0,2,0.4,0.5,0.6\n",
        );
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();
        assert!(detector.detect(&frame(0)).unwrap().hands.is_empty());
    }

    #[test]
    fn test_extra_landmark_index_dropped() {
        let content = format!(
            "{}{}0,0,{},0.9,0.9,0.0,1.0\n",
            HEADER,
            hand_rows(0, 0, 0.1, 1.0),
            NUM_LANDMARKS
        );
        let file = write_csv(&content);
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();
        assert!(detector.detect(&frame(0)).unwrap().hands.is_empty());
    }

    #[test]
    fn test_frame_outside_recording() {
        let file = write_csv(&format!("{}{}", HEADER, hand_rows(0, 0, 0.1, 1.0)));
        let mut detector = RecordedDetector::load_csv(file.path(), DetectorOptions::default()).unwrap();
        assert!(matches!(
            detector.detect(&frame(5)),
            Err(DetectorError::Unavailable(_))
        ));
    }

    #[test]
    fn test_empty_recording_rejected() {
        let file = write_csv("frame,hand,landmark,x,y,z\n");
        assert!(RecordedDetector::load_csv(file.path(), DetectorOptions::default()).is_err());
    }
}
