use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Punto 3D de la mano en coordenadas normalizadas de imagen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Una mano detectada: landmarks en el orden que define el detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Aplana la mano a [x0, y0, z0, x1, y1, z1, ...] sin normalizar
    pub fn to_feature_vector(&self) -> FeatureVector {
        let mut features = Vec::with_capacity(self.landmarks.len() * COORDS_PER_LANDMARK);
        for point in &self.landmarks {
            features.push(point.x);
            features.push(point.y);
            features.push(point.z);
        }
        features
    }
}

/// Vector de características de un frame: 3 × número de landmarks
pub type FeatureVector = Vec<f32>;

/// Frame de cámara con su índice de secuencia
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

/// Resultado del detector para un frame: cero o más manos más la imagen fuente
#[derive(Debug, Clone)]
pub struct Detection {
    pub frame_index: u64,
    pub image: RgbImage,
    pub hands: Vec<Hand>,
}

impl Detection {
    /// Solo se procesa la primera mano detectada
    pub fn first_hand(&self) -> Option<&Hand> {
        self.hands.first()
    }
}

/// Constantes del sistema
pub const NUM_LANDMARKS: usize = 21; // modelo de mano de MediaPipe
pub const COORDS_PER_LANDMARK: usize = 3; // x, y, z
pub const FEATURE_LEN: usize = NUM_LANDMARKS * COORDS_PER_LANDMARK; // 63
pub const FRAME_LIMIT: usize = 30; // frames por muestra de gesto
pub const CAMERA_WIDTH: u32 = 640;
pub const CAMERA_HEIGHT: u32 = 480;
pub const CROP_SIZE: u32 = 224; // entrada cuadrada del modelo de imagen
pub const PADDING_RATIO: f32 = 0.2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_order() {
        let hand = Hand::new(vec![
            Landmark::new(0.1, 0.2, 0.3),
            Landmark::new(0.4, 0.5, 0.6),
            Landmark::new(0.7, 0.8, -0.9),
        ]);

        assert_eq!(
            hand.to_feature_vector(),
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, -0.9]
        );
    }

    #[test]
    fn test_feature_vector_length_full_hand() {
        let landmarks = (0..NUM_LANDMARKS)
            .map(|i| Landmark::new(i as f32, i as f32 * 10.0, -(i as f32)))
            .collect();
        let features = Hand::new(landmarks).to_feature_vector();

        assert_eq!(features.len(), FEATURE_LEN);
        // Landmark 20 ocupa las posiciones 60..63
        assert_eq!(&features[60..63], &[20.0, 200.0, -20.0]);
    }
}
