//! Recorte de la mano para el clasificador de imagen.
//!
//! La caja se calcula sobre los landmarks normalizados, se amplía con un
//! margen proporcional, se recorta a los límites de la imagen y se reescala
//! a un cuadrado fijo con valores en [0, 1].

use crate::types::Hand;
use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CropError {
    #[error("Invalid hand bounding box dimensions ({width}x{height})")]
    InvalidGeometry { width: f32, height: f32 },
}

/// Caja alineada a los ejes en coordenadas normalizadas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    /// Caja de los landmarks de una mano. Arranca en min = 1, max = 0, así
    /// que lo que cae fuera del cuadrado unidad queda recortado.
    pub fn from_hand(hand: &Hand) -> Self {
        let mut bbox = Self {
            min_x: 1.0,
            min_y: 1.0,
            max_x: 0.0,
            max_y: 0.0,
        };

        for point in &hand.landmarks {
            bbox.min_x = bbox.min_x.min(point.x);
            bbox.min_y = bbox.min_y.min(point.y);
            bbox.max_x = bbox.max_x.max(point.x);
            bbox.max_y = bbox.max_y.max(point.y);
        }

        bbox
    }
}

/// Rectángulo de recorte en píxeles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Pasa la caja a píxeles, añade `padding_ratio` (la mitad a cada lado) y
/// recorta a [0, img_dim]
pub fn crop_rect(
    bbox: &BoundingBox,
    img_width: u32,
    img_height: u32,
    padding_ratio: f32,
) -> Result<CropRect, CropError> {
    let img_w = img_width as f32;
    let img_h = img_height as f32;

    let width = (bbox.max_x - bbox.min_x) * img_w;
    let height = (bbox.max_y - bbox.min_y) * img_h;

    let x = (bbox.min_x * img_w - width * padding_ratio / 2.0).max(0.0);
    let y = (bbox.min_y * img_h - height * padding_ratio / 2.0).max(0.0);
    let width = (img_w - x).min(width * (1.0 + padding_ratio));
    let height = (img_h - y).min(height * (1.0 + padding_ratio));

    if !(width > 0.0 && height > 0.0) {
        return Err(CropError::InvalidGeometry { width, height });
    }

    Ok(CropRect {
        x,
        y,
        width,
        height,
    })
}

/// Recorta `rect` de la imagen y lo reescala (bilineal) a `size`×`size`
pub fn crop_and_resize(image: &RgbImage, rect: &CropRect, size: u32) -> Result<RgbImage, CropError> {
    let invalid = || CropError::InvalidGeometry {
        width: rect.width,
        height: rect.height,
    };

    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    if x0 >= image.width() || y0 >= image.height() {
        return Err(invalid());
    }

    // Al menos un píxel; nunca más allá del borde
    let w = (rect.width.round() as u32).max(1).min(image.width() - x0);
    let h = (rect.height.round() as u32).max(1).min(image.height() - y0);

    let cropped = imageops::crop_imm(image, x0, y0, w, h).to_image();
    Ok(imageops::resize(&cropped, size, size, FilterType::Triangle))
}

/// Píxeles RGB en orden HWC normalizados a [0, 1]
pub fn normalized_pixels(image: &RgbImage) -> Vec<f32> {
    image.as_raw().iter().map(|&v| v as f32 / 255.0).collect()
}
