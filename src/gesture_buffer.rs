use crate::types::{FeatureVector, FRAME_LIMIT};
use std::collections::VecDeque;

/// Ventana acotada de vectores de características
///
/// Se usa con dos políticas:
/// - grabación: se llena hasta `capacity`, se entrega completa y se vacía
/// - predicción: ventana deslizante, descarta el frame más antiguo
pub struct SequenceWindow {
    buffer: VecDeque<FeatureVector>,
    capacity: usize,
}

impl SequenceWindow {
    /// Crea una ventana con la capacidad indicada
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Política de grabación: devuelve la ventana completa al llenarse
    /// y deja el buffer vacío para la siguiente muestra
    pub fn push_record(&mut self, features: FeatureVector) -> Option<Vec<FeatureVector>> {
        self.buffer.push_back(features);

        if self.buffer.len() >= self.capacity {
            return Some(self.buffer.drain(..).collect());
        }

        None
    }

    /// Política de predicción: añade y desliza. Retorna true cuando la
    /// ventana está llena y debe lanzarse una inferencia
    pub fn push_predict(&mut self, features: FeatureVector) -> bool {
        self.buffer.push_back(features);

        // Mantener exactamente `capacity` frames
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }

        self.is_ready()
    }

    /// Verifica si la ventana está completa
    pub fn is_ready(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Copia del contenido actual, del más antiguo al más reciente
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.buffer.iter().cloned().collect()
    }

    /// Obtiene el número de frames acumulados
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Limpia el buffer sin entregar nada
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for SequenceWindow {
    fn default() -> Self {
        Self::new(FRAME_LIMIT)
    }
}
