use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Label table is empty")]
    Empty,
}

/// Formatos aceptados para el fichero de etiquetas
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelsJson {
    /// ["Hello", "Yes", ...]
    List(Vec<String>),
    /// {"index_to_class": {"0": "Hello", ...}}
    Indexed {
        index_to_class: HashMap<String, String>,
    },
}

/// Tabla índice → nombre de clase, alineada con la salida del modelo
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Etiquetas fijas del clasificador de imagen
    pub fn builtin_signs() -> Self {
        Self::new(
            ["Hello", "Yes", "No", "Thank You", "I Love You", "Other/None"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LabelError> {
        let labels = match serde_json::from_str::<LabelsJson>(content)? {
            LabelsJson::List(labels) => labels,
            LabelsJson::Indexed { index_to_class } => {
                // Convertir HashMap a Vec ordenado por índice
                let mut pairs: Vec<(usize, String)> = index_to_class
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|idx| (idx, v)))
                    .collect();

                pairs.sort_by_key(|(idx, _)| *idx);
                pairs.into_iter().map(|(_, name)| name).collect()
            }
        };

        if labels.is_empty() {
            return Err(LabelError::Empty);
        }

        Ok(Self { labels })
    }

    /// Nombre de la clase `index`. Fuera de rango retorna None, nunca falla
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
