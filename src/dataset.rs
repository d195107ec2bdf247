use crate::types::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Nombre fijo del fichero exportado
pub const DATASET_FILE_NAME: &str = "gesture_dataset.json";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset is empty!")]
    Empty,

    #[error("IO error en {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Secuencia etiquetada capturada en modo grabación
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub label: String,
    pub sequence: Vec<FeatureVector>,
}

/// Colección en memoria de muestras, vive lo que vive el proceso
#[derive(Debug, Default)]
pub struct Dataset {
    samples: Vec<LabeledSample>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade una muestra. Las muestras no se modifican después
    pub fn push(&mut self, sample: LabeledSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Número de muestras por etiqueta, ordenado por etiqueta
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Serializa el dataset completo como array JSON de {label, sequence}
    pub fn to_json(&self) -> Result<String, DatasetError> {
        if self.samples.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(serde_json::to_string_pretty(&self.samples)?)
    }

    /// Escribe `gesture_dataset.json` dentro de `dir` y retorna la ruta
    pub fn export(&self, dir: impl AsRef<Path>) -> Result<PathBuf, DatasetError> {
        let json = self.to_json()?;
        let dir = dir.as_ref();

        fs::create_dir_all(dir).map_err(|source| DatasetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(DATASET_FILE_NAME);
        fs::write(&path, json).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Carga un dataset exportado previamente
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let samples: Vec<LabeledSample> = serde_json::from_str(&content)?;
        Ok(Self { samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: &str, rows: usize) -> LabeledSample {
        LabeledSample {
            label: label.to_string(),
            sequence: (0..rows).map(|r| vec![r as f32, 0.5, -1.0]).collect(),
        }
    }

    #[test]
    fn test_empty_export_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::new();

        let err = dataset.export(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
        assert_eq!(err.to_string(), "Dataset is empty!");
        assert!(!dir.path().join(DATASET_FILE_NAME).exists());
    }

    #[test]
    fn test_export_single_sample() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = Dataset::new();
        dataset.push(sample("HELLO", 30));

        let path = dataset.export(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), DATASET_FILE_NAME);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["label"], "HELLO");
        assert_eq!(array[0]["sequence"].as_array().unwrap().len(), 30);
    }

    #[test]
    fn test_load_exported_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = Dataset::new();
        dataset.push(sample("YES", 4));
        dataset.push(sample("", 4));
        let path = dataset.export(dir.path()).unwrap();

        let loaded = Dataset::load(&path).unwrap();
        assert_eq!(loaded.samples(), dataset.samples());
    }

    #[test]
    fn test_label_counts() {
        let mut dataset = Dataset::new();
        dataset.push(sample("NO", 2));
        dataset.push(sample("YES", 2));
        dataset.push(sample("NO", 2));

        let counts = dataset.label_counts();
        assert_eq!(counts.get("NO"), Some(&2));
        assert_eq!(counts.get("YES"), Some(&1));
    }
}
