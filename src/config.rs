use crate::detector::DetectorOptions;
use crate::predictor::Strategy;
use crate::types::{CAMERA_HEIGHT, CAMERA_WIDTH, CROP_SIZE, FRAME_LIMIT, PADDING_RATIO};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const USAGE: &str = "Uso: gestocam [--config archivo.json] [--strategy sequence|crop] \
[--model modelo.onnx] [--labels labels.json] [--recording grabacion.csv] \
[--frames-dir dir] [--export-dir dir] [--fps n] [--no-auto-predict] [--stdin-controls]";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No se pudo leer la configuración {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuración JSON inválida: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Argumento inválido '{arg}': {reason}\n{usage}", usage = USAGE)]
    InvalidArg { arg: String, reason: String },

    #[error("Falta valor para {0}\n{usage}", usage = USAGE)]
    MissingValue(String),
}

/// Configuración del daemon
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: Strategy,
    /// Modelo ONNX; por defecto depende de la estrategia
    pub model_path: Option<PathBuf>,
    /// Tabla de etiquetas; el recorte usa la tabla fija si falta
    pub labels_path: Option<PathBuf>,
    /// Grabación de landmarks frame,hand,landmark,x,y,z
    pub recording_path: PathBuf,
    pub frames_dir: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub frame_limit: usize,
    pub camera_width: u32,
    pub camera_height: u32,
    pub fps: f32,
    pub looping: bool,
    pub detector: DetectorOptions,
    pub padding_ratio: f32,
    pub crop_size: u32,
    /// Pasar a predicción al encender la cámara
    pub auto_predict: bool,
    /// Comandos por stdin en vez de teclado global
    pub stdin_controls: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sequence,
            model_path: None,
            labels_path: None,
            recording_path: PathBuf::from("recordings/session.csv"),
            frames_dir: None,
            export_dir: PathBuf::from("."),
            frame_limit: FRAME_LIMIT,
            camera_width: CAMERA_WIDTH,
            camera_height: CAMERA_HEIGHT,
            fps: 30.0,
            looping: true,
            detector: DetectorOptions::default(),
            padding_ratio: PADDING_RATIO,
            crop_size: CROP_SIZE,
            auto_predict: true,
            stdin_controls: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Construye la configuración desde los argumentos (sin el nombre del
    /// programa). `--config` se aplica primero y el resto lo sobrescribe.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();

        let mut config = match args.iter().position(|a| a == "--config") {
            Some(idx) => {
                let path = args
                    .get(idx + 1)
                    .ok_or_else(|| ConfigError::MissingValue("--config".into()))?;
                Self::load(path)?
            }
            None => Self::default(),
        };

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
            };

            match arg.as_str() {
                "--config" => {
                    value("--config")?;
                }
                "--strategy" => {
                    let raw = value("--strategy")?;
                    config.strategy = raw
                        .parse()
                        .map_err(|reason| ConfigError::InvalidArg { arg: raw, reason })?;
                }
                "--model" => config.model_path = Some(PathBuf::from(value("--model")?)),
                "--labels" => config.labels_path = Some(PathBuf::from(value("--labels")?)),
                "--recording" => config.recording_path = PathBuf::from(value("--recording")?),
                "--frames-dir" => config.frames_dir = Some(PathBuf::from(value("--frames-dir")?)),
                "--export-dir" => config.export_dir = PathBuf::from(value("--export-dir")?),
                "--fps" => {
                    let raw = value("--fps")?;
                    config.fps = raw.parse().map_err(|_| ConfigError::InvalidArg {
                        arg: raw.clone(),
                        reason: "fps debe ser un número".into(),
                    })?;
                }
                "--no-auto-predict" => config.auto_predict = false,
                "--stdin-controls" => config.stdin_controls = true,
                other => {
                    return Err(ConfigError::InvalidArg {
                        arg: other.to_string(),
                        reason: "opción desconocida".into(),
                    })
                }
            }
        }

        Ok(config)
    }

    /// Ruta del modelo, con el valor por defecto de cada estrategia
    pub fn model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(|| match self.strategy {
            Strategy::Sequence => PathBuf::from("models/gesture_sequence.onnx"),
            Strategy::Crop => PathBuf::from("models/gesture_crop.onnx"),
        })
    }

    /// Ruta de etiquetas; la secuencia usa labels.json si no se indica
    pub fn labels_path(&self) -> Option<PathBuf> {
        match (&self.labels_path, self.strategy) {
            (Some(path), _) => Some(path.clone()),
            (None, Strategy::Sequence) => Some(PathBuf::from("labels.json")),
            (None, Strategy::Crop) => None,
        }
    }
}
