//! Estado completo de una sesión de captura.
//!
//! `Session` es el único dueño del modo, las ventanas, el dataset y el
//! texto de estado. Todo se procesa desde un solo hilo: una detección o un
//! comando se ejecuta completo antes del siguiente.

use crate::config::AppConfig;
use crate::controls::{Command, LabelPrompt};
use crate::dataset::{Dataset, DatasetError, LabeledSample};
use crate::detector::DetectorError;
use crate::gesture_buffer::SequenceWindow;
use crate::gesture_classifier::{ClassifierError, GestureClassifier};
use crate::mode::{ControlState, Mode, ModeController};
use crate::predictor::{CropPredictor, PredictOutcome, Predictor, SequencePredictor, Strategy};
use crate::source::FrameSource;
use crate::types::{Detection, Frame, FEATURE_LEN};
use crossbeam_channel::Sender;
use std::path::PathBuf;

/// Texto visible para el usuario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub mode_text: String,
    pub gesture_text: String,
}

/// Resultado de un comando
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied,
    /// Control deshabilitado o sin efecto
    Ignored,
    /// Rechazado con un mensaje para el usuario
    Rejected(String),
    Quit,
}

/// Qué hizo la sesión con una detección
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Cámara apagada o en espera
    Ignored,
    /// Modo grabación; `flushed` indica que se completó una muestra
    Recorded { flushed: bool },
    Predicted(PredictOutcome),
}

pub struct Session {
    controller: ModeController,
    controls: ControlState,
    record_window: SequenceWindow,
    predictor: Predictor,
    classifier: Option<GestureClassifier>,
    dataset: Dataset,
    prompt: Box<dyn LabelPrompt>,
    status: Status,
    /// Último gesto predicho en modo secuencia
    predicted_gesture: String,
    auto_predict: bool,
    export_dir: PathBuf,
}

impl Session {
    pub fn new(
        config: &AppConfig,
        classifier: Option<GestureClassifier>,
        prompt: Box<dyn LabelPrompt>,
    ) -> Self {
        let predictor = match config.strategy {
            Strategy::Sequence => {
                Predictor::Sequence(SequencePredictor::new(config.frame_limit, FEATURE_LEN))
            }
            Strategy::Crop => Predictor::Crop(CropPredictor::new(config.padding_ratio, config.crop_size)),
        };

        let gesture_text = if classifier.is_some() {
            "GESTURE: Waiting for hand...".to_string()
        } else {
            "GESTURE: Model not loaded yet.".to_string()
        };

        Self {
            controller: ModeController::new(),
            controls: ControlState::camera_off(),
            record_window: SequenceWindow::new(config.frame_limit),
            predictor,
            classifier,
            dataset: Dataset::new(),
            prompt,
            status: Status {
                mode_text: Mode::Disabled.status_text().to_string(),
                gesture_text,
            },
            predicted_gesture: String::new(),
            auto_predict: config.auto_predict,
            export_dir: config.export_dir.clone(),
        }
    }

    /// Fallo al cargar el modelo: estado de error y, en la variante de
    /// recorte, la cámara queda bloqueada
    pub fn model_failed(&mut self, error: &ClassifierError) {
        tracing::error!("❌ Model failed to load: {}", error);
        self.classifier = None;
        self.set_mode_text("MODE: ERROR".to_string());
        self.set_gesture_text(format!("GESTURE: Error: {}", error));
        if self.predictor.strategy() == Strategy::Crop {
            self.controls = ControlState::locked();
        }
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn model_ready(&self) -> bool {
        self.classifier.is_some()
    }

    /// Frames en la ventana de grabación en curso
    pub fn record_buffered(&self) -> usize {
        self.record_window.len()
    }

    /// Frames en la ventana de predicción en curso
    pub fn predict_buffered(&self) -> usize {
        self.predictor.buffered()
    }

    /// Ejecuta un comando si su control está habilitado
    pub fn handle_command(
        &mut self,
        command: Command,
        source: &mut dyn FrameSource,
        frames: &Sender<Frame>,
    ) -> CommandOutcome {
        match command {
            Command::Enable if self.controls.enable => self.enable(source, frames),
            Command::Disable if self.controls.disable => self.disable(source),
            Command::ToggleCapture if self.controls.capture => self.toggle_capture(source),
            Command::Export if self.controls.download => self.export(),
            Command::Quit => CommandOutcome::Quit,
            _ => {
                tracing::debug!("Comando {:?} ignorado (control deshabilitado)", command);
                CommandOutcome::Ignored
            }
        }
    }

    fn enable(&mut self, source: &mut dyn FrameSource, frames: &Sender<Frame>) -> CommandOutcome {
        if source.is_running() {
            return CommandOutcome::Ignored;
        }

        if let Err(e) = source.start(frames.clone()) {
            tracing::error!("❌ Failed to start webcam: {}", e);
            self.set_mode_text("MODE: ERROR".to_string());
            self.set_gesture_text(format!("GESTURE: Error: {}", e));
            self.controls = ControlState::camera_off();
            return CommandOutcome::Rejected(e.to_string());
        }

        self.controller.source_started();
        if self.auto_predict {
            self.controller.set_mode(Mode::Predict);
        }
        self.discard_windows();
        self.controls = ControlState::camera_on();
        self.sync_mode_text();
        CommandOutcome::Applied
    }

    fn disable(&mut self, source: &mut dyn FrameSource) -> CommandOutcome {
        if let Err(e) = source.stop() {
            tracing::error!("❌ Failed to stop webcam: {}", e);
            self.set_mode_text("MODE: ERROR".to_string());
            self.set_gesture_text(format!("GESTURE: Error: {}", e));
            return CommandOutcome::Rejected(e.to_string());
        }

        self.controller.source_stopped();
        self.discard_windows();
        self.controls = ControlState::camera_off();
        self.sync_mode_text();
        self.set_gesture_text("GESTURE: Webcam OFF".to_string());
        CommandOutcome::Applied
    }

    fn toggle_capture(&mut self, source: &dyn FrameSource) -> CommandOutcome {
        if !source.is_running() || !self.controller.source_active() {
            return CommandOutcome::Rejected("Turn on the camera first!".to_string());
        }

        if !self.controller.toggle_capture() {
            return CommandOutcome::Ignored;
        }

        // Cambiar de modo nunca arrastra frames entre ventanas
        self.discard_windows();
        self.sync_mode_text();
        CommandOutcome::Applied
    }

    fn export(&mut self) -> CommandOutcome {
        match self.dataset.export(&self.export_dir) {
            Ok(path) => {
                tracing::info!(
                    "💾 Dataset downloaded successfully: {} ({} muestras)",
                    path.display(),
                    self.dataset.len()
                );
                CommandOutcome::Applied
            }
            Err(DatasetError::Empty) => {
                tracing::warn!("⚠️  Dataset is empty!");
                CommandOutcome::Rejected(DatasetError::Empty.to_string())
            }
            Err(e) => {
                tracing::error!("❌ Error exportando dataset: {}", e);
                CommandOutcome::Rejected(e.to_string())
            }
        }
    }

    /// La fuente se detuvo sola (fin de grabación, error del hilo)
    pub fn source_lost(&mut self) {
        if self.controller.source_stopped() {
            tracing::warn!("⚠️  La cámara dejó de enviar frames");
            self.discard_windows();
            self.controls = ControlState::camera_off();
            self.sync_mode_text();
        }
    }

    /// El detector no pudo procesar un frame. Modo y ventanas no cambian
    pub fn detector_unavailable(&mut self, error: &DetectorError) {
        let text = "GESTURE: Hand detector unavailable.".to_string();
        if self.status.gesture_text != text {
            tracing::warn!("⚠️  {}", error);
        }
        self.set_gesture_text(text);
    }

    /// Procesa el resultado del detector para un frame
    pub fn handle_detection(&mut self, detection: &Detection) -> FrameOutcome {
        match self.controller.mode() {
            Mode::Disabled | Mode::Idle => FrameOutcome::Ignored,
            Mode::Record => self.record(detection),
            Mode::Predict => self.predict(detection),
        }
    }

    fn record(&mut self, detection: &Detection) -> FrameOutcome {
        let Some(hand) = detection.first_hand() else {
            return FrameOutcome::Recorded { flushed: false };
        };

        self.predictor.reset();
        let Some(sequence) = self.record_window.push_record(hand.to_feature_vector()) else {
            return FrameOutcome::Recorded { flushed: false };
        };

        // Punto de suspensión: el hilo espera la respuesta del usuario
        match self.prompt.ask_label(sequence.len()) {
            Some(answer) => {
                let label = answer.to_uppercase();
                tracing::info!("✅ Saved sequence for label: {:?}", label);
                self.dataset.push(LabeledSample { label, sequence });
            }
            None => {
                tracing::warn!("⚠️  Etiqueta cancelada, muestra descartada");
            }
        }

        FrameOutcome::Recorded { flushed: true }
    }

    fn predict(&mut self, detection: &Detection) -> FrameOutcome {
        let outcome = self.predictor.observe(detection, self.classifier.as_mut());

        match &outcome {
            PredictOutcome::Predicted(prediction) => {
                let label = prediction.display_label();
                if label != self.predicted_gesture {
                    tracing::info!("🎯 Predicted: {} ({:.1}%)", label, prediction.confidence);
                    self.predicted_gesture = label.to_string();
                }
            }
            PredictOutcome::Failed(reason) => {
                tracing::error!("❌ Prediction failed: {}", reason);
            }
            PredictOutcome::InvalidCrop(e) => {
                tracing::warn!("⚠️  {}. Skipping prediction.", e);
            }
            PredictOutcome::ModelNotReady => {
                tracing::debug!("Modelo no disponible, inferencia omitida");
            }
            PredictOutcome::NoHand | PredictOutcome::Buffering(_) => {}
        }

        if let Some(text) = self.predictor.gesture_text(&outcome, &self.predicted_gesture) {
            self.set_gesture_text(text);
        }

        FrameOutcome::Predicted(outcome)
    }

    fn discard_windows(&mut self) {
        self.record_window.clear();
        self.predictor.reset();
    }

    fn sync_mode_text(&mut self) {
        let text = self.controller.mode().status_text().to_string();
        self.set_mode_text(text);
    }

    fn set_mode_text(&mut self, text: String) {
        if self.status.mode_text != text {
            tracing::info!("{}", text);
            self.status.mode_text = text;
        }
    }

    fn set_gesture_text(&mut self, text: String) {
        if self.status.gesture_text != text {
            tracing::debug!("{}", text);
            self.status.gesture_text = text;
        }
    }
}
