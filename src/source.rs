use crate::types::{Frame, CAMERA_HEIGHT, CAMERA_WIDTH};
use crossbeam_channel::{Sender, TrySendError};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No se pudo iniciar la fuente de frames: {0}")]
    Start(String),

    #[error("El hilo de captura terminó con pánico")]
    Join,
}

/// Fuente de frames de cámara
///
/// `start` entrega los frames por el canal desde un hilo propio; el estado
/// de ejecución se consulta con `is_running`, nunca infiriéndolo.
pub trait FrameSource {
    fn start(&mut self, tx: Sender<Frame>) -> Result<(), SourceError>;
    fn stop(&mut self) -> Result<(), SourceError>;
    fn is_running(&self) -> bool;
}

/// Parámetros de la fuente de reproducción
#[derive(Debug, Clone)]
pub struct ReplayParams {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    /// Número de frames de la grabación
    pub frame_count: u64,
    /// Directorio opcional con frame_00000.png, frame_00001.png, ...
    pub frames_dir: Option<PathBuf>,
    /// Volver a empezar al terminar
    pub looping: bool,
}

impl Default for ReplayParams {
    fn default() -> Self {
        Self {
            width: CAMERA_WIDTH,
            height: CAMERA_HEIGHT,
            fps: 30.0,
            frame_count: 0,
            frames_dir: None,
            looping: true,
        }
    }
}

/// Reproduce una sesión grabada a ritmo fijo
pub struct ReplaySource {
    params: ReplayParams,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(params: ReplayParams) -> Self {
        Self {
            params,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Imagen del frame `index`, o un frame negro si no hay fichero
    fn load_image(dir: Option<&Path>, index: u64, width: u32, height: u32) -> RgbImage {
        let Some(dir) = dir else {
            return RgbImage::new(width, height);
        };

        let path = dir.join(format!("frame_{:05}.png", index));
        match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::debug!("Sin imagen para {:?}: {}", path, e);
                RgbImage::new(width, height)
            }
        }
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self, tx: Sender<Frame>) -> Result<(), SourceError> {
        if self.is_running() {
            return Ok(());
        }

        if self.params.frame_count == 0 {
            return Err(SourceError::Start("la grabación no tiene frames".into()));
        }
        let period = Duration::try_from_secs_f32(1.0 / self.params.fps)
            .ok()
            .filter(|period| !period.is_zero())
            .ok_or_else(|| SourceError::Start(format!("fps inválido: {}", self.params.fps)))?;
        if let Some(dir) = &self.params.frames_dir {
            if !dir.is_dir() {
                return Err(SourceError::Start(format!("no existe el directorio {:?}", dir)));
            }
        }

        // Recoger un hilo anterior que terminó solo
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| SourceError::Join)?;
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let params = self.params.clone();

        self.handle = Some(std::thread::spawn(move || {
            let mut index = 0u64;
            while running.load(Ordering::SeqCst) {
                if index >= params.frame_count {
                    if !params.looping {
                        break;
                    }
                    index = 0;
                }

                let image = Self::load_image(
                    params.frames_dir.as_deref(),
                    index,
                    params.width,
                    params.height,
                );

                // Si el consumidor va atrasado el frame se descarta
                match tx.try_send(Frame { index, image }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        tracing::debug!("Frame {} descartado: canal lleno", frame.index);
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }

                index += 1;
                std::thread::sleep(period);
            }
            running.store(false, Ordering::SeqCst);
        }));

        tracing::info!("🎥 Cámara iniciada ({}x{} @ {} fps)", self.params.width, self.params.height, self.params.fps);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SourceError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| SourceError::Join)?;
        }
        tracing::info!("🎥 Cámara detenida");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
