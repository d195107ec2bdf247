/*
Captura y reconocimiento de gestos de mano - Rust + ONNX

Reproduce una sesión de cámara grabada (landmarks en CSV y, opcionalmente,
los frames en PNG) y permite:
1. Grabar secuencias de landmarks y etiquetarlas desde la terminal
2. Exportar el dataset etiquetado a gesture_dataset.json
3. Predecir el gesto en tiempo real con un modelo ONNX
   (ventana de secuencia o recorte de la mano)

Antes de todo, asegurarse de tener onnxruntime instalado.
wget https://github.com/microsoft/onnxruntime/releases/download/v1.22.0/onnxruntime-linux-x64-1.22.0.tgz
tar -xzf onnxruntime-linux-x64-1.22.0.tgz

Para ejecutar:
set -x LD_LIBRARY_PATH (pwd)/onnxruntime-linux-x64-1.22.0/lib $LD_LIBRARY_PATH
     ./target/release/gestocam --recording recordings/session.csv

Teclas: e (encender), d (apagar), r (grabar/predecir), s (exportar), q (salir)
Con teclado global hace falta acceso a /dev/input:
sg input -c './target/release/gestocam'
*/

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, never, select, unbounded, Receiver};
use std::env;
use std::time::Duration;

use gestocam::config::AppConfig;
use gestocam::controls::{spawn_keyboard_listener, spawn_stdin_reader, Command, StdinPrompt};
use gestocam::detector::{LandmarkDetector, RecordedDetector};
use gestocam::gesture_classifier::GestureClassifier;
use gestocam::labels::LabelTable;
use gestocam::logging;
use gestocam::mode::Mode;
use gestocam::predictor::Strategy;
use gestocam::session::{CommandOutcome, FrameOutcome, Session, Status};
use gestocam::source::{FrameSource, ReplayParams, ReplaySource};
use gestocam::types::Frame;

/// Frames en vuelo entre la cámara y el bucle principal
const FRAME_QUEUE: usize = 100;
const SOURCE_POLL: Duration = Duration::from_millis(200);

fn load_labels(config: &AppConfig) -> LabelTable {
    let Some(path) = config.labels_path() else {
        return LabelTable::builtin_signs();
    };

    match LabelTable::load(&path) {
        Ok(labels) => {
            tracing::info!("🏷️  {} etiquetas cargadas desde {:?}", labels.len(), path);
            labels
        }
        Err(e) => {
            tracing::error!("❌ Error cargando etiquetas {:?}: {}", path, e);
            LabelTable::new(Vec::new())
        }
    }
}

fn print_status(status: &Status) {
    println!("{} | {}", status.mode_text, status.gesture_text);
}

fn print_help(stdin_commands: bool) {
    let origin = if stdin_commands { "escribe la letra + Enter" } else { "teclado global" };
    println!("⌨️  Controles ({}):", origin);
    println!("   e → encender cámara");
    println!("   d → apagar cámara");
    println!("   r → alternar grabación / predicción");
    println!("   s → exportar dataset");
    println!("   q → salir\n");
}

/// Vacía un canal; retorna cuántos mensajes descartó
fn drain<T>(rx: &Receiver<T>) -> usize {
    rx.try_iter().count()
}

fn main() -> Result<()> {
    logging::init();
    let config = AppConfig::from_args(env::args().skip(1))?;

    println!("🎯 Gestocam - landmarks + ONNX\n");
    tracing::info!("🔧 Estrategia: {:?}", config.strategy);

    let mut detector = RecordedDetector::load_csv(&config.recording_path, config.detector.clone())
        .with_context(|| format!("No se pudo cargar la grabación {:?}", config.recording_path))?;

    let mut source = ReplaySource::new(ReplayParams {
        width: config.camera_width,
        height: config.camera_height,
        fps: config.fps,
        frame_count: detector.frame_count(),
        frames_dir: config.frames_dir.clone(),
        looping: config.looping,
    });

    // Un solo lector de stdin: lo comparten el prompt de etiquetas y los comandos
    let (line_tx, line_rx) = unbounded::<String>();
    spawn_stdin_reader(line_tx);
    let prompt = StdinPrompt::new(line_rx.clone());

    let labels = load_labels(&config);
    let model_path = config.model_path();
    tracing::info!("🔧 Inicializando clasificador ONNX ({:?})...", model_path);
    let mut session = match GestureClassifier::load(&model_path, labels) {
        Ok(classifier) => {
            tracing::info!("✅ Clasificador cargado");
            Session::new(&config, Some(classifier), Box::new(prompt))
        }
        Err(e) => {
            let mut session = Session::new(&config, None, Box::new(prompt));
            session.model_failed(&e);
            session
        }
    };

    let (frame_tx, frame_rx) = bounded::<Frame>(FRAME_QUEUE);
    let (cmd_tx, cmd_rx) = unbounded::<Command>();

    let keyboard = if config.stdin_controls {
        false
    } else {
        match spawn_keyboard_listener(cmd_tx.clone()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("⚠️  Teclado global no disponible ({}), usando stdin", e);
                false
            }
        }
    };
    let stdin_commands = !keyboard;
    if config.strategy == Strategy::Crop && !session.model_ready() {
        println!("⚠️  Sin modelo de imagen la cámara queda bloqueada. Pulsa q para salir.\n");
    }
    print_help(stdin_commands);

    let mut lines = line_rx;
    let mut last_status = session.status().clone();
    print_status(&last_status);

    loop {
        let mut command = None;
        let mut stdin_closed = false;

        select! {
            recv(frame_rx) -> msg => {
                let Ok(frame) = msg else { break };

                let detection = match detector.detect(&frame) {
                    Ok(detection) => Some(detection),
                    Err(e) => {
                        tracing::debug!("Frame {} sin detección: {}", frame.index, e);
                        session.detector_unavailable(&e);
                        None
                    }
                };

                let outcome = detection.map(|detection| session.handle_detection(&detection));
                if keyboard && outcome == Some(FrameOutcome::Recorded { flushed: true }) {
                    // Las letras de la etiqueta también llegaron como teclas globales
                    let dropped = drain(&cmd_rx);
                    if dropped > 0 {
                        tracing::debug!("{} pulsaciones descartadas tras el prompt", dropped);
                    }
                }
            }
            recv(cmd_rx) -> msg => {
                command = msg.ok();
            }
            recv(lines) -> msg => match msg {
                Ok(line) if stdin_commands => {
                    command = Command::from_line(&line);
                    if command.is_none() && !line.trim().is_empty() {
                        println!("❓ Comando desconocido: {:?}", line.trim());
                    }
                }
                Ok(_) => {}
                Err(_) => {
                    stdin_closed = true;
                    if stdin_commands {
                        command = Some(Command::Quit);
                    }
                }
            },
            default(SOURCE_POLL) => {
                if session.mode() != Mode::Disabled && !source.is_running() {
                    session.source_lost();
                }
            }
        }

        if stdin_closed {
            lines = never();
        }

        if let Some(command) = command {
            match session.handle_command(command, &mut source, &frame_tx) {
                CommandOutcome::Quit => break,
                CommandOutcome::Rejected(reason) => println!("⚠️  {}", reason),
                CommandOutcome::Applied => {
                    if matches!(command, Command::Enable | Command::Disable) {
                        drain(&frame_rx);
                    }
                }
                CommandOutcome::Ignored => {}
            }
        }

        if session.status() != &last_status {
            last_status = session.status().clone();
            print_status(&last_status);
        }
    }

    if let Err(e) = source.stop() {
        tracing::error!("❌ Error deteniendo la cámara: {}", e);
    }

    let dataset = session.dataset();
    tracing::info!("📊 Muestras grabadas: {}", dataset.len());
    for (label, count) in dataset.label_counts() {
        tracing::info!("   {:<20} {}", format!("{:?}", label), count);
    }

    println!("👋 Hasta luego");
    Ok(())
}
