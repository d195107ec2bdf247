use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, Sender};
use evdev::{Device, InputEventKind, Key};
use std::fs;
use std::io::BufRead;
use std::time::Duration;

/// Comandos de usuario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Encender la cámara
    Enable,
    /// Apagar la cámara
    Disable,
    /// Alternar grabación / predicción
    ToggleCapture,
    /// Exportar el dataset
    Export,
    Quit,
}

impl Command {
    /// Atajo de una tecla: e, d, r, s, q
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'e' => Some(Command::Enable),
            'd' => Some(Command::Disable),
            'r' => Some(Command::ToggleCapture),
            's' => Some(Command::Export),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }

    /// Una línea de terminal con una sola tecla
    pub fn from_line(line: &str) -> Option<Self> {
        let mut chars = line.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(key), None) => Self::from_key(key),
            _ => None,
        }
    }

    fn from_evdev(key: Key) -> Option<Self> {
        match key {
            Key::KEY_E => Some(Command::Enable),
            Key::KEY_D => Some(Command::Disable),
            Key::KEY_R => Some(Command::ToggleCapture),
            Key::KEY_S => Some(Command::Export),
            Key::KEY_Q => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Busca un teclado en /dev/input
fn find_keyboard() -> Result<Device> {
    for entry in fs::read_dir("/dev/input")?.flatten() {
        let path = entry.path();
        let is_event = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if !is_event {
            continue;
        }

        if let Ok(device) = Device::open(&path) {
            let is_keyboard = device
                .name()
                .map(|name| {
                    let name = name.to_lowercase();
                    name.contains("keyboard") || name.contains("at translated")
                })
                .unwrap_or(false);

            if is_keyboard {
                tracing::info!(
                    "⌨️  Teclado encontrado: {} ({})",
                    device.name().unwrap_or("?"),
                    path.display()
                );
                return Ok(device);
            }
        }
    }

    Err(anyhow!("No se encontró ningún dispositivo de teclado en /dev/input"))
}

/// Lanza un hilo que traduce teclas globales a comandos
pub fn spawn_keyboard_listener(tx: Sender<Command>) -> Result<()> {
    let mut device = find_keyboard()?;

    std::thread::spawn(move || loop {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("❌ Error leyendo teclado: {}", e);
                return;
            }
        };

        for ev in events {
            if let InputEventKind::Key(key) = ev.kind() {
                // Solo pulsaciones, no repeticiones ni liberaciones
                if ev.value() != 1 {
                    continue;
                }
                if let Some(command) = Command::from_evdev(key) {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
            }
        }

        std::thread::sleep(Duration::from_millis(10));
    });

    Ok(())
}

/// Lanza un hilo que reenvía las líneas de stdin
pub fn spawn_stdin_reader(tx: Sender<String>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Error leyendo stdin: {}", e);
                    break;
                }
            }
        }
    });
}

/// Pide una etiqueta al usuario al completar una muestra
///
/// Bloquea el procesamiento de frames hasta obtener respuesta. None
/// significa que el usuario canceló.
pub trait LabelPrompt {
    fn ask_label(&mut self, frames: usize) -> Option<String>;
}

/// Prompt sobre las líneas de stdin
pub struct StdinPrompt {
    lines: Receiver<String>,
}

impl StdinPrompt {
    pub fn new(lines: Receiver<String>) -> Self {
        Self { lines }
    }
}

impl LabelPrompt for StdinPrompt {
    fn ask_label(&mut self, frames: usize) -> Option<String> {
        println!("✍️  Enter a label for this gesture ({} frames):", frames);
        // stdin cerrado equivale a cancelar
        self.lines.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_key_shortcuts() {
        assert_eq!(Command::from_key('e'), Some(Command::Enable));
        assert_eq!(Command::from_key('D'), Some(Command::Disable));
        assert_eq!(Command::from_key('r'), Some(Command::ToggleCapture));
        assert_eq!(Command::from_key('s'), Some(Command::Export));
        assert_eq!(Command::from_key('x'), None);
    }

    #[test]
    fn test_from_line() {
        assert_eq!(Command::from_line(" q \n"), Some(Command::Quit));
        assert_eq!(Command::from_line("enable"), None);
        assert_eq!(Command::from_line(""), None);
    }

    #[test]
    fn test_stdin_prompt_reads_next_line() {
        let (tx, rx) = unbounded();
        let mut prompt = StdinPrompt::new(rx);
        tx.send("wave".to_string()).unwrap();
        assert_eq!(prompt.ask_label(30).as_deref(), Some("wave"));

        drop(tx);
        assert_eq!(prompt.ask_label(30), None);
    }
}
