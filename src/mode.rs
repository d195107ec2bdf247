use std::fmt;

/// Modo de operación del daemon. Solo uno activo a la vez
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Cámara apagada
    Disabled,
    /// Cámara encendida sin procesar detecciones
    Idle,
    /// Acumulando secuencias etiquetadas
    Record,
    /// Clasificando en tiempo real
    Predict,
}

impl Mode {
    /// Texto de estado mostrado al usuario
    pub fn status_text(&self) -> &'static str {
        match self {
            Mode::Disabled => "MODE: NONE",
            Mode::Idle => "MODE: IDLE",
            Mode::Record => "MODE: RECORD",
            Mode::Predict => "MODE: PREDICT",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Máquina de estados de modo
///
/// Las transiciones solo ocurren por acción explícita del usuario. Una
/// petición cuya precondición no se cumple se ignora sin error.
#[derive(Debug)]
pub struct ModeController {
    mode: Mode,
    source_active: bool,
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Disabled,
            source_active: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_active(&self) -> bool {
        self.source_active
    }

    /// La fuente de frames arrancó: Disabled → Idle
    pub fn source_started(&mut self) -> bool {
        self.source_active = true;
        if self.mode == Mode::Disabled {
            self.mode = Mode::Idle;
            return true;
        }
        false
    }

    /// La fuente de frames se detuvo: cualquier modo → Disabled
    pub fn source_stopped(&mut self) -> bool {
        self.source_active = false;
        let changed = self.mode != Mode::Disabled;
        self.mode = Mode::Disabled;
        changed
    }

    /// Intenta cambiar a `requested`. Retorna true si el modo cambió
    pub fn set_mode(&mut self, requested: Mode) -> bool {
        if requested == self.mode {
            return false;
        }

        let allowed = match requested {
            Mode::Record | Mode::Predict | Mode::Idle => self.source_active,
            Mode::Disabled => !self.source_active,
        };

        if !allowed {
            return false;
        }

        self.mode = requested;
        true
    }

    /// Alterna grabación/predicción: Idle → Record, Record → Predict,
    /// Predict → Record
    pub fn toggle_capture(&mut self) -> bool {
        let next = match self.mode {
            Mode::Disabled => return false,
            Mode::Idle | Mode::Predict => Mode::Record,
            Mode::Record => Mode::Predict,
        };
        self.set_mode(next)
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

/// Estado habilitado/deshabilitado de cada control de usuario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub enable: bool,
    pub disable: bool,
    pub capture: bool,
    pub download: bool,
}

impl ControlState {
    /// Estado inicial y tras apagar la cámara
    pub fn camera_off() -> Self {
        Self {
            enable: true,
            disable: false,
            capture: false,
            download: false,
        }
    }

    pub fn camera_on() -> Self {
        Self {
            enable: false,
            disable: true,
            capture: true,
            download: true,
        }
    }

    /// Sin modelo de imagen no se permite encender la cámara
    pub fn locked() -> Self {
        Self {
            enable: false,
            disable: false,
            capture: false,
            download: false,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::camera_off()
    }
}
