//! Inicialización de logs con `tracing`.
//!
//! Nivel por defecto `info`; `RUST_LOG` lo sobrescribe
//! (por ejemplo `RUST_LOG=gestocam=debug`).

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: OnceLock<()> = OnceLock::new();

/// Instala el subscriber global. Llamadas posteriores no hacen nada
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init();

        if let Err(e) = installed {
            eprintln!("No se pudo instalar el subscriber de logs: {}", e);
        }
    });
}
