//! Infrastructure layer for Orbit.
//!
//! Concrete implementations of the ports defined in `orbit-core`:
//! - `event_bus`: in-process [`EventChannels`](orbit_core::event::EventChannels)
//! - `process_backend` / `http_backend`: [`Backend`](orbit_core::backend::Backend) transports
//! - `config_service` / `paths`: config file loading and directory layout

pub mod config_service;
pub mod event_bus;
pub mod http_backend;
pub mod paths;
pub mod process_backend;

use std::sync::Arc;
use std::time::Duration;

use orbit_core::backend::Backend;
use orbit_core::config::{BackendConfig, BackendKind};
use orbit_core::error::Result;

pub use config_service::ConfigService;
pub use event_bus::LocalEventBus;
pub use http_backend::HttpBackend;
pub use paths::OrbitPaths;
pub use process_backend::ProcessBackend;

/// Builds the backend selected by `[backend] kind`, publishing on `bus`.
pub fn build_backend(config: &BackendConfig, bus: Arc<LocalEventBus>) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config.kind {
        BackendKind::Process => Arc::new(ProcessBackend::new(
            config.program.clone(),
            config.args.clone(),
            bus,
        )),
        BackendKind::Http if config.timeout_secs > 0 => Arc::new(HttpBackend::with_connect_timeout(
            &config.url,
            bus,
            Duration::from_secs(config.timeout_secs),
        )?),
        BackendKind::Http => Arc::new(HttpBackend::new(&config.url, bus)),
    };
    tracing::info!("[Infrastructure] Using {:?} backend", config.kind);
    Ok(backend)
}
