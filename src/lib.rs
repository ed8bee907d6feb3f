pub mod app;
pub mod capture;
pub mod error;
pub mod geometry;
pub mod hotkeys;
pub mod logging;
pub mod notification;
pub mod selector;
pub mod settings;
pub mod storage;
pub mod ui;

pub use error::{AppError, AppResult};

/// Entrypoint used by the binary and higher-level integrations.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting snapstamp");

    let app = app::App::new();
    app.start()?;

    tracing::info!("shutdown complete");
    Ok(())
}
