//! Standalone Sketch Canvas Application (Desktop)
//!
//! This binary runs the sketch canvas as a native desktop application.
//! For WASM/web builds, the entry point is in lib.rs (wasm_start).

use std::cell::RefCell;
use std::rc::Rc;

use sketch_canvas::{App, AppWrapper, CanvasConfig, FileStore, KeyValueStore, MemoryStore, TextRenderer};
use winit::event_loop::{ControlFlow, EventLoop};

fn open_store() -> Box<dyn KeyValueStore> {
    match FileStore::in_data_dir() {
        Some(store) => {
            log::info!("Auto-saving to {}", store.dir().display());
            Box::new(store)
        }
        None => {
            log::warn!("No data directory; drawings will not survive a restart");
            Box::new(MemoryStore::new())
        }
    }
}

fn load_font(config: &CanvasConfig) -> Option<TextRenderer> {
    let font = match &config.font_path {
        Some(path) => TextRenderer::from_file(path),
        None => TextRenderer::system_sans_serif(),
    };
    font.map_err(|e| log::warn!("Text tool unavailable: {}", e)).ok()
}

fn main() {
    env_logger::init();
    log::info!("Starting sketch canvas desktop app");

    let config = CanvasConfig::load_or_default();
    let mut app = match App::new(&config, open_store()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Invalid canvas configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(font) = load_font(&config) {
        app.set_font(font);
    }
    app.load_saved();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let export_dir = config.export_dir.clone().unwrap_or_else(|| ".".into());
    let mut app_wrapper = AppWrapper::new(Rc::new(RefCell::new(app))).with_export_dir(export_dir);

    if let Err(e) = event_loop.run_app(&mut app_wrapper) {
        log::error!("Event loop error: {}", e);
    }
}
