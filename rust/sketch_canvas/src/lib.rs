//! Sketch Canvas Library
//!
//! A raster drawing canvas with brush, eraser, shape and text tools,
//! undo/redo history, auto-save and PNG/JPEG export. It runs:
//! - Standalone in a browser (via WASM), with the page owning the controls
//! - As a native desktop app (see main.rs), driven by keyboard shortcuts
//!
//! Drawing happens on a CPU canvas owned by [`App`]; the wgpu renderer only
//! presents it, so everything but the window layer runs in plain tests.

mod app;
mod canvas;
mod color;
mod config;
pub mod debug;
mod error;
mod export;
mod gesture;
mod history;
mod input;
mod mask;
mod paint;
mod renderer;
mod shape;
mod storage;
mod text;
mod tool;
mod window;

pub use app::App;
pub use canvas::{decode_image, Canvas, Snapshot};
pub use color::Rgb;
pub use config::CanvasConfig;
pub use error::{CanvasError, ConfigError, ControlError, ExportError, FontError, RenderError, StorageError};
#[cfg(target_arch = "wasm32")]
pub use export::DownloadSink;
pub use export::{DirectorySink, ExportFormat, FileSink};
pub use gesture::Gesture;
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use input::{InputQueue, PointerEvent, PointerEventType, TextInbox};
pub use mask::{Mask, Rect};
pub use renderer::{Renderer, Viewport};
pub use shape::{Point, Shape};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use text::TextRenderer;
pub use tool::{ControlChange, Style, Tool, ToolState};
pub use window::{AppWrapper, Shortcut};

// Re-export for WASM builds
#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;

    use crate::{
        window, App, AppWrapper, CanvasConfig, ControlChange, DownloadSink, ExportFormat, KeyValueStore,
        LocalStorageStore, MemoryStore, TextInbox, TextRenderer, Tool,
    };

    thread_local! {
        static APP: RefCell<Option<Rc<RefCell<App>>>> = const { RefCell::new(None) };
        static TEXT_INBOX: RefCell<Option<TextInbox>> = const { RefCell::new(None) };
    }

    /// Run `f` on the shared app and schedule a frame. Fails instead of
    /// panicking when called re-entrantly from one of the page hooks.
    fn with_app<T>(f: impl FnOnce(&mut App) -> T) -> Result<T, JsError> {
        let app = APP
            .with(|slot| slot.borrow().clone())
            .ok_or_else(|| JsError::new("canvas not started"))?;
        let result = {
            let mut app = app
                .try_borrow_mut()
                .map_err(|_| JsError::new("canvas busy, retry from a fresh task"))?;
            f(&mut app)
        };
        window::request_redraw();
        Ok(result)
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        match LocalStorageStore::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{}; drawings will not survive a reload", e);
                Box::new(MemoryStore::new())
            }
        }
    }

    /// WASM entry point - called when the module is loaded
    #[wasm_bindgen(start)]
    pub fn wasm_start() {
        console_error_panic_hook::set_once();
        // Logs go to the browser console
        let _ = console_log::init_with_level(log::Level::Debug);
        log::info!("Sketch canvas WASM module started");

        let mut app = match App::new(&CanvasConfig::default(), open_store()) {
            Ok(app) => app,
            Err(e) => {
                log::error!("Invalid canvas configuration: {}", e);
                return;
            }
        };
        app.load_saved();
        let inbox = app.text_inbox();
        TEXT_INBOX.with(|slot| *slot.borrow_mut() = Some(inbox));
        let app = Rc::new(RefCell::new(app));
        APP.with(|slot| *slot.borrow_mut() = Some(app.clone()));

        use winit::event_loop::{ControlFlow, EventLoop};
        use winit::platform::web::EventLoopExtWebSys;

        let event_loop = match EventLoop::new() {
            Ok(event_loop) => event_loop,
            Err(e) => {
                log::error!("Failed to create event loop: {}", e);
                return;
            }
        };
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.spawn_app(AppWrapper::new(app));
    }

    #[wasm_bindgen]
    pub fn set_tool(name: &str) -> Result<(), JsError> {
        let tool: Tool = name.parse()?;
        with_app(|app| app.set_active_tool(tool))
    }

    #[wasm_bindgen]
    pub fn set_color(hex: &str) -> Result<(), JsError> {
        Ok(with_app(|app| app.apply_control(ControlChange::Color(hex.to_owned())))??)
    }

    #[wasm_bindgen]
    pub fn set_stroke_width(width: f32) -> Result<(), JsError> {
        Ok(with_app(|app| app.apply_control(ControlChange::StrokeWidth(width)))??)
    }

    #[wasm_bindgen]
    pub fn set_opacity(opacity: f32) -> Result<(), JsError> {
        Ok(with_app(|app| app.apply_control(ControlChange::Opacity(opacity)))??)
    }

    #[wasm_bindgen]
    pub fn set_shadow(enabled: bool) -> Result<(), JsError> {
        Ok(with_app(|app| app.apply_control(ControlChange::Shadow(enabled)))??)
    }

    #[wasm_bindgen]
    pub fn set_gradient(enabled: bool) -> Result<(), JsError> {
        Ok(with_app(|app| app.apply_control(ControlChange::Gradient(enabled)))??)
    }

    /// Accepts `png`, `jpeg`, `jpg` or a MIME type
    #[wasm_bindgen]
    pub fn set_export_format(format: &str) -> Result<(), JsError> {
        let format: ExportFormat = format.parse()?;
        Ok(with_app(|app| app.apply_control(ControlChange::ExportFormat(format)))??)
    }

    #[wasm_bindgen]
    pub fn undo() -> Result<(), JsError> {
        with_app(App::undo)
    }

    #[wasm_bindgen]
    pub fn redo() -> Result<(), JsError> {
        with_app(App::redo)
    }

    #[wasm_bindgen]
    pub fn clear() -> Result<(), JsError> {
        with_app(App::clear)
    }

    #[wasm_bindgen]
    pub fn reset() -> Result<(), JsError> {
        with_app(App::reset)
    }

    /// Download the canvas in the selected export format
    #[wasm_bindgen]
    pub fn save_file() -> Result<(), JsError> {
        Ok(with_app(|app| app.save_file(&mut DownloadSink))??)
    }

    /// Answer a `requestText` call; `undefined` or empty text cancels.
    /// Safe to call from inside `requestText` itself: the answer is applied
    /// on the next frame.
    #[wasm_bindgen]
    pub fn submit_text(text: Option<String>) -> Result<(), JsError> {
        let inbox = TEXT_INBOX
            .with(|slot| slot.borrow().clone())
            .ok_or_else(|| JsError::new("canvas not started"))?;
        inbox.post(text);
        window::request_redraw();
        Ok(())
    }

    /// Load the face used by the text tool from font file bytes
    #[wasm_bindgen]
    pub fn set_font(bytes: Vec<u8>) -> Result<(), JsError> {
        let font = TextRenderer::from_bytes(bytes, 0)?;
        with_app(|app| app.set_font(font))
    }
}
