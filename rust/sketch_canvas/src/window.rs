//! Window and Event Loop Management
//!
//! This module contains the shared windowing logic used by both
//! WASM (lib.rs) and desktop (main.rs) entry points. Pointer events are
//! mapped into canvas pixels and queued on the app; keys either feed a
//! pending text request or act as shortcuts for the control surface.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, KeyEvent, MouseButton, Touch, TouchPhase, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowId};

use crate::export::ExportFormat;
use crate::input::{PointerEvent, PointerEventType};
use crate::renderer::Viewport;
use crate::tool::{ControlChange, Tool, ToolState};
use crate::{App, Renderer};

/// Colors the palette shortcut cycles through
pub const PALETTE: [&str; 8] = [
    "#000000", "#ff0000", "#ff8c00", "#ffd700", "#008000", "#1e90ff", "#8a2be2", "#ffffff",
];

/// Largest stroke width reachable from the keyboard
const MAX_KEY_STROKE_WIDTH: f32 = 100.0;

#[cfg(target_arch = "wasm32")]
thread_local! {
    static WINDOW: RefCell<Option<Arc<Window>>> = const { RefCell::new(None) };
}

/// Ask for a frame after state changed outside the event loop
#[cfg(target_arch = "wasm32")]
pub fn request_redraw() {
    WINDOW.with(|window| {
        if let Some(window) = window.borrow().as_ref() {
            window.request_redraw();
        }
    });
}

/// What a key press asks for, outside of text entry
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    Control(ControlChange),
    Undo,
    Redo,
    Save,
    Clear,
    Reset,
}

/// Map a key press to a shortcut given the current tool state
pub fn shortcut(key: &Key, modifiers: ModifiersState, tools: &ToolState) -> Option<Shortcut> {
    let command = modifiers.control_key() || modifiers.super_key();
    match key {
        Key::Named(NamedKey::Delete) if command => Some(Shortcut::Reset),
        Key::Named(NamedKey::Delete) => Some(Shortcut::Clear),
        Key::Character(c) => {
            let c = c.to_lowercase();
            if command {
                return match c.as_str() {
                    "z" if modifiers.shift_key() => Some(Shortcut::Redo),
                    "z" => Some(Shortcut::Undo),
                    "y" => Some(Shortcut::Redo),
                    "s" => Some(Shortcut::Save),
                    _ => None,
                };
            }
            let change = match c.as_str() {
                "b" => ControlChange::Tool(Tool::Brush),
                "e" => ControlChange::Tool(Tool::Eraser),
                "r" => ControlChange::Tool(Tool::Rectangle),
                "c" => ControlChange::Tool(Tool::Circle),
                "l" => ControlChange::Tool(Tool::Line),
                "t" => ControlChange::Tool(Tool::Text),
                "[" => ControlChange::StrokeWidth((tools.stroke_width() - 1.0).max(1.0)),
                "]" => ControlChange::StrokeWidth((tools.stroke_width() + 1.0).min(MAX_KEY_STROKE_WIDTH)),
                "s" => ControlChange::Shadow(!tools.shadow_enabled()),
                "g" => ControlChange::Gradient(!tools.gradient_enabled()),
                "f" => ControlChange::ExportFormat(match tools.export_format() {
                    ExportFormat::Png => ExportFormat::Jpeg,
                    ExportFormat::Jpeg => ExportFormat::Png,
                }),
                "p" => ControlChange::Color(next_palette_color(&tools.picker_color().to_hex()).to_owned()),
                // 1-9 select 10%-90% opacity, 0 selects fully opaque
                digit => {
                    let value = digit.parse::<u8>().ok().filter(|d| *d <= 9)?;
                    let opacity = if value == 0 { 1.0 } else { f32::from(value) / 10.0 };
                    ControlChange::Opacity(opacity)
                }
            };
            Some(Shortcut::Control(change))
        }
        _ => None,
    }
}

fn next_palette_color(current: &str) -> &'static str {
    let next = PALETTE
        .iter()
        .position(|hex| hex.eq_ignore_ascii_case(current))
        .map_or(0, |i| (i + 1) % PALETTE.len());
    PALETTE[next]
}

/// Wrapper for the application window and state
pub struct AppWrapper {
    window: Option<Arc<Window>>,
    renderer: Rc<RefCell<Option<Renderer>>>,
    app: Rc<RefCell<App>>,
    modifiers: ModifiersState,
    cursor: Option<PhysicalPosition<f64>>,
    #[cfg(not(target_arch = "wasm32"))]
    export_dir: std::path::PathBuf,
}

impl AppWrapper {
    pub fn new(app: Rc<RefCell<App>>) -> Self {
        Self {
            window: None,
            renderer: Rc::new(RefCell::new(None)),
            app,
            modifiers: ModifiersState::empty(),
            cursor: None,
            #[cfg(not(target_arch = "wasm32"))]
            export_dir: std::path::PathBuf::from("."),
        }
    }

    /// Directory Ctrl+S writes exports into
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_export_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn viewport(&self) -> Viewport {
        if let Some(renderer) = self.renderer.borrow().as_ref() {
            return renderer.viewport();
        }
        let app = self.app.borrow();
        let canvas = (app.canvas().width(), app.canvas().height());
        let surface = self
            .window
            .as_ref()
            .map(|window| window.inner_size())
            .map_or(canvas, |size| (size.width, size.height));
        Viewport::fit(canvas, surface)
    }

    /// Queue a pointer event at a window position. Positions outside the
    /// canvas end any press in progress.
    fn pointer(&mut self, event_type: PointerEventType, position: PhysicalPosition<f64>) {
        let point = self.viewport().to_canvas(position.x, position.y);
        let mut app = self.app.borrow_mut();
        let inside = point.x >= 0.0
            && point.y >= 0.0
            && point.x < app.canvas().width() as f32
            && point.y < app.canvas().height() as f32;

        let event_type = match (event_type, inside) {
            (PointerEventType::Down, false) => return,
            (PointerEventType::Move, false) => PointerEventType::Leave,
            (event_type, _) => event_type,
        };
        app.queue_input_event(PointerEvent::new(event_type, point));
        if app.has_pending_input() {
            drop(app);
            self.request_redraw();
        }
    }

    fn touch(&mut self, touch: Touch) {
        self.cursor = Some(touch.location);
        let event_type = match touch.phase {
            TouchPhase::Started => PointerEventType::Down,
            TouchPhase::Moved => PointerEventType::Move,
            TouchPhase::Ended => PointerEventType::Up,
            TouchPhase::Cancelled => PointerEventType::Leave,
        };
        self.pointer(event_type, touch.location);
    }

    fn keyboard(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }

        let awaiting_text = self.app.borrow().gesture().is_awaiting_text();
        if awaiting_text {
            let mut app = self.app.borrow_mut();
            match &event.logical_key {
                Key::Named(NamedKey::Enter) => app.finish_text(),
                Key::Named(NamedKey::Escape) => app.cancel_text(),
                Key::Named(NamedKey::Backspace) => app.backspace_text(),
                _ => {
                    if let Some(text) = event.text.as_deref() {
                        app.type_text(text);
                    }
                }
            }
            if let Some(typed) = app.gesture().typed_text() {
                if let Some(window) = &self.window {
                    window.set_title(&format!("Text: {typed}_"));
                }
            } else if let Some(window) = &self.window {
                window.set_title("Sketch Canvas");
            }
            drop(app);
            self.request_redraw();
            return;
        }

        let action = {
            let app = self.app.borrow();
            shortcut(&event.logical_key, self.modifiers, app.tools())
        };
        let Some(action) = action else {
            return;
        };
        log::debug!("Shortcut: {:?}", action);

        match action {
            Shortcut::Control(change) => {
                if let Err(e) = self.app.borrow_mut().apply_control(change) {
                    log::warn!("Control change rejected: {}", e);
                }
            }
            Shortcut::Undo => self.app.borrow_mut().undo(),
            Shortcut::Redo => self.app.borrow_mut().redo(),
            Shortcut::Clear => self.app.borrow_mut().clear(),
            Shortcut::Reset => self.app.borrow_mut().reset(),
            Shortcut::Save => self.save(),
        }
        self.request_redraw();
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save(&self) {
        let mut sink = crate::export::DirectorySink::new(&self.export_dir);
        if let Err(e) = self.app.borrow().save_file(&mut sink) {
            log::error!("Export failed: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn save(&self) {
        let mut sink = crate::export::DownloadSink;
        if let Err(e) = self.app.borrow().save_file(&mut sink) {
            log::error!("Export failed: {}", e);
        }
    }
}

impl ApplicationHandler for AppWrapper {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let canvas_size = {
            let app = self.app.borrow();
            (app.canvas().width(), app.canvas().height())
        };
        let initial_size = winit::dpi::PhysicalSize::new(canvas_size.0, canvas_size.1);

        let window_attributes = Window::default_attributes()
            .with_title("Sketch Canvas")
            .with_inner_size(initial_size);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created: {:?}", window.inner_size());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;

            // On web the canvas has to be in the DOM before its size sticks
            let appended = window.canvas().and_then(|canvas| {
                let document = web_sys::window()?.document()?;
                let container = document
                    .get_element_by_id("canvas-container")
                    .or_else(|| document.body().map(Into::into))?;
                container.append_child(&canvas).ok()
            });
            if appended.is_none() {
                log::error!("Failed to append canvas to document");
            }
            let _ = window.request_inner_size(initial_size);

            WINDOW.with(|slot| *slot.borrow_mut() = Some(window.clone()));
            self.window = Some(window.clone());

            let renderer_slot = self.renderer.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match Renderer::new(window.clone(), initial_size, canvas_size).await {
                    Ok(renderer) => {
                        *renderer_slot.borrow_mut() = Some(renderer);
                        window.request_redraw();
                    }
                    Err(e) => {
                        log::error!("Renderer initialization failed: {}", e);
                        crate::debug::update_status(&format!("Renderer failed: {e}"));
                    }
                }
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(Renderer::new(window.clone(), initial_size, canvas_size)) {
                Ok(renderer) => *self.renderer.borrow_mut() = Some(renderer),
                Err(e) => {
                    log::error!("Renderer initialization failed: {}", e);
                    event_loop.exit();
                    return;
                }
            }
            self.window = Some(window);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width == 0 || physical_size.height == 0 {
                    log::warn!("Ignoring resize to zero size: {:?}", physical_size);
                    return;
                }
                if let Some(renderer) = self.renderer.borrow_mut().as_mut() {
                    renderer.resize(physical_size);
                }
                self.request_redraw();
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(position);
                self.pointer(PointerEventType::Move, position);
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(position) = self.cursor.take() {
                    self.pointer(PointerEventType::Leave, position);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(position) = self.cursor else {
                    return;
                };
                let event_type = match state {
                    ElementState::Pressed => PointerEventType::Down,
                    ElementState::Released => PointerEventType::Up,
                };
                self.pointer(event_type, position);
            }
            WindowEvent::Touch(touch) => self.touch(touch),
            WindowEvent::KeyboardInput { event, .. } => self.keyboard(event),
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.borrow_mut().as_mut() {
                    // Wait mode: frames come only from events
                    self.app.borrow_mut().render(renderer);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: &str) -> Key {
        Key::Character(c.into())
    }

    fn press(c: &str, tools: &ToolState) -> Option<Shortcut> {
        shortcut(&key(c), ModifiersState::empty(), tools)
    }

    #[test]
    fn test_tool_keys() {
        let tools = ToolState::default();
        assert_eq!(press("r", &tools), Some(Shortcut::Control(ControlChange::Tool(Tool::Rectangle))));
        assert_eq!(press("E", &tools), Some(Shortcut::Control(ControlChange::Tool(Tool::Eraser))));
        assert_eq!(press("q", &tools), None);
    }

    #[test]
    fn test_history_keys_need_modifier() {
        let tools = ToolState::default();
        let ctrl = ModifiersState::CONTROL;
        assert_eq!(shortcut(&key("z"), ctrl, &tools), Some(Shortcut::Undo));
        assert_eq!(shortcut(&key("Z"), ctrl | ModifiersState::SHIFT, &tools), Some(Shortcut::Redo));
        assert_eq!(shortcut(&key("y"), ctrl, &tools), Some(Shortcut::Redo));
        assert_eq!(shortcut(&key("s"), ctrl, &tools), Some(Shortcut::Save));
        // Plain s toggles the shadow instead
        assert_eq!(press("s", &tools), Some(Shortcut::Control(ControlChange::Shadow(true))));

        let delete = Key::Named(NamedKey::Delete);
        assert_eq!(shortcut(&delete, ModifiersState::empty(), &tools), Some(Shortcut::Clear));
        assert_eq!(shortcut(&delete, ctrl, &tools), Some(Shortcut::Reset));
    }

    #[test]
    fn test_width_and_opacity_keys() {
        let tools = ToolState::default();
        assert_eq!(press("]", &tools), Some(Shortcut::Control(ControlChange::StrokeWidth(6.0))));
        assert_eq!(press("[", &tools), Some(Shortcut::Control(ControlChange::StrokeWidth(4.0))));
        assert_eq!(press("5", &tools), Some(Shortcut::Control(ControlChange::Opacity(0.5))));
        assert_eq!(press("0", &tools), Some(Shortcut::Control(ControlChange::Opacity(1.0))));

        let thin = ToolState::new(crate::color::Rgb::BLACK, 1.0, 1.0).unwrap();
        assert_eq!(press("[", &thin), Some(Shortcut::Control(ControlChange::StrokeWidth(1.0))));
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(next_palette_color("#000000"), "#ff0000");
        assert_eq!(next_palette_color("#FFFFFF"), "#000000");
        assert_eq!(next_palette_color("#123456"), "#000000");

        let tools = ToolState::default();
        assert_eq!(press("p", &tools), Some(Shortcut::Control(ControlChange::Color("#ff0000".into()))));
    }

    #[test]
    fn test_format_toggle() {
        let mut tools = ToolState::default();
        assert_eq!(
            press("f", &tools),
            Some(Shortcut::Control(ControlChange::ExportFormat(ExportFormat::Jpeg)))
        );
        tools.apply(ControlChange::ExportFormat(ExportFormat::Jpeg)).unwrap();
        assert_eq!(
            press("f", &tools),
            Some(Shortcut::Control(ControlChange::ExportFormat(ExportFormat::Png)))
        );
    }
}
