//! Application State and Logic
//!
//! `App` is the drawing controller. It owns the tool settings, turns pointer
//! gestures into canvas draw calls, keeps the undo/redo history and mirrors
//! every change into the key-value store. It knows nothing about windows or
//! GPUs, so the same state machine runs natively, in the browser and in
//! tests.

use crate::canvas::{decode_image, Canvas};
use crate::config::CanvasConfig;
use crate::debug;
use crate::error::{ConfigError, ControlError, ExportError};
use crate::export::{ExportFormat, FileSink};
use crate::gesture::Gesture;
use crate::history::History;
use crate::input::{InputQueue, PointerEvent, PointerEventType, TextInbox};
use crate::renderer::Renderer;
use crate::shape::{Point, Shape};
use crate::storage::KeyValueStore;
use crate::text::TextRenderer;
use crate::tool::{ControlChange, Tool, ToolState};

/// Main application state
pub struct App {
    canvas: Canvas,
    tools: ToolState,
    gesture: Gesture,
    history: History,
    store: Box<dyn KeyValueStore>,
    /// Face used by the text tool, if one could be loaded
    font: Option<TextRenderer>,
    input_queue: InputQueue,
    /// Answers to text requests, collected once per frame
    text_inbox: TextInbox,
    storage_key: String,
    jpeg_quality: u8,
    /// Canvas changed since the renderer last saw it
    dirty: bool,
}

impl App {
    /// Create an app with a blank canvas and empty history. Call
    /// [`App::load_saved`] afterwards to restore the last session.
    pub fn new(config: &CanvasConfig, store: Box<dyn KeyValueStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            canvas: Canvas::new(config.width, config.height, config.background_color()?),
            tools: config.initial_tool_state()?,
            gesture: Gesture::Idle,
            history: History::new(config.history_limit),
            store,
            font: None,
            input_queue: InputQueue::new(),
            text_inbox: TextInbox::new(),
            storage_key: config.storage_key.clone(),
            jpeg_quality: config.jpeg_quality,
            dirty: true,
        })
    }

    pub fn set_font(&mut self, font: TextRenderer) {
        self.font = Some(font);
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Whether the canvas changed since the last call, clearing the flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Render the application (called each frame)
    pub fn render(&mut self, renderer: &mut Renderer) {
        self.process_input_events();
        if self.take_dirty() {
            renderer.upload_canvas(self.canvas.pixels());
        }
        renderer.render();
    }

    // ---- Controls ----

    /// The single path through which control-surface changes reach the
    /// tool state
    pub fn apply_control(&mut self, change: ControlChange) -> Result<(), ControlError> {
        let tool_change = match change {
            ControlChange::Tool(tool) => Some(tool),
            _ => None,
        };
        self.tools.apply(change)?;

        if let Some(tool) = tool_change {
            if self.gesture.is_awaiting_text() && tool != Tool::Text {
                self.submit_text(None);
            }
            log::info!(
                "Active tool: {} (stroke color {})",
                tool,
                self.tools.stroke_color(self.canvas.background())
            );
            debug::update_active_tool(tool.name());
        }
        Ok(())
    }

    pub fn set_active_tool(&mut self, tool: Tool) {
        // Every tool is valid, so this cannot be rejected
        let _ = self.apply_control(ControlChange::Tool(tool));
    }

    // ---- Pointer input ----

    /// Queue an input event for processing on the next frame
    pub fn queue_input_event(&mut self, event: PointerEvent) {
        self.input_queue.push_event(event);
    }

    /// Check if there are pending input events or a text answer
    pub fn has_pending_input(&self) -> bool {
        self.input_queue.has_events() || self.text_inbox.has_answer()
    }

    /// Handle through which a page answers text requests; see
    /// [`debug::request_text`]
    pub fn text_inbox(&self) -> TextInbox {
        self.text_inbox.clone()
    }

    /// Apply all queued events in arrival order, then any text answer
    pub fn process_input_events(&mut self) {
        let events: Vec<PointerEvent> = self.input_queue.drain_events().collect();
        for event in events {
            self.handle_pointer_event(event);
        }
        if let Some(answer) = self.text_inbox.take() {
            self.submit_text(answer);
        }
    }

    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event.event_type {
            PointerEventType::Down => self.pointer_down(event.position),
            PointerEventType::Move => self.pointer_move(event.position),
            PointerEventType::Up => self.pointer_up(event.position),
            PointerEventType::Leave => self.pointer_leave(event.position),
        }
    }

    pub fn pointer_down(&mut self, at: Point) {
        if self.gesture.is_awaiting_text() {
            log::debug!("Ignoring pointer down while waiting for text");
            return;
        }
        if self.gesture.is_active() {
            // A release got lost somewhere; finish the old gesture first
            self.pointer_up(at);
        }

        let tool = self.tools.active_tool();
        self.gesture = match tool {
            Tool::Brush | Tool::Eraser => Gesture::Freehand { last: at },
            Tool::Rectangle | Tool::Circle | Tool::Line => Gesture::Shape { tool, anchor: at },
            Tool::Text => {
                debug::request_text(at.x, at.y);
                Gesture::AwaitingText {
                    at,
                    typed: String::new(),
                }
            }
        };
        log::debug!("Gesture started: {:?}", self.gesture);
    }

    pub fn pointer_move(&mut self, at: Point) {
        if let Gesture::Freehand { last } = &mut self.gesture {
            let style = self.tools.style(self.canvas.background());
            self.canvas.stroke_segment(*last, at, &style);
            *last = at;
            self.dirty = true;
        }
    }

    pub fn pointer_up(&mut self, at: Point) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Freehand { .. } => self.commit_snapshot(),
            Gesture::Shape { tool, anchor } => {
                if let Some(shape) = Shape::from_drag(tool, anchor, at) {
                    let style = self.tools.style(self.canvas.background());
                    self.canvas.stroke_shape(&shape, &style);
                    self.dirty = true;
                    log::debug!("Committed {:?}", shape);
                }
                self.commit_snapshot();
            }
            waiting @ Gesture::AwaitingText { .. } => self.gesture = waiting,
            Gesture::Idle => {}
        }
    }

    /// Pointer left the canvas. A freehand stroke is committed as it stands;
    /// a shape drag is dropped without drawing anything.
    pub fn pointer_leave(&mut self, _at: Point) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Freehand { .. } => self.commit_snapshot(),
            Gesture::Shape { tool, .. } => log::debug!("{} drag abandoned on leave", tool),
            waiting @ Gesture::AwaitingText { .. } => self.gesture = waiting,
            Gesture::Idle => {}
        }
    }

    // ---- Text entry ----

    /// Answer a pending text request. `None` or empty text cancels.
    ///
    /// Text is filled at twice the stroke width with the stroke color and
    /// opacity, its baseline starting where the text tool was clicked.
    pub fn submit_text(&mut self, text: Option<String>) {
        let Gesture::AwaitingText { at, .. } = self.gesture else {
            return;
        };
        self.gesture = Gesture::Idle;

        let Some(text) = text.filter(|t| !t.is_empty()) else {
            log::debug!("Text entry cancelled");
            return;
        };

        let style = self.tools.style(self.canvas.background());
        let size = style.line_width * 2.0;
        match self.font.as_mut() {
            Some(font) => {
                self.canvas.fill_text(&text, at, size, &style, font);
                self.dirty = true;
            }
            None => log::warn!("No font loaded, text {:?} not drawn", text),
        }
        self.commit_snapshot();
    }

    /// Append typed characters to a pending text request
    pub fn type_text(&mut self, chars: &str) {
        if let Gesture::AwaitingText { typed, .. } = &mut self.gesture {
            typed.push_str(chars);
        }
    }

    pub fn backspace_text(&mut self) {
        if let Gesture::AwaitingText { typed, .. } = &mut self.gesture {
            typed.pop();
        }
    }

    /// Submit whatever has been typed so far
    pub fn finish_text(&mut self) {
        let typed = match &mut self.gesture {
            Gesture::AwaitingText { typed, .. } => std::mem::take(typed),
            _ => return,
        };
        self.submit_text(Some(typed));
    }

    pub fn cancel_text(&mut self) {
        self.submit_text(None);
    }

    // ---- History ----

    /// Record the current canvas as a new undo step and auto-save it
    pub fn commit_snapshot(&mut self) {
        self.commit(true);
    }

    fn commit(&mut self, persist: bool) {
        match self.canvas.snapshot() {
            Ok(snapshot) => {
                self.history.commit(snapshot);
                log::debug!(
                    "Snapshot committed (undo: {}, redo: {}, {} bytes held)",
                    self.history.undo_len(),
                    self.history.redo_len(),
                    self.history.byte_size()
                );
            }
            Err(e) => log::warn!("Skipping history entry: {}", e),
        }
        self.history_changed();
        if persist {
            self.auto_save();
        }
    }

    pub fn undo(&mut self) {
        self.abandon_gesture();
        let Some(snapshot) = self.history.undo() else {
            log::debug!("Nothing to undo");
            return;
        };
        self.canvas.restore(snapshot);
        self.dirty = true;
        self.history_changed();
        self.auto_save();
    }

    pub fn redo(&mut self) {
        self.abandon_gesture();
        let Some(snapshot) = self.history.redo() else {
            log::debug!("Nothing to redo");
            return;
        };
        self.canvas.restore(snapshot);
        self.dirty = true;
        self.history_changed();
        self.auto_save();
    }

    /// Blank the canvas as an undoable step
    pub fn clear(&mut self) {
        self.abandon_gesture();
        self.canvas.clear();
        self.dirty = true;
        self.commit_snapshot();
    }

    /// Blank the canvas, forget all history and the saved image, and start
    /// over from a fresh baseline
    pub fn reset(&mut self) {
        self.abandon_gesture();
        self.canvas.clear();
        self.dirty = true;
        self.history.reset();
        self.commit(false);
        if let Err(e) = self.store.delete(&self.storage_key) {
            log::warn!("Could not delete saved drawing: {}", e);
        }
        log::info!("Canvas reset");
    }

    fn abandon_gesture(&mut self) {
        if self.gesture.is_active() {
            log::debug!("Abandoning {:?}", self.gesture);
            self.gesture = Gesture::Idle;
        }
    }

    fn history_changed(&self) {
        debug::update_history(self.history.can_undo(), self.history.can_redo());
    }

    // ---- Persistence ----

    /// Overwrite the saved image with the current canvas
    pub fn auto_save(&mut self) {
        let bytes = match self.canvas.encode(ExportFormat::Png, self.jpeg_quality) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Auto-save skipped: {}", e);
                return;
            }
        };
        match self.store.set(&self.storage_key, &bytes) {
            Ok(()) => log::debug!("Auto-saved {} bytes under {:?}", bytes.len(), self.storage_key),
            Err(e) => log::warn!("Auto-save failed: {}", e),
        }
    }

    /// Restore the last auto-saved drawing, if any, and make it the undo
    /// baseline. Without one, the blank canvas becomes the baseline.
    pub fn load_saved(&mut self) {
        let saved = match self.store.get(&self.storage_key) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Could not read saved drawing: {}", e);
                None
            }
        };
        let image = saved.and_then(|bytes| match decode_image(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Ignoring unreadable saved drawing: {}", e);
                None
            }
        });

        match image {
            Some(image) => {
                self.canvas.clear();
                self.canvas.draw_image_scaled(&image);
                self.history.reset();
                log::info!("Restored saved drawing ({}x{})", image.width(), image.height());
            }
            None => log::info!("No saved drawing, starting blank"),
        }
        self.dirty = true;
        self.commit_snapshot();
    }

    // ---- Export ----

    /// Encode the canvas in the selected export format and hand it to `sink`
    pub fn save_file(&self, sink: &mut dyn FileSink) -> Result<(), ExportError> {
        let format = self.tools.export_format();
        let bytes = self.canvas.encode(format, self.jpeg_quality)?;
        sink.deliver(&format.file_name(), format.mime_type(), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::storage::MemoryStore;
    use image::{Rgba, RgbaImage};

    const KEY: &str = "savedDrawing";

    fn config() -> CanvasConfig {
        CanvasConfig {
            width: 120,
            height: 80,
            ..CanvasConfig::default()
        }
    }

    fn fresh_app() -> App {
        let mut app = App::new(&config(), Box::new(MemoryStore::new())).unwrap();
        app.load_saved();
        app
    }

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn drag(app: &mut App, from: Point, to: Point) {
        app.pointer_down(from);
        app.pointer_move(p((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        app.pointer_move(to);
        app.pointer_up(to);
    }

    fn pixels(app: &App) -> RgbaImage {
        app.canvas().pixels().clone()
    }

    fn saved(app: &App) -> Option<RgbaImage> {
        app.store()
            .get(KEY)
            .unwrap()
            .map(|bytes| decode_image(&bytes).unwrap())
    }

    /// Records deliveries in memory
    #[derive(Default)]
    struct RecordingSink {
        files: Vec<(String, String, Vec<u8>)>,
    }

    impl FileSink for RecordingSink {
        fn deliver(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), ExportError> {
            self.files.push((name.to_owned(), mime_type.to_owned(), bytes.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_fresh_session_has_blank_baseline() {
        let app = fresh_app();
        assert_eq!(app.history().undo_len(), 1);
        assert_eq!(app.history().redo_len(), 0);
        assert!(app.canvas().is_blank());
        assert_eq!(app.gesture(), &Gesture::Idle);
    }

    #[test]
    fn test_red_line_scenario() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Line);
        app.apply_control(ControlChange::Color("#ff0000".into())).unwrap();
        app.apply_control(ControlChange::StrokeWidth(3.0)).unwrap();

        app.pointer_down(p(10.0, 10.0));
        app.pointer_move(p(30.0, 12.0));
        // No live preview for shapes
        assert!(app.canvas().is_blank());
        app.pointer_up(p(50.0, 50.0));

        let red = Rgba([255, 0, 0, 255]);
        assert_eq!(app.canvas().pixels().get_pixel(30, 30), &red);
        assert_eq!(app.canvas().pixels().get_pixel(30, 12), &Rgba([255, 255, 255, 255]));
        assert_eq!(app.history().undo_len(), 2);
        assert_eq!(saved(&app).unwrap(), pixels(&app));
    }

    #[test]
    fn test_freehand_draws_connected_segments() {
        let mut app = fresh_app();
        app.apply_control(ControlChange::StrokeWidth(4.0)).unwrap();
        app.pointer_down(p(10.0, 40.0));
        app.pointer_move(p(40.0, 40.0));
        app.pointer_move(p(40.0, 70.0));

        // Drawn immediately, committed only on release
        let black = Rgba([0, 0, 0, 255]);
        assert_eq!(app.canvas().pixels().get_pixel(25, 40), &black);
        assert_eq!(app.canvas().pixels().get_pixel(40, 55), &black);
        assert_eq!(app.history().undo_len(), 1);

        app.pointer_up(p(40.0, 70.0));
        assert_eq!(app.history().undo_len(), 2);
        assert_eq!(app.gesture(), &Gesture::Idle);
    }

    #[test]
    fn test_eraser_paints_background() {
        let mut app = fresh_app();
        app.apply_control(ControlChange::StrokeWidth(6.0)).unwrap();
        drag(&mut app, p(10.0, 20.0), p(100.0, 20.0));
        assert!(!app.canvas().is_blank());

        app.set_active_tool(Tool::Eraser);
        app.apply_control(ControlChange::StrokeWidth(20.0)).unwrap();
        drag(&mut app, p(0.0, 20.0), p(119.0, 20.0));
        assert!(app.canvas().is_blank());
    }

    #[test]
    fn test_eraser_matches_custom_background() {
        let config = CanvasConfig {
            background: "#102030".to_owned(),
            ..config()
        };
        let mut app = App::new(&config, Box::new(MemoryStore::new())).unwrap();
        app.load_saved();
        app.apply_control(ControlChange::Color("#ff0000".into())).unwrap();
        drag(&mut app, p(10.0, 20.0), p(100.0, 20.0));
        assert!(!app.canvas().is_blank());

        app.set_active_tool(Tool::Eraser);
        app.apply_control(ControlChange::StrokeWidth(20.0)).unwrap();
        drag(&mut app, p(0.0, 20.0), p(119.0, 20.0));
        assert!(app.canvas().is_blank());
        assert_eq!(app.canvas().pixels().get_pixel(50, 20), &Rgba([0x10, 0x20, 0x30, 255]));
        // The picker keeps its color for the next brush stroke
        assert_eq!(app.tools().picker_color(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_huge_stroke_width_paints_whole_canvas() {
        let mut app = fresh_app();
        app.apply_control(ControlChange::Color("#ff0000".into())).unwrap();
        app.apply_control(ControlChange::StrokeWidth(1.0e6)).unwrap();
        app.apply_control(ControlChange::Shadow(true)).unwrap();
        app.pointer_down(p(5.0, 20.0));
        app.pointer_move(p(6.0, 20.0));
        app.pointer_up(p(6.0, 20.0));

        let red = Rgba([255, 0, 0, 255]);
        assert!(app.canvas().pixels().pixels().all(|px| *px == red));
        assert_eq!(app.history().undo_len(), 2);

        // Shapes take the same path
        app.apply_control(ControlChange::Color("#0000ff".into())).unwrap();
        app.set_active_tool(Tool::Circle);
        drag(&mut app, p(60.0, 40.0), p(61.0, 40.0));
        assert!(app.canvas().pixels().pixels().all(|px| *px == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut app = fresh_app();
        let before = pixels(&app);

        let mut states = Vec::new();
        for (i, tool) in [Tool::Brush, Tool::Rectangle, Tool::Circle].into_iter().enumerate() {
            app.set_active_tool(tool);
            let offset = 10.0 + 20.0 * i as f32;
            drag(&mut app, p(offset, offset), p(offset + 15.0, offset + 10.0));
            states.push(pixels(&app));
        }

        for _ in 0..3 {
            app.undo();
        }
        assert_eq!(pixels(&app), before);

        // Each redo brings back exactly the pixels the matching undo removed
        for state in &states {
            app.redo();
            assert_eq!(&pixels(&app), state);
        }
        assert_eq!(saved(&app).unwrap(), states[2]);
    }

    #[test]
    fn test_two_undos_then_noop() {
        let mut app = fresh_app();
        let before = pixels(&app);
        app.set_active_tool(Tool::Line);
        drag(&mut app, p(5.0, 5.0), p(60.0, 40.0));
        assert_eq!((app.history().undo_len(), app.history().redo_len()), (2, 0));

        app.undo();
        app.undo();
        assert_eq!((app.history().undo_len(), app.history().redo_len()), (0, 2));
        assert_eq!(pixels(&app), before);

        app.undo();
        assert_eq!((app.history().undo_len(), app.history().redo_len()), (0, 2));
        assert_eq!(pixels(&app), before);
    }

    #[test]
    fn test_commit_after_undo_discards_redo() {
        let mut app = fresh_app();
        drag(&mut app, p(10.0, 10.0), p(50.0, 10.0));
        drag(&mut app, p(10.0, 30.0), p(50.0, 30.0));
        app.undo();
        app.undo();
        assert_eq!(app.history().redo_len(), 2);

        drag(&mut app, p(10.0, 60.0), p(50.0, 60.0));
        assert_eq!(app.history().redo_len(), 0);
        let after = pixels(&app);
        app.redo();
        assert_eq!(pixels(&app), after);
    }

    #[test]
    fn test_shape_leave_draws_nothing() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Rectangle);
        app.pointer_down(p(10.0, 10.0));
        app.pointer_move(p(40.0, 40.0));
        app.pointer_leave(p(119.0, 40.0));

        assert!(app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 1);
        assert_eq!(app.gesture(), &Gesture::Idle);

        // The release that follows outside the canvas is ignored too
        app.pointer_up(p(119.0, 40.0));
        assert_eq!(app.history().undo_len(), 1);
    }

    #[test]
    fn test_freehand_leave_commits() {
        let mut app = fresh_app();
        app.pointer_down(p(10.0, 10.0));
        app.pointer_move(p(60.0, 10.0));
        app.pointer_leave(p(119.0, 10.0));

        assert!(!app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 2);
        assert_eq!(app.gesture(), &Gesture::Idle);
    }

    #[test]
    fn test_gradient_rectangle_then_flat() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Rectangle);
        app.apply_control(ControlChange::Color("#ff0000".into())).unwrap();
        app.apply_control(ControlChange::StrokeWidth(4.0)).unwrap();
        app.apply_control(ControlChange::Gradient(true)).unwrap();
        drag(&mut app, p(0.0, 0.0), p(100.0, 50.0));

        let near = *app.canvas().pixels().get_pixel(1, 1);
        let far = *app.canvas().pixels().get_pixel(99, 49);
        assert!(near[1] < 20 && far[1] > 235, "near {near:?}, far {far:?}");

        // Freehand strokes never take the gradient
        app.set_active_tool(Tool::Brush);
        drag(&mut app, p(30.0, 25.0), p(60.0, 25.0));
        assert_eq!(app.canvas().pixels().get_pixel(45, 25), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_opacity_and_style_reapplied_per_gesture() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Line);
        app.apply_control(ControlChange::Opacity(0.5)).unwrap();
        drag(&mut app, p(10.0, 10.5), p(100.0, 10.5));
        let translucent = app.canvas().pixels().get_pixel(50, 10)[0];
        assert!((translucent as i32 - 128).abs() <= 1);

        app.apply_control(ControlChange::Opacity(1.0)).unwrap();
        drag(&mut app, p(10.0, 40.5), p(100.0, 40.5));
        assert_eq!(app.canvas().pixels().get_pixel(50, 40)[0], 0);
    }

    #[test]
    fn test_text_cancel_is_noop() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Text);
        app.pointer_down(p(20.0, 40.0));
        assert!(app.gesture().is_awaiting_text());

        // Pointer input is ignored while waiting
        app.pointer_up(p(20.0, 40.0));
        app.pointer_down(p(50.0, 50.0));
        assert!(app.gesture().is_awaiting_text());

        app.submit_text(Some(String::new()));
        assert_eq!(app.gesture(), &Gesture::Idle);
        assert_eq!(app.history().undo_len(), 1);

        app.pointer_down(p(20.0, 40.0));
        app.cancel_text();
        assert_eq!(app.history().undo_len(), 1);
        assert!(app.canvas().is_blank());
    }

    #[test]
    fn test_typed_text_commits() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Text);
        app.pointer_down(p(20.0, 40.0));
        app.type_text("Hi");
        app.type_text("!x");
        app.backspace_text();
        assert_eq!(app.gesture().typed_text(), Some("Hi!"));

        app.finish_text();
        assert_eq!(app.gesture(), &Gesture::Idle);
        assert_eq!(app.history().undo_len(), 2);
    }

    fn tuffy() -> TextRenderer {
        TextRenderer::from_bytes(include_bytes!("../assets/fonts/Tuffy.ttf").to_vec(), 0).unwrap()
    }

    /// First and last rows holding mostly-red pixels
    fn red_rows(app: &App) -> Option<(u32, u32)> {
        let rows: Vec<u32> = app
            .canvas()
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, px)| px[0] > 200 && px[1] < 128)
            .map(|(_, y, _)| y)
            .collect();
        Some((*rows.iter().min()?, *rows.iter().max()?))
    }

    fn write_text(app: &mut App, at: Point, text: &str) {
        app.set_active_tool(Tool::Text);
        app.pointer_down(at);
        app.submit_text(Some(text.to_owned()));
    }

    #[test]
    fn test_text_drawn_on_baseline_at_twice_stroke_width() {
        let mut app = fresh_app();
        app.set_font(tuffy());
        app.apply_control(ControlChange::Color("#ff0000".into())).unwrap();
        app.apply_control(ControlChange::StrokeWidth(10.0)).unwrap();
        write_text(&mut app, p(20.0, 50.0), "H");
        assert_eq!(app.history().undo_len(), 2);

        // 20px text: about 14px of cap height sitting on row 50
        let (top, bottom) = red_rows(&app).unwrap();
        assert!((32..=40).contains(&top), "text top at {top}");
        assert!((45..=50).contains(&bottom), "text bottom at {bottom}");
        let small = bottom - top + 1;

        app.clear();
        app.apply_control(ControlChange::StrokeWidth(20.0)).unwrap();
        write_text(&mut app, p(20.0, 70.0), "H");
        let (top, bottom) = red_rows(&app).unwrap();
        assert!(bottom <= 70, "text bottom at {bottom}");
        assert!(app.canvas().pixels().pixels().any(|px| px[0] == 255 && px[1] < 10));
        let ratio = (bottom - top + 1) as f32 / small as f32;
        assert!(ratio > 1.7 && ratio < 2.3, "height ratio {ratio}");
    }

    #[test]
    fn test_text_uses_opacity() {
        let mut app = fresh_app();
        app.set_font(tuffy());
        app.apply_control(ControlChange::StrokeWidth(15.0)).unwrap();
        app.apply_control(ControlChange::Opacity(0.5)).unwrap();
        write_text(&mut app, p(10.0, 60.0), "HH");

        // Black at half opacity over white never gets darker than mid gray
        let darkest = app.canvas().pixels().pixels().map(|px| px[0]).min().unwrap();
        assert!((126..=130).contains(&darkest), "darkest {darkest}");
    }

    #[test]
    fn test_text_answer_from_inbox_lands_next_frame() {
        let mut app = fresh_app();
        app.set_font(tuffy());
        app.apply_control(ControlChange::StrokeWidth(10.0)).unwrap();
        let inbox = app.text_inbox();

        // An answer with no request waiting is dropped
        inbox.post(Some("stray".into()));
        app.process_input_events();
        assert!(app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 1);

        app.set_active_tool(Tool::Text);
        app.queue_input_event(PointerEvent::new(PointerEventType::Down, [20.0, 50.0]));
        app.queue_input_event(PointerEvent::new(PointerEventType::Up, [20.0, 50.0]));
        app.process_input_events();
        assert!(app.gesture().is_awaiting_text());

        inbox.post(Some("Hi".into()));
        assert!(app.has_pending_input());
        app.process_input_events();
        assert_eq!(app.gesture(), &Gesture::Idle);
        assert!(!app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 2);
    }

    #[test]
    fn test_switching_tool_cancels_text_request() {
        let mut app = fresh_app();
        app.set_active_tool(Tool::Text);
        app.pointer_down(p(20.0, 40.0));
        app.set_active_tool(Tool::Brush);
        assert_eq!(app.gesture(), &Gesture::Idle);
        assert_eq!(app.history().undo_len(), 1);
    }

    #[test]
    fn test_clear_is_undoable() {
        let mut app = fresh_app();
        drag(&mut app, p(10.0, 10.0), p(60.0, 60.0));
        let drawn = pixels(&app);

        app.clear();
        assert!(app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 3);

        app.undo();
        assert_eq!(pixels(&app), drawn);
    }

    #[test]
    fn test_reset_leaves_single_baseline_and_no_blob() {
        let mut app = fresh_app();
        drag(&mut app, p(10.0, 10.0), p(60.0, 60.0));
        drag(&mut app, p(10.0, 60.0), p(60.0, 10.0));
        app.undo();
        assert!(saved(&app).is_some());

        app.reset();
        assert_eq!(app.history().undo_len(), 1);
        assert_eq!(app.history().redo_len(), 0);
        assert!(app.canvas().is_blank());
        assert!(saved(&app).is_none());

        // Baseline can still be stepped past, but nothing older exists
        app.undo();
        assert!(app.canvas().is_blank());
    }

    #[test]
    fn test_load_saved_restores_as_baseline() {
        let mut store = MemoryStore::new();
        let mut previous = App::new(&config(), Box::new(MemoryStore::new())).unwrap();
        previous.load_saved();
        previous.apply_control(ControlChange::StrokeWidth(8.0)).unwrap();
        drag(&mut previous, p(10.0, 10.0), p(100.0, 70.0));
        let bytes = previous.store().get(KEY).unwrap().unwrap();
        store.set(KEY, &bytes).unwrap();

        let mut app = App::new(&config(), Box::new(store)).unwrap();
        app.load_saved();
        assert_eq!(pixels(&app), pixels(&previous));
        assert_eq!(app.history().undo_len(), 1);
        assert_eq!(app.history().redo_len(), 0);
    }

    #[test]
    fn test_load_saved_scales_other_sizes() {
        let mut store = MemoryStore::new();
        let mut other = Canvas::new(30, 20, Rgb::new(0, 0, 255));
        other.clear();
        store.set(KEY, &other.encode(ExportFormat::Png, 90).unwrap()).unwrap();

        let mut app = App::new(&config(), Box::new(store)).unwrap();
        app.load_saved();
        assert_eq!(app.canvas().pixels().get_pixel(119, 79), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_load_saved_ignores_corrupt_blob() {
        let mut store = MemoryStore::new();
        store.set(KEY, b"garbage").unwrap();
        let mut app = App::new(&config(), Box::new(store)).unwrap();
        app.load_saved();

        assert!(app.canvas().is_blank());
        assert_eq!(app.history().undo_len(), 1);
        // The baseline commit overwrote the garbage
        assert!(saved(&app).is_some());
    }

    #[test]
    fn test_history_limit_bounds_undo() {
        let config = CanvasConfig {
            history_limit: 3,
            ..config()
        };
        let mut app = App::new(&config, Box::new(MemoryStore::new())).unwrap();
        app.load_saved();
        for i in 0..5 {
            let y = 10.0 + 10.0 * i as f32;
            drag(&mut app, p(10.0, y), p(100.0, y));
        }
        assert_eq!(app.history().undo_len(), 3);
    }

    #[test]
    fn test_save_file_uses_selected_format() {
        let mut app = fresh_app();
        let mut sink = RecordingSink::default();

        app.save_file(&mut sink).unwrap();
        app.apply_control(ControlChange::ExportFormat(ExportFormat::Jpeg)).unwrap();
        app.save_file(&mut sink).unwrap();

        let names: Vec<_> = sink.files.iter().map(|(n, m, _)| (n.as_str(), m.as_str())).collect();
        assert_eq!(names, [("drawing.png", "image/png"), ("drawing.jpeg", "image/jpeg")]);
        assert_eq!(&sink.files[1].2[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_queued_events_processed_in_order() {
        let mut app = fresh_app();
        app.queue_input_event(PointerEvent::new(PointerEventType::Down, [10.0, 10.0]));
        app.queue_input_event(PointerEvent::new(PointerEventType::Move, [60.0, 10.0]));
        app.queue_input_event(PointerEvent::new(PointerEventType::Up, [60.0, 10.0]));
        assert!(app.has_pending_input());

        app.process_input_events();
        assert!(!app.has_pending_input());
        assert_eq!(app.history().undo_len(), 2);
        assert!(app.take_dirty());
        assert!(!app.take_dirty());
    }

    #[test]
    fn test_rejected_control_keeps_state() {
        let mut app = fresh_app();
        let before = app.tools().clone();
        assert!(app.apply_control(ControlChange::Opacity(-0.1)).is_err());
        assert_eq!(app.tools(), &before);
    }
}
