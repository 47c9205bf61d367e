//! Page hooks for the web platform
//!
//! The host page owns the buttons and inputs around the canvas. These calls
//! keep it in sync with controller state: which tool is marked active,
//! whether undo/redo are available, and when to ask for text. All of them
//! are no-ops natively.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Update the status line
#[cfg(target_arch = "wasm32")]
pub fn update_status(status: &str) {
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = updateStatus)]
        fn update_status_js(status: &str);
    }
    update_status_js(status);
}

/// Mark the control for `tool` as the active one
#[cfg(target_arch = "wasm32")]
pub fn update_active_tool(tool: &str) {
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = updateActiveTool)]
        fn update_active_tool_js(tool: &str);
    }
    update_active_tool_js(tool);
}

/// Enable or disable the undo/redo controls
#[cfg(target_arch = "wasm32")]
pub fn update_history(can_undo: bool, can_redo: bool) {
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = updateHistory)]
        fn update_history_js(can_undo: bool, can_redo: bool);
    }
    update_history_js(can_undo, can_redo);
}

/// Ask the page to collect text for the text tool. The page answers by
/// calling the exported `submit_text`, either synchronously (for example
/// straight from `prompt()`) or later. The answer lands in the app's
/// [`crate::TextInbox`] and is drawn on the next frame.
#[cfg(target_arch = "wasm32")]
pub fn request_text(x: f32, y: f32) {
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = requestText)]
        fn request_text_js(x: f32, y: f32);
    }
    request_text_js(x, y);
}

// No-op versions for non-WASM platforms
#[cfg(not(target_arch = "wasm32"))]
pub fn update_status(_status: &str) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn update_active_tool(_tool: &str) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn update_history(_can_undo: bool, _can_redo: bool) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn request_text(_x: f32, _y: f32) {}
