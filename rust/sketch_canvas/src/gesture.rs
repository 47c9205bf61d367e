//! Pointer Gesture State
//!
//! One gesture at a time: idle, a freehand stroke in progress, a shape drag
//! waiting for release, or a text placement waiting for the user to type.

use crate::shape::Point;
use crate::tool::Tool;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Brush or eraser stroke; `last` is where the previous segment ended
    Freehand { last: Point },
    /// Shape drag started at `anchor` with `tool`
    Shape { tool: Tool, anchor: Point },
    /// Text tool clicked at `at`. Pointer input is ignored until the text is
    /// submitted or cancelled.
    AwaitingText { at: Point, typed: String },
}

impl Gesture {
    /// A freehand stroke or shape drag is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Gesture::Freehand { .. } | Gesture::Shape { .. })
    }

    pub fn is_awaiting_text(&self) -> bool {
        matches!(self, Gesture::AwaitingText { .. })
    }

    /// Characters typed so far while awaiting text
    pub fn typed_text(&self) -> Option<&str> {
        match self {
            Gesture::AwaitingText { typed, .. } => Some(typed),
            _ => None,
        }
    }
}
