//! Input Event Handling
//!
//! Pointer events arrive from the window layer in canvas coordinates and are
//! queued until the next frame, where the app drains them in order. Moves
//! and leaves while no button is held carry no information for drawing and
//! are dropped on arrival.
//!
//! Answers to a text request take a separate path, [`TextInbox`], because
//! the page may answer while the app is still busy handling the click that
//! asked for them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::shape::Point;

/// A pointer input event (mouse, touch, or stylus)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Position in canvas space (pixels from top-left)
    pub position: Point,
    pub event_type: PointerEventType,
}

impl PointerEvent {
    pub fn new(event_type: PointerEventType, position: impl Into<Point>) -> Self {
        Self {
            position: position.into(),
            event_type,
        }
    }
}

/// Type of pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventType {
    /// Button pressed
    Down,
    /// Pointer moved while button held
    Move,
    /// Button released
    Up,
    /// Pointer left the canvas while button held
    Leave,
}

/// Queue for input events that coalesces events between frames
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<PointerEvent>,
    is_pressed: bool,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the queue
    pub fn push_event(&mut self, event: PointerEvent) {
        match event.event_type {
            PointerEventType::Down => self.is_pressed = true,
            PointerEventType::Move => {
                if !self.is_pressed {
                    return;
                }
            }
            PointerEventType::Up | PointerEventType::Leave => {
                if !self.is_pressed {
                    return;
                }
                self.is_pressed = false;
            }
        }

        self.events.push_back(event);
        log::debug!("Input event queued: {:?} (queue size: {})", event.event_type, self.events.len());
    }

    /// Drain all pending events for processing
    pub fn drain_events(&mut self) -> impl Iterator<Item = PointerEvent> + '_ {
        self.events.drain(..)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Shared slot holding the page's answer to a text request until the next
/// frame. Clones share the slot; posting never borrows the app.
#[derive(Debug, Clone, Default)]
pub struct TextInbox {
    answer: Rc<RefCell<Option<Option<String>>>>,
}

impl TextInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave an answer; `None` cancels. A later answer replaces an earlier
    /// one that has not been collected yet.
    pub fn post(&self, text: Option<String>) {
        *self.answer.borrow_mut() = Some(text);
    }

    /// Collect the posted answer, if any
    pub fn take(&self) -> Option<Option<String>> {
        self.answer.borrow_mut().take()
    }

    pub fn has_answer(&self) -> bool {
        self.answer.borrow().is_some()
    }
}
