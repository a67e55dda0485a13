// Keybindings for the image overlay
// Keys are only acted upon while the overlay is open.
//
// Keybindings:
// - ArrowLeft / h: Previous item
// - ArrowRight / l: Next item
// - Escape: Close overlay

use std::cell::Cell;

/// Toolkit-independent key identity, named after DOM `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Char(char),
    Other(String),
}

/// Action requested from the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    Prev,
    Next,
    Close,
}

/// Key handler for the overlay.
///
/// Bound when the overlay opens and unbound when it closes, so that
/// arrow keys fall through to the grid otherwise.
pub struct OverlayKeybindings {
    bound: Cell<bool>,
}

impl OverlayKeybindings {
    pub fn new() -> Self {
        Self {
            bound: Cell::new(false),
        }
    }

    pub fn bind(&self) {
        self.bound.set(true);
    }

    pub fn unbind(&self) {
        self.bound.set(false);
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    /// Map a key to an overlay action. Returns `None` while unbound.
    pub fn action_for(&self, key: &Key) -> Option<OverlayAction> {
        if !self.bound.get() {
            return None;
        }
        match key {
            Key::ArrowLeft | Key::Char('h') => Some(OverlayAction::Prev),
            Key::ArrowRight | Key::Char('l') => Some(OverlayAction::Next),
            Key::Escape => Some(OverlayAction::Close),
            _ => None,
        }
    }
}

impl Default for OverlayKeybindings {
    fn default() -> Self {
        Self::new()
    }
}
