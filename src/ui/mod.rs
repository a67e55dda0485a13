pub mod keybindings;
pub mod list_view;
pub mod scroll;
pub mod viewer;

pub use keybindings::{Key, OverlayAction, OverlayKeybindings};
pub use list_view::{Viewport, VirtualListView};
pub use scroll::ScrollDirector;
pub use viewer::{NavDirection, OverlayNavigator, SelectionState};
