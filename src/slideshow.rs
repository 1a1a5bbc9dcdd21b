//! Slideshow state machine, timer and the controller tying them to a cursor.

pub mod controller;
pub mod state;
pub mod timer;

pub use controller::{PERMISSION_NOTICE, ScreenUpdate, ScreenView, SlideshowController};
pub use state::{SlideshowCommand, SlideshowState, ToggleLabel, UiEffect};
pub use timer::SlideshowTimer;
