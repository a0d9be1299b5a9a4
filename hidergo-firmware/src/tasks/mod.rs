//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod battery;
pub mod control;
pub mod display;

pub use battery::battery_task;
pub use control::control_task;
pub use display::{display_task, Panel, DISPLAY_OBSERVER};
