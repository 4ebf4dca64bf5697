//! Game rules: win detection.

mod win;

pub use win::{WinResult, evaluate};
