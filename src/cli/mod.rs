//! CLI-specific utilities for ciciot-dl
//!
//! This module contains code specific to the interactive command-line tool,
//! separate from the core library functionality.

pub mod menu;
pub mod progress;

pub use menu::{print_menu, MenuChoice};
pub use progress::ProgressManager;
