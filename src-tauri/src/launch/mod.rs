//! How the process was started, and what the main window does about it.

pub mod commands;
mod coordinator;
mod deep_link;

pub use coordinator::{AppContext, LaunchContext, LaunchCoordinator, MainWindow, AUTOSTART_FLAG};
pub use deep_link::DeepLinkAction;
