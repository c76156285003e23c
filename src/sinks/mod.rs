//! Reference frame sinks.

pub mod notifier;
pub mod preview;

pub use notifier::{CallbackNotifier, NotifierEvent};
pub use preview::{PreviewFrame, PreviewWindow};
