pub mod config;
pub mod ipc;
pub mod listener;
pub mod prompt;
pub mod replay;

pub use config::{Config, DEFAULT_SOCKET_PATH};
pub use ipc::IpcNotifier;
pub use listener::{Notification, SubscriberListener};
pub use prompt::LinePrompt;
pub use replay::{EngineScript, ReplayEngine, ScriptEvent};
