pub mod alerts;
pub mod change;
pub mod error;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod retry;
pub mod settings;
pub mod visibility;
pub mod watcher;
