//! Reloadable runtime configuration shared with the server crate.
//!
//! Loading and validating the config file is the server's job; the core
//! only reads snapshots through [`ConfigStore`].

mod config_store;
mod notification;

pub use config_store::ConfigStore;
pub use notification::NotificationTarget;
