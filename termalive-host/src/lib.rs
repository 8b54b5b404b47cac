//! Registry of persistent named sessions, served over WebSocket and a
//! platform pipe.
//!
//! [`SessionHost`] owns the session map and idle sweep; [`serve`] runs the
//! listeners described by [`HostConfig`] until one of them fails.

mod config;
mod error;
mod host;
mod listener;
mod registry;
mod worker;

pub use config::HostConfig;
pub use error::HostError;
pub use host::SessionHost;
pub use listener::serve;
