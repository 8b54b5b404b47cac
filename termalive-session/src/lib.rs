//! Binds a [`termalive_pty`] session to a [`termalive_screen::ScreenBuffer`]
//! and a [`termalive_screen::RingBuffer`], and fans its output out to any
//! number of concurrent subscribers.

mod error;
mod info;
mod options;
mod pump;
mod session;
mod subscriber;

pub use error::SessionError;
pub use info::{SessionInfo, SessionState};
pub use options::SessionOptions;
pub use session::ManagedSession;
pub use subscriber::{OutputStream, SessionEvent};
