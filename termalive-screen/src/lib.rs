//! A VT500-family screen buffer built on `termalive-vte`, plus the fixed
//! capacity ring buffer used to replay recent pty output to late-attaching
//! subscribers.

mod cell;
mod charset;
mod color;
mod cursor;
mod grid;
mod mode;
mod params;
mod pen;
mod ring;
mod screen;

pub use cell::Cell;
pub use charset::{Charset, GSet};
pub use color::Color;
pub use cursor::{Cursor, SavedCursor};
pub use grid::Buffer;
pub use mode::{ModeState, Modes};
pub use params::Params;
pub use pen::{Attrs, Pen};
pub use ring::{RingBuffer, DEFAULT_CAPACITY};
pub use screen::ScreenBuffer;
