//! VT500-family escape sequence parser.
//!
//! Implements the Paul Williams state machine table almost verbatim: a byte
//! stream (which may straddle sequence and UTF-8 boundaries across separate
//! `feed` calls) drives a fixed set of typed dispatch calls against an
//! [`Actor`] implementation. The parser itself never interprets a sequence's
//! meaning; that is entirely up to the actor (a screen buffer, a test
//! recorder, anything).

mod actor;
mod csi;
mod enums;
mod parser;
mod transitions;
mod utf8;

pub use actor::Actor;
pub use csi::CsiParam;
pub use parser::{MAX_PARAMS, Parser};
