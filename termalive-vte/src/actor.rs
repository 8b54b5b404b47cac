//! Callbacks invoked by the virtual terminal parser.
//!
//! The [`Parser`](crate::parser::Parser) walks a byte stream and translates
//! it into higher level terminal actions. Those actions are handed to an
//! [`Actor`] implementation, which is responsible for mutating a terminal
//! model, recording the calls for a test, or whatever else the embedding
//! application needs. The trait methods mirror the action set defined by the
//! ECMA-48 escape sequence state machine and the DEC/xterm extensions layered
//! on top of it. Implementations should be prepared to receive any sequence
//! of calls that is valid according to the virtual terminal protocol and
//! should avoid performing additional parsing themselves.
use crate::csi::CsiParam;

/// Consumer-facing interface for terminal actions emitted by the parser.
///
/// ## Terminology
///
/// An intermediate is a byte in the range 0x20-0x2F that occurs before the
/// final byte of a CSI/ESC/DCS sequence. For CSI sequences, intermediates
/// (and any DEC private marker byte such as `?`) are folded into `params` as
/// [`CsiParam::P`] entries in the order they were seen, interleaved with the
/// numeric [`CsiParam::Integer`] entries.
///
/// `ignored_excess_intermediates`/`parameters_truncated` is set when the
/// sequence carried more data than the parser retains (more than two
/// intermediates for ESC/DCS, or more than [`crate::parser::MAX_PARAMS`] CSI
/// parameter slots, or a parameter value above 65535); in the CSI case the
/// sequence is fully consumed but `csi_dispatch` is never called.
pub trait Actor {
    /// Emits a single printable Unicode scalar value at the current pen.
    fn print(&mut self, c: char);

    /// Executes a C0/C1 control byte that is not part of a longer sequence
    /// (e.g. `BEL`, `BS`, `CR`, `IND`, `NEL`, `HTS`).
    fn execute(&mut self, byte: u8);

    /// Signals the start of a Device Control String (DCS).
    fn hook(
        &mut self,
        byte: u8,
        params: &[i64],
        intermediates: &[u8],
        ignored_excess_intermediates: bool,
    );

    /// Passes a single payload byte of the current DCS string through to the
    /// handler chosen in [`Actor::hook`].
    fn put(&mut self, byte: u8);

    /// Marks the end of the current DCS string.
    fn unhook(&mut self);

    /// Dispatches an Operating System Command (OSC). By convention the first
    /// field is the decimal command number and the rest is the raw payload.
    fn osc_dispatch(&mut self, params: &[&[u8]]);

    /// Dispatches a Control Sequence Introducer (CSI) escape.
    fn csi_dispatch(
        &mut self,
        params: &[CsiParam],
        parameters_truncated: bool,
        byte: u8,
    );

    /// Dispatches a standalone (non-CSI, non-DCS) escape sequence.
    fn esc_dispatch(
        &mut self,
        params: &[i64],
        intermediates: &[u8],
        ignored_excess_intermediates: bool,
        byte: u8,
    );
}
