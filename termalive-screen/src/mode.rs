//! Boolean terminal modes latched by `CSI h`/`CSI l` (ANSI) and
//! `CSI ? h`/`CSI ? l` (DEC private).

use std::collections::HashSet;

use bitflags::bitflags;

bitflags! {
    /// Modes with dedicated behavior in the screen buffer. Bit values are
    /// internal; they do not correspond to the DEC mode numbers on the wire
    /// (see [`Modes::set_private`]/[`Modes::set_ansi`] for that mapping).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modes: u16 {
        /// DEC 25 (DECTCEM) — text cursor enable.
        const CURSOR_VISIBLE    = 1 << 0;
        /// DEC 6 (DECOM) — origin mode.
        const ORIGIN            = 1 << 1;
        /// DEC 7 (DECAWM) — autowrap, on by default.
        const AUTOWRAP          = 1 << 2;
        /// DEC 2004 — bracketed paste. Tracked, not rendered.
        const BRACKETED_PASTE   = 1 << 3;
        /// DEC 1049 — alternate screen + save/restore cursor on enter/exit.
        const ALT_SCREEN        = 1 << 4;
        /// ANSI 4 (IRM) — insert mode, recognized but not wired into ICH/DCH
        /// beyond what those operations already do explicitly.
        const INSERT            = 1 << 5;
    }
}

impl Default for Modes {
    fn default() -> Self {
        Self::CURSOR_VISIBLE | Self::AUTOWRAP
    }
}

impl Modes {
    /// Map a DEC private mode number (the argument of `CSI ? N h/l`) onto a
    /// tracked bit, returning `None` for modes this buffer does not model
    /// beyond "recognized and silently set/cleared".
    fn private_bit(number: i64) -> Option<Self> {
        match number {
            6 => Some(Self::ORIGIN),
            7 => Some(Self::AUTOWRAP),
            25 => Some(Self::CURSOR_VISIBLE),
            1049 => Some(Self::ALT_SCREEN),
            2004 => Some(Self::BRACKETED_PASTE),
            _ => None,
        }
    }

    fn ansi_bit(number: i64) -> Option<Self> {
        match number {
            4 => Some(Self::INSERT),
            _ => None,
        }
    }
}

/// Full mode state, including DEC private modes this buffer does not give
/// distinct behavior to. Those are still remembered so a later `CSI ? Nn`
/// query or re-read reports something consistent.
#[derive(Debug, Clone, Default)]
pub struct ModeState {
    pub bits: Modes,
    unknown_private: HashSet<i64>,
    unknown_ansi: HashSet<i64>,
}

impl ModeState {
    #[must_use]
    pub fn new() -> Self {
        Self { bits: Modes::default(), ..Self::default() }
    }

    pub fn set_private(&mut self, number: i64, enabled: bool) {
        match Modes::private_bit(number) {
            Some(bit) => self.bits.set(bit, enabled),
            None => {
                if enabled {
                    self.unknown_private.insert(number);
                } else {
                    self.unknown_private.remove(&number);
                }
            }
        }
    }

    pub fn set_ansi(&mut self, number: i64, enabled: bool) {
        match Modes::ansi_bit(number) {
            Some(bit) => self.bits.set(bit, enabled),
            None => {
                if enabled {
                    self.unknown_ansi.insert(number);
                } else {
                    self.unknown_ansi.remove(&number);
                }
            }
        }
    }

    #[must_use]
    pub fn is_private_set(&self, number: i64) -> bool {
        match Modes::private_bit(number) {
            Some(bit) => self.bits.contains(bit),
            None => self.unknown_private.contains(&number),
        }
    }

    #[must_use]
    pub fn contains(&self, bit: Modes) -> bool {
        self.bits.contains(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_modes_toggle_their_bit() {
        let mut modes = ModeState::new();
        assert!(modes.contains(Modes::AUTOWRAP));
        modes.set_private(7, false);
        assert!(!modes.contains(Modes::AUTOWRAP));
        modes.set_private(25, false);
        assert!(!modes.contains(Modes::CURSOR_VISIBLE));
    }

    #[test]
    fn unknown_modes_are_recognized_silently() {
        let mut modes = ModeState::new();
        modes.set_private(47, true);
        assert!(modes.is_private_set(47));
        modes.set_private(47, false);
        assert!(!modes.is_private_set(47));
    }
}
