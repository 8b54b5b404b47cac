//! Current drawing attributes applied to subsequently written cells.

use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Text rendering attributes set by SGR parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD          = 1 << 0;
        const ITALIC        = 1 << 1;
        const UNDERLINE     = 1 << 2;
        const BLINK         = 1 << 3;
        const INVERSE       = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
    }
}

/// Color pair plus attribute bitset applied to the next printed cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}
