//! Terminal color representation shared by the pen and by SGR dispatch.

/// A foreground or background color slot.
///
/// `Default` is a sentinel distinct from any indexed color and is preserved
/// across `SGR 0` resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}
