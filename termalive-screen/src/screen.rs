//! The default [`Actor`] consumer of `termalive-vte`: a VT500-family screen
//! buffer.

use termalive_vte::Actor;
use unicode_width::UnicodeWidthChar;

use crate::cell::Cell;
use crate::charset::{Charset, GSet};
use crate::color::Color;
use crate::cursor::SavedCursor;
use crate::grid::Buffer;
use crate::mode::{ModeState, Modes};
use crate::params::Params;
use crate::pen::{Attrs, Pen};

/// A VT500-family virtual screen: cell grid, cursor, pen, modes and scroll
/// region, plus an optional alternate screen (DEC 1049).
///
/// Device queries (`DA`, `DSR`) are answered by appending their response
/// bytes to an internal buffer rather than through a generic callback —
/// `Actor` has no such capability, so callers drain responses explicitly
/// with [`ScreenBuffer::take_responses`] and forward them to the pty.
#[derive(Debug, Clone)]
pub struct ScreenBuffer {
    width: usize,
    height: usize,
    primary: Buffer,
    alternate: Buffer,
    alt_active: bool,
    pen: Pen,
    modes: ModeState,
    title: String,
    g0: Charset,
    g1: Charset,
    active_gset: GSet,
    responses: Vec<u8>,
}

impl ScreenBuffer {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            primary: Buffer::new(width, height),
            alternate: Buffer::new(width, height),
            alt_active: false,
            pen: Pen::default(),
            modes: ModeState::new(),
            title: String::new(),
            g0: Charset::default(),
            g1: Charset::default(),
            active_gset: GSet::default(),
            responses: Vec::new(),
        }
    }

    fn buffer(&self) -> &Buffer {
        if self.alt_active { &self.alternate } else { &self.primary }
    }

    fn buffer_mut(&mut self) -> &mut Buffer {
        if self.alt_active { &mut self.alternate } else { &mut self.primary }
    }

    fn active_charset(&self) -> Charset {
        match self.active_gset {
            GSet::G0 => self.g0,
            GSet::G1 => self.g1,
        }
    }

    fn blank_cell(&self) -> Cell {
        Cell { ch: ' ', pen: Pen { fg: Color::Default, bg: self.pen.bg, attrs: Attrs::empty() }, width: 1 }
    }

    // ---- contract exposed to callers ----

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn cursor_x(&self) -> usize {
        self.buffer().cursor.x
    }

    #[must_use]
    pub fn cursor_y(&self) -> usize {
        self.buffer().cursor.y
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.modes.contains(Modes::CURSOR_VISIBLE)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn get_cell(&self, x: usize, y: usize) -> Cell {
        self.buffer().cell(x, y)
    }

    #[must_use]
    pub fn get_row_text(&self, y: usize) -> String {
        self.buffer().row_text(y)
    }

    #[must_use]
    pub fn is_alternate_screen(&self) -> bool {
        self.alt_active
    }

    /// Bytes produced by a device query (`DA`/`DSR`) since the last drain.
    /// Callers forward these to the pty as input.
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Reset to a state indistinguishable from a freshly constructed buffer
    /// of the same dimensions.
    pub fn reset(&mut self) {
        self.primary = Buffer::new(self.width, self.height);
        self.alternate = Buffer::new(self.width, self.height);
        self.alt_active = false;
        self.pen = Pen::default();
        self.modes = ModeState::new();
        self.title.clear();
        self.g0 = Charset::default();
        self.g1 = Charset::default();
        self.active_gset = GSet::default();
        self.responses.clear();
    }

    /// Resize both buffers, clearing their contents.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.primary.resize(self.width, self.height);
        self.alternate.resize(self.width, self.height);
    }

    // ---- cursor motion helpers shared by execute()/esc_dispatch()/csi_dispatch() ----

    fn backspace(&mut self) {
        let buf = self.buffer_mut();
        if buf.cursor.x > 0 {
            buf.cursor.x -= 1;
        }
        buf.cursor.pending_wrap = false;
    }

    fn tab(&mut self) {
        let buf = self.buffer_mut();
        buf.cursor.x = buf.next_tab_stop(buf.cursor.x);
    }

    fn carriage_return(&mut self) {
        let buf = self.buffer_mut();
        buf.cursor.x = 0;
        buf.cursor.pending_wrap = false;
    }

    /// IND: move down one row, scrolling the region if already at its
    /// bottom. Shared by LF/VT/FF execute and `ESC D`.
    fn index(&mut self) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let bottom = buf.scroll_bottom;
        if buf.cursor.y == bottom {
            buf.scroll_region_up(1, blank);
        } else if buf.cursor.y + 1 < buf.height {
            buf.cursor.y += 1;
        }
        buf.cursor.pending_wrap = false;
    }

    /// RI: move up one row, scrolling the region if already at its top.
    fn reverse_index(&mut self) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let top = buf.scroll_top;
        if buf.cursor.y == top {
            buf.scroll_region_down(1, blank);
        } else if buf.cursor.y > 0 {
            buf.cursor.y -= 1;
        }
        buf.cursor.pending_wrap = false;
    }

    fn next_line(&mut self) {
        self.carriage_return();
        self.index();
    }

    fn back_index(&mut self) {
        let buf = self.buffer_mut();
        if buf.cursor.x > 0 {
            buf.cursor.x -= 1;
        }
    }

    fn forward_index(&mut self) {
        let buf = self.buffer_mut();
        if buf.cursor.x + 1 < buf.width {
            buf.cursor.x += 1;
        }
    }

    fn save_cursor(&mut self) {
        let pen = self.pen;
        let buf = self.buffer_mut();
        buf.saved = Some(SavedCursor { x: buf.cursor.x, y: buf.cursor.y, pen });
    }

    fn restore_cursor(&mut self) {
        let saved = self.buffer().saved;
        if let Some(saved) = saved {
            let buf = self.buffer_mut();
            buf.cursor.x = saved.x;
            buf.cursor.y = saved.y;
            buf.cursor.pending_wrap = false;
            self.pen = saved.pen;
        }
    }

    fn set_alt_screen(&mut self, enable: bool) {
        if enable && !self.alt_active {
            self.alternate = Buffer::new(self.width, self.height);
            self.alt_active = true;
        } else if !enable && self.alt_active {
            self.alt_active = false;
        }
    }

    // ---- CSI operations ----

    fn cursor_up(&mut self, n: usize) {
        let buf = self.buffer_mut();
        buf.cursor.y = buf.cursor.y.saturating_sub(n);
        buf.cursor.pending_wrap = false;
    }

    fn cursor_down(&mut self, n: usize) {
        let buf = self.buffer_mut();
        buf.cursor.y = (buf.cursor.y + n).min(buf.height - 1);
        buf.cursor.pending_wrap = false;
    }

    fn cursor_forward(&mut self, n: usize) {
        let buf = self.buffer_mut();
        buf.cursor.x = (buf.cursor.x + n).min(buf.width - 1);
        buf.cursor.pending_wrap = false;
    }

    fn cursor_back(&mut self, n: usize) {
        let buf = self.buffer_mut();
        buf.cursor.x = buf.cursor.x.saturating_sub(n);
        buf.cursor.pending_wrap = false;
    }

    fn cursor_next_line(&mut self, n: usize) {
        self.cursor_down(n);
        self.carriage_return();
    }

    fn cursor_prev_line(&mut self, n: usize) {
        self.cursor_up(n);
        self.carriage_return();
    }

    fn cursor_col(&mut self, col: usize) {
        let buf = self.buffer_mut();
        buf.cursor.x = col.saturating_sub(1).min(buf.width - 1);
        buf.cursor.pending_wrap = false;
    }

    fn cursor_row(&mut self, row: usize) {
        let buf = self.buffer_mut();
        buf.cursor.y = row.saturating_sub(1).min(buf.height - 1);
        buf.cursor.pending_wrap = false;
    }

    /// CUP/HVP: origin-mode-aware absolute positioning.
    fn cursor_pos(&mut self, row: usize, col: usize) {
        let origin = self.modes.contains(Modes::ORIGIN);
        let buf = self.buffer_mut();
        let y = if origin {
            (buf.scroll_top + row.saturating_sub(1)).clamp(buf.scroll_top, buf.scroll_bottom)
        } else {
            row.saturating_sub(1).min(buf.height - 1)
        };
        let x = col.saturating_sub(1).min(buf.width - 1);
        buf.cursor.x = x;
        buf.cursor.y = y;
        buf.cursor.pending_wrap = false;
    }

    fn erase_display(&mut self, n: i64) {
        let blank = self.blank_cell();
        let (x, y) = {
            let c = self.buffer().cursor;
            (c.x, c.y)
        };
        let (w, h) = (self.buffer().width, self.buffer().height);
        let buf = self.buffer_mut();
        match n {
            0 => {
                buf.clear_range(y, x, w, blank);
                for row in (y + 1)..h {
                    buf.clear_range(row, 0, w, blank);
                }
            }
            1 => {
                for row in 0..y {
                    buf.clear_range(row, 0, w, blank);
                }
                buf.clear_range(y, 0, x + 1, blank);
            }
            2 => buf.clear_all(blank),
            _ => {} // 3 (scrollback) — no-op, no scrollback is kept
        }
    }

    fn erase_line(&mut self, n: i64) {
        let blank = self.blank_cell();
        let (x, y, w) = {
            let c = self.buffer().cursor;
            (c.x, c.y, self.buffer().width)
        };
        let buf = self.buffer_mut();
        match n {
            0 => buf.clear_range(y, x, w, blank),
            1 => buf.clear_range(y, 0, x + 1, blank),
            2 => buf.clear_range(y, 0, w, blank),
            _ => {}
        }
    }

    fn insert_lines(&mut self, n: usize) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let y = buf.cursor.y;
        if y < buf.scroll_top || y > buf.scroll_bottom {
            return;
        }
        buf.insert_lines(y, n, blank);
    }

    fn delete_lines(&mut self, n: usize) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let y = buf.cursor.y;
        if y < buf.scroll_top || y > buf.scroll_bottom {
            return;
        }
        buf.delete_lines(y, n, blank);
    }

    fn delete_chars(&mut self, n: usize) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let (x, y) = (buf.cursor.x, buf.cursor.y);
        buf.delete_chars(x, y, n, blank);
    }

    fn insert_chars(&mut self, n: usize) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let (x, y) = (buf.cursor.x, buf.cursor.y);
        buf.insert_chars(x, y, n, blank);
    }

    fn erase_chars(&mut self, n: usize) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let (x, y) = (buf.cursor.x, buf.cursor.y);
        let end = (x + n).min(buf.width);
        buf.clear_range(y, x, end, blank);
    }

    fn scroll_up(&mut self, n: usize) {
        let blank = self.blank_cell();
        self.buffer_mut().scroll_region_up(n, blank);
    }

    fn scroll_down(&mut self, n: usize) {
        let blank = self.blank_cell();
        self.buffer_mut().scroll_region_down(n, blank);
    }

    /// DECSTBM: set the scroll region, then home the cursor (origin-mode
    /// respected). An invalid region (`top >= bottom`) is ignored.
    fn set_scroll_region(&mut self, top: i64, bottom: i64) {
        let origin = self.modes.contains(Modes::ORIGIN);
        let buf = self.buffer_mut();
        let h = buf.height;
        let top0 = ((top.max(1) - 1) as usize).min(h - 1);
        let bottom_arg = if bottom <= 0 { h as i64 } else { bottom };
        let bottom0 = ((bottom_arg.max(1) - 1) as usize).min(h - 1);
        if top0 < bottom0 {
            buf.scroll_top = top0;
            buf.scroll_bottom = bottom0;
        }
        buf.cursor.x = 0;
        buf.cursor.y = if origin { buf.scroll_top } else { 0 };
        buf.cursor.pending_wrap = false;
    }

    fn csi_set_reset_mode(&mut self, params: &Params, enable: bool) {
        for slot in &params.slots {
            let Some(number) = slot else { continue };
            if params.marker == Some(b'?') {
                if *number == 1049 {
                    self.set_alt_screen(enable);
                }
                self.modes.set_private(*number, enable);
            } else {
                self.modes.set_ansi(*number, enable);
            }
        }
    }

    fn tab_clear(&mut self, n: i64) {
        let x = self.buffer().cursor.x;
        let buf = self.buffer_mut();
        match n {
            3 => buf.clear_all_tab_stops(),
            _ => buf.clear_tab_stop(x),
        }
    }

    fn device_attributes(&mut self) {
        self.responses.extend_from_slice(b"\x1b[?1;2c");
    }

    fn device_status_report(&mut self, n: i64) {
        match n {
            5 => self.responses.extend_from_slice(b"\x1b[0n"),
            6 => {
                let row = self.buffer().cursor.y + 1;
                let col = self.buffer().cursor.x + 1;
                self.responses.extend_from_slice(format!("\x1b[{row};{col}R").as_bytes());
            }
            _ => {}
        }
    }

    fn sgr(&mut self, params: &Params) {
        let values: Vec<i64> = params.slots.iter().map(|s| s.unwrap_or(0)).collect();
        let mut i = 0;
        while i < values.len() {
            let p = values[i];
            i += 1;
            match p {
                0 => self.pen = Pen::default(),
                1 => self.pen.attrs.insert(Attrs::BOLD),
                3 => self.pen.attrs.insert(Attrs::ITALIC),
                4 => self.pen.attrs.insert(Attrs::UNDERLINE),
                5 => self.pen.attrs.insert(Attrs::BLINK),
                7 => self.pen.attrs.insert(Attrs::INVERSE),
                9 => self.pen.attrs.insert(Attrs::STRIKETHROUGH),
                22 => self.pen.attrs.remove(Attrs::BOLD),
                23 => self.pen.attrs.remove(Attrs::ITALIC),
                24 => self.pen.attrs.remove(Attrs::UNDERLINE),
                25 => self.pen.attrs.remove(Attrs::BLINK),
                27 => self.pen.attrs.remove(Attrs::INVERSE),
                29 => self.pen.attrs.remove(Attrs::STRIKETHROUGH),
                30..=37 => self.pen.fg = Color::Indexed((p - 30) as u8),
                90..=97 => self.pen.fg = Color::Indexed((p - 90 + 8) as u8),
                40..=47 => self.pen.bg = Color::Indexed((p - 40) as u8),
                100..=107 => self.pen.bg = Color::Indexed((p - 100 + 8) as u8),
                39 => self.pen.fg = Color::Default,
                49 => self.pen.bg = Color::Default,
                38 | 48 => self.sgr_extended_color(p == 38, &values, &mut i),
                _ => {}
            }
        }
    }

    /// Consumes the `5;N` or `2;R;G;B` tail of an extended SGR color. A
    /// malformed or truncated tail aborts just this color change; `i` is
    /// left wherever parsing stopped so later parameters keep processing.
    fn sgr_extended_color(&mut self, is_fg: bool, values: &[i64], i: &mut usize) {
        match values.get(*i) {
            Some(&5) => {
                *i += 1;
                if let Some(&idx) = values.get(*i) {
                    *i += 1;
                    let color = Color::Indexed(idx.clamp(0, 255) as u8);
                    if is_fg { self.pen.fg = color } else { self.pen.bg = color }
                }
            }
            Some(&2) => {
                *i += 1;
                if *i + 2 < values.len() {
                    let r = values[*i].clamp(0, 255) as u8;
                    let g = values[*i + 1].clamp(0, 255) as u8;
                    let b = values[*i + 2].clamp(0, 255) as u8;
                    *i += 3;
                    let color = Color::Rgb(r, g, b);
                    if is_fg { self.pen.fg = color } else { self.pen.bg = color }
                } else {
                    *i = values.len();
                }
            }
            Some(_) => *i += 1,
            None => {}
        }
    }

    fn wrap_to_next_line(&mut self) {
        let blank = self.blank_cell();
        let buf = self.buffer_mut();
        let bottom = buf.scroll_bottom;
        buf.cursor.x = 0;
        if buf.cursor.y == bottom {
            buf.scroll_region_up(1, blank);
        } else {
            buf.cursor.y += 1;
        }
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl Actor for ScreenBuffer {
    fn print(&mut self, c: char) {
        let ch = self.active_charset().translate(c);
        let width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1) as u8;
        let autowrap = self.modes.contains(Modes::AUTOWRAP);

        if self.buffer().cursor.pending_wrap {
            if autowrap {
                self.wrap_to_next_line();
            }
            self.buffer_mut().cursor.pending_wrap = false;
        }

        let pen = self.pen;
        let (x, y) = {
            let cursor = self.buffer().cursor;
            (cursor.x, cursor.y)
        };
        self.buffer_mut().set_cell(x, y, Cell { ch, pen, width });

        let buf = self.buffer_mut();
        if x < buf.width - 1 {
            buf.cursor.x = x + 1;
        } else if autowrap {
            buf.cursor.pending_wrap = true;
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x08 => self.backspace(),
            0x09 => self.tab(),
            0x0A | 0x0B | 0x0C => self.index(),
            0x0D => self.carriage_return(),
            0x84 => self.index(),     // IND (C1)
            0x85 => self.next_line(), // NEL (C1)
            0x88 => {
                let x = self.buffer().cursor.x;
                self.buffer_mut().set_tab_stop(x);
            } // HTS (C1)
            0x8D => self.reverse_index(), // RI (C1)
            _ => {} // BEL and unhandled controls: forwarded to the handler, ignored here
        }
    }

    fn hook(&mut self, _byte: u8, _params: &[i64], _intermediates: &[u8], _ignored_excess_intermediates: bool) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, params: &[&[u8]]) {
        let Some(first) = params.first() else { return };
        let Ok(text) = std::str::from_utf8(first) else { return };
        let Ok(command) = text.parse::<u32>() else { return };
        if matches!(command, 0 | 1 | 2) {
            if let Some(text) = params.get(1) {
                self.title = String::from_utf8_lossy(text).into_owned();
            }
        }
    }

    fn csi_dispatch(&mut self, raw: &[termalive_vte::CsiParam], _parameters_truncated: bool, byte: u8) {
        let params = Params::parse(raw);
        match byte {
            b'A' => self.cursor_up(params.count(0, 1) as usize),
            b'B' => self.cursor_down(params.count(0, 1) as usize),
            b'C' => self.cursor_forward(params.count(0, 1) as usize),
            b'D' => self.cursor_back(params.count(0, 1) as usize),
            b'E' => self.cursor_next_line(params.count(0, 1) as usize),
            b'F' => self.cursor_prev_line(params.count(0, 1) as usize),
            b'G' | b'`' => self.cursor_col(params.count(0, 1) as usize),
            b'H' | b'f' => self.cursor_pos(params.count(0, 1) as usize, params.count(1, 1) as usize),
            b'd' => self.cursor_row(params.count(0, 1) as usize),
            b'J' => self.erase_display(params.get(0, 0)),
            b'K' => self.erase_line(params.get(0, 0)),
            b'L' => self.insert_lines(params.count(0, 1) as usize),
            b'M' => self.delete_lines(params.count(0, 1) as usize),
            b'P' => self.delete_chars(params.count(0, 1) as usize),
            b'@' => self.insert_chars(params.count(0, 1) as usize),
            b'X' => self.erase_chars(params.count(0, 1) as usize),
            b'S' => self.scroll_up(params.count(0, 1) as usize),
            b'T' => self.scroll_down(params.count(0, 1) as usize),
            b'r' => self.set_scroll_region(params.get(0, 1), params.get(1, self.height as i64)),
            b'h' => self.csi_set_reset_mode(&params, true),
            b'l' => self.csi_set_reset_mode(&params, false),
            b'm' => self.sgr(&params),
            b's' => self.save_cursor(),
            b'u' => self.restore_cursor(),
            b'c' => self.device_attributes(),
            b'n' => self.device_status_report(params.get(0, 0)),
            b'g' => self.tab_clear(params.get(0, 0)),
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, _params: &[i64], intermediates: &[u8], _ignored_excess_intermediates: bool, byte: u8) {
        if let Some(&lead) = intermediates.first() {
            match lead {
                b'(' => {
                    if let Some(cs) = Charset::from_final_byte(byte) {
                        self.g0 = cs;
                    }
                }
                b')' => {
                    if let Some(cs) = Charset::from_final_byte(byte) {
                        self.g1 = cs;
                    }
                }
                _ => {}
            }
            return;
        }

        match byte {
            b'7' => self.save_cursor(),
            b'8' => self.restore_cursor(),
            b'c' => self.reset(),
            b'D' => self.index(),
            b'M' => self.reverse_index(),
            b'E' => self.next_line(),
            b'6' => self.back_index(),
            b'9' => self.forward_index(),
            b'=' | b'>' => {} // keypad mode, recognized only
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termalive_vte::Parser;

    fn feed(screen: &mut ScreenBuffer, bytes: &[u8]) {
        Parser::new().advance(bytes, screen);
    }

    #[test]
    fn sgr_round_trip_scenario() {
        let mut screen = ScreenBuffer::new(10, 3);
        feed(&mut screen, b"\x1b[1;31mA\x1b[0mB");
        let a = screen.get_cell(0, 0);
        assert_eq!(a.ch, 'A');
        assert!(a.pen.attrs.contains(Attrs::BOLD));
        assert_eq!(a.pen.fg, Color::Indexed(1));
        let b = screen.get_cell(1, 0);
        assert_eq!(b.ch, 'B');
        assert_eq!(b.pen, Pen::default());
    }

    #[test]
    fn scroll_region_confinement_scenario() {
        let mut screen = ScreenBuffer::new(10, 5);
        feed(&mut screen, b"Line1\r\nLine2\r\nLine3\r\nLine4\r\nLine5");
        feed(&mut screen, b"\x1b[2;4r\x1b[4;1H");
        feed(&mut screen, b"\r\nNewLine");

        assert_eq!(screen.get_row_text(0), "Line1");
        assert_eq!(screen.get_row_text(1), "Line3");
        assert_eq!(screen.get_row_text(2), "Line4");
        assert_eq!(screen.get_row_text(3), "NewLine");
        assert_eq!(screen.get_row_text(4), "Line5");
    }

    #[test]
    fn title_is_set_by_either_terminator() {
        let mut screen = ScreenBuffer::new(10, 2);
        feed(&mut screen, b"\x1b]2;hello\x1b\\");
        assert_eq!(screen.title(), "hello");

        let mut screen = ScreenBuffer::new(10, 2);
        feed(&mut screen, b"\x1b]2;hello\x07");
        assert_eq!(screen.title(), "hello");
    }

    #[test]
    fn pending_wrap_defers_to_next_print() {
        let mut screen = ScreenBuffer::new(3, 2);
        feed(&mut screen, b"abc");
        assert_eq!(screen.cursor_x(), 2);
        feed(&mut screen, b"d");
        assert_eq!(screen.get_row_text(0), "abc");
        assert_eq!(screen.get_row_text(1), "d");
    }

    #[test]
    fn autowrap_off_overwrites_last_column() {
        let mut screen = ScreenBuffer::new(3, 2);
        feed(&mut screen, b"\x1b[?7labc");
        assert_eq!(screen.cursor_x(), 2);
        feed(&mut screen, b"d");
        assert_eq!(screen.get_cell(2, 0).ch, 'd');
        assert_eq!(screen.cursor_y(), 0);
    }

    #[test]
    fn cup_clamps_to_grid_bounds() {
        let mut screen = ScreenBuffer::new(10, 5);
        feed(&mut screen, b"\x1b[0;0H");
        assert_eq!((screen.cursor_x(), screen.cursor_y()), (0, 0));
        feed(&mut screen, b"\x1b[999;999H");
        assert_eq!((screen.cursor_x(), screen.cursor_y()), (9, 4));
    }

    #[test]
    fn reset_matches_a_fresh_buffer() {
        let mut screen = ScreenBuffer::new(10, 5);
        feed(&mut screen, b"\x1b[1;31mhello\x1b[3;3r");
        screen.reset();
        let fresh = ScreenBuffer::new(10, 5);
        assert_eq!(screen.get_row_text(0), fresh.get_row_text(0));
        assert_eq!(screen.cursor_x(), fresh.cursor_x());
        assert_eq!(screen.cursor_visible(), fresh.cursor_visible());
    }

    #[test]
    fn alternate_screen_preserves_primary_contents() {
        let mut screen = ScreenBuffer::new(10, 2);
        feed(&mut screen, b"primary");
        feed(&mut screen, b"\x1b[?1049h");
        assert!(screen.is_alternate_screen());
        feed(&mut screen, b"alt-text");
        assert_eq!(screen.get_row_text(0), "alt-text");
        feed(&mut screen, b"\x1b[?1049l");
        assert!(!screen.is_alternate_screen());
        assert_eq!(screen.get_row_text(0), "primary");
    }

    #[test]
    fn device_status_report_emits_cursor_position() {
        let mut screen = ScreenBuffer::new(10, 5);
        feed(&mut screen, b"\x1b[3;4H\x1b[6n");
        assert_eq!(screen.take_responses(), b"\x1b[3;4R");
    }

    #[test]
    fn csi_param_slot_limit_ignores_the_sequence() {
        let mut screen = ScreenBuffer::new(10, 5);
        let mut seq = b"\x1b[".to_vec();
        for i in 0..20 {
            if i > 0 {
                seq.push(b';');
            }
            seq.extend_from_slice(b"1");
        }
        seq.push(b'm');
        feed(&mut screen, &seq);
        // Overflowed sequence never dispatches: pen stays default.
        assert_eq!(screen.pen, Pen::default());
    }
}
