//! Turns the raw [`CsiParam`] list handed to `Actor::csi_dispatch` into the
//! slot/marker shape CSI dispatch needs: an optional private marker byte,
//! up to [`termalive_vte::MAX_PARAMS`] semicolon-delimited slots each
//! either "unset" or a parsed integer, and a single collected intermediate
//! byte. Colon-separated sub-parameters are consumed (so the sequence
//! parses) but not individually surfaced.

use termalive_vte::CsiParam;

/// Parsed view of one CSI sequence's parameters.
#[derive(Debug, Default, Clone)]
pub struct Params {
    /// `?`, `<`, `=`, or `>` when the sequence opened with a DEC private
    /// marker byte.
    pub marker: Option<u8>,
    /// A single 0x20-0x2F intermediate byte, if one preceded the final byte.
    pub intermediate: Option<u8>,
    /// One entry per semicolon-delimited slot; `None` is "unset".
    pub slots: Vec<Option<i64>>,
}

impl Params {
    pub fn parse(params: &[CsiParam]) -> Self {
        let mut out = Self::default();
        let mut current: Option<i64> = None;
        let mut have_current = false;

        for param in params {
            match *param {
                CsiParam::Integer(value) => {
                    current = Some(value);
                    have_current = true;
                }
                CsiParam::P(byte) => match byte {
                    b';' => {
                        out.slots.push(if have_current { current } else { None });
                        current = None;
                        have_current = false;
                    }
                    0x3C..=0x3F
                        if out.marker.is_none()
                            && out.slots.is_empty()
                            && !have_current =>
                    {
                        out.marker = Some(byte);
                    }
                    0x20..=0x2F => out.intermediate = Some(byte),
                    _ => { /* colon sub-parameter separator or similar: parsed, not surfaced */ }
                },
            }
        }
        out.slots.push(if have_current { current } else { None });
        out
    }

    /// Slot `index` (0-based), or `default` if absent/unset.
    #[must_use]
    pub fn get(&self, index: usize, default: i64) -> i64 {
        match self.slots.get(index) {
            Some(Some(value)) => *value,
            _ => default,
        }
    }

    /// Slot `index` treated as a count: unset or zero both mean `default`
    /// (the common VT convention for repeat counts like CUU/DCH/ICH).
    #[must_use]
    pub fn count(&self, index: usize, default: i64) -> i64 {
        match self.get(index, default) {
            0 => default,
            value => value,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<CsiParam> {
        let mut out = Vec::new();
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                out.push(CsiParam::P(b';'));
            }
            out.push(CsiParam::Integer(*v));
        }
        out
    }

    #[test]
    fn plain_integers_become_slots() {
        let p = Params::parse(&ints(&[1, 31]));
        assert_eq!(p.get(0, 0), 1);
        assert_eq!(p.get(1, 0), 31);
    }

    #[test]
    fn empty_sequence_is_one_unset_slot() {
        let p = Params::parse(&[]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(0, 1), 1);
        assert!(p.is_empty());
    }

    #[test]
    fn leading_semicolon_is_an_unset_first_slot() {
        let raw = [CsiParam::P(b';'), CsiParam::Integer(5)];
        let p = Params::parse(&raw);
        assert_eq!(p.get(0, 1), 1);
        assert_eq!(p.get(1, 1), 5);
    }

    #[test]
    fn private_marker_is_extracted() {
        let raw = [CsiParam::P(b'?'), CsiParam::Integer(1049)];
        let p = Params::parse(&raw);
        assert_eq!(p.marker, Some(b'?'));
        assert_eq!(p.get(0, 0), 1049);
    }

    #[test]
    fn colon_subparams_do_not_shift_slot_positions() {
        // `4:3` (curly underline) followed by `;31`
        let raw = [
            CsiParam::Integer(4),
            CsiParam::P(b':'),
            CsiParam::Integer(3),
            CsiParam::P(b';'),
            CsiParam::Integer(31),
        ];
        let p = Params::parse(&raw);
        assert_eq!(p.get(0, 0), 3); // last integer before the separator wins
        assert_eq!(p.get(1, 0), 31);
    }
}
