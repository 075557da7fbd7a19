//! Decoding of escaped Wine registry strings
//!
//! Wine writes string data in its text hives with C-style escapes. Anything
//! outside printable ASCII becomes a `\x` hex escape of a UTF-16 code unit, so
//! a supplementary-plane character is stored as two escapes (a surrogate pair).
//! This mirrors `parse_strW()` from the Wine server.

use std::iter::Peekable;
use std::str::Chars;

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Decode an escaped registry string back into UTF-8.
///
/// Never fails: unknown escapes are copied literally, a trailing lone
/// backslash is dropped and unpaired surrogates become U+FFFD.
pub fn decode(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = Utf16Sink::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push_char(ch);
            continue;
        }

        let Some(escaped) = chars.next() else {
            break;
        };

        match escaped {
            'a' => out.push_char('\x07'),
            'b' => out.push_char('\x08'),
            'e' => out.push_char('\x1b'),
            'f' => out.push_char('\x0c'),
            'n' => out.push_char('\n'),
            'r' => out.push_char('\r'),
            't' => out.push_char('\t'),
            'v' => out.push_char('\x0b'),
            'x' => match take_digits(&mut chars, 16, 4) {
                Some((unit, _)) => out.push_unit(unit),
                None => out.push_char('x'),
            },
            '0'..='7' => {
                let first = escaped as u32 - '0' as u32;
                let rest = take_digits(&mut chars, 8, 2);
                let unit = match rest {
                    Some((value, count)) => first * 8u32.pow(count) + value,
                    None => first,
                };
                out.push_unit(unit);
            }
            other => out.push_char(other),
        }
    }

    out.finish()
}

/// Accumulate up to `max` digits of `radix`.
///
/// Returns the value and the number of digits consumed, or `None` when the
/// next character is not a digit at all.
fn take_digits(chars: &mut Peekable<Chars<'_>>, radix: u32, max: u32) -> Option<(u32, u32)> {
    let mut value = 0u32;
    let mut count = 0u32;
    while count < max {
        let Some(digit) = chars.peek().and_then(|c| c.to_digit(radix)) else {
            break;
        };
        chars.next();
        value = value * radix + digit;
        count += 1;
    }
    (count > 0).then_some((value, count))
}

/// Output buffer that joins UTF-16 surrogate pairs produced by numeric escapes.
struct Utf16Sink {
    out: String,
    high: Option<u32>,
}

impl Utf16Sink {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            high: None,
        }
    }

    fn flush_high(&mut self) {
        if self.high.take().is_some() {
            self.out.push(REPLACEMENT);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.flush_high();
        self.out.push(ch);
    }

    fn push_unit(&mut self, unit: u32) {
        match unit {
            0xD800..=0xDBFF => {
                self.flush_high();
                self.high = Some(unit);
            }
            0xDC00..=0xDFFF => match self.high.take() {
                Some(high) => {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                    self.out.push(char::from_u32(code).unwrap_or(REPLACEMENT));
                }
                None => self.out.push(REPLACEMENT),
            },
            _ => {
                self.flush_high();
                self.out.push(char::from_u32(unit).unwrap_or(REPLACEMENT));
            }
        }
    }

    fn finish(mut self) -> String {
        self.flush_high();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_escapes() {
        let cases = [
            ("\\a", "\x07"),
            ("\\b", "\x08"),
            ("\\e", "\x1b"),
            ("\\f", "\x0c"),
            ("\\n", "\n"),
            ("\\r", "\r"),
            ("\\t", "\t"),
            ("\\v", "\x0b"),
        ];
        for (raw, expected) in cases {
            assert_eq!(decode(raw), expected, "decoding {raw:?}");
        }
    }

    #[test]
    fn test_hex_escape() {
        assert_eq!(decode("\\x41"), "A");
        assert_eq!(decode("caf\\xe9"), "café");
        assert_eq!(decode("\\x20ac"), "€");
    }

    #[test]
    fn test_hex_escape_stops_after_four_digits() {
        assert_eq!(decode("\\x004142"), "A42");
    }

    #[test]
    fn test_hex_escape_without_digits() {
        assert_eq!(decode("\\xZ"), "xZ");
        assert_eq!(decode("\\x"), "x");
    }

    #[test]
    fn test_octal_escape() {
        assert_eq!(decode("\\101"), "A");
        assert_eq!(decode("\\0"), "\0");
        assert_eq!(decode("\\1018"), "A8");
        assert_eq!(decode("\\7z"), "\x07z");
    }

    #[test]
    fn test_unknown_escape_copies_character() {
        assert_eq!(decode("C:\\\\windows"), "C:\\windows");
        assert_eq!(decode("\\\"quoted\\\""), "\"quoted\"");
        assert_eq!(decode("\\q"), "q");
    }

    #[test]
    fn test_trailing_backslash_dropped() {
        assert_eq!(decode("abc\\"), "abc");
    }

    #[test]
    fn test_surrogate_pair_joined() {
        assert_eq!(decode("\\xd83d\\xde00"), "😀");
    }

    #[test]
    fn test_unpaired_surrogates_replaced() {
        assert_eq!(decode("\\xd83dA"), "\u{FFFD}A");
        assert_eq!(decode("\\xde00"), "\u{FFFD}");
        assert_eq!(decode("\\xd83d"), "\u{FFFD}");
    }

    #[test]
    fn test_plain_text_unchanged() {
        for s in ["", "plain", "Start Menu/Programs", "ünïcödé"] {
            assert_eq!(decode(s), s);
        }
    }
}
