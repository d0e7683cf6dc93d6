//! Byte cursor for the response grammar.
//!
//! The response parser is recursive descent straight over the raw bytes;
//! there is no token stream. Each grammar element (atom word, quoted
//! string, literal, number) is one read method, and compound rules
//! compose them. Methods consume on success and report the byte offset
//! on failure.

use crate::{Error, Result};

/// Bytes that can appear in an atom word.
///
/// The grammar's delimiters stay out: parens, brackets, the literal
/// brace, list wildcards, the quote, whitespace and controls. Backslash
/// is out too; words like `\Seen` go through [`Cursor::flag_word`].
pub(crate) const fn is_atom_byte(b: u8) -> bool {
    b.is_ascii_graphic()
        && !matches!(
            b,
            b'(' | b')' | b'{' | b'[' | b']' | b'%' | b'*' | b'"' | b'\\'
        )
}

pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.at).copied()
    }

    /// True once only a line terminator (or nothing) remains.
    pub fn at_line_end(&self) -> bool {
        matches!(self.bytes.get(self.at..), None | Some([] | [b'\r', b'\n'] | [b'\r'] | [b'\n']))
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.at += 1;
        Some(b)
    }

    /// Consumes `byte` if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.at += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.fail(format!("expected {:?}", char::from(byte))))
        }
    }

    pub fn expect_sp(&mut self) -> Result<()> {
        self.expect(b' ')
    }

    pub fn skip_sp(&mut self) {
        while self.eat(b' ') {}
    }

    pub fn fail(&self, reason: impl Into<String>) -> Error {
        Error::Parse {
            at: self.at,
            reason: reason.into(),
        }
    }

    /// Reads an atom word.
    pub fn word(&mut self) -> Result<&'a str> {
        let start = self.at;
        while self.peek().is_some_and(is_atom_byte) {
            self.at += 1;
        }
        if start == self.at {
            return Err(self.fail("expected an atom"));
        }
        std::str::from_utf8(&self.bytes[start..self.at])
            .map_err(|_| self.fail("atom is not ASCII"))
    }

    /// Reads a run of digits as u64; MODSEQ and UIDVALIDITY need the full
    /// range, so nothing narrows by default.
    pub fn number(&mut self) -> Result<u64> {
        let start = self.at;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.at += 1;
        }
        if start == self.at {
            return Err(self.fail("expected a number"));
        }
        std::str::from_utf8(&self.bytes[start..self.at])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| self.fail("number out of range"))
    }

    /// Reads a number that must fit the grammar's 32-bit slots.
    pub fn number32(&mut self) -> Result<u32> {
        let n = self.number()?;
        u32::try_from(n).map_err(|_| self.fail("number exceeds 32 bits"))
    }

    /// Reads a quoted string, resolving `\"` and `\\` escapes.
    pub fn quoted(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut value = Vec::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b @ (b'"' | b'\\')) => value.push(b),
                    _ => return Err(self.fail("bad escape in quoted string")),
                },
                Some(b) => value.push(b),
                None => return Err(self.fail("quoted string never closes")),
            }
        }
        String::from_utf8(value).map_err(|_| self.fail("quoted string is not UTF-8"))
    }

    /// Reads a literal: `{N}` or `{N+}`, CRLF, then N raw bytes.
    ///
    /// The framing layer guarantees the payload is present in full.
    pub fn literal(&mut self) -> Result<Vec<u8>> {
        self.expect(b'{')?;
        let len = self.number()?;
        self.eat(b'+');
        self.expect(b'}')?;
        // LITERAL+ output from quirky servers may omit the CRLF
        if self.eat(b'\r') {
            self.expect(b'\n')?;
        }
        let len = usize::try_from(len).map_err(|_| self.fail("literal too large"))?;
        let end = self
            .at
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.fail("literal is truncated"))?;
        let data = self.bytes[self.at..end].to_vec();
        self.at = end;
        Ok(data)
    }

    /// Reads an nstring: quoted, literal, or the `NIL` atom.
    pub fn nstring(&mut self) -> Result<Option<String>> {
        match self.peek() {
            Some(b'"') => self.quoted().map(Some),
            Some(b'{') => {
                let data = self.literal()?;
                String::from_utf8(data)
                    .map(Some)
                    .map_err(|_| self.fail("literal is not UTF-8"))
            }
            _ => {
                let word = self.word()?;
                if word.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Ok(Some(word.to_string()))
                }
            }
        }
    }

    /// Reads an nstring keeping raw bytes (body content can be binary).
    pub fn nbytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.peek() {
            Some(b'"') => self.quoted().map(|s| Some(s.into_bytes())),
            Some(b'{') => self.literal().map(Some),
            _ => {
                let word = self.word()?;
                if word.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Ok(Some(word.as_bytes().to_vec()))
                }
            }
        }
    }

    /// Reads an astring (atom or string); NIL here is an error.
    pub fn astring(&mut self) -> Result<String> {
        match self.peek() {
            Some(b'"') => self.quoted(),
            Some(b'{') => {
                let data = self.literal()?;
                String::from_utf8(data).map_err(|_| self.fail("literal is not UTF-8"))
            }
            _ => self.word().map(str::to_string),
        }
    }

    /// Reads a flag-shaped word: optional leading backslash, and `\*`.
    pub fn flag_word(&mut self) -> Result<String> {
        if self.eat(b'\\') {
            if self.eat(b'*') {
                return Ok("\\*".to_string());
            }
            return Ok(format!("\\{}", self.word()?));
        }
        self.word().map(str::to_string)
    }

    /// Takes the rest of the line, consuming the terminator.
    pub fn line(&mut self) -> String {
        let rest = &self.bytes[self.at..];
        let len = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(rest.len());
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.at += len;
        self.eat(b'\r');
        self.eat(b'\n');
        text
    }

    /// Skips one value: an atom, string, literal, or a balanced group.
    ///
    /// Used for fields and response codes this client does not model.
    /// Quoted strings and literals inside groups are skipped whole, so a
    /// paren in a subject line cannot unbalance the walk.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"') => self.quoted().map(|_| ()),
            Some(b'{') => self.literal().map(|_| ()),
            Some(b'(') => {
                self.at += 1;
                self.skip_group()
            }
            Some(b'<') => {
                while self.bump().is_some_and(|b| b != b'>') {}
                Ok(())
            }
            _ => {
                while self.peek().is_some_and(|b| is_atom_byte(b) || b == b'\\') {
                    self.at += 1;
                }
                Ok(())
            }
        }
    }

    /// Consumes up to and including the `)` closing the group the cursor
    /// is currently inside.
    pub fn skip_group(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b')') => {
                    self.at += 1;
                    return Ok(());
                }
                Some(b' ') => {
                    self.at += 1;
                }
                Some(_) => self.skip_value()?,
                None => return Err(self.fail("group never closes")),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn words_stop_at_delimiters() {
        let mut c = Cursor::new(b"OK [UIDNEXT 4392]");
        assert_eq!(c.word().unwrap(), "OK");
        assert!(c.eat(b' '));
        assert!(c.eat(b'['));
        assert_eq!(c.word().unwrap(), "UIDNEXT");
    }

    #[test]
    fn sequence_sets_are_single_words() {
        let mut c = Cursor::new(b"300:310,405 rest");
        assert_eq!(c.word().unwrap(), "300:310,405");
    }

    #[test]
    fn numbers_keep_64_bits() {
        let mut c = Cursor::new(b"18446744073709551615");
        assert_eq!(c.number().unwrap(), u64::MAX);
    }

    #[test]
    fn number32_rejects_overflow() {
        let mut c = Cursor::new(b"4294967296");
        assert!(c.number32().is_err());
    }

    #[test]
    fn quoted_strings_unescape() {
        let mut c = Cursor::new(b"\"a \\\"b\\\" \\\\c\"");
        assert_eq!(c.quoted().unwrap(), "a \"b\" \\c");
    }

    #[test]
    fn quoted_string_must_close() {
        let mut c = Cursor::new(b"\"dangling");
        assert!(c.quoted().is_err());
    }

    #[test]
    fn literal_carries_payload() {
        let mut c = Cursor::new(b"{5}\r\nhe)lo rest");
        assert_eq!(c.literal().unwrap(), b"he)lo");
        assert!(c.eat(b' '));
        assert_eq!(c.word().unwrap(), "rest");
    }

    #[test]
    fn literal_plus_marker_is_accepted() {
        let mut c = Cursor::new(b"{3+}\r\nabc");
        assert_eq!(c.literal().unwrap(), b"abc");
    }

    #[test]
    fn truncated_literal_is_an_error() {
        let mut c = Cursor::new(b"{10}\r\nshort");
        assert!(c.literal().is_err());
    }

    #[test]
    fn nstring_resolves_nil() {
        let mut c = Cursor::new(b"NIL \"x\" nil");
        assert_eq!(c.nstring().unwrap(), None);
        c.skip_sp();
        assert_eq!(c.nstring().unwrap(), Some("x".to_string()));
        c.skip_sp();
        assert_eq!(c.nstring().unwrap(), None);
    }

    #[test]
    fn flag_words_keep_the_backslash() {
        let mut c = Cursor::new(b"\\Seen \\* $Custom");
        assert_eq!(c.flag_word().unwrap(), "\\Seen");
        c.skip_sp();
        assert_eq!(c.flag_word().unwrap(), "\\*");
        c.skip_sp();
        assert_eq!(c.flag_word().unwrap(), "$Custom");
    }

    #[test]
    fn line_consumes_the_terminator() {
        let mut c = Cursor::new(b"LOGIN completed\r\n");
        assert_eq!(c.line(), "LOGIN completed");
        assert!(c.at_line_end());
    }

    #[test]
    fn skip_value_handles_nested_groups_and_strings() {
        // The quoted paren and the literal payload must not unbalance the
        // walk; the literal here contains three open parens
        let mut c = Cursor::new(b"(a (b \"par)en\" {3}\r\n((( c)) tail");
        c.skip_value().unwrap();
        assert!(c.eat(b' '));
        assert_eq!(c.word().unwrap(), "tail");
    }
}
