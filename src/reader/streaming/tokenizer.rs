// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Push tokenizer for the array-of-rows chunk format.
//!
//! The tokenizer is fed arbitrary byte slices as they arrive from the stream
//! and keeps enough state to resume in the middle of a string, an escape
//! sequence or a literal. Every completed cell is pushed into the
//! [`MatrixWriter`] immediately, so peak memory is one cell plus the staged
//! rows.
//!
//! ```text
//!   Start --'['--> RowOrEnd --'['--> CellOrRowEnd --value--> CellCommaOrRowEnd
//!                     |                   |                     |        |
//!                    ']'                 ']'                   ','      ']'
//!                     v                   v                     v        v
//!                   Done <--']'-- CommaOrEnd <------------------+--------+
//!                                     |                         |
//!                                    ','--> Row --'['-->        Cell --value-->
//! ```

use crate::error::{ChunkErrorHelper, Result};
use crate::types::matrix::{Cell, MatrixWriter};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the top-level `[`.
    Start,
    /// After the top-level `[`: a row or the closing `]`.
    RowOrEnd,
    /// After a `,` between rows: a row is required.
    Row,
    /// After a row: `,` or the closing `]`.
    CommaOrEnd,
    /// After a row's `[`: a cell or the row's `]`.
    CellOrRowEnd,
    /// After a `,` inside a row: a cell is required.
    Cell,
    /// After a cell: `,` or the row's `]`.
    CellCommaOrRowEnd,
    /// After the top-level `]`: only whitespace may follow.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode { high: Option<u32>, digits: u8, value: u32 },
    /// A high surrogate was decoded and `\` must follow.
    LowBackslash { high: u32 },
    /// A high surrogate was decoded and `\` was seen, `u` must follow.
    LowU { high: u32 },
}

/// A string cell whose closing quote has not been seen yet.
#[derive(Debug)]
struct StringScan {
    buf: Vec<u8>,
    escape: Escape,
}

impl StringScan {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            escape: Escape::None,
        }
    }

    /// Consume string body bytes. Returns the number of bytes consumed and
    /// whether the closing quote was among them.
    fn scan(&mut self, input: &[u8]) -> std::result::Result<(usize, bool), &'static str> {
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            match self.escape {
                Escape::None => {
                    let plain = input[i..]
                        .iter()
                        .position(|&c| c == b'"' || c == b'\\' || c < 0x20)
                        .unwrap_or(input.len() - i);
                    self.buf.extend_from_slice(&input[i..i + plain]);
                    i += plain;
                    match input.get(i) {
                        None => break,
                        Some(b'"') => return Ok((i + 1, true)),
                        Some(b'\\') => {
                            self.escape = Escape::Backslash;
                            i += 1;
                        }
                        Some(_) => return Err("control character in string"),
                    }
                }
                Escape::Backslash => {
                    i += 1;
                    let unescaped = match b {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'/' => b'/',
                        b'b' => 0x08,
                        b'f' => 0x0c,
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'u' => {
                            self.escape = Escape::Unicode {
                                high: None,
                                digits: 0,
                                value: 0,
                            };
                            continue;
                        }
                        _ => return Err("invalid escape sequence"),
                    };
                    self.buf.push(unescaped);
                    self.escape = Escape::None;
                }
                Escape::Unicode {
                    high,
                    digits,
                    value,
                } => {
                    let digit = (b as char).to_digit(16).ok_or("invalid unicode escape")?;
                    i += 1;
                    let value = (value << 4) | digit;
                    if digits < 3 {
                        self.escape = Escape::Unicode {
                            high,
                            digits: digits + 1,
                            value,
                        };
                        continue;
                    }
                    let code = match (high, value) {
                        (None, 0xD800..=0xDBFF) => {
                            self.escape = Escape::LowBackslash { high: value };
                            continue;
                        }
                        (None, 0xDC00..=0xDFFF) => return Err("lone trailing surrogate"),
                        (None, v) => v,
                        (Some(h), 0xDC00..=0xDFFF) => {
                            0x10000 + ((h - 0xD800) << 10) + (value - 0xDC00)
                        }
                        (Some(_), _) => return Err("lone leading surrogate"),
                    };
                    let ch = char::from_u32(code).ok_or("invalid unicode escape")?;
                    let mut utf8 = [0u8; 4];
                    self.buf
                        .extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                    self.escape = Escape::None;
                }
                Escape::LowBackslash { high } => {
                    if b != b'\\' {
                        return Err("lone leading surrogate");
                    }
                    i += 1;
                    self.escape = Escape::LowU { high };
                }
                Escape::LowU { high } => {
                    if b != b'u' {
                        return Err("lone leading surrogate");
                    }
                    i += 1;
                    self.escape = Escape::Unicode {
                        high: Some(high),
                        digits: 0,
                        value: 0,
                    };
                }
            }
        }
        Ok((i, false))
    }
}

#[derive(Debug)]
enum Token {
    None,
    String(StringScan),
    /// Number, `true`, `false` or `null` being accumulated.
    Literal(Vec<u8>),
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn ends_literal(b: u8) -> bool {
    b == b',' || b == b']' || is_whitespace(b)
}

/// JSON number grammar: `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`.
pub(crate) fn is_json_number(text: &[u8]) -> bool {
    fn digits(text: &[u8], mut i: usize) -> usize {
        while i < text.len() && text[i].is_ascii_digit() {
            i += 1;
        }
        i
    }

    let mut i = 0;
    if text.first() == Some(&b'-') {
        i += 1;
    }
    match text.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits(text, i),
        _ => return false,
    }
    if text.get(i) == Some(&b'.') {
        let end = digits(text, i + 1);
        if end == i + 1 {
            return false;
        }
        i = end;
    }
    if matches!(text.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(text.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = digits(text, i);
        if end == i {
            return false;
        }
        i = end;
    }
    i == text.len()
}

/// Convert a completed literal into a cell.
fn literal_cell(text: Vec<u8>) -> std::result::Result<Cell, &'static str> {
    let valid = match text.as_slice() {
        b"null" => return Ok(Cell::Null),
        b"true" | b"false" => true,
        t => is_json_number(t),
    };
    if !valid {
        return Err("invalid literal");
    }
    String::from_utf8(text)
        .map(Cell::Value)
        .map_err(|_| "invalid literal")
}

/// Incremental tokenizer writing rows into a [`MatrixWriter`].
#[derive(Debug)]
pub(crate) struct RowTokenizer {
    state: State,
    token: Token,
    /// Bytes consumed so far, for error positions.
    offset: u64,
}

impl RowTokenizer {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Start,
            token: Token::None,
            offset: 0,
        }
    }

    fn malformed(&self, what: &str) -> crate::error::Error {
        ChunkErrorHelper::malformed_chunk().message(format!("{} at byte {}", what, self.offset))
    }

    /// Feed the next slice of the chunk.
    pub(crate) fn feed(&mut self, input: &[u8], writer: &mut MatrixWriter<'_>) -> Result<()> {
        let mut i = 0;
        while i < input.len() {
            match std::mem::replace(&mut self.token, Token::None) {
                Token::String(mut scan) => {
                    let (consumed, done) = scan.scan(&input[i..]).map_err(|e| {
                        self.offset += i as u64;
                        self.malformed(e)
                    })?;
                    i += consumed;
                    if done {
                        let text = String::from_utf8(scan.buf).map_err(|_| {
                            self.offset += i as u64;
                            self.malformed("invalid UTF-8 in string")
                        })?;
                        self.complete_cell(Cell::Value(text), writer)?;
                    } else {
                        self.token = Token::String(scan);
                    }
                    continue;
                }
                Token::Literal(mut text) => {
                    let rest = &input[i..];
                    let end = rest.iter().position(|&b| ends_literal(b)).unwrap_or(rest.len());
                    text.extend_from_slice(&rest[..end]);
                    i += end;
                    if i < input.len() {
                        let cell = literal_cell(text).map_err(|e| {
                            self.offset += i as u64;
                            self.malformed(e)
                        })?;
                        self.complete_cell(cell, writer)?;
                    } else {
                        self.token = Token::Literal(text);
                    }
                    continue;
                }
                Token::None => {}
            }

            let b = input[i];
            if let Err(e) = self.step(b, writer) {
                self.offset += i as u64;
                return Err(e);
            }
            i += 1;
        }
        self.offset += input.len() as u64;
        Ok(())
    }

    fn complete_cell(&mut self, cell: Cell, writer: &mut MatrixWriter<'_>) -> Result<()> {
        writer.push_cell(cell)?;
        self.state = State::CellCommaOrRowEnd;
        Ok(())
    }

    fn start_cell(&mut self, b: u8) -> Result<()> {
        match b {
            b'"' => self.token = Token::String(StringScan::new()),
            b'[' | b'{' => return Err(self.malformed("nested value in cell")),
            b',' | b']' => return Err(self.malformed("expected a cell value")),
            _ => self.token = Token::Literal(vec![b]),
        }
        Ok(())
    }

    fn end_row(&mut self, writer: &mut MatrixWriter<'_>) -> Result<()> {
        writer.end_row()?;
        trace!("Tokenized row {}", writer.rows_written() - 1);
        self.state = State::CommaOrEnd;
        Ok(())
    }

    fn step(&mut self, b: u8, writer: &mut MatrixWriter<'_>) -> Result<()> {
        if is_whitespace(b) {
            return Ok(());
        }
        match self.state {
            State::Start => {
                if b != b'[' {
                    return Err(self.malformed("chunk is not a JSON array"));
                }
                self.state = State::RowOrEnd;
            }
            State::RowOrEnd | State::Row => match b {
                b'[' => {
                    writer.begin_row()?;
                    self.state = State::CellOrRowEnd;
                }
                b']' if self.state == State::RowOrEnd => self.state = State::Done,
                _ => {
                    return Err(self.malformed(&format!(
                        "row {} is not a JSON array",
                        writer.rows_written()
                    )))
                }
            },
            State::CommaOrEnd => match b {
                b',' => self.state = State::Row,
                b']' => self.state = State::Done,
                _ => return Err(self.malformed("expected ',' or ']' after row")),
            },
            State::CellOrRowEnd => {
                if b == b']' {
                    self.end_row(writer)?;
                } else {
                    self.start_cell(b)?;
                }
            }
            State::Cell => self.start_cell(b)?,
            State::CellCommaOrRowEnd => match b {
                b',' => self.state = State::Cell,
                b']' => self.end_row(writer)?,
                _ => return Err(self.malformed("expected ',' or ']' after cell")),
            },
            State::Done => return Err(self.malformed("trailing characters after chunk")),
        }
        Ok(())
    }

    /// Signal end of stream. Fails unless a complete top-level array was seen.
    pub(crate) fn finish(&self) -> Result<()> {
        if self.state != State::Done || !matches!(self.token, Token::None) {
            return Err(self.malformed("unexpected end of chunk"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::matrix::ResultMatrix;

    /// Tokenize `input` in pieces of `piece` bytes.
    fn tokenize(input: &str, cols: usize, piece: usize) -> Result<ResultMatrix> {
        let mut matrix = ResultMatrix::allocate(0, cols);
        let mut writer = matrix.writer();
        let mut tokenizer = RowTokenizer::new();
        for part in input.as_bytes().chunks(piece) {
            tokenizer.feed(part, &mut writer)?;
        }
        tokenizer.finish()?;
        writer.finish()?;
        Ok(matrix)
    }

    fn text(matrix: &ResultMatrix, row: usize, col: usize) -> Option<String> {
        matrix.get(row, col).unwrap().as_text().map(str::to_string)
    }

    #[test]
    fn test_simple_rows_any_split() {
        let input = r#"[ ["1", "1.234", "abcde"],  ["2", "5.678", "fghi"] ]"#;
        for piece in [1, 2, 3, 7, input.len()] {
            let matrix = tokenize(input, 3, piece).unwrap();
            assert_eq!(matrix.row_count(), 2);
            assert_eq!(text(&matrix, 0, 1).as_deref(), Some("1.234"));
            assert_eq!(text(&matrix, 1, 2).as_deref(), Some("fghi"));
        }
    }

    #[test]
    fn test_literals_keep_their_text() {
        let matrix = tokenize("[[1.50, -0, 2E+3, true, false, null]]", 6, 1).unwrap();
        assert_eq!(text(&matrix, 0, 0).as_deref(), Some("1.50"));
        assert_eq!(text(&matrix, 0, 1).as_deref(), Some("-0"));
        assert_eq!(text(&matrix, 0, 2).as_deref(), Some("2E+3"));
        assert_eq!(text(&matrix, 0, 3).as_deref(), Some("true"));
        assert_eq!(text(&matrix, 0, 4).as_deref(), Some("false"));
        assert_eq!(text(&matrix, 0, 5), None);
    }

    #[test]
    fn test_escapes_split_across_feeds() {
        let input = r#"[["a\"b\\c\/\n\t", "é😀", ""]]"#;
        for piece in [1, 2, 5] {
            let matrix = tokenize(input, 3, piece).unwrap();
            assert_eq!(text(&matrix, 0, 0).as_deref(), Some("a\"b\\c/\n\t"));
            assert_eq!(text(&matrix, 0, 1).as_deref(), Some("é😀"));
            assert_eq!(text(&matrix, 0, 2).as_deref(), Some(""));
        }
    }

    #[test]
    fn test_raw_utf8_split_across_feeds() {
        let matrix = tokenize("[[\"日本語\"]]", 1, 1).unwrap();
        assert_eq!(text(&matrix, 0, 0).as_deref(), Some("日本語"));
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [
            "",
            "{}",
            r#""abc""#,
            "[1]",
            r#"[{"a": 1}]"#,
            "[[[1]]]",
            r#"[[{"a": 1}]]"#,
            "[[1,]]",
            "[[,1]]",
            "[[1] [2]]",
            "[[1]],",
            "[[1]] x",
            "[[01]]",
            "[[1.]]",
            "[[nul]]",
            r#"[["\x"]]"#,
            r#"[["\ud800"]]"#,
            r#"[["\udc00"]]"#,
            "[[\"a\nb\"]]",
            "[[\"abc",
            "[[1",
            "[",
        ] {
            let err = tokenize(input, 4, 3).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedChunk, "input: {:?}", input);
        }
    }

    #[test]
    fn test_wide_row_is_shape_violation() {
        let err = tokenize(r#"[["1","2","3"]]"#, 2, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeViolation);
    }

    #[test]
    fn test_json_number_grammar() {
        for ok in ["0", "-1", "10", "1.5", "1e5", "1E-5", "-0.0e+10"] {
            assert!(is_json_number(ok.as_bytes()), "{}", ok);
        }
        for bad in ["", "-", "+1", "01", ".5", "1.", "1e", "1e+", "0x1", "NaN"] {
            assert!(!is_json_number(bad.as_bytes()), "{}", bad);
        }
    }
}
