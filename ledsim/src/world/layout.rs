use std::{
    collections::{hash_map::Entry, HashMap},
    str::FromStr,
};

use thiserror::Error;

use super::Position;

/// Where every LED of the strip sits on the canvas.
///
/// The canvas is plain text; each delimited run of decimal digits is the index
/// of the LED drawn at the position of its first digit. Indices must cover
/// `0..N` exactly, which is how the strip length is discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    height: usize,
    width: usize,
    positions: Vec<Position>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("LED {index} is drawn twice, at {first} and at {second}")]
    DuplicateIndex {
        index: usize,
        first: Position,
        second: Position,
    },
    #[error("{token:?} at {position} is too large to be an LED index")]
    IndexTooLarge { token: String, position: Position },
    #[error(
        "layout does not use continuous LED indices, every LED between 0 and the \
         highest index must be drawn. Missing: {missing:?}"
    )]
    NonContinuous { missing: Vec<usize> },
}

/// A run of digits found on a canvas row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub column: usize,
    pub text: &'a str,
}

impl Layout {
    pub fn parse(canvas: &str) -> Result<Layout, LayoutError> {
        let rows = canvas_rows(canvas);
        let height = rows.len();
        let width = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0);

        let mut found: HashMap<usize, Position> = HashMap::new();

        for (row, line) in rows.iter().enumerate() {
            for token in tokens(line) {
                let position = Position::new(row, token.column);
                let index = token
                    .text
                    .parse::<usize>()
                    .map_err(|_| LayoutError::IndexTooLarge {
                        token: token.text.to_string(),
                        position,
                    })?;

                match found.entry(index) {
                    Entry::Occupied(first) => {
                        return Err(LayoutError::DuplicateIndex {
                            index,
                            first: *first.get(),
                            second: position,
                        })
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(position);
                    }
                }
            }
        }

        let led_count = found.len();
        let missing: Vec<usize> = (0..led_count)
            .filter(|index| !found.contains_key(index))
            .collect();

        if !missing.is_empty() {
            return Err(LayoutError::NonContinuous { missing });
        }

        let mut positions = vec![Position::new(0, 0); led_count];
        for (index, position) in found {
            positions[index] = position;
        }

        Ok(Layout {
            height,
            width,
            positions,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of LEDs on the strip.
    pub fn led_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, index: usize) -> Option<Position> {
        self.positions.get(index).copied()
    }

    /// `(index, position)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Position)> + '_ {
        self.positions.iter().copied().enumerate()
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::parse(s)
    }
}

/// Splits on `\n`, dropping the `\r` of CRLF line endings. A trailing newline
/// produces a final empty row.
fn canvas_rows(canvas: &str) -> Vec<&str> {
    canvas
        .split('\n')
        .map(|row| row.strip_suffix('\r').unwrap_or(row))
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Finds runs of ASCII digits that sit between word boundaries, the same
/// tokens `\b[0-9]+\b` matches. Columns count characters.
pub fn tokens(line: &str) -> Vec<Token<'_>> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut found = vec![];
    let mut i = 0;

    while i < chars.len() {
        let starts_run = chars[i].1.is_ascii_digit() && (i == 0 || !is_word_char(chars[i - 1].1));
        if !starts_run {
            i += 1;
            continue;
        }

        let mut end = i;
        while end < chars.len() && chars[end].1.is_ascii_digit() {
            end += 1;
        }

        let bounded = end == chars.len() || !is_word_char(chars[end].1);
        if bounded {
            let byte_end = chars.get(end).map(|(b, _)| *b).unwrap_or(line.len());
            found.push(Token {
                column: i,
                text: &line[chars[i].0..byte_end],
            });
        }

        i = end;
    }

    found
}
