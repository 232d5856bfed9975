use std::fmt;

use crate::document::TextDocument;

/// A line as seen through the cursor, with sentinels for the edges of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Text(&'a str),
    /// The document has no lines at all.
    Empty,
    /// There is no line after the current one.
    End,
}

impl<'a> Line<'a> {
    pub fn text(&self) -> Option<&'a str> {
        match self {
            Line::Text(text) => Some(text),
            Line::Empty | Line::End => None,
        }
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Text(text) => f.write_str(text),
            Line::Empty => Ok(()),
            Line::End => f.write_str("(end)"),
        }
    }
}

/// Position within a loaded document.
///
/// The index is always `< len` for a non-empty document; advancing past the
/// last line is a no-op.
#[derive(Debug, Clone)]
pub struct Cursor {
    document: TextDocument,
    index: usize,
}

impl Cursor {
    pub fn new(document: TextDocument) -> Self {
        Self { document, index: 0 }
    }

    pub fn current(&self) -> Line<'_> {
        match self.document.get(self.index) {
            Some(text) => Line::Text(text),
            None => Line::Empty,
        }
    }

    pub fn peek_next(&self) -> Line<'_> {
        match self.document.get(self.index + 1) {
            Some(text) => Line::Text(text),
            None => Line::End,
        }
    }

    /// Step to the next line. Returns `false` when already at the last line.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.document.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_at_end(&self) -> bool {
        self.index + 1 >= self.document.len()
    }

    pub fn document(&self) -> &TextDocument {
        &self.document
    }
}
