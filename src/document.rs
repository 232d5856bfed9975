use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use quick_xml::events::Event;
use regex::Regex;
use serde::Deserialize;

use crate::error::LoadError;

/// How a text file is cut into utterances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One utterance per non-empty line.
    #[default]
    Lines,
    /// Lines are further split after `.`, `!` or `?` followed by whitespace.
    Sentences,
}

/// An ordered, immutable list of utterances loaded from a text file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
    source: Option<PathBuf>,
}

impl TextDocument {
    /// Read a UTF-8 text file, or the paragraphs of a `.docx`, into a document.
    ///
    /// Nothing is returned on failure, so a caller holding a previous document
    /// keeps it unchanged.
    pub fn load(path: &Path, mode: SplitMode) -> Result<Self, LoadError> {
        let text = if is_docx(path) {
            read_docx(path)?
        } else {
            read_utf8(path)?
        };

        let mut document = Self::parse(&text, mode);
        document.source = Some(path.to_path_buf());
        log::info!(
            "Loaded {} utterances from {}",
            document.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn parse(text: &str, mode: SplitMode) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .flat_map(|line| match mode {
                SplitMode::Lines => vec![line.to_string()],
                SplitMode::Sentences => split_sentences(line),
            })
            .collect();

        Self {
            lines,
            source: None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_utf8(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    String::from_utf8(bytes).map_err(|_| LoadError::Encoding {
        path: path.to_path_buf(),
    })
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
}

/// Pull the body text out of a Word document, one line per paragraph.
fn read_docx(path: &Path) -> Result<String, LoadError> {
    let docx_error = |message: String| LoadError::Docx {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(io_error(path))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| docx_error(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| docx_error(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(io_error(path))?;

    docx_paragraphs(&xml).map_err(|e| docx_error(e.to_string()))
}

fn docx_paragraphs(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run_text => text.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"))
}

fn split_sentences(line: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(line) {
        // keep the punctuation with the sentence it ends
        let end = boundary.start() + 1;
        push_trimmed(&mut sentences, &line[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &line[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
