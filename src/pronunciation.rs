use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::LoadError;

/// Whole-word, case-insensitive replacements applied to each utterance
/// before it reaches the engine.
#[derive(Debug, Clone, Default)]
pub struct PronunciationRules {
    rules: Vec<(Regex, String)>,
}

impl PronunciationRules {
    /// Load a CSV table with `term` and `replacement` columns.
    ///
    /// Columns may appear in any order; extra columns are ignored. Rows with
    /// an empty term or replacement are skipped.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&content).map_err(|column| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })?;
        log::info!(
            "Loaded {} pronunciation rules from {}",
            rules.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Parse CSV content. On failure returns the name of the missing column.
    pub fn parse(content: &str) -> Result<Self, &'static str> {
        let mut rows = records(content).into_iter();
        let header = rows.next().unwrap_or_default();
        let column = |name: &'static str| {
            header
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or(name)
        };
        let term_col = column("term")?;
        let replacement_col = column("replacement")?;

        let mut rules = Vec::new();
        for fields in rows {
            let term = fields.get(term_col).map(String::as_str).unwrap_or("");
            let replacement = fields.get(replacement_col).map(String::as_str).unwrap_or("");
            if term.is_empty() || replacement.is_empty() {
                continue;
            }
            match word_pattern(term) {
                Ok(pattern) => rules.push((pattern, replacement.to_string())),
                Err(e) => log::warn!("Skipping pronunciation term {term:?}: {e}"),
            }
        }

        Ok(Self { rules })
    }

    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |out, (pattern, replacement)| {
                pattern
                    .replace_all(&out, regex::NoExpand(replacement))
                    .into_owned()
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn word_pattern(term: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
        .case_insensitive(true)
        .build()
}

/// Split CSV content into records, honouring double-quoted fields with `""`
/// escapes. Line breaks inside quotes stay in the field; blank lines are
/// dropped.
fn records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => record.push(std::mem::take(&mut field).trim().to_string()),
            '\r' if !quoted => {}
            '\n' if !quoted => end_record(&mut records, &mut record, &mut field),
            _ => field.push(ch),
        }
    }
    end_record(&mut records, &mut record, &mut field);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    record.push(std::mem::take(field).trim().to_string());
    let record = std::mem::take(record);
    if record.iter().any(|f| !f.is_empty()) {
        records.push(record);
    }
}
