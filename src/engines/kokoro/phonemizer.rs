use std::collections::HashMap;

use super::model::KokoroError;
use crate::engines::espeak::Espeak;

/// Map a voice name prefix to an espeak-ng language code.
pub fn voice_lang(voice: &str) -> &'static str {
    match voice.get(..2).unwrap_or("") {
        "af" | "am" => "en-us",
        "bf" | "bm" => "en-gb",
        "ef" | "em" => "es",
        "ff" => "fr",
        "hf" | "hm" => "hi",
        "if" | "im" => "it",
        "jf" | "jm" => "ja",
        "pf" | "pm" => "pt-br",
        "zf" | "zm" => "cmn",
        _ => "en-us",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

/// Convert text to Kokoro token IDs.
///
/// Punctuation is kept as its own token; the text between punctuation is sent
/// to espeak-ng in one batch, one segment per line. IPA characters missing
/// from the vocab are dropped.
pub fn phonemize(
    text: &str,
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &Espeak,
) -> Result<Vec<i64>, KokoroError> {
    let parts = split_text_parts(text);
    let segments: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();
    let segment_ids = if segments.is_empty() {
        Vec::new()
    } else {
        phonemize_segments(&segments, lang, vocab, espeak)?
    };
    let mut segment_ids = segment_ids.into_iter();

    let mut ids = Vec::new();
    for part in parts {
        match part {
            TextPart::Text(_) => ids.extend(segment_ids.next().unwrap_or_default()),
            TextPart::Punct(ch) => ids.extend(vocab.get(&ch)),
        }
    }
    Ok(ids)
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        if let Some(punct) = boundary_punctuation(ch) {
            if !is_digit_separator(text, idx, ch) {
                flush_text(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
        } else {
            current.push(ch);
        }
    }

    flush_text(&mut parts, &mut current);
    parts
}

fn flush_text(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

fn boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

/// `2.0` and `1,000` keep their separator inside the text segment.
fn is_digit_separator(text: &str, idx: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }
    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch.len_utf8()..].chars().next();
    matches!(
        (prev, next),
        (Some(left), Some(right)) if left.is_ascii_digit() && right.is_ascii_digit()
    )
}

fn phonemize_segments(
    segments: &[&str],
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &Espeak,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let ipa = |input: &str| {
        espeak
            .phonemes(input, lang)
            .map_err(|e| KokoroError::PhonemizerFailed(e.to_string()))
    };

    let output = ipa(&segments.join("\n"))?;
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() == segments.len() {
        return Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect());
    }

    log::debug!(
        "espeak-ng returned {} lines for {} segments, phonemizing one at a time",
        lines.len(),
        segments.len()
    );
    segments
        .iter()
        .map(|segment| -> Result<Vec<i64>, KokoroError> {
            Ok(ipa_to_ids(&ipa(segment)?, vocab))
        })
        .collect()
}

fn ipa_to_ids(ipa: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    ipa.lines()
        .flat_map(|line| line.trim().chars())
        .filter(|&ch| ch != '_')
        .filter_map(|ch| vocab.get(&ch).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ipa_to_ids, phonemize, split_text_parts, voice_lang, TextPart};
    use crate::engines::espeak::Espeak;
    use std::collections::HashMap;

    fn vocab() -> HashMap<char, i64> {
        [(',', 3), ('.', 4), (' ', 16), ('ə', 83), ('h', 50), ('l', 54)]
            .into_iter()
            .collect()
    }

    #[test]
    fn splits_text_and_punctuation_parts() {
        assert_eq!(
            split_text_parts("Hello, world. Testing!"),
            vec![
                TextPart::Text("Hello".to_string()),
                TextPart::Punct(','),
                TextPart::Text("world".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("Testing".to_string()),
                TextPart::Punct('!'),
            ]
        );
    }

    #[test]
    fn keeps_decimal_and_thousands_separators_inside_text() {
        assert_eq!(
            split_text_parts("Version 2.0 reached 1,000 users."),
            vec![
                TextPart::Text("Version 2.0 reached 1,000 users".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn voice_prefix_selects_language() {
        assert_eq!(voice_lang("bf_emma"), "en-gb");
        assert_eq!(voice_lang("zf_xiaobei"), "cmn");
        assert_eq!(voice_lang("x"), "en-us");
    }

    #[test]
    fn ipa_drops_unknown_and_tie_characters() {
        assert_eq!(ipa_to_ids("hə_l ?", &vocab()), vec![50, 83, 54, 16]);
    }

    #[test]
    fn phonemize_keeps_terminal_schwa_for_america() {
        let Ok(espeak) = Espeak::locate(None) else {
            return;
        };
        let vocab = vocab();
        let ids =
            phonemize("America", "en-us", &vocab, &espeak).expect("phonemize should succeed");
        assert_eq!(ids.last(), Some(&83), "terminal schwa should be preserved");
    }
}
