use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::KokoroError;

#[derive(Deserialize)]
struct ModelConfig {
    vocab: HashMap<String, i64>,
}

/// Load the IPA-character-to-token table from the model's `config.json`.
pub fn load_vocab(config_path: &Path) -> Result<HashMap<char, i64>, KokoroError> {
    parse_vocab(&std::fs::read_to_string(config_path)?)
}

fn parse_vocab(json: &str) -> Result<HashMap<char, i64>, KokoroError> {
    let config: ModelConfig = serde_json::from_str(json)
        .map_err(|e| KokoroError::Config(format!("Failed to parse JSON: {e}")))?;

    config
        .vocab
        .into_iter()
        .map(|(key, id)| {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok((ch, id)),
                _ => Err(KokoroError::Config(format!(
                    "vocab key {key:?} must be a single character"
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_vocab;
    use crate::engines::kokoro::KokoroError;

    #[test]
    fn reads_single_character_keys() {
        let vocab = parse_vocab(r#"{"n_token": 178, "vocab": {";": 1, "ə": 83, " ": 16}}"#).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab[&'ə'], 83);
    }

    #[test]
    fn rejects_missing_vocab() {
        assert!(matches!(
            parse_vocab(r#"{"n_token": 178}"#),
            Err(KokoroError::Config(_))
        ));
    }

    #[test]
    fn rejects_multi_character_keys() {
        assert!(matches!(
            parse_vocab(r#"{"vocab": {"ab": 1}}"#),
            Err(KokoroError::Config(_))
        ));
    }
}
