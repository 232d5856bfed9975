use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::{KokoroError, STYLE_DIM};

type Style = [f32; STYLE_DIM];

/// Style vectors for every voice in the archive.
///
/// Row `i` of a voice is the style used for an utterance of `i` phoneme tokens.
pub struct VoiceStore {
    voices: HashMap<String, Vec<Style>>,
}

impl VoiceStore {
    /// Load all voices from a `.npz` archive with one `<voice>.npy` entry each.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let mut zip = zip::ZipArchive::new(File::open(path)?)
            .map_err(|e| KokoroError::VoiceParse(format!("Failed to open zip archive: {e}")))?;

        let mut voices = HashMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| {
                KokoroError::VoiceParse(format!("Failed to read zip entry {i}: {e}"))
            })?;
            if entry.is_dir() {
                continue;
            }

            let entry_name = entry.name().to_string();
            let voice = entry_name.trim_end_matches(".npy").to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| KokoroError::VoiceParse(format!("Failed to read {entry_name}: {e}")))?;

            voices.insert(voice, parse_npy(&data, &entry_name)?);
        }

        log::info!("Loaded {} Kokoro voices", voices.len());
        Ok(Self { voices })
    }

    /// Style for `voice` at row `idx`, clamped to the last row.
    pub fn get_style(&self, voice: &str, idx: usize) -> Result<Style, KokoroError> {
        let styles = self
            .voices
            .get(voice)
            .filter(|styles| !styles.is_empty())
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))?;
        Ok(styles[idx.min(styles.len() - 1)])
    }

    /// Voice names in sorted order.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parse a little-endian float32 `.npy` array of shape `[N, 256]`.
fn parse_npy(data: &[u8], name: &str) -> Result<Vec<Style>, KokoroError> {
    let invalid = |reason: String| KokoroError::VoiceParse(format!("{name}: {reason}"));

    if data.len() < 10 || &data[0..6] != b"\x93NUMPY" {
        return Err(invalid("not a numpy array".to_string()));
    }

    // header_len at [8..10], little-endian u16
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let body = data
        .get(10 + header_len..)
        .ok_or_else(|| invalid("header truncated".to_string()))?;

    let row_bytes = STYLE_DIM * 4;
    if body.len() % row_bytes != 0 {
        return Err(invalid(format!(
            "{} data bytes is not a whole number of {STYLE_DIM}-float rows",
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(row_bytes)
        .map(|row| {
            let mut style = [0f32; STYLE_DIM];
            for (value, bytes) in style.iter_mut().zip(row.chunks_exact(4)) {
                *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            style
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{parse_npy, VoiceStore, STYLE_DIM};
    use std::collections::HashMap;

    fn npy(rows: usize) -> Vec<u8> {
        let header = b"{'descr': '<f4', 'fortran_order': False, 'shape': (N, 256), }   \n";
        let mut data = b"\x93NUMPY\x01\x00".to_vec();
        data.extend_from_slice(&(header.len() as u16).to_le_bytes());
        data.extend_from_slice(header);
        for row in 0..rows {
            for _ in 0..STYLE_DIM {
                data.extend_from_slice(&(row as f32).to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn parses_rows_of_style_vectors() {
        let styles = parse_npy(&npy(3), "bf_emma.npy").unwrap();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[2][STYLE_DIM - 1], 2.0);
    }

    #[test]
    fn rejects_bad_magic_and_ragged_rows() {
        assert!(parse_npy(b"not numpy at all", "x.npy").is_err());

        let mut ragged = npy(1);
        ragged.extend_from_slice(&[0, 0, 0, 0]);
        assert!(parse_npy(&ragged, "x.npy").is_err());
    }

    #[test]
    fn style_index_is_clamped() {
        let store = VoiceStore {
            voices: HashMap::from([("bf_emma".to_string(), parse_npy(&npy(2), "bf_emma").unwrap())]),
        };
        assert_eq!(store.get_style("bf_emma", 99).unwrap()[0], 1.0);
        assert!(store.get_style("af_heart", 0).is_err());
        assert_eq!(store.list_voices(), vec!["bf_emma"]);
    }
}
