//! # Persisted Vocabulary State
//!
//! A JSON document holding the live mapping (in insertion order) and the
//! commit history. Token bytes are base64 encoded, so non-UTF-8 tokens
//! survive the round trip.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "mapping": [{"token": "PFVOSz4=", "id": 1}, ...],
//!   "history": [{"stage_id": "stage_1700000000_0", ...}],
//!   "saved_at": 1700000000000
//! }
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{STResult, StableTokError},
    types::{TokenType, token_from_u64, token_to_usize},
    updater::CommitRecord,
    vocab::{CategoryPolicy, TokenRecord, VocabMapping},
};

/// The current persisted state format.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// One persisted ``(token, id)`` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
    /// Base64-encoded token bytes.
    pub token: String,

    /// The token id.
    pub id: u64,
}

/// The persisted state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// The document format version.
    pub format_version: u32,

    /// The mapping, in insertion order.
    pub mapping: Vec<PersistedToken>,

    /// The commit history.
    pub history: Vec<CommitRecord>,

    /// When the state was saved, in unix millis.
    pub saved_at: u64,
}

impl PersistedState {
    /// Capture a mapping and history.
    pub fn capture<T: TokenType>(
        mapping: &VocabMapping<T>,
        history: Vec<CommitRecord>,
        saved_at: u64,
    ) -> Self {
        let mapping = mapping
            .iter()
            .map(|(text, id)| PersistedToken {
                token: STANDARD.encode(text),
                id: token_to_usize(id) as u64,
            })
            .collect();
        Self {
            format_version: STATE_FORMAT_VERSION,
            mapping,
            history,
            saved_at,
        }
    }

    /// Rebuild the mapping; categories are re-derived with `policy`.
    ///
    /// Any malformed entry fails the whole restore.
    pub fn restore_mapping<T: TokenType>(
        &self,
        policy: &CategoryPolicy,
    ) -> STResult<VocabMapping<T>> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(StableTokError::Format(format!(
                "unsupported state format version {} (expected {STATE_FORMAT_VERSION})",
                self.format_version
            )));
        }

        let mut mapping = VocabMapping::with_capacity(self.mapping.len());
        for (idx, entry) in self.mapping.iter().enumerate() {
            let text = STANDARD.decode(&entry.token).map_err(|e| {
                StableTokError::Format(format!("mapping entry {idx}: invalid base64: {e}"))
            })?;
            let id: T = token_from_u64(entry.id).map_err(|e| {
                StableTokError::Format(format!("mapping entry {idx}: {e}"))
            })?;

            let category = policy.categorize(&text);
            let frequency = policy.estimate_frequency(&text, category);
            let record = TokenRecord::new(text, id, category, frequency);
            match mapping.insert(record) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(StableTokError::Format(format!(
                        "mapping entry {idx}: duplicate entry"
                    )));
                }
                Err(e) => {
                    return Err(StableTokError::Format(format!("mapping entry {idx}: {e}")));
                }
            }
        }
        Ok(mapping)
    }

    /// Write the document as pretty JSON.
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
    ) -> STResult<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Write the document to a file.
    pub fn save_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> STResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a document from a file.
    ///
    /// Unparseable documents are a `Format` error.
    pub fn load_path<P: AsRef<Path>>(path: P) -> STResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| StableTokError::Format(format!("invalid persisted state: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_restore() {
        type T = u32;
        let policy = CategoryPolicy::default();
        let mapping: VocabMapping<T> = VocabMapping::from_pairs(
            vec![
                (b"<UNK>".to_vec(), 1),
                (vec![0xFF, 0xFE], 500_000),
                (b"hello".to_vec(), 356),
            ],
            &policy,
        )
        .unwrap();

        let state = PersistedState::capture(&mapping, vec![], 42);
        assert_eq!(state.mapping[0].token, "PFVOSz4=");

        let restored: VocabMapping<T> = state.restore_mapping(&policy).unwrap();
        assert_eq!(restored, mapping);
    }

    #[test]
    fn test_malformed_restore() {
        let policy = CategoryPolicy::default();
        let good = PersistedToken {
            token: STANDARD.encode("a"),
            id: 1,
        };

        let mut state = PersistedState {
            format_version: STATE_FORMAT_VERSION,
            mapping: vec![good.clone(), good.clone()],
            history: vec![],
            saved_at: 0,
        };
        assert!(matches!(
            state.restore_mapping::<u32>(&policy),
            Err(StableTokError::Format(_))
        ));

        state.mapping = vec![PersistedToken {
            token: "!!not base64!!".to_string(),
            id: 1,
        }];
        assert!(state.restore_mapping::<u32>(&policy).is_err());

        state.mapping = vec![PersistedToken {
            token: STANDARD.encode("a"),
            id: 70_000,
        }];
        assert!(matches!(
            state.restore_mapping::<u16>(&policy),
            Err(StableTokError::Format(_))
        ));

        state.mapping = vec![good];
        state.format_version = 99;
        assert!(state.restore_mapping::<u32>(&policy).is_err());
    }
}
