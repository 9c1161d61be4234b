//! # JSON Vocabulary IO
//!
//! Two structured forms are accepted:
//! * an ordered list of tokens, ``["<UNK>", "a", ...]``; index is id.
//! * a token to id object, ``{"<UNK>": 0, "a": 1, ...}``.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde_json::Value;

use crate::{
    errors::{STResult, StableTokError},
    types::{TokenType, token_from_u64, token_to_usize},
    vocab::{CategoryPolicy, VocabMapping},
};

/// A parsed JSON vocabulary document.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonVocab {
    /// Ordered token list; index implies id.
    List(Vec<String>),

    /// Explicit ``token -> id`` entries.
    Map(Vec<(String, u64)>),
}

impl JsonVocab {
    /// Interpret a JSON value as a vocabulary.
    pub fn from_value(value: Value) -> STResult<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(s) => Ok(s),
                    other => Err(StableTokError::Format(format!(
                        "vocab list entry {idx} is not a string: {other}"
                    ))),
                })
                .collect::<STResult<Vec<_>>>()
                .map(JsonVocab::List),
            Value::Object(entries) => entries
                .into_iter()
                .map(|(token, id)| match id.as_u64() {
                    Some(id) => Ok((token, id)),
                    None => Err(StableTokError::Format(format!(
                        "vocab entry {token:?} has a non-integer id: {id}"
                    ))),
                })
                .collect::<STResult<Vec<_>>>()
                .map(JsonVocab::Map),
            _ => Err(StableTokError::Format(
                "unsupported JSON vocab: expected a token list or a token->id object".to_string(),
            )),
        }
    }

    /// Build a [`VocabMapping`].
    pub fn into_mapping<T: TokenType>(
        self,
        policy: &CategoryPolicy,
    ) -> STResult<VocabMapping<T>> {
        let res = match self {
            JsonVocab::List(tokens) => VocabMapping::from_ordered_tokens(
                tokens.into_iter().map(String::into_bytes),
                policy,
            ),
            JsonVocab::Map(entries) => {
                let pairs = entries
                    .into_iter()
                    .map(|(token, id)| Ok((token.into_bytes(), token_from_u64::<T>(id)?)))
                    .collect::<STResult<Vec<_>>>()?;
                VocabMapping::from_pairs(pairs, policy)
            }
        };
        res.map_err(|e| match e {
            StableTokError::VocabConflict(msg) => StableTokError::Format(msg),
            e => e,
        })
    }
}

/// Read a [`VocabMapping`] from a JSON stream.
pub fn read_json_vocab<T, R>(
    reader: R,
    policy: &CategoryPolicy,
) -> STResult<VocabMapping<T>>
where
    T: TokenType,
    R: Read,
{
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| StableTokError::Format(format!("invalid JSON vocab: {e}")))?;
    JsonVocab::from_value(value)?.into_mapping(policy)
}

/// Load a [`VocabMapping`] from a JSON file.
pub fn load_json_vocab_path<T, P>(
    path: P,
    policy: &CategoryPolicy,
) -> STResult<VocabMapping<T>>
where
    T: TokenType,
    P: AsRef<Path>,
{
    read_json_vocab(BufReader::new(File::open(path)?), policy)
}

/// Write a [`VocabMapping`] as a JSON ``token -> id`` object.
///
/// Tokens must be valid UTF-8.
pub fn write_json_vocab<T, W>(
    mapping: &VocabMapping<T>,
    writer: &mut W,
) -> STResult<()>
where
    T: TokenType,
    W: Write,
{
    let mut object = serde_json::Map::new();
    for (text, id) in mapping.iter() {
        let s = core::str::from_utf8(text).map_err(|_| {
            StableTokError::Format(format!("token {id} is not valid UTF-8"))
        })?;
        object.insert(s.to_string(), Value::from(token_to_usize(id) as u64));
    }
    serde_json::to_writer_pretty(&mut *writer, &Value::Object(object))?;
    writeln!(writer)?;
    Ok(())
}

/// Save a [`VocabMapping`] as a JSON ``token -> id`` object file.
pub fn save_json_vocab_path<T, P>(
    mapping: &VocabMapping<T>,
    path: P,
) -> STResult<()>
where
    T: TokenType,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_json_vocab(mapping, &mut writer)?;
    writer.flush()?;
    Ok(())
}
