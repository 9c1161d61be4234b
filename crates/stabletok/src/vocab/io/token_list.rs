//! # Line-Oriented Token List IO
//!
//! One token per line; line order implies id. Lines are trimmed,
//! and blank lines are skipped.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{
    errors::{STResult, StableTokError},
    types::{TokenType, token_to_usize},
    vocab::{CategoryPolicy, VocabMapping},
};

/// Read the tokens of a line-oriented token list.
pub fn read_token_lines<R: BufRead>(reader: R) -> STResult<Vec<Vec<u8>>> {
    let mut tokens = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let token = line.trim();
        if !token.is_empty() {
            tokens.push(token.as_bytes().to_vec());
        }
    }
    Ok(tokens)
}

/// Load a [`VocabMapping`] from a line-oriented token list file.
///
/// ## Arguments
/// * `path` - the path to the token list.
/// * `policy` - categorization used for the token records.
pub fn load_token_list_path<T, P>(
    path: P,
    policy: &CategoryPolicy,
) -> STResult<VocabMapping<T>>
where
    T: TokenType,
    P: AsRef<Path>,
{
    let reader = BufReader::new(File::open(path)?);
    read_token_list(reader, policy)
}

/// Read a [`VocabMapping`] from a line-oriented token list stream.
pub fn read_token_list<T, R>(
    reader: R,
    policy: &CategoryPolicy,
) -> STResult<VocabMapping<T>>
where
    T: TokenType,
    R: BufRead,
{
    let tokens = read_token_lines(reader)?;
    VocabMapping::from_ordered_tokens(tokens, policy).map_err(|e| match e {
        StableTokError::VocabConflict(msg) => StableTokError::Format(msg),
        e => e,
    })
}

/// Save a [`VocabMapping`] as a line-oriented token list file.
pub fn save_token_list_path<T, P>(
    mapping: &VocabMapping<T>,
    path: P,
) -> STResult<()>
where
    T: TokenType,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_token_list(mapping, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a [`VocabMapping`] as a line-oriented token list, in id order.
///
/// Only dense ``0..n`` mappings survive the round trip; tokens must be
/// UTF-8 without line breaks or surrounding whitespace.
pub fn write_token_list<T, W>(
    mapping: &VocabMapping<T>,
    writer: &mut W,
) -> STResult<()>
where
    T: TokenType,
    W: Write,
{
    let tokens = mapping.tokens_by_id();

    if tokens
        .iter()
        .enumerate()
        .any(|(idx, &(id, _))| token_to_usize(id) != idx)
    {
        log::warn!("token list ids are not dense; line order will not reproduce them");
    }

    for (id, text) in tokens {
        let s = core::str::from_utf8(text).map_err(|_| {
            StableTokError::Format(format!("token {id} is not valid UTF-8"))
        })?;
        if s.trim() != s || s.contains(['\n', '\r']) {
            return Err(StableTokError::Format(format!(
                "token {id} ({s:?}) cannot be stored one-per-line"
            )));
        }
        writeln!(writer, "{s}")?;
    }
    Ok(())
}
