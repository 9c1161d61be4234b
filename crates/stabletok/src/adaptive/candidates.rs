//! # Candidate Extraction and Ranking

use core::{cmp::Ordering, ops::Range};

use serde::Serialize;

use crate::{adaptive::UtilityWeights, types::TokenType, vocab::category::is_alphabetic};

/// A scored adaptation candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    /// The candidate text.
    pub text: String,

    /// How often it was observed.
    pub count: u64,

    /// The utility score.
    pub utility: f64,
}

/// The source ranges of unmatched text.
///
/// Adjacent unknown tokens are merged, and each merged range is widened
/// to the enclosing char boundaries of `text`.
///
/// Runs longer than `max_len` bytes are cut into pieces of at most
/// `max_len` bytes on char boundaries; a segmenter bounded by `max_len`
/// lookahead can never match a longer token. A single char wider than
/// `max_len` is dropped.
pub fn unknown_spans<T: TokenType>(
    text: &str,
    spans: &[(T, Range<usize>)],
    unk: T,
    max_len: usize,
) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::new();
    for (token, range) in spans {
        if *token != unk {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.end >= range.start => last.end = last.end.max(range.end),
            _ => merged.push(range.clone()),
        }
    }

    let mut widened: Vec<Range<usize>> = Vec::with_capacity(merged.len());
    for range in merged {
        let mut start = range.start.min(text.len());
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = range.end.min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        if start >= end {
            continue;
        }
        match widened.last_mut() {
            Some(last) if last.end >= start => last.end = last.end.max(end),
            _ => widened.push(start..end),
        }
    }

    let mut pieces: Vec<Range<usize>> = Vec::with_capacity(widened.len());
    for range in widened {
        split_at_most(text, range, max_len, &mut pieces);
    }
    pieces
}

fn split_at_most(
    text: &str,
    range: Range<usize>,
    max_len: usize,
    pieces: &mut Vec<Range<usize>>,
) {
    let mut start = range.start;
    while start < range.end {
        let mut cut = range.end.min(start.saturating_add(max_len));
        while cut > start && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == start {
            // The char at `start` alone exceeds `max_len`.
            cut = start + 1;
            while !text.is_char_boundary(cut) {
                cut += 1;
            }
        } else {
            pieces.push(start..cut);
        }
        start = cut;
    }
}

/// Score a candidate.
///
/// * compression - ``byte_length * count``.
/// * speed impact - ``1 + vocab_size / 1e6``; larger vocabularies score lower.
/// * coherence - 1.0 for alphabetic text, else 0.5.
pub fn utility(
    text: &str,
    count: u64,
    vocab_size: usize,
    weights: &UtilityWeights,
) -> f64 {
    let compression = (text.len() as f64) * (count as f64);
    let speed_impact = 1.0 + vocab_size as f64 / 1_000_000.0;
    let coherence = if is_alphabetic(text) { 1.0 } else { 0.5 };

    weights.compression * compression + weights.speed / speed_impact + weights.coherence * coherence
}

/// Filter and rank candidates by descending utility; ties by text.
pub fn rank<'a, I>(
    candidates: I,
    min_count: u64,
    vocab_size: usize,
    weights: &UtilityWeights,
) -> Vec<RankedCandidate>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter(|&(_, &count)| count >= min_count)
        .map(|(text, &count)| RankedCandidate {
            text: text.clone(),
            count,
            utility: utility(text, count, vocab_size, weights),
        })
        .collect();

    ranked.sort_by(|a, b| match b.utility.total_cmp(&a.utility) {
        Ordering::Equal => a.text.cmp(&b.text),
        ord => ord,
    });
    ranked
}
