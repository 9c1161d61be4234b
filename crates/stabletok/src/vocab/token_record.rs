//! # Token Records

use sha2::{Digest, Sha256};

use crate::{types::TokenType, vocab::TokenCategory};

/// SHA-256 content fingerprint of a token's bytes.
pub type Fingerprint = [u8; 32];

/// Compute the [`Fingerprint`] of a token.
pub fn fingerprint(text: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(text);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// An assigned token.
///
/// Records are immutable once created; changing the text of a token
/// would require retiring its id, which is not supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenRecord<T: TokenType> {
    text: Vec<u8>,
    id: T,
    category: TokenCategory,
    frequency_estimate: u64,
    fingerprint: Fingerprint,
}

impl<T: TokenType> TokenRecord<T> {
    /// Create a new record; the fingerprint is computed from `text`.
    pub fn new(
        text: Vec<u8>,
        id: T,
        category: TokenCategory,
        frequency_estimate: u64,
    ) -> Self {
        let fingerprint = fingerprint(&text);
        Self {
            text,
            id,
            category,
            frequency_estimate,
            fingerprint,
        }
    }

    /// The token bytes.
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// The assigned id.
    pub fn id(&self) -> T {
        self.id
    }

    /// The category the token was classified into.
    ///
    /// A spilled-over token keeps its structural category,
    /// even though its id lives in the RARE range.
    pub fn category(&self) -> TokenCategory {
        self.category
    }

    /// The frequency estimate used for ordering.
    pub fn frequency_estimate(&self) -> u64 {
        self.frequency_estimate
    }

    /// The content fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The token length in bytes.
    pub fn byte_length(&self) -> usize {
        self.text.len()
    }

    /// The token text, lossy UTF-8 decoded.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        type T = u32;

        let record = TokenRecord::<T>::new(b"hello".to_vec(), 400, TokenCategory::Common, 7);
        assert_eq!(record.text(), b"hello");
        assert_eq!(record.id(), 400);
        assert_eq!(record.category(), TokenCategory::Common);
        assert_eq!(record.frequency_estimate(), 7);
        assert_eq!(record.byte_length(), 5);
        assert_eq!(record.text_lossy(), "hello");
        assert_eq!(record.fingerprint(), &fingerprint(b"hello"));
    }

    #[test]
    fn test_fingerprint_known_value() {
        // sha256("abc")
        assert_eq!(
            fingerprint(b"abc")[..4],
            [0xba, 0x78, 0x16, 0xbf]
        );
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }
}
