//! # Common Types and Traits
use core::{
    fmt::{Debug, Display},
    hash::Hash,
};

use num_traits::{FromPrimitive, PrimInt, ToPrimitive, Unsigned};

use crate::errors::{STResult, StableTokError};

/// A type that can be used as a token id.
///
/// These are constrained to be unsigned primitive integers;
/// the default category ranges need ids up to ``1_000_000``,
/// so `u32` is the usual choice.
pub trait TokenType:
    'static
    + PrimInt
    + FromPrimitive
    + ToPrimitive
    + Unsigned
    + Hash
    + Default
    + Debug
    + Display
    + Send
    + Sync
{
}

impl<T> TokenType for T where
    T: 'static
        + PrimInt
        + FromPrimitive
        + ToPrimitive
        + Unsigned
        + Hash
        + Default
        + Debug
        + Display
        + Send
        + Sync
{
}

/// Convert a `usize` id into a token, failing if it does not fit.
pub fn token_from_usize<T: TokenType>(id: usize) -> STResult<T> {
    T::from_usize(id).ok_or(StableTokError::TokenOutOfRange { id: id as u64 })
}

/// Convert a `u64` id into a token, failing if it does not fit.
pub fn token_from_u64<T: TokenType>(id: u64) -> STResult<T> {
    T::from_u64(id).ok_or(StableTokError::TokenOutOfRange { id })
}

/// Widen a token to `usize`.
///
/// Every [`TokenType`] used by this crate is an unsigned integer no
/// wider than 64 bits.
#[inline(always)]
pub fn token_to_usize<T: TokenType>(token: T) -> usize {
    token.to_usize().unwrap_or(usize::MAX)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "ahash")] {
        /// Type Alias for hash maps in this crate.
        pub type STHashMap<K, V> = ahash::AHashMap<K, V>;

        /// Create a new empty hash map.
        pub fn hash_map_new<K, V>() -> STHashMap<K, V> {
            STHashMap::new()
        }

        /// Create a new hash map with the given capacity.
        pub fn hash_map_with_capacity<K, V>(capacity: usize) -> STHashMap<K, V> {
            STHashMap::with_capacity(capacity)
        }

        /// Type Alias for hash sets in this crate.
        pub type STHashSet<V> = ahash::AHashSet<V>;

    } else if #[cfg(feature = "foldhash")] {
        /// Type Alias for hash maps in this crate.
        pub type STHashMap<K, V> = foldhash::HashMap<K, V>;

        /// Create a new empty hash map.
        pub fn hash_map_new<K, V>() -> STHashMap<K, V> {
            foldhash::HashMapExt::new()
        }

        /// Create a new hash map with the given capacity.
        pub fn hash_map_with_capacity<K, V>(capacity: usize) -> STHashMap<K, V> {
            foldhash::HashMapExt::with_capacity(capacity)
        }

        /// Type Alias for hash sets in this crate.
        pub type STHashSet<V> = foldhash::HashSet<V>;

    } else {
        /// Type Alias for hash maps in this crate.
        pub type STHashMap<K, V> = std::collections::HashMap<K, V>;

        /// Create a new empty hash map.
        pub fn hash_map_new<K, V>() -> STHashMap<K, V> {
            STHashMap::new()
        }

        /// Create a new hash map with the given capacity.
        pub fn hash_map_with_capacity<K, V>(capacity: usize) -> STHashMap<K, V> {
            STHashMap::with_capacity(capacity)
        }

        /// Type Alias for hash sets in this crate.
        pub type STHashSet<V> = std::collections::HashSet<V>;
    }
}

/// Static check that a type is `Send`.
pub fn check_is_send<S: Send>(_: &S) {}

/// Static check that a type is `Sync`.
pub fn check_is_sync<S: Sync>(_: &S) {}

#[cfg(test)]
mod tests {
    use core::marker::PhantomData;

    use super::*;

    #[test]
    fn test_common_token_types() {
        struct IsToken<T: TokenType>(PhantomData<T>);

        let _: IsToken<u16>;
        let _: IsToken<u32>;
        let _: IsToken<u64>;
        let _: IsToken<usize>;
    }

    #[test]
    fn test_token_conversion() {
        assert_eq!(token_from_usize::<u32>(1_000).unwrap(), 1_000);
        assert!(matches!(
            token_from_usize::<u16>(500_000),
            Err(StableTokError::TokenOutOfRange { id: 500_000 })
        ));
        assert_eq!(token_to_usize(42_u16), 42);
    }
}
