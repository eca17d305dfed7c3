//! spritz-cipher: the sponge engine and the keyed hash built on it
//!
//! # Overview
//! - `engine`: a 256-entry permutation state that absorbs input nibbles and
//!   squeezes keystream bytes, re-mixing itself between the two phases
//! - `hash`: variable-width hash of a byte slice or stream, bound to the
//!   requested output width

pub mod engine;
pub mod hash;

pub use engine::Spritz;
pub use hash::{digest_to_base64, digest_to_hex, hash_bytes, hash_file, hash_reader, Hasher};
