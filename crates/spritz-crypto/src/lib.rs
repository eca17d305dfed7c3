//! spritz-crypto: password-keyed, compressed, name-bearing containers
//!
//! Key hierarchy:
//! ```text
//! Password (UTF-8)
//!   └── Header Engine (iterated sponge KDF over hash512(password), keyed by a 4-byte IV)
//!       ├── Verification block: 4 random bytes + hash32 of them (early wrong-password check)
//!       └── Payload Key (64 random bytes, wrapped by the header engine keystream)
//!           └── Payload Engine (absorb key, skip 2048 + key[3]) → name + deflate body
//! ```
//!
//! Container layout:
//! ```text
//! [1: version][4: IV ^ hash32(pw)][4: check][4: hash32(check)][64: payload key]
//! [1: name length][n: name][..: deflate(plaintext)]   (all after the IV XORed with keystream)
//! ```
//!
//! Changing the password rewrites only the 77-byte header; the body is keyed
//! by the payload key, which survives the change.

pub mod container;
pub mod files;
pub mod header;
pub mod kdf;
pub mod keys;
pub mod rekey;
pub mod stream;

pub use container::{check, decrypt, decrypt_to, encrypt, reencrypt, Decrypted};
pub use files::{check_file, decrypt_file, decrypted_target, encrypt_file, encrypted_target};
pub use header::{encode_header, generate_iv, read_header, read_version, write_header};
pub use kdf::{derive_header_engine, KdfParams};
pub use keys::{derive_payload_engine, generate_payload_key, PayloadKey};
pub use rekey::{rekey, rekey_file};
pub use stream::{DecryptReader, EncryptWriter};

pub use spritz_core::{SpritzError, SpritzResult};

/// Canonical header format tag
pub const FORMAT_VERSION: u8 = 1;

/// Size of the header IV
pub const IV_SIZE: usize = 4;

/// Size of the random verification value (and of its hash)
pub const CHECK_SIZE: usize = 4;

/// Size of the random payload key
pub const PAYLOAD_KEY_SIZE: usize = 64;

/// Total header size: version + IV + check + check hash + payload key
pub const HEADER_SIZE: usize = 1 + IV_SIZE + 2 * CHECK_SIZE + PAYLOAD_KEY_SIZE;

/// Longest storable name (the length travels in one byte)
pub const MAX_NAME_LEN: usize = 255;
