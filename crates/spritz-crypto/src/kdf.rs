//! Key derivation: password + IV → header engine
//!
//! The password is hashed to 512 bits of key material, which is then run
//! through `base_rounds + iv[3]` rounds of reset / absorb IV / stop /
//! absorb key / squeeze key, bumping the IV as a little-endian counter
//! after each round. The engine that finally absorbs the resulting key
//! material is the header engine.

use secrecy::{ExposeSecret, SecretString};
use spritz_cipher::{hash_bytes, Spritz};
use spritz_core::ContainerConfig;
use zeroize::Zeroize;

use crate::IV_SIZE;

/// Width of the stretched key material
pub const KDF_KEY_BITS: usize = 512;

/// Canonical base round count
pub const DEFAULT_BASE_ROUNDS: u32 = 20_000;

/// KDF cost parameters.
///
/// Containers can only be opened with the base they were written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub base_rounds: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            base_rounds: DEFAULT_BASE_ROUNDS,
        }
    }
}

impl From<&ContainerConfig> for KdfParams {
    fn from(config: &ContainerConfig) -> Self {
        Self {
            base_rounds: config.kdf_base_rounds,
        }
    }
}

impl KdfParams {
    /// Rounds actually run for a given IV.
    pub fn rounds_for(&self, iv: &[u8; IV_SIZE]) -> u32 {
        self.base_rounds.saturating_add(iv[3] as u32)
    }
}

/// Derive the header engine for `password` under the (unmasked) `iv`.
pub fn derive_header_engine(
    password: &SecretString,
    iv: &[u8; IV_SIZE],
    params: &KdfParams,
) -> Spritz {
    let mut key = hash_bytes(KDF_KEY_BITS, password.expose_secret().as_bytes());
    let mut counter = *iv;
    let rounds = params.rounds_for(iv);

    let mut engine = Spritz::new();
    for _ in 0..rounds {
        engine.reset();
        engine.absorb_bytes(&counter);
        engine.absorb_stop();
        engine.absorb_bytes(&key);
        engine.squeeze_into(&mut key);
        counter = u32::from_le_bytes(counter).wrapping_add(1).to_le_bytes();
    }

    engine.reset();
    engine.absorb_bytes(&key);
    key.zeroize();
    engine
}
