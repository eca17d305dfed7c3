//! Payload key generation and the payload engine it seeds

use rand::RngCore;
use spritz_cipher::Spritz;
use zeroize::Zeroize;

use crate::PAYLOAD_KEY_SIZE;

/// Keystream bytes discarded before the payload engine is used.
pub const PAYLOAD_WARMUP: u64 = 2048;

/// The per-container 512-bit body key. Zeroized on drop.
#[derive(Clone)]
pub struct PayloadKey {
    bytes: [u8; PAYLOAD_KEY_SIZE],
}

impl PayloadKey {
    pub fn from_bytes(bytes: [u8; PAYLOAD_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for PayloadKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random payload key.
pub fn generate_payload_key() -> PayloadKey {
    let mut bytes = [0u8; PAYLOAD_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    let key = PayloadKey::from_bytes(bytes);
    bytes.zeroize();
    key
}

/// Seed the engine that drives the container body.
///
/// The warm-up is `2048 + key[3]` bytes, so the discard length differs
/// between containers.
pub fn derive_payload_engine(key: &PayloadKey) -> Spritz {
    let mut engine = Spritz::new();
    engine.absorb_bytes(key.as_bytes());
    engine.skip(PAYLOAD_WARMUP + key.as_bytes()[3] as u64);
    engine
}
