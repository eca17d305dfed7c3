//! Container header: version, masked IV, verification block, wrapped payload key
//!
//! Header format (binary, 77 bytes):
//! ```text
//! [1 byte:  version]
//! [4 bytes: IV ^ hash32(password)]
//! [4 bytes: check ^ keystream]
//!   (keystream advanced by check[3] bytes here)
//! [4 bytes: hash32(check) ^ keystream]
//! [64 bytes: payload key ^ keystream]
//! ```
//! The keystream comes from the header engine derived from (password, IV).
//! Decrypting the check and comparing its hash tells a wrong password apart
//! before any payload byte is read.

use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use spritz_cipher::hash_bytes;
use spritz_core::{SpritzError, SpritzResult};
use std::io::{Read, Write};
use zeroize::Zeroize;

use crate::kdf::{derive_header_engine, KdfParams};
use crate::keys::PayloadKey;
use crate::{CHECK_SIZE, FORMAT_VERSION, HEADER_SIZE, IV_SIZE, PAYLOAD_KEY_SIZE};

const HDR_IV: usize = 1;
const HDR_CHECK: usize = HDR_IV + IV_SIZE;
const HDR_CHECK_HASH: usize = HDR_CHECK + CHECK_SIZE;
const HDR_KEY: usize = HDR_CHECK_HASH + CHECK_SIZE;

const CHECK_BITS: usize = CHECK_SIZE * 8;

/// Generate a fresh random IV.
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

fn password_mask(password: &SecretString) -> Vec<u8> {
    hash_bytes(CHECK_BITS, password.expose_secret().as_bytes())
}

/// Build the encrypted header block.
///
/// `iv` is the unmasked IV; callers pass a fresh one for every write,
/// including password changes.
pub fn encode_header(
    password: &SecretString,
    iv: &[u8; IV_SIZE],
    payload_key: &PayloadKey,
    params: &KdfParams,
) -> [u8; HEADER_SIZE] {
    let mut block = [0u8; HEADER_SIZE];
    block[0] = FORMAT_VERSION;

    let mask = password_mask(password);
    for (slot, (iv_byte, mask_byte)) in block[HDR_IV..HDR_CHECK]
        .iter_mut()
        .zip(iv.iter().zip(mask.iter()))
    {
        *slot = iv_byte ^ mask_byte;
    }

    let mut engine = derive_header_engine(password, iv, params);

    let mut check = [0u8; CHECK_SIZE];
    rand::thread_rng().fill_bytes(&mut check);
    let check_hash = hash_bytes(CHECK_BITS, &check);

    block[HDR_CHECK..HDR_CHECK_HASH].copy_from_slice(&check);
    block[HDR_CHECK_HASH..HDR_KEY].copy_from_slice(&check_hash);
    block[HDR_KEY..].copy_from_slice(payload_key.as_bytes());

    engine.squeeze_xor(&mut block[HDR_CHECK..HDR_CHECK_HASH]);
    engine.skip(check[3] as u64);
    engine.squeeze_xor(&mut block[HDR_CHECK_HASH..]);

    check.zeroize();
    block
}

/// Write a header for `payload_key` under `password`.
pub fn write_header<W: Write>(
    mut out: W,
    password: &SecretString,
    iv: &[u8; IV_SIZE],
    payload_key: &PayloadKey,
    params: &KdfParams,
) -> SpritzResult<()> {
    let mut block = encode_header(password, iv, payload_key, params);
    let result = out.write_all(&block);
    block.zeroize();
    result?;
    tracing::debug!(rounds = params.rounds_for(iv), "header written");
    Ok(())
}

/// Read and check the version tag.
pub fn read_version<R: Read>(mut input: R) -> SpritzResult<u8> {
    let mut version = [0u8; 1];
    input
        .read_exact(&mut version)
        .map_err(|e| SpritzError::truncated(e, "version"))?;
    if version[0] != FORMAT_VERSION {
        return Err(SpritzError::UnsupportedVersion(version[0]));
    }
    Ok(version[0])
}

/// Read a header and recover the payload key.
///
/// Fails with `BadPasswordOrCorrupt` when the verification hash does not
/// match; nothing past the header has been read at that point.
pub fn read_header<R: Read>(
    mut input: R,
    password: &SecretString,
    params: &KdfParams,
) -> SpritzResult<PayloadKey> {
    read_version(&mut input)?;

    let mut iv = [0u8; IV_SIZE];
    input
        .read_exact(&mut iv)
        .map_err(|e| SpritzError::truncated(e, "header IV"))?;
    let mut rest = [0u8; HEADER_SIZE - HDR_CHECK];
    input
        .read_exact(&mut rest)
        .map_err(|e| SpritzError::truncated(e, "header block"))?;

    let mask = password_mask(password);
    for (iv_byte, mask_byte) in iv.iter_mut().zip(mask.iter()) {
        *iv_byte ^= mask_byte;
    }

    let mut engine = derive_header_engine(password, &iv, params);

    let (check, tail) = rest.split_at_mut(CHECK_SIZE);
    engine.squeeze_xor(check);
    engine.skip(check[3] as u64);
    engine.squeeze_xor(tail);

    let (check_hash, key_bytes) = tail.split_at(CHECK_SIZE);
    if hash_bytes(CHECK_BITS, check).as_slice() != check_hash {
        rest.zeroize();
        tracing::debug!("header verification failed");
        return Err(SpritzError::BadPasswordOrCorrupt);
    }

    let mut key = [0u8; PAYLOAD_KEY_SIZE];
    key.copy_from_slice(key_bytes);
    rest.zeroize();
    let payload_key = PayloadKey::from_bytes(key);
    key.zeroize();

    tracing::debug!(rounds = params.rounds_for(&iv), "header verified");
    Ok(payload_key)
}
