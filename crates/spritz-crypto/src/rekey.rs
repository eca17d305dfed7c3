//! In-place password change
//!
//! Only the 77-byte header is rewritten: the payload key is unwrapped with the
//! old password and wrapped again under the new one with a fresh IV and fresh
//! verification bytes. Body bytes are never read or touched, so the cost does
//! not depend on the payload size.

use anyhow::Context;
use secrecy::SecretString;
use spritz_core::{ContainerConfig, SpritzResult};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use zeroize::Zeroize;

use crate::container::read_payload_key;
use crate::header::{encode_header, generate_iv};
use crate::kdf::KdfParams;

/// Rewrite the header of an open container from `old_password` to
/// `new_password`. The container's position is left just past the header.
pub fn rekey<F: Read + Write + Seek>(
    container: &mut F,
    old_password: &SecretString,
    new_password: &SecretString,
    config: &ContainerConfig,
) -> SpritzResult<()> {
    container.seek(SeekFrom::Start(0))?;
    let payload_key = read_payload_key(old_password, &mut *container, config)?;

    let mut block = encode_header(
        new_password,
        &generate_iv(),
        &payload_key,
        &KdfParams::from(config),
    );
    drop(payload_key);

    container.seek(SeekFrom::Start(0))?;
    let written = container.write_all(&block).and_then(|_| container.flush());
    block.zeroize();
    written?;

    tracing::debug!("header rewrapped under new password");
    Ok(())
}

/// Change the password of a container file in place.
pub fn rekey_file(
    path: &Path,
    old_password: &SecretString,
    new_password: &SecretString,
    config: &ContainerConfig,
) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("opening container: {}", path.display()))?;

    rekey(&mut file, old_password, new_password, config)
        .with_context(|| format!("rekeying: {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing: {}", path.display()))?;

    tracing::info!(path = %path.display(), "password changed");
    Ok(())
}
