//! Whole-container operations over arbitrary readers and writers

use secrecy::SecretString;
use spritz_core::{ContainerConfig, SpritzError, SpritzResult};
use std::io::{self, Read, Write};

use crate::header::read_header;
use crate::kdf::KdfParams;
use crate::keys::generate_payload_key;
use crate::stream::{DecryptReader, EncryptWriter};

/// Result of decrypting a whole container into a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// Name stored in the container, if any
    pub name: Option<String>,
    /// Plaintext bytes written
    pub bytes: u64,
}

/// Copy `reader` into `writer` with a `buffer_size` buffer.
fn copy_buffered<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Encrypt everything `plaintext` yields into `sink`.
///
/// Returns the number of plaintext bytes consumed.
pub fn encrypt<R: Read, W: Write>(
    password: &SecretString,
    name_hint: Option<&str>,
    plaintext: R,
    sink: W,
    config: &ContainerConfig,
) -> SpritzResult<u64> {
    let mut writer = EncryptWriter::new(sink, password, name_hint, config)?;
    let bytes = copy_buffered(plaintext, &mut writer, config.buffer_size)?;
    writer.finish()?;
    tracing::debug!(bytes, "container encrypted");
    Ok(bytes)
}

/// Open a container for reading. The password is verified and the stored
/// name recovered before this returns; the body is inflated on demand.
pub fn decrypt<R: Read>(
    password: &SecretString,
    ciphertext: R,
    config: &ContainerConfig,
) -> SpritzResult<DecryptReader<R>> {
    config.validate()?;
    DecryptReader::new(ciphertext, password, config)
}

/// Decrypt a whole container into `sink`.
pub fn decrypt_to<R: Read, W: Write>(
    password: &SecretString,
    ciphertext: R,
    mut sink: W,
    config: &ContainerConfig,
) -> SpritzResult<Decrypted> {
    let mut reader = decrypt(password, ciphertext, config)?;
    let name = reader.original_name().map(str::to_owned);
    let bytes = copy_body(&mut reader, &mut sink, config.buffer_size)?;
    sink.flush()?;
    tracing::debug!(bytes, "container decrypted");
    Ok(Decrypted { name, bytes })
}

/// Copy an inflating reader into a sink, telling body errors apart from
/// sink errors.
pub(crate) fn copy_body<R: Read, W: Write>(
    reader: &mut DecryptReader<R>,
    sink: &mut W,
    buffer_size: usize,
) -> SpritzResult<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SpritzError::from_body(e)),
        };
        sink.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Verify `password` against a container and report its stored name,
/// without reading the compressed body.
pub fn check<R: Read>(
    password: &SecretString,
    ciphertext: R,
    config: &ContainerConfig,
) -> SpritzResult<Option<String>> {
    let reader = decrypt(password, ciphertext, config)?;
    Ok(reader.original_name().map(str::to_owned))
}

/// Re-encrypt a container under `new_password` with a freshly generated
/// payload key. Unlike a rekey this rewrites the whole body; the stored
/// name carries over.
pub fn reencrypt<R: Read, W: Write>(
    old_password: &SecretString,
    new_password: &SecretString,
    ciphertext: R,
    sink: W,
    config: &ContainerConfig,
) -> SpritzResult<u64> {
    let mut reader = decrypt(old_password, ciphertext, config)?;
    let name = reader.original_name().map(str::to_owned);

    let payload_key = generate_payload_key();
    let mut writer =
        EncryptWriter::with_payload_key(sink, new_password, name.as_deref(), &payload_key, config)?;
    drop(payload_key);

    let bytes = copy_body(&mut reader, &mut writer, config.buffer_size)?;
    writer.finish()?;
    tracing::debug!(bytes, "container re-encrypted under a new payload key");
    Ok(bytes)
}

/// Recover the payload key of a container, consuming only its header.
pub(crate) fn read_payload_key<R: Read>(
    password: &SecretString,
    ciphertext: R,
    config: &ContainerConfig,
) -> SpritzResult<crate::keys::PayloadKey> {
    read_header(ciphertext, password, &KdfParams::from(config))
}
