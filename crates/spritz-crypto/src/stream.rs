//! Streaming container codec
//!
//! Writing composes `ZlibEncoder<CipherWriter<W>>`: caller bytes are
//! deflated, and every compressed byte is XORed with the payload keystream
//! on its way to the sink. Reading mirrors it with
//! `Inflater<BufReader<CipherReader<R>>>`. The stored name sits between the
//! header and the compressed body and goes through the cipher layer only.
//!
//! Both directions are strictly forward: every byte that passes through the
//! cipher layer advances the keystream by exactly one position.

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use secrecy::SecretString;
use spritz_cipher::Spritz;
use spritz_core::{ContainerConfig, SpritzError, SpritzResult};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::header::{generate_iv, read_header, write_header};
use crate::kdf::KdfParams;
use crate::keys::{derive_payload_engine, generate_payload_key, PayloadKey};
use crate::MAX_NAME_LEN;

/// XORs everything written through it with the engine's keystream.
pub struct CipherWriter<W: Write> {
    inner: W,
    engine: Spritz,
    scratch: Vec<u8>,
}

impl<W: Write> CipherWriter<W> {
    pub fn new(inner: W, engine: Spritz) -> Self {
        Self {
            inner,
            engine,
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The keystream has already moved past these bytes, so they must
        // all reach the sink; a short write here would desynchronise it.
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.engine.squeeze_xor(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// XORs everything read through it with the engine's keystream.
pub struct CipherReader<R: Read> {
    inner: R,
    engine: Spritz,
}

impl<R: Read> CipherReader<R> {
    pub fn new(inner: R, engine: Spritz) -> Self {
        Self { inner, engine }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.engine.squeeze_xor(&mut buf[..n]);
        Ok(n)
    }
}

/// Zlib inflater that insists on seeing the end of the stream.
///
/// Input running out before the zlib trailer is an `UnexpectedEof` error;
/// malformed data is `InvalidData`. Bytes after the trailer are ignored.
pub struct Inflater<R: BufRead> {
    inner: R,
    state: Decompress,
    finished: bool,
}

impl<R: BufRead> Inflater<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: Decompress::new(true),
            finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> Read for Inflater<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let input = self.inner.fill_buf()?;
            let eof = input.is_empty();

            let in_before = self.state.total_in();
            let out_before = self.state.total_out();
            let status = self
                .state
                .decompress(input, buf, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (self.state.total_in() - in_before) as usize;
            let produced = (self.state.total_out() - out_before) as usize;
            self.inner.consume(consumed);

            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    return Ok(produced);
                }
                _ if produced > 0 => return Ok(produced),
                _ if eof => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "compressed body ended before its trailer",
                    ))
                }
                _ => continue,
            }
        }
    }
}

/// Basename of a name hint, cut to at most `MAX_NAME_LEN` bytes on a
/// character boundary. Directory components are never stored.
pub(crate) fn stored_name(name_hint: Option<&str>) -> &str {
    let Some(hint) = name_hint else {
        return "";
    };
    let base = Path::new(hint)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if base.len() <= MAX_NAME_LEN {
        return base;
    }
    let mut end = MAX_NAME_LEN;
    while !base.is_char_boundary(end) {
        end -= 1;
    }
    tracing::warn!(
        original_len = base.len(),
        stored_len = end,
        "name too long for container, truncating"
    );
    &base[..end]
}

/// Writing half of a container. Call [`EncryptWriter::finish`] to flush the
/// compressor's trailing blocks and get the sink back.
pub struct EncryptWriter<W: Write> {
    encoder: ZlibEncoder<CipherWriter<W>>,
}

impl<W: Write> EncryptWriter<W> {
    /// Write a header under a fresh payload key, then the stored name.
    pub fn new(
        sink: W,
        password: &SecretString,
        name_hint: Option<&str>,
        config: &ContainerConfig,
    ) -> SpritzResult<Self> {
        let payload_key = generate_payload_key();
        Self::with_payload_key(sink, password, name_hint, &payload_key, config)
    }

    pub(crate) fn with_payload_key(
        mut sink: W,
        password: &SecretString,
        name_hint: Option<&str>,
        payload_key: &PayloadKey,
        config: &ContainerConfig,
    ) -> SpritzResult<Self> {
        config.validate()?;
        write_header(
            &mut sink,
            password,
            &generate_iv(),
            payload_key,
            &KdfParams::from(config),
        )?;

        let mut cipher = CipherWriter::new(sink, derive_payload_engine(payload_key));

        let name = stored_name(name_hint).as_bytes();
        cipher.write_all(&[name.len() as u8])?;
        cipher.write_all(name)?;
        tracing::debug!(name_len = name.len(), "container name written");

        let encoder = ZlibEncoder::new(cipher, Compression::new(config.compression_level));
        Ok(Self { encoder })
    }

    /// Finalize compression and return the sink, flushed.
    pub fn finish(self) -> SpritzResult<W> {
        let cipher = self.encoder.finish()?;
        let mut sink = cipher.into_inner();
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

/// Reading half of a container: verified header, recovered name, and a
/// lazily inflated plaintext stream.
pub struct DecryptReader<R: Read> {
    decoder: Inflater<BufReader<CipherReader<R>>>,
    original_name: Option<String>,
}

impl<R: Read> DecryptReader<R> {
    /// Verify the password and read the stored name. The body is not
    /// touched until the caller reads.
    pub fn new(
        mut source: R,
        password: &SecretString,
        config: &ContainerConfig,
    ) -> SpritzResult<Self> {
        let payload_key = read_header(&mut source, password, &KdfParams::from(config))?;
        let mut cipher = CipherReader::new(source, derive_payload_engine(&payload_key));
        drop(payload_key);

        let mut len = [0u8; 1];
        cipher
            .read_exact(&mut len)
            .map_err(|e| SpritzError::truncated(e, "name length"))?;
        let mut name = vec![0u8; len[0] as usize];
        cipher
            .read_exact(&mut name)
            .map_err(|e| SpritzError::truncated(e, "name"))?;

        let original_name = if name.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&name).into_owned())
        };
        tracing::debug!(name_len = name.len(), "container name read");

        Ok(Self {
            decoder: Inflater::new(BufReader::with_capacity(config.buffer_size.max(1), cipher)),
            original_name,
        })
    }

    /// Name stored at encryption time, if any.
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Read and discard up to `n` plaintext bytes. Returns how many were
    /// skipped; fewer than `n` means the body ended.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        io::copy(&mut self.by_ref().take(n), &mut io::sink())
    }

    /// The underlying source. Ciphertext already buffered for inflation is
    /// dropped.
    pub fn into_inner(self) -> R {
        self.decoder.into_inner().into_inner().into_inner()
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}
