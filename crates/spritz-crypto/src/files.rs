//! Single-file operations: output naming, encrypt, decrypt and check
//!
//! Outputs are written to a sibling temp file and renamed into place, so a
//! wrong password or a corrupt body never leaves a partial file behind.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use spritz_core::ContainerConfig;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::container::{check, copy_body, decrypt, encrypt};

/// Move `path` into `out_dir`, keeping its file name.
fn relocate(path: PathBuf, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => dir.join(path.file_name().unwrap_or_default()),
        None => path,
    }
}

/// Where `encrypt_file` writes: the source minus its extension plus the
/// encrypted extension (`notes.txt` -> `notes.dat`).
pub fn encrypted_target(src: &Path, out_dir: Option<&Path>, config: &ContainerConfig) -> PathBuf {
    relocate(src.with_extension(&config.encrypted_extension), out_dir)
}

/// Where `decrypt_file` writes.
///
/// A stored name wins, reduced to its final component and placed next to
/// the source. Without one, the encrypted extension is stripped
/// (`notes.dat` -> `notes`), or the decrypted extension appended when there
/// is none to strip (`blob` -> `blob.unenc`).
pub fn decrypted_target(
    src: &Path,
    stored_name: Option<&str>,
    out_dir: Option<&Path>,
    config: &ContainerConfig,
) -> PathBuf {
    let stored = stored_name
        .and_then(|name| Path::new(name).file_name())
        .filter(|name| !name.is_empty());

    let target = match stored {
        Some(name) => src.with_file_name(name),
        None if src.extension() == Some(OsStr::new(&config.encrypted_extension)) => {
            src.with_extension("")
        }
        None => {
            let mut name = src.file_name().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(&config.decrypted_extension);
            src.with_file_name(name)
        }
    };
    relocate(target, out_dir)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name: OsString = target.file_name().unwrap_or_default().to_os_string();
    name.push(".spritz_tmp");
    target.with_file_name(name)
}

/// Fill `target` through a temp file, then rename it into place.
fn write_atomically<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating dir: {}", parent.display()))?;
    }

    let tmp = temp_path(target);
    let file =
        File::create(&tmp).with_context(|| format!("creating tmp: {}", tmp.display()))?;
    let mut out = BufWriter::new(file);

    let result = fill(&mut out).and_then(|_| {
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    });
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.context(format!("writing: {}", target.display())));
    }

    std::fs::rename(&tmp, target)
        .with_context(|| format!("renaming to: {}", target.display()))?;
    Ok(())
}

fn ensure_distinct(src: &Path, target: &Path) -> Result<()> {
    if src == target {
        bail!("output would overwrite its own input: {}", src.display());
    }
    Ok(())
}

/// Encrypt `src` into a container, storing its file name. Returns the
/// output path.
pub fn encrypt_file(
    password: &SecretString,
    src: &Path,
    out_dir: Option<&Path>,
    config: &ContainerConfig,
) -> Result<PathBuf> {
    let target = encrypted_target(src, out_dir, config);
    ensure_distinct(src, &target)?;

    let input = File::open(src).with_context(|| format!("opening: {}", src.display()))?;
    let name = src.file_name().and_then(|n| n.to_str());

    let mut bytes = 0u64;
    write_atomically(&target, |out| {
        bytes = encrypt(password, name, BufReader::new(input), out, config)?;
        Ok(())
    })?;

    tracing::info!(
        src = %src.display(),
        dst = %target.display(),
        bytes,
        "encrypted"
    );
    Ok(target)
}

/// Decrypt a container file next to itself (or into `out_dir`). Returns the
/// output path.
pub fn decrypt_file(
    password: &SecretString,
    src: &Path,
    out_dir: Option<&Path>,
    config: &ContainerConfig,
) -> Result<PathBuf> {
    let input = File::open(src).with_context(|| format!("opening: {}", src.display()))?;
    let mut reader = decrypt(password, BufReader::new(input), config)
        .with_context(|| format!("decrypting: {}", src.display()))?;

    let target = decrypted_target(src, reader.original_name(), out_dir, config);
    ensure_distinct(src, &target)?;

    let mut bytes = 0u64;
    write_atomically(&target, |out| {
        bytes = copy_body(&mut reader, out, config.buffer_size)?;
        out.flush()?;
        Ok(())
    })?;

    tracing::info!(
        src = %src.display(),
        dst = %target.display(),
        bytes,
        "decrypted"
    );
    Ok(target)
}

/// Verify the password of a container file and return its stored name.
pub fn check_file(
    password: &SecretString,
    src: &Path,
    config: &ContainerConfig,
) -> Result<Option<String>> {
    let input = File::open(src).with_context(|| format!("opening: {}", src.display()))?;
    let name = check(password, BufReader::new(input), config)
        .with_context(|| format!("checking: {}", src.display()))?;

    tracing::info!(
        src = %src.display(),
        stored_name = name.as_deref().unwrap_or("<none stored>"),
        "password ok"
    );
    Ok(name)
}
