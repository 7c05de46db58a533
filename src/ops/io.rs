use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::checksum::Checksum;
use crate::error::{Error, Result};

/// Leading bytes inspected for NUL when deciding whether a file is text.
pub(super) const BINARY_SNIFF_BYTES: usize = 8 * 1024;

const TEMP_PREFIX: &str = ".guarded-vfs.";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug)]
pub(super) struct TextFile {
    pub(super) content: String,
    pub(super) checksum: Checksum,
    pub(super) size_bytes: u64,
}

pub(super) fn looks_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    memchr::memchr(0, head).is_some()
}

fn too_large(virtual_path: &str, size_bytes: u64, max_bytes: u64) -> Error {
    Error::TooLarge {
        path: virtual_path.to_string(),
        size_bytes,
        max_bytes,
    }
}

/// Reads a regular file, failing with `TooLarge` past `max_bytes`.
pub(super) fn read_bytes_limited(
    real: &Path,
    virtual_path: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let file = fs::File::open(real).map_err(|err| open_error(virtual_path, err))?;
    let meta = file
        .metadata()
        .map_err(|err| Error::io_path("metadata", virtual_path, err))?;
    if meta.is_dir() {
        return Err(Error::InvalidType(format!("{virtual_path} is a directory")));
    }
    if meta.len() > max_bytes {
        return Err(too_large(virtual_path, meta.len(), max_bytes));
    }

    let mut bytes = Vec::with_capacity(usize::try_from(meta.len()).unwrap_or(0));
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io_path("read", virtual_path, err))?;
    let read_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if read_size > max_bytes {
        return Err(too_large(virtual_path, read_size, max_bytes));
    }
    Ok(bytes)
}

/// A missing file, or a missing directory because a parent component is a regular file.
pub(super) fn is_missing(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

fn open_error(virtual_path: &str, err: std::io::Error) -> Error {
    if is_missing(&err) {
        Error::NotFound(virtual_path.to_string())
    } else {
        Error::io_path("open", virtual_path, err)
    }
}

/// Reads a UTF-8 text file. A NUL in the leading bytes or invalid UTF-8 is `NotText`.
pub(super) fn read_text(real: &Path, virtual_path: &str, max_bytes: u64) -> Result<TextFile> {
    let bytes = read_bytes_limited(real, virtual_path, max_bytes)?;
    if looks_binary(&bytes) {
        return Err(Error::NotText(virtual_path.to_string()));
    }
    let checksum = Checksum::compute(&bytes);
    let size_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    let content =
        String::from_utf8(bytes).map_err(|_| Error::NotText(virtual_path.to_string()))?;
    Ok(TextFile {
        content,
        checksum,
        size_bytes,
    })
}

pub(super) fn ensure_write_size(virtual_path: &str, bytes: &[u8], max_bytes: u64) -> Result<()> {
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if size > max_bytes {
        return Err(too_large(virtual_path, size, max_bytes));
    }
    Ok(())
}

/// Streams the file through the hasher; no size limit applies.
pub(super) fn hash_file(real: &Path, virtual_path: &str) -> Result<Checksum> {
    let file = fs::File::open(real).map_err(|err| open_error(virtual_path, err))?;
    Checksum::from_reader(file).map_err(|err| Error::io_path("read", virtual_path, err))
}

/// Fails with `ChecksumMismatch` if the file no longer hashes to `expected`.
pub(super) fn recheck(real: &Path, virtual_path: &str, expected: &Checksum) -> Result<()> {
    hash_file(real, virtual_path)?.ensure_matches(Some(expected.as_str()))
}

fn write_temp_file(
    parent: &Path,
    virtual_path: &str,
    bytes: &[u8],
) -> Result<tempfile::NamedTempFile> {
    let mut tmp_file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|err| Error::io_path("create_temp", virtual_path, err))?;
    tmp_file
        .as_file_mut()
        .write_all(bytes)
        .map_err(|err| Error::io_path("write", virtual_path, err))?;
    tmp_file
        .as_file_mut()
        .sync_all()
        .map_err(|err| Error::io_path("sync", virtual_path, err))?;
    Ok(tmp_file)
}

fn parent_of<'a>(real: &'a Path, virtual_path: &str) -> Result<&'a Path> {
    real.parent().ok_or_else(|| {
        Error::InvalidPath(format!("{virtual_path} has no parent directory"))
    })
}

/// Replaces an existing file through a temporary sibling and a rename.
///
/// With `expected`, the file is re-hashed right before the rename and the replacement is
/// abandoned if it changed since the caller read it.
pub(super) fn replace_atomic(
    real: &Path,
    virtual_path: &str,
    bytes: &[u8],
    expected: Option<&Checksum>,
) -> Result<()> {
    let parent = parent_of(real, virtual_path)?;
    let permissions = fs::metadata(real)
        .map_err(|err| Error::io_path("metadata", virtual_path, err))?
        .permissions();

    let tmp_file = write_temp_file(parent, virtual_path, bytes)?;
    tmp_file
        .as_file()
        .set_permissions(permissions)
        .map_err(|err| Error::io_path("set_permissions", virtual_path, err))?;

    if let Some(expected) = expected {
        recheck(real, virtual_path, expected)?;
    }
    tmp_file
        .persist(real)
        .map_err(|err| Error::io_path("rename", virtual_path, err.error))?;
    Ok(())
}

/// Creates a new file (and missing parent directories) without replacing anything.
pub(super) fn create_new(real: &Path, virtual_path: &str, bytes: &[u8]) -> Result<()> {
    let parent = parent_of(real, virtual_path)?;
    fs::create_dir_all(parent).map_err(|err| Error::io_path("create_dir_all", virtual_path, err))?;

    let tmp_file = write_temp_file(parent, virtual_path, bytes)?;
    match tmp_file.persist_noclobber(real) {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(Error::AlreadyExists(virtual_path.to_string()))
        }
        Err(err) => Err(Error::io_path("rename", virtual_path, err.error)),
    }
}

pub(super) fn remove_file(real: &Path, virtual_path: &str) -> Result<()> {
    fs::remove_file(real).map_err(|err| open_error(virtual_path, err))
}
