use std::io::Read;

use crate::error::CliError;

pub(crate) const DEFAULT_MAX_REQUEST_BYTES: u64 = 16 * 1024 * 1024;
const HARD_MAX_REQUEST_BYTES: u64 = 256 * 1024 * 1024;

/// The request text: the argument itself, or stdin when the argument is `-`.
pub(crate) fn load_request(arg: &str, max_bytes: u64) -> Result<String, CliError> {
    if arg == "-" {
        return read_limited(std::io::stdin().lock(), max_bytes);
    }
    check_limit(max_bytes)?;
    let size = u64::try_from(arg.len()).unwrap_or(u64::MAX);
    if size > max_bytes {
        return Err(too_large(size, max_bytes));
    }
    Ok(arg.to_string())
}

fn check_limit(max_bytes: u64) -> Result<(), CliError> {
    if max_bytes == 0 {
        return Err(CliError::Input("max request bytes must be > 0".to_string()));
    }
    if max_bytes > HARD_MAX_REQUEST_BYTES {
        return Err(CliError::Input(format!(
            "max request bytes exceeds hard limit ({HARD_MAX_REQUEST_BYTES} bytes)"
        )));
    }
    Ok(())
}

fn too_large(size_bytes: u64, max_bytes: u64) -> CliError {
    CliError::Input(format!(
        "request is too large ({size_bytes} bytes; max {max_bytes} bytes)"
    ))
}

pub(crate) fn read_limited(reader: impl Read, max_bytes: u64) -> Result<String, CliError> {
    check_limit(max_bytes)?;
    let mut bytes = Vec::<u8>::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::Input(format!("failed to read stdin: {err}")))?;

    let read_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if read_size > max_bytes {
        return Err(too_large(read_size, max_bytes));
    }
    String::from_utf8(bytes).map_err(|_| CliError::Input("request is not valid UTF-8".to_string()))
}
