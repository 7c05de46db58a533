//! Uniform response envelopes and the raw JSON entry points.
//!
//! Every call through this module produces an envelope, never an `Err`: failures are folded into
//! an [`ErrorBody`] carrying a stable [`ErrorCode`] plus whatever detail helps the caller recover.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, ErrorCode, Result};
use crate::lines::LineRange;
use crate::ops::{
    Context, EditAction, ReadOutcome, ReadOutput, ReadRequest, WriteOperation, WriteOutput,
    WriteRequest, WriteResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_lines: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_checksum: Option<String>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let mut body = Self {
            code: err.code(),
            message: err.to_string(),
            candidates: None,
            match_count: None,
            match_lines: None,
            current_checksum: None,
        };
        match err {
            Error::Ambiguous { candidates, .. } => body.candidates = Some(candidates.clone()),
            Error::MultipleMatches { count, lines } => {
                body.match_count = Some(*count);
                body.match_lines = Some(lines.clone());
            }
            Error::ChecksumMismatch { actual, .. } => body.current_checksum = Some(actual.clone()),
            _ => {}
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResponse {
    pub success: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
    #[serde(flatten)]
    pub outcome: Option<ReadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub hint: String,
}

impl ReadResponse {
    fn success(output: ReadOutput) -> Self {
        let hint = read_hint(&output);
        Self {
            success: true,
            path: output.path,
            redirected_from: output.redirected_from,
            outcome: Some(output.outcome),
            error: None,
            hint,
        }
    }

    fn failure(path: String, err: &Error) -> Self {
        let body = ErrorBody::from(err);
        Self {
            success: false,
            path,
            redirected_from: None,
            outcome: None,
            hint: body.code.hint().to_string(),
            error: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub path: String,
    /// Echoes the requested operation, even when it was not recognised.
    pub operation: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WriteResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub hint: String,
}

impl WriteResponse {
    fn success(output: WriteOutput) -> Self {
        let hint = write_hint(&output);
        Self {
            success: true,
            path: output.path,
            operation: output.operation.to_string(),
            applied: output.applied,
            result: Some(output.result),
            error: None,
            hint,
        }
    }

    fn failure(path: String, operation: String, err: &Error) -> Self {
        let body = ErrorBody::from(err);
        Self {
            success: false,
            path,
            operation,
            applied: false,
            result: None,
            hint: body.code.hint().to_string(),
            error: Some(body),
        }
    }
}

fn read_hint(output: &ReadOutput) -> String {
    let base = match &output.outcome {
        ReadOutcome::File(file) if file.truncated => format!(
            "Showing {} of {} lines; pass lines=\"N-M\" to read more. Send checksum {} with edits.",
            file.range.map_or(0, |range| range.end),
            file.total_lines,
            file.checksum
        ),
        ReadOutcome::File(file) => {
            format!("Send checksum {} with edits to this file.", file.checksum)
        }
        ReadOutcome::Directory(listing) if listing.truncated => {
            "Listing truncated; read a subdirectory or lower depth.".to_string()
        }
        ReadOutcome::Directory(_) => "Read a file path to see its content.".to_string(),
        ReadOutcome::Search(result) if result.matches.is_empty() => {
            "No matches; try case_insensitive or pattern_mode=fuzzy.".to_string()
        }
        ReadOutcome::Search(result) if result.truncated => {
            "Results truncated; narrow the path or raise max_matches.".to_string()
        }
        ReadOutcome::Search(_) => {
            "Use lines from these matches, or the same pattern, to target an update.".to_string()
        }
        ReadOutcome::Find(found) if found.matches.is_empty() => {
            "Nothing matched; try a shorter query.".to_string()
        }
        ReadOutcome::Find(_) => "Read one of the matched paths.".to_string(),
    };
    match &output.redirected_from {
        Some(from) => format!("{from} was not found; read {} instead. {base}", output.path),
        None => base,
    }
}

fn write_hint(output: &WriteOutput) -> String {
    if !output.applied {
        return "Dry run: nothing was written. Repeat without dry_run to apply.".to_string();
    }
    match (output.operation, output.result.checksum.as_ref()) {
        (WriteOperation::Delete, _) => "File deleted.".to_string(),
        (_, Some(checksum)) => format!("Send checksum {checksum} with the next edit to this file."),
        (_, None) => String::new(),
    }
}

fn request_path(value: &Value) -> String {
    value
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn malformed(err: impl std::fmt::Display) -> Error {
    Error::InvalidType(format!("malformed request: {err}"))
}

/// A `lines` string that does not parse is a range error, not a type error.
fn screen_lines(value: &Value) -> Result<()> {
    match value.get("lines") {
        Some(Value::String(raw)) => raw.parse::<LineRange>().map(|_| ()),
        _ => Ok(()),
    }
}

/// Checks the enumerated fields up front so they fail with their own codes instead of a generic
/// deserialization error.
fn screen_write(value: &Value) -> std::result::Result<String, (String, Error)> {
    if !value.is_object() {
        return Err((String::new(), malformed("expected a JSON object")));
    }
    let operation = match value.get("operation") {
        None | Some(Value::Null) => {
            return Err((
                String::new(),
                Error::InvalidOperation("missing operation".to_string()),
            ));
        }
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => {
            return Err((
                other.to_string(),
                Error::InvalidOperation(format!("{other} is not an operation name")),
            ));
        }
    };
    if let Err(err) = WriteOperation::from_str(&operation) {
        return Err((operation, err));
    }
    match value.get("action") {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) => {
            if let Err(err) = EditAction::from_str(raw) {
                return Err((operation, err));
            }
        }
        Some(other) => {
            return Err((
                operation,
                Error::InvalidAction(format!("{other} is not an action name")),
            ));
        }
    }
    if let Err(err) = screen_lines(value) {
        return Err((operation, err));
    }
    Ok(operation)
}

impl Context {
    pub fn read_envelope(&self, request: ReadRequest) -> ReadResponse {
        let path = request.path.clone();
        match self.read(request) {
            Ok(output) => ReadResponse::success(output),
            Err(err) => {
                tracing::debug!(path = %path, code = %err.code(), error = %err, "read failed");
                ReadResponse::failure(path, &err)
            }
        }
    }

    pub fn write_envelope(&self, request: WriteRequest) -> WriteResponse {
        let path = request.path.clone();
        let operation = request.operation.to_string();
        match self.write(request) {
            Ok(output) => WriteResponse::success(output),
            Err(err) => {
                tracing::debug!(path = %path, code = %err.code(), error = %err, "write failed");
                WriteResponse::failure(path, operation, &err)
            }
        }
    }

    /// Parses a raw read request and runs it.
    pub fn read_json(&self, raw: &str) -> ReadResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => return ReadResponse::failure(String::new(), &malformed(err)),
        };
        if !value.is_object() {
            return ReadResponse::failure(String::new(), &malformed("expected a JSON object"));
        }
        let path = request_path(&value);
        if let Err(err) = screen_lines(&value) {
            return ReadResponse::failure(path, &err);
        }
        match serde_json::from_value::<ReadRequest>(value) {
            Ok(request) => self.read_envelope(request),
            Err(err) => ReadResponse::failure(path, &malformed(err)),
        }
    }

    /// Parses a raw write request and runs it.
    pub fn write_json(&self, raw: &str) -> WriteResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                return WriteResponse::failure(String::new(), String::new(), &malformed(err));
            }
        };
        let path = request_path(&value);
        let operation = match screen_write(&value) {
            Ok(operation) => operation,
            Err((operation, err)) => return WriteResponse::failure(path, operation, &err),
        };
        match serde_json::from_value::<WriteRequest>(value) {
            Ok(request) => self.write_envelope(request),
            Err(err) => WriteResponse::failure(path, operation, &malformed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_recovery_details() {
        let body = ErrorBody::from(&Error::Ambiguous {
            path: "config.js".to_string(),
            candidates: vec!["a/config.js".to_string(), "b/config.js".to_string()],
        });
        assert_eq!(body.code, ErrorCode::Ambiguous);
        assert_eq!(body.candidates.as_ref().map(Vec::len), Some(2));

        let body = ErrorBody::from(&Error::MultipleMatches {
            count: 3,
            lines: vec![1, 4],
        });
        assert_eq!(body.match_count, Some(3));
        assert_eq!(body.match_lines, Some(vec![1, 4]));

        let body = ErrorBody::from(&Error::ChecksumMismatch {
            expected: "aaaaaaaaaaaa".to_string(),
            actual: "bbbbbbbbbbbb".to_string(),
        });
        assert_eq!(body.current_checksum.as_deref(), Some("bbbbbbbbbbbb"));
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["code"], "CHECKSUM_MISMATCH");
        assert!(json.get("candidates").is_none());
    }

    #[test]
    fn screening_reports_operation_and_action_codes() {
        let missing = serde_json::json!({"path": "x.md"});
        let (_, err) = screen_write(&missing).expect_err("should reject");
        assert_eq!(err.code(), ErrorCode::InvalidOperation);

        let unknown = serde_json::json!({"path": "x.md", "operation": "rename"});
        let (operation, err) = screen_write(&unknown).expect_err("should reject");
        assert_eq!(operation, "rename");
        assert_eq!(err.code(), ErrorCode::InvalidOperation);

        let action = serde_json::json!({"operation": "update", "action": "upsert"});
        let (_, err) = screen_write(&action).expect_err("should reject");
        assert_eq!(err.code(), ErrorCode::InvalidAction);

        let ok = serde_json::json!({"operation": "update", "action": "insertBefore"});
        assert_eq!(screen_write(&ok).expect("valid"), "update");
    }
}
