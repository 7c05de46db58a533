const CLI_ERROR_CODE_JSON: &str = "json";
const CLI_ERROR_CODE_INPUT: &str = "input";

/// Failures that happen before or after the engine produced an envelope.
#[derive(Debug)]
pub(crate) enum CliError {
    Engine(guarded_vfs::Error),
    Json(serde_json::Error),
    Input(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Engine(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "json error: {err}"),
            CliError::Input(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Engine(err) => Some(err),
            CliError::Json(err) => Some(err),
            CliError::Input(_) => None,
        }
    }
}

impl From<guarded_vfs::Error> for CliError {
    fn from(err: guarded_vfs::Error) -> Self {
        Self::Engine(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl CliError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            CliError::Engine(err) => err.code().as_str(),
            CliError::Json(_) => CLI_ERROR_CODE_JSON,
            CliError::Input(_) => CLI_ERROR_CODE_INPUT,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let mut error = serde_json::Map::new();
        error.insert(
            "code".to_string(),
            serde_json::Value::String(self.code().to_string()),
        );
        error.insert(
            "message".to_string(),
            serde_json::Value::String(self.to_string()),
        );
        if let CliError::Engine(err) = self {
            error.insert(
                "hint".to_string(),
                serde_json::Value::String(err.code().hint().to_string()),
            );
        }
        serde_json::json!({ "success": false, "error": error })
    }
}
