//! Stable JSON output shapes for the CLI.
//!
//! Every JSON payload carries `schema_version`, a `kind` naming the command,
//! and `ok`. Failures add an `error` object with a snake_case `code`, a
//! human message, an optional `hint` and a `retryable` flag.

pub(crate) const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    NotConfigured,
    NoAnswer,
    SearchFailed,
    LlmFailed,
    FetchFailed,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotConfigured => "not_configured",
            ErrorCode::NoAnswer => "no_answer",
            ErrorCode::SearchFailed => "search_failed",
            ErrorCode::LlmFailed => "llm_failed",
            ErrorCode::FetchFailed => "fetch_failed",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::SearchFailed | ErrorCode::LlmFailed | ErrorCode::FetchFailed
        )
    }

    fn default_hint(self) -> Option<&'static str> {
        match self {
            ErrorCode::NotConfigured => {
                Some("run `answerpipe doctor` to see what is configured")
            }
            ErrorCode::NoAnswer => Some("run `answerpipe doctor` and check provider keys"),
            _ => None,
        }
    }
}

pub(crate) fn code_for(err: &answerpipe::Error) -> ErrorCode {
    match err {
        answerpipe::Error::NotConfigured(_) => ErrorCode::NotConfigured,
        answerpipe::Error::Search(_) => ErrorCode::SearchFailed,
        answerpipe::Error::Llm(_) => ErrorCode::LlmFailed,
        answerpipe::Error::InvalidUrl(_) | answerpipe::Error::Fetch(_) => ErrorCode::FetchFailed,
    }
}

pub(crate) fn error_obj(code: ErrorCode, message: &str, hint: Option<&str>) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "code": code.as_str(),
        "message": message,
        "retryable": code.retryable(),
    });
    if let Some(hint) = hint.or_else(|| code.default_hint()) {
        obj["hint"] = serde_json::Value::String(hint.to_string());
    }
    obj
}

pub(crate) fn error_envelope(kind: &str, err: &answerpipe::Error) -> serde_json::Value {
    let code = code_for(err);
    serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "kind": kind,
        "ok": false,
        "error": error_obj(code, &err.to_string(), None),
    })
}
