//! Unified error taxonomy with stable error codes for the operator platform.
//!
//! Every platform error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by [`RfpError::new`]
//! to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to, per the error handling
/// design: each kind maps to a surfaced HTTP status and a retry posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Prerequisite missing (e.g. API key). Never retried.
    NotConfigured,
    /// AI/chat/git-host failure, possibly after exhausting retries.
    Upstream,
    /// Model output did not parse or violated a schema/validator.
    ParseValidation,
    /// Agent loop tried to write before loading, or post before writing.
    ProtocolViolation,
    /// Durable write dropped because an invariant was not met.
    PolicyCheck,
    /// Repository-level not-found.
    NotFound,
    /// Repository-level conflict from a conditional write losing a race.
    Conflict,
    /// Policy-scoped allowlist rejection (domain/key/channel/repo).
    NotAllowed,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCategory {
    /// The HTTP status this category surfaces as, per §7.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotConfigured => 500,
            Self::Upstream => 502,
            Self::ParseValidation => 500,
            Self::ProtocolViolation => 500,
            Self::PolicyCheck => 200,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::NotAllowed => 400,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotConfigured => "not_configured",
            Self::Upstream => "upstream",
            Self::ParseValidation => "parse_validation",
            Self::ProtocolViolation => "protocol_violation",
            Self::PolicyCheck => "policy_check",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::NotAllowed => "not_allowed",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required API key or credential is missing.
    NotConfigured,
    /// The upstream AI/chat/git-host call failed after retries were exhausted.
    UpstreamFailed,
    /// The upstream call failed because the circuit breaker is open.
    UpstreamCircuitOpen,
    /// AI output failed to parse as JSON.
    ParseFailed,
    /// AI output did not satisfy the expected JSON schema.
    SchemaViolation,
    /// The agent attempted a write tool before loading opportunity state.
    ProtocolLoadBeforeWrite,
    /// The agent attempted to post a summary before recording a write.
    ProtocolWriteBeforeTalk,
    /// A durable write was dropped because an invariant was not met.
    PolicyCheckFailed,
    /// The requested resource does not exist.
    NotFound,
    /// A conditional write lost a race against a concurrent writer.
    Conflict,
    /// The requested domain is not on the allowlist.
    DomainNotAllowed,
    /// The requested key is not on the allowlist.
    KeyNotAllowed,
    /// The requested channel is not on the allowlist.
    ChannelNotAllowed,
    /// The requested repository is not on the allowlist.
    RepoNotAllowed,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConfigured => ErrorCategory::NotConfigured,
            Self::UpstreamFailed | Self::UpstreamCircuitOpen => ErrorCategory::Upstream,
            Self::ParseFailed | Self::SchemaViolation => ErrorCategory::ParseValidation,
            Self::ProtocolLoadBeforeWrite | Self::ProtocolWriteBeforeTalk => {
                ErrorCategory::ProtocolViolation
            }
            Self::PolicyCheckFailed => ErrorCategory::PolicyCheck,
            Self::NotFound => ErrorCategory::NotFound,
            Self::Conflict => ErrorCategory::Conflict,
            Self::DomainNotAllowed
            | Self::KeyNotAllowed
            | Self::ChannelNotAllowed
            | Self::RepoNotAllowed => ErrorCategory::NotAllowed,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"UPSTREAM_FAILED"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::UpstreamFailed => "UPSTREAM_FAILED",
            Self::UpstreamCircuitOpen => "UPSTREAM_CIRCUIT_OPEN",
            Self::ParseFailed => "PARSE_FAILED",
            Self::SchemaViolation => "SCHEMA_VIOLATION",
            Self::ProtocolLoadBeforeWrite => "PROTOCOL_LOAD_BEFORE_WRITE",
            Self::ProtocolWriteBeforeTalk => "PROTOCOL_WRITE_BEFORE_TALK",
            Self::PolicyCheckFailed => "POLICY_CHECK_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::KeyNotAllowed => "KEY_NOT_ALLOWED",
            Self::ChannelNotAllowed => "CHANNEL_NOT_ALLOWED",
            Self::RepoNotAllowed => "REPO_NOT_ALLOWED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RfpError
// ---------------------------------------------------------------------------

/// Unified platform error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use rfp_error::{RfpError, ErrorCode};
///
/// let err = RfpError::new(ErrorCode::UpstreamFailed, "timed out after 30 s")
///     .with_context("provider", "chat")
///     .with_context("timeout_ms", 30_000);
/// ```
pub struct RfpError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
    /// Whether the call that produced this error is safe to retry.
    pub retryable: bool,
}

impl RfpError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let retryable = matches!(code.category(), ErrorCategory::Upstream);
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
            retryable,
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the default retryability for this error.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// The tool-boundary propagation shape from §7:
    /// `{ok: false, error, errorCategory, retryable, errorType, errorDetails}`.
    pub fn to_tool_error(&self) -> ToolError {
        ToolError {
            ok: false,
            error: self.message.clone(),
            error_category: self.category(),
            retryable: self.retryable,
            error_type: self.code,
            error_details: self.context.clone(),
        }
    }
}

impl fmt::Debug for RfpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RfpError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for RfpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RfpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Tool boundary propagation (§7)
// ---------------------------------------------------------------------------

/// The shape every tool handler returns instead of throwing across the
/// dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolError {
    /// Always `false` for this type; present so serialized output carries an
    /// explicit `ok` discriminant alongside successful tool results.
    pub ok: bool,
    /// Human-readable error message.
    pub error: String,
    /// Broad error family.
    #[serde(rename = "errorCategory")]
    pub error_category: ErrorCategory,
    /// Whether the caller may retry this call.
    pub retryable: bool,
    /// Stable machine-readable error type.
    #[serde(rename = "errorType")]
    pub error_type: ErrorCode,
    /// Structured details for diagnostics.
    #[serde(rename = "errorDetails")]
    pub error_details: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of an [`RfpError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RfpErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
    /// Whether the call is safe to retry.
    pub retryable: bool,
}

impl From<&RfpError> for RfpErrorDto {
    fn from(err: &RfpError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
            retryable: err.retryable,
        }
    }
}

impl From<RfpErrorDto> for RfpError {
    fn from(dto: RfpErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
            retryable: dto.retryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::NotConfigured,
        ErrorCode::UpstreamFailed,
        ErrorCode::UpstreamCircuitOpen,
        ErrorCode::ParseFailed,
        ErrorCode::SchemaViolation,
        ErrorCode::ProtocolLoadBeforeWrite,
        ErrorCode::ProtocolWriteBeforeTalk,
        ErrorCode::PolicyCheckFailed,
        ErrorCode::NotFound,
        ErrorCode::Conflict,
        ErrorCode::DomainNotAllowed,
        ErrorCode::KeyNotAllowed,
        ErrorCode::ChannelNotAllowed,
        ErrorCode::RepoNotAllowed,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = RfpError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = RfpError::new(ErrorCode::NotFound, "no such rfp");
        assert_eq!(err.to_string(), "[NOT_FOUND] no such rfp");
    }

    #[test]
    fn display_with_context() {
        let err =
            RfpError::new(ErrorCode::UpstreamFailed, "timed out").with_context("timeout_ms", 5000);
        let s = err.to_string();
        assert!(s.starts_with("[UPSTREAM_FAILED] timed out"));
        assert!(s.contains("timeout_ms"));
        assert!(s.contains("5000"));
    }

    #[test]
    fn upstream_defaults_retryable() {
        let err = RfpError::new(ErrorCode::UpstreamFailed, "down");
        assert!(err.retryable);
        let err = RfpError::new(ErrorCode::NotConfigured, "no key");
        assert!(!err.retryable);
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = RfpError::new(ErrorCode::Internal, "init failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("file missing"));
    }

    #[test]
    fn protocol_codes_categorised() {
        assert_eq!(
            ErrorCode::ProtocolLoadBeforeWrite.category(),
            ErrorCategory::ProtocolViolation
        );
        assert_eq!(
            ErrorCode::ProtocolWriteBeforeTalk.category(),
            ErrorCategory::ProtocolViolation
        );
    }

    #[test]
    fn not_allowed_codes_categorised() {
        for code in [
            ErrorCode::DomainNotAllowed,
            ErrorCode::KeyNotAllowed,
            ErrorCode::ChannelNotAllowed,
            ErrorCode::RepoNotAllowed,
        ] {
            assert_eq!(code.category(), ErrorCategory::NotAllowed);
            assert_eq!(code.category().http_status(), 400);
        }
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCategory::Upstream.http_status(), 502);
        assert_eq!(ErrorCategory::NotFound.http_status(), 404);
        assert_eq!(ErrorCategory::Conflict.http_status(), 409);
        assert_eq!(ErrorCategory::PolicyCheck.http_status(), 200);
    }

    #[test]
    fn builder_with_context_multiple_keys() {
        let err = RfpError::new(ErrorCode::UpstreamFailed, "timeout")
            .with_context("provider", "chat")
            .with_context("timeout_ms", 30_000)
            .with_context("retries", 3);
        assert_eq!(err.context.len(), 3);
        assert_eq!(err.context["provider"], serde_json::json!("chat"));
    }

    #[test]
    fn to_tool_error_shape() {
        let err = RfpError::new(ErrorCode::PolicyCheckFailed, "dropped commitment")
            .with_context("dropped", 1);
        let tool_err = err.to_tool_error();
        assert!(!tool_err.ok);
        assert_eq!(tool_err.error_type, ErrorCode::PolicyCheckFailed);
        assert_eq!(tool_err.error_category, ErrorCategory::PolicyCheck);
        let json = serde_json::to_string(&tool_err).unwrap();
        assert!(json.contains("\"errorCategory\""));
        assert!(json.contains("\"errorType\""));
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let code = ErrorCode::UpstreamFailed;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""UPSTREAM_FAILED""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn dto_roundtrip_without_source() {
        let err = RfpError::new(ErrorCode::SchemaViolation, "bad json").with_context("node", "plan");
        let dto: RfpErrorDto = (&err).into();
        let json = serde_json::to_string(&dto).unwrap();
        let back: RfpErrorDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto, back);
        assert!(back.source_message.is_none());
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = RfpError::new(ErrorCode::Internal, "staging").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            let s = code.as_str();
            assert!(seen.insert(s), "duplicate as_str value: {s}");
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn error_code_count() {
        assert_eq!(ALL_CODES.len(), 15);
    }
}
