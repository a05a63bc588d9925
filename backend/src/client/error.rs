//! Error types for scenario series operations.
//!
//! Every failure the core can surface is one variant of [`SeriesError`], each
//! carrying an [`ErrorContext`] so the UI layer can pick a presentation
//! (retry banner, "no data for this combination", fatal error) without
//! parsing messages.

use serde::Serialize;
use std::fmt;

/// Result type for series operations
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Structured context for series errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "fetch_series", "aggregate")
    pub operation: Option<String>,
    /// The variable being queried
    pub variable: Option<String>,
    /// Canonical filter string of the request
    pub filters: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether a user-initiated retry may succeed
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the variable name.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Set the canonical filters.
    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref variable) = self.variable {
            parts.push(format!("variable={}", variable));
        }
        if let Some(ref filters) = self.filters {
            parts.push(format!("filters={}", filters));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for scenario series operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    /// Transport failure talking to the scenario source.
    /// Surfaced as a retryable error state; never auto-retried.
    #[error("Network error: {message} {context}")]
    Network {
        message: String,
        context: ErrorContext,
    },

    /// The requested variable is unknown to the source.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The filter set matches zero scenarios.
    #[error("No matching scenario: {message} {context}")]
    NoMatch {
        message: String,
        context: ErrorContext,
    },

    /// Aggregation was given no series or no points.
    #[error("Empty series: {message} {context}")]
    EmptySeries {
        message: String,
        context: ErrorContext,
    },

    /// Matched series share no common time step.
    #[error("Disjoint series: {message} {context}")]
    DisjointSeries {
        message: String,
        context: ErrorContext,
    },

    /// The source returned a body that violates the series contract.
    #[error("Invalid response: {message} {context}")]
    InvalidResponse {
        message: String,
        context: ErrorContext,
    },

    /// Baseline year lies outside the series (strict comparison only).
    #[error("Baseline out of range: {message} {context}")]
    BaselineOutOfRange {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Internal/unexpected errors.
    #[error("Internal error: {message} {context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl SeriesError {
    /// Create a network error. Network errors are always retryable.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a no-match error for the given canonical filters.
    pub fn no_match(filters: impl Into<String>) -> Self {
        let filters = filters.into();
        Self::NoMatch {
            message: "no scenario matches the selected parameters".to_string(),
            context: ErrorContext::default().with_filters(filters),
        }
    }

    /// Create an empty series error.
    pub fn empty_series(message: impl Into<String>) -> Self {
        Self::EmptySeries {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a disjoint series error.
    pub fn disjoint_series(message: impl Into<String>) -> Self {
        Self::DisjointSeries {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a baseline out of range error.
    pub fn baseline_out_of_range(message: impl Into<String>) -> Self {
        Self::BaselineOutOfRange {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NETWORK_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NoMatch { .. } => "NO_MATCH",
            Self::EmptySeries { .. } => "EMPTY_SERIES",
            Self::DisjointSeries { .. } => "DISJOINT_SERIES",
            Self::InvalidResponse { .. } => "INVALID_RESPONSE",
            Self::BaselineOutOfRange { .. } => "BASELINE_OUT_OF_RANGE",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message without the context suffix.
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::NotFound { message, .. }
            | Self::NoMatch { message, .. }
            | Self::EmptySeries { message, .. }
            | Self::DisjointSeries { message, .. }
            | Self::InvalidResponse { message, .. }
            | Self::BaselineOutOfRange { message, .. }
            | Self::Configuration { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Network { context, .. }
            | Self::NotFound { context, .. }
            | Self::NoMatch { context, .. }
            | Self::EmptySeries { context, .. }
            | Self::DisjointSeries { context, .. }
            | Self::InvalidResponse { context, .. }
            | Self::BaselineOutOfRange { context, .. }
            | Self::Configuration { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Network { context, .. }
            | Self::NotFound { context, .. }
            | Self::NoMatch { context, .. }
            | Self::EmptySeries { context, .. }
            | Self::DisjointSeries { context, .. }
            | Self::InvalidResponse { context, .. }
            | Self::BaselineOutOfRange { context, .. }
            | Self::Configuration { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add or update the variable in the error context.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.context_mut().variable = Some(variable.into());
        self
    }

    /// Add or update the canonical filters in the error context.
    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.context_mut().filters = Some(filters.into());
        self
    }

    /// Add or update the details in the error context.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.context_mut().details = Some(details.into());
        self
    }
}

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for SeriesError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SeriesError::invalid_response(format!("Failed to decode body: {}", err));
        }
        let details = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else {
            "transport"
        };
        SeriesError::network(err.to_string()).with_details(details)
    }
}
