// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner Cloud API error classification.
//!
//! Every failed API call is reduced to one of a handful of classes the reconcilers
//! branch on. The Hetzner error `code` from the response body wins; the HTTP status
//! decides when the body carries no usable code.
//!
//! | HTTP | `error.code` | Class |
//! |------|--------------|-------|
//! | 404 | `not_found` | [`HCloudError::NotFound`] |
//! | 429 | `rate_limit_exceeded` | [`HCloudError::RateLimited`] |
//! | 409, 423 | `conflict`, `uniqueness_error`, `locked`, `protected` | [`HCloudError::Conflict`] |
//! | 401, 403 | `unauthorized`, `forbidden`, `token_readonly` | [`HCloudError::Unauthorized`] |
//! | 400, 422 | `invalid_input`, `json_error`, `resource_limit_exceeded`, `unsupported_error` | [`HCloudError::InvalidInput`] |
//! | 5xx, transport | `server_error`, `service_error`, `maintenance`, `timeout`, `unavailable`, `resource_unavailable` | [`HCloudError::Transient`] |

use thiserror::Error;

/// Classified failure of a Hetzner Cloud API call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HCloudError {
    /// The resource does not exist (or no longer exists)
    #[error("Hetzner Cloud resource not found: {message}")]
    NotFound {
        /// Message returned by the API
        message: String,
    },

    /// Too many requests; the caller must back off
    #[error("Hetzner Cloud rate limit exceeded: {message}")]
    RateLimited {
        /// Message returned by the API
        message: String,
    },

    /// The request conflicts with the current state (name taken, resource locked)
    #[error("Hetzner Cloud conflict: {message}")]
    Conflict {
        /// Message returned by the API
        message: String,
    },

    /// The token is missing, invalid or lacks permissions
    #[error("Hetzner Cloud rejected the token: {message}")]
    Unauthorized {
        /// Message returned by the API
        message: String,
    },

    /// The request was rejected as malformed
    #[error("Hetzner Cloud rejected the request: {message}")]
    InvalidInput {
        /// Message returned by the API
        message: String,
    },

    /// Timeout, connection failure or server-side error
    #[error("Hetzner Cloud API unreachable: {message}")]
    Transient {
        /// Underlying error
        message: String,
    },
}

impl HCloudError {
    /// Classify an error response from its HTTP status and the Hetzner error code.
    #[must_use]
    pub fn from_response(status: u16, code: Option<&str>, message: &str) -> Self {
        let message = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message.to_string()
        };

        match code {
            Some("not_found") => Self::NotFound { message },
            Some("rate_limit_exceeded") => Self::RateLimited { message },
            Some("conflict" | "uniqueness_error" | "locked" | "protected") => {
                Self::Conflict { message }
            }
            Some("unauthorized" | "forbidden" | "token_readonly") => Self::Unauthorized { message },
            Some(
                "invalid_input" | "json_error" | "resource_limit_exceeded" | "unsupported_error",
            ) => Self::InvalidInput { message },
            Some(
                "server_error" | "service_error" | "maintenance" | "timeout" | "unavailable"
                | "resource_unavailable",
            ) => Self::Transient { message },
            _ => Self::from_status(status, message),
        }
    }

    fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => Self::NotFound { message },
            429 => Self::RateLimited { message },
            409 | 423 => Self::Conflict { message },
            401 | 403 => Self::Unauthorized { message },
            400 | 422 => Self::InvalidInput { message },
            _ => Self::Transient { message },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns true if retrying the same call later may succeed without any change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// Whether the API received and answered the request.
    ///
    /// Rate-limit and transient failures mean it did not.
    #[must_use]
    pub fn api_answered(&self) -> bool {
        !self.is_transient()
    }

    /// Short label used in metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Conflict { .. } => "conflict",
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Transient { .. } => "transient",
        }
    }
}

impl From<reqwest::Error> for HCloudError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        Self::Transient {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
