// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for cache key derivation and result caching

use thiserror::Error;

/// Cache errors
///
/// None of these are recoverable mid-operation: key derivation is a pure
/// computation, so a failure to obtain its inputs is terminal for the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A required collaborator is missing or the configuration is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The query engine does not expose the compiled-plan capability we need
    #[error("Incompatible query engine: {0}")]
    HostIncompatible(String),

    /// Parameter extraction found a parameter with no bound value
    #[error("Unbound query parameter: {0}")]
    UnboundParameter(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
