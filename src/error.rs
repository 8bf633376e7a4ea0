//! Error types.
//!
//! Only [`ProviderError`] ever reaches a caller of the provider contract, and
//! only from `create_client`. Everything raised while a call is in flight is
//! folded into a [`crate::ModelResponse`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced when constructing a client for a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{label} not found: `{command}` is not on PATH. {hint}")]
    ExecutableNotFound {
        label: &'static str,
        command: String,
        hint: &'static str,
    },
}

/// Errors from running a child process.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare prompt file in {dir}: {source}")]
    PromptFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write prompt to stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("failed waiting for subprocess: {0}")]
    Wait(#[source] std::io::Error),

    #[error("failed to read subprocess output: {0}")]
    Output(#[source] std::io::Error),

    #[error("subprocess output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("subprocess {0} was not captured")]
    Pipe(&'static str),

    #[error("output reader task failed: {0}")]
    Join(String),

    #[error("failed to start process runtime: {0}")]
    Runtime(String),
}

/// Errors from the provider registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown provider '{key}'. Known providers: {known}")]
    UnknownProvider { key: String, known: String },

    #[error("the global provider registry is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from loading the provider config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings for provider '{key}': {source}")]
    Provider {
        key: String,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pipe_is_not_reported_as_join_failure() {
        let err = ExecError::Pipe("stdout");
        assert_eq!(err.to_string(), "subprocess stdout was not captured");
        assert!(!matches!(err, ExecError::Join(_)));
    }
}
