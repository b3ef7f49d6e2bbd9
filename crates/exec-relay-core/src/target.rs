//! Description of the remote instance and command a relay session streams from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Target validation error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Instance name is empty")]
    MissingInstance,
    #[error("Scope is empty")]
    MissingScope,
    #[error("Container name is empty")]
    MissingContainer,
    #[error("Command is empty")]
    EmptyCommand,
    #[error("Command program is blank")]
    BlankProgram,
}

/// Identifies the remote instance and the command a session executes there.
///
/// Immutable once a relay session starts; the relay never mutates the
/// instance itself and assumes the diagnostic container it addresses is
/// already present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecTarget {
    /// Remote instance (pod) name.
    pub instance: String,

    /// Namespace-like scope the instance lives in.
    pub scope: String,

    /// Container (process) inside the instance to exec into.
    pub container: String,

    /// Command argv to execute.
    pub command: Vec<String>,

    /// Allocate a TTY for the remote process.
    #[serde(default)]
    pub tty: bool,

    /// Attach a stdin channel to the remote process.
    #[serde(default)]
    pub stdin: bool,

    /// Arbitrary metadata for app-specific needs.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecTarget {
    /// Create a new target with stdio flags off and no metadata.
    #[must_use]
    pub fn new<S>(
        instance: impl Into<String>,
        scope: impl Into<String>,
        container: impl Into<String>,
        command: S,
    ) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            instance: instance.into(),
            scope: scope.into(),
            container: container.into(),
            command: command.into_iter().map(Into::into).collect(),
            tty: false,
            stdin: false,
            metadata: HashMap::new(),
        }
    }

    /// Enable or disable TTY allocation.
    #[must_use]
    pub const fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Enable or disable the stdin channel.
    #[must_use]
    pub const fn with_stdin(mut self, stdin: bool) -> Self {
        self.stdin = stdin;
        self
    }

    /// Get a metadata value by key.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Check that every required field is present and well-formed.
    ///
    /// # Errors
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.instance.trim().is_empty() {
            return Err(TargetError::MissingInstance);
        }
        if self.scope.trim().is_empty() {
            return Err(TargetError::MissingScope);
        }
        if self.container.trim().is_empty() {
            return Err(TargetError::MissingContainer);
        }
        let Some(program) = self.command.first() else {
            return Err(TargetError::EmptyCommand);
        };
        if program.trim().is_empty() {
            return Err(TargetError::BlankProgram);
        }
        Ok(())
    }
}
