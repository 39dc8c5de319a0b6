//! Pipeline command builder.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Builder for an external pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCommand {
    /// Program to execute (name on PATH or a path)
    program: String,
    /// Positional arguments
    args: Vec<String>,
    /// Working directory for the process
    working_dir: Option<PathBuf>,
}

impl PipelineCommand {
    /// Create a new command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a boolean token (`true` / `false`).
    pub fn flag(self, enabled: bool) -> Self {
        self.arg(if enabled { "true" } else { "false" })
    }

    /// Add a decimal token.
    pub fn decimal(self, value: f64) -> Self {
        self.arg(format_decimal(value))
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Positional arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if set.
    pub fn get_working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Render the command line for logs.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Format a decimal with at least one fractional digit (`2` -> `2.0`).
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Resolve a program name on PATH, or check an explicit path.
pub fn resolve_program(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::InterpreterNotFound(program.to_string()))
}
