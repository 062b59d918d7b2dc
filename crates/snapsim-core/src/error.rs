//! Error types for snapsim-core

use std::fmt::Write;
use thiserror::Error;

/// Remediation command for resolving an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snapsim-core
#[derive(Error, Debug)]
pub enum Error {
    /// Retention specification errors
    #[error("Retention spec error: {0}")]
    Spec(#[from] SpecError),

    /// Invalid operator input (snapshot list, numeric arguments)
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Spec(err) => Some(err.remediation()),
            Self::Input(err) => Some(err.remediation()),
            Self::Config(err) => Some(err.remediation()),
            // Broken pipes and closed terminals need no advice.
            Self::Io(_) => None,
        }
    }
}

/// Retention specification parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("entry '{entry}' is not of the form interval:count")]
    MissingSeparator { entry: String },

    #[error("unknown interval '{name}'")]
    UnknownInterval { name: String },

    #[error("count '{value}' in entry '{entry}' is not a non-negative integer")]
    InvalidCount { entry: String, value: String },
}

impl SpecError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::MissingSeparator { .. } => Remediation::new(
                "Write each retention rule as interval:count, separated by commas.",
            )
            .alternative("Example: -r hour:24,day:7,week:4,4week:13"),
            Self::UnknownInterval { .. } => {
                Remediation::new("Use one of the valid interval names.")
                    .command("List intervals", "snapsim --list-valid-intervals")
            }
            Self::InvalidCount { .. } => {
                Remediation::new("Retention counts must be whole numbers of zero or more.")
                    .alternative("Use a count of 0 to disable an interval.")
            }
        }
    }
}

/// Operator input errors detected before the simulation starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Empty snapshot list")]
    EmptySnapshotList,

    #[error("-i requires a positive numeric value (got '{0}')")]
    InvalidInterval(String),

    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("'{value}' does not match date format '{format}'")]
    InvalidNow { value: String, format: String },

    #[error("simulated clock ran past the supported date range")]
    ClockOverflow,
}

impl InputError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::EmptySnapshotList => Remediation::new(
                "Provide at least one snapshot name matching the date format.",
            )
            .command("Example", "printf '2024-01-01_00.00.00\\n' | snapsim -f %Y-%m-%d_%H.%M.%S -r day:7 -i 86400")
            .alternative("Check that -f matches the snapshot names exactly."),
            Self::InvalidInterval(_) => {
                Remediation::new("Pass the time step as a positive number of seconds.")
                    .alternative("Example: -i 3600 advances one hour per run.")
            }
            Self::MissingArgument(name) => {
                Remediation::new(format!("Pass {name} on the command line or set it in the config file."))
                    .command("Show usage", "snapsim --help")
            }
            Self::InvalidNow { format, .. } => {
                Remediation::new(format!("Write --now in the date format '{format}'."))
            }
            Self::ClockOverflow => Remediation::new(
                "Use a smaller -i step or cap the simulation with --runs.",
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid date format '{0}'")]
    InvalidDateFormat(String),

    #[error("Config validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => {
                Remediation::new(format!("Create the config file or fix the path: {path}"))
                    .alternative("Omit --config to use built-in defaults.")
            }
            Self::ReadFailed { path, .. } => {
                Remediation::new("Config file could not be read. Check permissions.")
                    .command("Check permissions", format!("ls -l \"{path}\""))
            }
            Self::ParseError(_) => Remediation::new("Config parse failed. Fix the TOML syntax and retry.")
                .alternative("Unknown keys and wrong value types are reported by line."),
            Self::InvalidDateFormat(_) => Remediation::new(
                "Use a strftime-style pattern such as %Y-%m-%d_%H.%M.%S.",
            )
            .alternative("Escape a literal percent sign as %%.")
            .alternative("Time zone items (%z, %Z) cannot be printed; drop them from the pattern."),
            Self::ValidationError(_) => {
                Remediation::new("Config validation failed. Fix the invalid fields and retry.")
            }
        }
    }
}

/// Format an error with remediation guidance for display.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    let mut output = format!("Error: {error}");
    if let Some(remediation) = error.remediation() {
        output.push('\n');
        output.push('\n');
        output.push_str(&remediation.render_plain());
    }
    output
}
