//! Error types for batchlaunch
//!
//! Errors are split by blast radius. `Validation` and `Submission` are scoped
//! to a single job and are recovered at the launcher loop boundary; `Config`,
//! `Yaml` and `Io` describe the batch as a whole and abort a run before any
//! job is processed.

use std::path::PathBuf;

use thiserror::Error;

/// Placeholder used when a job has no usable name yet
pub const UNNAMED_JOB: &str = "<unnamed>";

/// Main error type for batchlaunch operations
#[derive(Debug, Error)]
pub enum Error {
    /// A job definition is malformed
    #[error("validation error for {job}: {message}")]
    Validation {
        /// Name of the job with the invalid definition
        job: String,
        /// Description of what's invalid
        message: String,
        /// The offending field, when one can be named (e.g. "minGpuMemory")
        field: Option<String>,
    },

    /// The cluster rejected a job or could not be reached
    #[error("submission error for {job}: {message}")]
    Submission {
        /// Name of the job that failed to submit
        job: String,
        /// Description of what failed
        message: String,
        /// Underlying Kubernetes client error, if any
        #[source]
        source: Option<kube::Error>,
    },

    /// The batch configuration is unusable
    #[error("config error: {message}")]
    Config {
        /// Description of what's wrong
        message: String,
    },

    /// The batch configuration could not be parsed as YAML
    #[error("yaml error in {path}: {message}")]
    Yaml {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The batch configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a validation error for a job
    pub fn validation(job: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            job: job.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error for a job and a specific field
    pub fn validation_field(
        job: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            job: job.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a submission error without an underlying client error
    pub fn submission(job: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Submission {
            job: job.into(),
            message: msg.into(),
            source: None,
        }
    }

    /// Wrap a Kubernetes client error.
    ///
    /// The client error is kept only as the source, so `diagnostic()` prints it once.
    pub fn submission_from(
        job: impl Into<String>,
        msg: impl Into<String>,
        source: kube::Error,
    ) -> Self {
        Self::Submission {
            job: job.into(),
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create a batch configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Returns true if this error only affects the job that raised it
    pub fn is_job_scoped(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Submission { .. })
    }

    /// Name of the job this error is attributed to, if it is job-scoped
    pub fn job(&self) -> Option<&str> {
        match self {
            Self::Validation { job, .. } | Self::Submission { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Render the error together with its full source chain.
    ///
    /// Used for verbose failure reports; the plain `Display` output is the terse form.
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        if let Self::Validation {
            field: Some(field), ..
        } = self
        {
            out.push_str(&format!("\n  field: {field}"));
        }
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(&format!("\n  caused by: {err}"));
            source = err.source();
        }
        out
    }
}
