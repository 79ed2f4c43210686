//! Per-job outcomes of a launcher run

use serde_json::Value;

use batchlaunch_common::Error;

/// What happened to one job
#[derive(Debug)]
pub enum JobOutcome {
    /// The cluster accepted the Job
    Submitted {
        /// UID assigned by the API server
        uid: Option<String>,
    },
    /// Dry run: the merged definition that would have been submitted
    Resolved {
        /// Merged job options
        definition: Value,
    },
    /// Validation or submission failed
    Failed {
        /// The job-scoped error
        error: Error,
    },
}

/// Outcome of one processed job
#[derive(Debug)]
pub struct JobRecord {
    /// Position of the job in the configured list
    pub index: usize,
    /// Job name, or a placeholder when it has none
    pub name: String,
    /// What happened
    pub outcome: JobOutcome,
}

impl JobRecord {
    /// Returns true if the job failed
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, JobOutcome::Failed { .. })
    }
}

/// Records for every job that was not filtered out, in list order
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// One record per processed job
    pub records: Vec<JobRecord>,
}

impl BatchReport {
    /// Create an empty report
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            records: Vec::new(),
        }
    }

    /// Append a record
    pub fn push(&mut self, index: usize, name: impl Into<String>, outcome: JobOutcome) {
        self.records.push(JobRecord {
            index,
            name: name.into(),
            outcome,
        });
    }

    /// Number of failed jobs
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }

    /// Returns true if no job failed
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Merged definitions recorded by a dry run
    pub fn resolved(&self) -> Vec<&Value> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                JobOutcome::Resolved { definition } => Some(definition),
                _ => None,
            })
            .collect()
    }

    /// Names of jobs accepted by the cluster
    pub fn submitted(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, JobOutcome::Submitted { .. }))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Human readable report.
    ///
    /// One line per job, then either the resolved definitions (dry run) or the
    /// failure total. `verbose` adds the full error chain under each failure.
    pub fn render(&self, verbose: bool) -> String {
        let mut lines = Vec::new();

        for record in &self.records {
            match &record.outcome {
                JobOutcome::Submitted { .. } => {
                    lines.push(format!("Successfully created job: {}", record.name));
                }
                JobOutcome::Resolved { .. } => {}
                JobOutcome::Failed { error } => {
                    lines.push(format!("Failed to create job: {}", record.name));
                    if verbose {
                        lines.push(format!("  {}", error.diagnostic().replace('\n', "\n  ")));
                    } else {
                        lines.push(format!("  {error}"));
                    }
                }
            }
        }

        if self.dry_run {
            let resolved = self.resolved();
            lines.push(format!("Resolved {} job(s):", resolved.len()));
            for definition in resolved {
                let text = serde_json::to_string_pretty(definition)
                    .unwrap_or_else(|_| definition.to_string());
                lines.push(text);
            }
        } else {
            lines.push(format!("Failed jobs: {}", self.failure_count()));
        }

        lines.join("\n")
    }
}
