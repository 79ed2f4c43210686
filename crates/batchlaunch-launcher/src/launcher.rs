//! BatchLauncher - processes every job in a batch, one at a time
//!
//! For each configured job, in list order:
//! 1. Layer the job's options over the batch defaults
//! 2. Skip it if an allow-list is set and does not name it
//! 3. Validate and compile it into a Job
//! 4. Record the merged options (dry run) or submit the Job
//!
//! A failure in steps 3 or 4 is recorded against that job only; the loop always
//! continues with the next one. A name already used by an earlier job in the
//! batch fails the later entry before it is compiled.
//!
//! Failures are carried by the returned report; the per-job log line is
//! emitted at debug level so the report is the one place they are shown.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use batchlaunch_common::error::UNNAMED_JOB;
use batchlaunch_common::{merge, Error, Result};
use batchlaunch_job::{job_name_of, JobCompiler, JobDefinition, WorkloadDescriptor};

use crate::client::ClusterClient;
use crate::config::BatchConfig;
use crate::report::{BatchReport, JobOutcome};

/// Run-time switches for a launcher run
#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    /// Only process jobs with these names; `None` processes every job
    pub job_filter: Option<BTreeSet<String>>,
    /// Resolve and validate without submitting
    pub dry_run: bool,
    /// Log the full error chain for failures
    pub verbose: bool,
}

impl LaunchOptions {
    /// Restrict the run to the named jobs. An empty list leaves the run unrestricted.
    pub fn with_jobs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.job_filter = if names.is_empty() { None } else { Some(names) };
        self
    }

    /// Enable dry run
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable verbose failure diagnostics
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns true if the job should be processed
    pub fn selects(&self, name: Option<&str>) -> bool {
        match (&self.job_filter, name) {
            (None, _) => true,
            (Some(filter), Some(name)) => filter.contains(name),
            (Some(_), None) => false,
        }
    }
}

/// Launches the jobs of one batch configuration
pub struct BatchLauncher {
    config: BatchConfig,
    options: LaunchOptions,
    client: Option<Arc<dyn ClusterClient>>,
}

impl BatchLauncher {
    /// Create a launcher without a cluster client (enough for dry runs)
    pub fn new(config: BatchConfig, options: LaunchOptions) -> Self {
        Self {
            config,
            options,
            client: None,
        }
    }

    /// Set the client jobs are submitted through
    pub fn with_client(mut self, client: Arc<dyn ClusterClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Process every job and collect the outcomes.
    ///
    /// Only batch-level problems are returned as errors; per-job failures are
    /// recorded in the report.
    pub async fn run(&self) -> Result<BatchReport> {
        if !self.options.dry_run && self.client.is_none() {
            return Err(Error::config("no cluster client configured for submission"));
        }

        info!(
            namespace = %self.config.namespace,
            jobs = self.config.jobs.len(),
            dry_run = self.options.dry_run,
            "launching batch"
        );

        let mut report = BatchReport::new(self.options.dry_run);
        let mut seen = BTreeSet::new();
        for (index, entry) in self.config.jobs.iter().enumerate() {
            let merged = self.resolve(entry);
            let name = job_name_of(&merged);

            if !self.options.selects(name) {
                debug!(index, job = name.unwrap_or(UNNAMED_JOB), "not in job filter, skipping");
                continue;
            }
            let name = name.unwrap_or(UNNAMED_JOB).to_string();

            let outcome = if name != UNNAMED_JOB && !seen.insert(name.clone()) {
                JobOutcome::Failed {
                    error: Error::validation_field(
                        &name,
                        "job_name",
                        "duplicate job name in batch",
                    ),
                }
            } else {
                self.process(&name, &merged).await
            };
            match &outcome {
                JobOutcome::Submitted { uid } => {
                    info!(job = %name, uid = uid.as_deref().unwrap_or(""), "job submitted");
                }
                JobOutcome::Resolved { .. } => {
                    info!(job = %name, "job resolved (dry run)");
                }
                JobOutcome::Failed { error } => self.log_failure(&name, error),
            }
            report.push(index, name, outcome);
        }

        if self.options.dry_run {
            info!(resolved = report.resolved().len(), "dry run complete");
        } else if report.is_success() {
            info!(submitted = report.submitted().len(), "batch complete");
        } else {
            warn!(
                submitted = report.submitted().len(),
                failed = report.failure_count(),
                "batch complete with failures"
            );
        }

        Ok(report)
    }

    /// Layer one job entry over the batch defaults.
    ///
    /// Non-mapping entries are passed through and fail validation on their own.
    fn resolve(&self, entry: &Value) -> Value {
        match entry {
            Value::Object(overrides) => Value::Object(merge(&self.config.defaults, overrides)),
            other => other.clone(),
        }
    }

    fn compile(&self, merged: &Value) -> Result<WorkloadDescriptor> {
        let definition = JobDefinition::from_value(merged)?;
        JobCompiler::new(&definition)
            .with_namespace(&self.config.namespace)
            .compile()
    }

    async fn process(&self, name: &str, merged: &Value) -> JobOutcome {
        let job = match self.compile(merged) {
            Ok(job) => job,
            Err(error) => return JobOutcome::Failed { error },
        };

        if self.options.dry_run {
            return JobOutcome::Resolved {
                definition: merged.clone(),
            };
        }

        let Some(client) = &self.client else {
            return JobOutcome::Failed {
                error: Error::submission(name, "no cluster client configured"),
            };
        };

        match client.submit_job(&job).await {
            Ok(submitted) => JobOutcome::Submitted { uid: submitted.uid },
            Err(error) => JobOutcome::Failed { error },
        }
    }

    fn log_failure(&self, name: &str, error: &Error) {
        if self.options.verbose {
            debug!(job = %name, "job failed: {}", error.diagnostic());
        } else {
            debug!(job = %name, error = %error, "job failed");
        }
    }
}
