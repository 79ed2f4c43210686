//! Job definitions
//!
//! A `JobDefinition` is the flat, user-facing description of one batch job: what
//! to run, how much to reserve, and where it may be placed. It is produced from a
//! merged config mapping and validated in full before anything is compiled.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use batchlaunch_common::error::UNNAMED_JOB;
use batchlaunch_common::{Error, Result};

/// Default CPU request (cores)
pub const DEFAULT_MIN_CPU: i64 = 2;
/// Default CPU limit (cores)
pub const DEFAULT_MAX_CPU: i64 = 4;
/// Default memory request (GiB)
pub const DEFAULT_MIN_RAM: i64 = 4;
/// Default memory limit (GiB)
pub const DEFAULT_MAX_RAM: i64 = 8;

/// Longest job name that still leaves room for the `-container` suffix
/// within a 63 character DNS label.
pub const MAX_JOB_NAME_LEN: usize = 53;

/// Largest `minGpuMemory` (GiB) whose MiB node label value fits in a `u64`
pub const MAX_MIN_GPU_MEMORY: i64 = (u64::MAX / 1024) as i64;

/// The command a job runs
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Command {
    /// A shell command line, run through `/bin/sh -c`
    Shell(String),
    /// An exec-form argv, used verbatim
    Exec(Vec<String>),
}

impl Command {
    /// Container command for this job
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Shell(line) => vec!["/bin/sh".to_string(), "-c".to_string(), line.clone()],
            Self::Exec(argv) => argv.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Shell(line) => line.trim().is_empty(),
            Self::Exec(argv) => argv.is_empty(),
        }
    }
}

/// A single job as written in the batch configuration
///
/// Field names follow the configuration file (camelCase, with snake_case aliases
/// for the resource fields). Unknown keys are rejected.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobDefinition {
    /// Job name, also used for the container name and pod label
    #[serde(rename = "job_name", alias = "jobName", default)]
    pub job_name: String,

    /// Container image reference
    #[serde(default)]
    pub image: String,

    /// Command to run
    #[serde(default)]
    pub command: Option<Command>,

    /// Working directory inside the container
    #[serde(default, alias = "working_dir")]
    pub working_dir: Option<String>,

    /// Environment variables. Non-string values are stringified.
    #[serde(default)]
    pub env: Option<BTreeMap<String, Value>>,

    /// Persistent volume claim name -> mount path
    #[serde(default)]
    pub volumes: Option<BTreeMap<String, String>>,

    /// Container ports
    #[serde(default)]
    pub ports: Option<Vec<i64>>,

    /// Number of GPUs
    #[serde(default, alias = "gpuCount")]
    pub gpu: i64,

    /// GPU product name (mutually exclusive with `min_gpu_memory`)
    #[serde(default, alias = "gpu_type")]
    pub gpu_type: Option<String>,

    /// Minimum GPU memory in GiB (mutually exclusive with `gpu_type`)
    #[serde(default, alias = "min_gpu_memory")]
    pub min_gpu_memory: Option<i64>,

    /// Required topology region
    #[serde(default)]
    pub region: Option<String>,

    /// Required node hostname
    #[serde(default)]
    pub hostname: Option<String>,

    /// Taint keys to tolerate
    #[serde(default)]
    pub tolerations: Option<Vec<String>>,

    /// Mount a memory-backed `/dev/shm`
    #[serde(default)]
    pub shm: bool,

    /// CPU request (cores)
    #[serde(default = "default_min_cpu", alias = "min_cpu")]
    pub min_cpu: i64,

    /// CPU limit (cores), raised to `min_cpu` if lower
    #[serde(default = "default_max_cpu", alias = "max_cpu")]
    pub max_cpu: i64,

    /// Memory request (GiB)
    #[serde(default = "default_min_ram", alias = "min_ram")]
    pub min_ram: i64,

    /// Memory limit (GiB), raised to `min_ram` if lower
    #[serde(default = "default_max_ram", alias = "max_ram")]
    pub max_ram: i64,
}

fn default_min_cpu() -> i64 {
    DEFAULT_MIN_CPU
}

fn default_max_cpu() -> i64 {
    DEFAULT_MAX_CPU
}

fn default_min_ram() -> i64 {
    DEFAULT_MIN_RAM
}

fn default_max_ram() -> i64 {
    DEFAULT_MAX_RAM
}

impl Default for JobDefinition {
    fn default() -> Self {
        Self {
            job_name: String::new(),
            image: String::new(),
            command: None,
            working_dir: None,
            env: None,
            volumes: None,
            ports: None,
            gpu: 0,
            gpu_type: None,
            min_gpu_memory: None,
            region: None,
            hostname: None,
            tolerations: None,
            shm: false,
            min_cpu: DEFAULT_MIN_CPU,
            max_cpu: DEFAULT_MAX_CPU,
            min_ram: DEFAULT_MIN_RAM,
            max_ram: DEFAULT_MAX_RAM,
        }
    }
}

impl JobDefinition {
    /// Build a definition from a merged config mapping and validate it.
    pub fn from_value(value: &Value) -> Result<Self> {
        let name = job_name_of(value).unwrap_or(UNNAMED_JOB);
        if !value.is_object() {
            return Err(Error::validation(name, "job definition must be a mapping"));
        }
        let definition =
            Self::deserialize(value).map_err(|e| Error::validation(name, e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Name to attribute errors to
    pub fn display_name(&self) -> &str {
        if self.job_name.is_empty() {
            UNNAMED_JOB
        } else {
            &self.job_name
        }
    }

    /// Check every field constraint, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let name = self.display_name();

        if self.job_name.is_empty() {
            return Err(Error::validation_field(name, "job_name", "must not be empty"));
        }
        if !is_dns_label(&self.job_name) || self.job_name.len() > MAX_JOB_NAME_LEN {
            return Err(Error::validation_field(
                name,
                "job_name",
                format!(
                    "must be lowercase alphanumerics or '-', start and end alphanumeric, \
                     and be at most {MAX_JOB_NAME_LEN} characters"
                ),
            ));
        }
        if self.image.trim().is_empty() {
            return Err(Error::validation_field(name, "image", "must not be empty"));
        }
        match &self.command {
            None => return Err(Error::validation_field(name, "command", "is required")),
            Some(cmd) if cmd.is_empty() => {
                return Err(Error::validation_field(
                    name,
                    "command",
                    "must be a non-empty string or a non-empty list of strings",
                ))
            }
            Some(_) => {}
        }
        if self.gpu_type.is_some() && self.min_gpu_memory.is_some() {
            return Err(Error::validation_field(
                name,
                "minGpuMemory",
                "gpuType and minGpuMemory are mutually exclusive",
            ));
        }

        let quantities = [
            ("minCpu", Some(self.min_cpu)),
            ("maxCpu", Some(self.max_cpu)),
            ("minRam", Some(self.min_ram)),
            ("maxRam", Some(self.max_ram)),
            ("gpu", Some(self.gpu)),
            ("minGpuMemory", self.min_gpu_memory),
        ];
        for (field, value) in quantities {
            if let Some(v) = value.filter(|v| *v < 0) {
                return Err(Error::validation_field(
                    name,
                    field,
                    format!("must not be negative, got {v}"),
                ));
            }
        }
        if let Some(gib) = self.min_gpu_memory.filter(|gib| *gib > MAX_MIN_GPU_MEMORY) {
            return Err(Error::validation_field(
                name,
                "minGpuMemory",
                format!("{gib} GiB exceeds the maximum of {MAX_MIN_GPU_MEMORY} GiB"),
            ));
        }

        for port in self.ports.iter().flatten() {
            if !(1..=i64::from(u16::MAX)).contains(port) {
                return Err(Error::validation_field(
                    name,
                    "ports",
                    format!("port {port} is out of range 1-65535"),
                ));
            }
        }

        Ok(())
    }
}

/// Extract the job name from a raw mapping, if present
pub fn job_name_of(value: &Value) -> Option<&str> {
    value
        .get("job_name")
        .or_else(|| value.get("jobName"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    let valid_char = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-';
    !bytes.is_empty()
        && bytes.iter().all(valid_char)
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}
