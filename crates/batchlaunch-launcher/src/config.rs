//! Batch configuration
//!
//! A batch document has a required `namespace`, a required non-empty `jobs`
//! list and an optional `defaults` mapping layered under every job. Anything
//! wrong at this level is a config error and stops the run before the first job.

use std::path::Path;

use serde_json::{Map, Value};

use batchlaunch_common::yaml::load_yaml_file;
use batchlaunch_common::{Error, Result};

/// Parsed batch configuration, held read-only for one launcher run
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Namespace every job is created in
    pub namespace: String,
    /// Options shared by every job, overridden per job
    pub defaults: Map<String, Value>,
    /// Per-job option mappings, in submission order
    ///
    /// Entries are kept raw so a malformed one fails only its own job.
    pub jobs: Vec<Value>,
}

impl BatchConfig {
    /// Read a batch configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let value = load_yaml_file(path)?;
        Self::from_value(&value)
    }

    /// Build a batch configuration from a parsed document
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| Error::config("batch configuration must be a mapping"))?;

        let namespace = match root.get("namespace") {
            None | Some(Value::Null) => {
                return Err(Error::config("missing required key 'namespace'"))
            }
            Some(Value::String(ns)) if ns.trim().is_empty() => {
                return Err(Error::config("'namespace' must not be empty"))
            }
            Some(Value::String(ns)) => ns.clone(),
            Some(_) => return Err(Error::config("'namespace' must be a string")),
        };

        let defaults = match root.get("defaults") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(defaults)) => defaults.clone(),
            Some(_) => return Err(Error::config("'defaults' must be a mapping")),
        };

        let jobs = match root.get("jobs") {
            None | Some(Value::Null) => {
                return Err(Error::config("missing required key 'jobs'"))
            }
            Some(Value::Array(jobs)) if jobs.is_empty() => {
                return Err(Error::config("'jobs' must contain at least one job"))
            }
            Some(Value::Array(jobs)) => jobs.clone(),
            Some(_) => return Err(Error::config("'jobs' must be a list")),
        };

        Ok(Self {
            namespace,
            defaults,
            jobs,
        })
    }

    /// Replace the namespace, e.g. from a command line override
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
