//! JobCompiler: turns a `JobDefinition` into a `batch/v1` Job
//!
//! - Resource requests/limits and GPU resource key via `resources`
//! - Node affinity via `affinity`
//! - PVC volumes, optional `/dev/shm`, env, ports and tolerations via `helpers`
//!
//! Compilation is pure: it performs no I/O and the output depends only on the
//! definition and the target namespace.

use tracing::debug;

use batchlaunch_common::Result;

use crate::affinity::build_affinity;
use crate::definition::JobDefinition;
use crate::helpers::{env_vars, pvc_volumes, shm_volume, taint_tolerations};
use crate::k8s::{Container, ContainerPort, Job, JobSpec, ObjectMeta, PodSpec, PodTemplateSpec};
use crate::resources::compute_requests_and_limits;

/// Seconds a finished job is kept before the cluster garbage collects it (one week)
pub const TTL_SECONDS_AFTER_FINISHED: i64 = 7 * 24 * 60 * 60;

/// Failed pods are never retried by the cluster
pub const BACKOFF_LIMIT: i32 = 0;

/// Pull policy for job images
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Label carrying the job name on the pod template
pub const APP_LABEL: &str = "app";

/// Compiles a single job definition.
///
/// ```rust,ignore
/// let job = JobCompiler::new(&definition)
///     .with_namespace("research")
///     .compile()?;
/// ```
pub struct JobCompiler<'a> {
    definition: &'a JobDefinition,
    namespace: Option<&'a str>,
}

impl<'a> JobCompiler<'a> {
    /// Create a compiler for the given definition
    pub fn new(definition: &'a JobDefinition) -> Self {
        Self {
            definition,
            namespace: None,
        }
    }

    /// Stamp the namespace into the Job metadata
    pub fn with_namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Validate the definition and build the Job.
    pub fn compile(self) -> Result<Job> {
        let def = self.definition;
        def.validate()?;

        // Validation guarantees every quantity is non-negative
        let gpu = def.gpu.unsigned_abs();
        let min_gpu_memory = def.min_gpu_memory.map(i64::unsigned_abs);

        let resources = compute_requests_and_limits(
            def.min_cpu.unsigned_abs(),
            def.max_cpu.unsigned_abs(),
            def.min_ram.unsigned_abs(),
            def.max_ram.unsigned_abs(),
            gpu,
            def.gpu_type.as_deref(),
        );

        let affinity = build_affinity(
            gpu,
            def.gpu_type.as_deref(),
            min_gpu_memory,
            def.region.as_deref(),
            def.hostname.as_deref(),
        );

        let (mut volumes, mut volume_mounts) = match &def.volumes {
            Some(claims) => {
                debug!(job = %def.job_name, claims = ?claims.keys().collect::<Vec<_>>(), "mounting PVCs");
                pvc_volumes(claims)
            }
            None => (Vec::new(), Vec::new()),
        };

        if def.shm {
            debug!(job = %def.job_name, "adding memory-backed /dev/shm");
            let (volume, mount) = shm_volume();
            volumes.push(volume);
            volume_mounts.push(mount);
        }

        let env = def.env.as_ref().map(env_vars).unwrap_or_default();
        if !env.is_empty() {
            debug!(job = %def.job_name, count = env.len(), "adding environment variables");
        }

        // Range checked during validation
        let ports = def
            .ports
            .iter()
            .flatten()
            .filter_map(|p| u16::try_from(*p).ok())
            .map(|container_port| ContainerPort { container_port })
            .collect();

        let tolerations = def
            .tolerations
            .as_deref()
            .map(taint_tolerations)
            .unwrap_or_default();

        let container = Container {
            name: format!("{}-container", def.job_name),
            image: def.image.clone(),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
            command: def.command.as_ref().map(|c| c.argv()),
            working_dir: def.working_dir.clone(),
            env,
            ports,
            resources: Some(resources),
            volume_mounts,
        };

        let template = PodTemplateSpec {
            metadata: ObjectMeta::default().with_label(APP_LABEL, &def.job_name),
            spec: PodSpec {
                restart_policy: "Never".to_string(),
                containers: vec![container],
                volumes,
                affinity,
                tolerations,
            },
        };

        let mut metadata = ObjectMeta::named(&def.job_name);
        if let Some(namespace) = self.namespace {
            metadata = metadata.with_namespace(namespace);
        }

        Ok(Job::new(
            metadata,
            JobSpec {
                backoff_limit: BACKOFF_LIMIT,
                ttl_seconds_after_finished: Some(TTL_SECONDS_AFTER_FINISHED),
                template,
            },
        ))
    }
}

/// Compile a job definition without a namespace.
pub fn synthesize(definition: &JobDefinition) -> Result<Job> {
    JobCompiler::new(definition).compile()
}
