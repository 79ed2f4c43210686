//! End-to-end launcher tests: YAML text in, compiled Jobs and reports out.
//!
//! A recording client stands in for the cluster so the full pipeline runs
//! without a Kubernetes API server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use batchlaunch_common::yaml::parse_yaml;
use batchlaunch_common::{Error, Result};
use batchlaunch_job::WorkloadDescriptor;
use batchlaunch_launcher::{
    BatchConfig, BatchLauncher, BatchReport, ClusterClient, JobOutcome, LaunchOptions, PodSummary,
    SubmittedJob,
};

const BATCH: &str = r#"
namespace: research
defaults:
  image: registry.example.com/trainer:1.4
  command: [python, train.py]
  minCpu: 4
  maxCpu: 8
  minRam: 16
  maxRam: 32
  shm: true
  volumes:
    datasets: /data
  env:
    WANDB_MODE: offline
    SEED: 7
jobs:
  - job_name: a100-train
    gpu: 1
    gpuType: NVIDIA-A100-SXM4-80GB
  - job_name: l40-train
    gpu: 2
    gpuType: NVIDIA-L40S
    region: us-west
    tolerations: [nvidia.com/gpu]
  - job_name: big-mem
    gpu: 1
    minGpuMemory: 40
    env:
      SEED: 8
  - job_name: broken
    gpuType: NVIDIA-L4
    minGpuMemory: 24
  - job_name: notebook
    command: jupyter lab --ip 0.0.0.0
    ports: [8888]
    workingDir: /workspace
"#;

/// Records every submitted Job and rejects the names it is told to
#[derive(Default)]
struct RecordingClient {
    submitted: Mutex<Vec<WorkloadDescriptor>>,
    reject: Vec<String>,
}

impl RecordingClient {
    fn rejecting(names: &[&str]) -> Self {
        Self {
            reject: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    fn submitted(&self) -> Vec<WorkloadDescriptor> {
        self.submitted.lock().unwrap().clone()
    }

    fn job(&self, name: &str) -> WorkloadDescriptor {
        self.submitted()
            .into_iter()
            .find(|j| j.name() == name)
            .unwrap_or_else(|| panic!("job {name} was not submitted"))
    }
}

#[async_trait]
impl ClusterClient for RecordingClient {
    async fn submit_job(&self, job: &WorkloadDescriptor) -> Result<SubmittedJob> {
        self.submitted.lock().unwrap().push(job.clone());
        if self.reject.iter().any(|n| n == job.name()) {
            return Err(Error::submission(job.name(), "jobs.batch already exists"));
        }
        Ok(SubmittedJob {
            name: job.name().to_string(),
            uid: Some(format!("{}-uid", job.name())),
        })
    }

    async fn list_pods(&self) -> Result<Vec<PodSummary>> {
        Ok(Vec::new())
    }
}

fn batch() -> BatchConfig {
    BatchConfig::from_value(&parse_yaml(BATCH).unwrap()).unwrap()
}

async fn launch(client: Arc<RecordingClient>, options: LaunchOptions) -> BatchReport {
    BatchLauncher::new(batch(), options)
        .with_client(client)
        .run()
        .await
        .unwrap()
}

fn to_json(job: &WorkloadDescriptor) -> Value {
    serde_json::to_value(job).unwrap()
}

#[tokio::test]
async fn submits_every_valid_job_in_order() {
    let client = Arc::new(RecordingClient::default());
    let report = launch(client.clone(), LaunchOptions::default()).await;

    let names: Vec<String> = client
        .submitted()
        .iter()
        .map(|j| j.name().to_string())
        .collect();
    assert_eq!(names, vec!["a100-train", "l40-train", "big-mem", "notebook"]);
    assert_eq!(report.records.len(), 5);
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(
        &report.records[3].outcome,
        JobOutcome::Failed { error: Error::Validation { .. } }
    ));

    let text = report.render(false);
    assert!(text.contains("Successfully created job: notebook"));
    assert!(text.contains("Failed to create job: broken"));
    assert!(text.ends_with("Failed jobs: 1"));
}

#[tokio::test]
async fn known_gpu_job_uses_dedicated_resource_without_affinity() {
    let client = Arc::new(RecordingClient::default());
    launch(client.clone(), LaunchOptions::default()).await;

    let job = to_json(&client.job("a100-train"));
    assert_eq!(job["metadata"]["namespace"], "research");
    let pod = &job["spec"]["template"]["spec"];
    let resources = &pod["containers"][0]["resources"];
    assert_eq!(resources["requests"]["cpu"], "4");
    assert_eq!(resources["requests"]["memory"], "16Gi");
    assert_eq!(resources["requests"]["nvidia.com/a100"], "1");
    assert_eq!(resources["limits"]["cpu"], "8");
    assert_eq!(resources["limits"]["memory"], "32Gi");
    assert_eq!(resources["limits"]["nvidia.com/a100"], "1");
    assert!(pod.get("affinity").is_none());
}

#[tokio::test]
async fn unknown_gpu_job_is_pinned_by_label() {
    let client = Arc::new(RecordingClient::default());
    launch(client.clone(), LaunchOptions::default()).await;

    let job = to_json(&client.job("l40-train"));
    let pod = &job["spec"]["template"]["spec"];
    let terms = &pod["affinity"]["nodeAffinity"]["requiredDuringSchedulingIgnoredDuringExecution"]
        ["nodeSelectorTerms"];
    assert_eq!(terms.as_array().unwrap().len(), 1);
    let exprs = terms[0]["matchExpressions"].as_array().unwrap();
    assert_eq!(exprs.len(), 2);
    assert_eq!(exprs[0]["key"], "nvidia.com/gpu.product");
    assert_eq!(exprs[0]["values"][0], "NVIDIA-L40S");
    assert_eq!(exprs[1]["key"], "topology.kubernetes.io/region");
    assert_eq!(
        pod["containers"][0]["resources"]["limits"]["nvidia.com/gpu"],
        "2"
    );
    assert_eq!(pod["tolerations"][0]["key"], "nvidia.com/gpu");
    assert_eq!(pod["tolerations"][0]["operator"], "Exists");
}

#[tokio::test]
async fn job_overrides_merge_into_nested_defaults() {
    let client = Arc::new(RecordingClient::default());
    launch(client.clone(), LaunchOptions::default()).await;

    let job = client.job("big-mem");
    let container = job.container().unwrap();
    let env: Vec<(&str, &str)> = container
        .env
        .iter()
        .map(|e| (e.name.as_str(), e.value.as_str()))
        .collect();
    assert_eq!(env, vec![("SEED", "8"), ("WANDB_MODE", "offline")]);

    let json = to_json(&job);
    let expr = &json["spec"]["template"]["spec"]["affinity"]["nodeAffinity"]
        ["requiredDuringSchedulingIgnoredDuringExecution"]["nodeSelectorTerms"][0]
        ["matchExpressions"][0];
    assert_eq!(expr["key"], "nvidia.com/gpu.memory");
    assert_eq!(expr["operator"], "Gt");
    assert_eq!(expr["values"][0], "40960");
}

#[tokio::test]
async fn shared_volumes_and_shm_are_mounted() {
    let client = Arc::new(RecordingClient::default());
    launch(client.clone(), LaunchOptions::default()).await;

    let job = client.job("notebook");
    let container = job.container().unwrap();
    let mounts: Vec<&str> = container
        .volume_mounts
        .iter()
        .map(|m| m.mount_path.as_str())
        .collect();
    assert_eq!(mounts, vec!["/data", "/dev/shm"]);
    assert_eq!(
        container.command.as_deref(),
        Some(
            &[
                "/bin/sh".to_string(),
                "-c".to_string(),
                "jupyter lab --ip 0.0.0.0".to_string()
            ][..]
        )
    );
    assert_eq!(container.working_dir.as_deref(), Some("/workspace"));
    assert_eq!(container.ports[0].container_port, 8888);
}

#[tokio::test]
async fn rejected_submission_is_isolated() {
    let client = Arc::new(RecordingClient::rejecting(&["l40-train"]));
    let report = launch(client.clone(), LaunchOptions::default()).await;

    assert_eq!(client.submitted().len(), 4);
    assert_eq!(report.failure_count(), 2);
    assert_eq!(report.submitted(), vec!["a100-train", "big-mem", "notebook"]);

    let verbose = report.render(true);
    assert!(verbose.contains("submission error for l40-train"));
}

#[tokio::test]
async fn dry_run_with_allow_list_submits_nothing() {
    let client = Arc::new(RecordingClient::default());
    let options = LaunchOptions::default()
        .with_jobs(["notebook", "not-configured"])
        .dry_run(true);
    let report = launch(client.clone(), options).await;

    assert!(client.submitted().is_empty());
    assert_eq!(report.records.len(), 1);
    let resolved = report.resolved();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0]["job_name"], "notebook");
    assert_eq!(resolved[0]["image"], "registry.example.com/trainer:1.4");
    assert_eq!(resolved[0]["env"]["SEED"], 7);
}
