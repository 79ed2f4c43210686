//! Cluster API client
//!
//! The launcher only needs two operations from the cluster: create one Job and,
//! for diagnostics, list the pods in the namespace. Both sit behind
//! `ClusterClient` so the launcher can be driven by a mock in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DynamicObject, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config, ResourceExt};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use batchlaunch_common::{Error, Result};
use batchlaunch_job::WorkloadDescriptor;

/// Field manager recorded on objects created by batchlaunch
pub const FIELD_MANAGER: &str = "batchlaunch";

/// Default connection timeout for API server requests
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for API server requests
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A Job accepted by the cluster
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedJob {
    /// Name of the created Job
    pub name: String,
    /// UID assigned by the API server
    pub uid: Option<String>,
}

/// Pod listing entry
#[derive(Clone, Debug, PartialEq)]
pub struct PodSummary {
    /// Pod name
    pub name: String,
    /// Pod phase (Pending, Running, Succeeded, Failed, Unknown)
    pub phase: Option<String>,
    /// Node the pod is bound to
    pub node: Option<String>,
}

/// Trait abstracting the cluster operations used by the launcher
///
/// Implementations are scoped to a single namespace.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create one Job
    ///
    /// # Arguments
    ///
    /// * `job` - Compiled Job to create
    async fn submit_job(&self, job: &WorkloadDescriptor) -> Result<SubmittedJob>;

    /// List the pods in the namespace
    async fn list_pods(&self) -> Result<Vec<PodSummary>>;
}

/// Real Kubernetes client implementation
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Create a client for the given namespace
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn job_api(&self) -> Api<DynamicObject> {
        let ar = ApiResource {
            group: "batch".to_string(),
            version: "v1".to_string(),
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
            plural: "jobs".to_string(),
        };
        Api::namespaced_with(self.client.clone(), &self.namespace, &ar)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn submit_job(&self, job: &WorkloadDescriptor) -> Result<SubmittedJob> {
        let name = job.name();
        let value =
            serde_json::to_value(job).map_err(|e| Error::submission(name, e.to_string()))?;
        let obj: DynamicObject =
            serde_json::from_value(value).map_err(|e| Error::submission(name, e.to_string()))?;

        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        debug!(job = %name, namespace = %self.namespace, "creating job");
        let created = self
            .job_api()
            .create(&params, &obj)
            .await
            .map_err(|e| Error::submission_from(name, "failed to create job", e))?;

        info!(job = %name, namespace = %self.namespace, "job created");
        Ok(SubmittedJob {
            name: created.name_any(),
            uid: created.uid(),
        })
    }

    async fn list_pods(&self) -> Result<Vec<PodSummary>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::submission_from(&self.namespace, "failed to list pods", e))?;

        Ok(pods.items.iter().map(pod_summary).collect())
    }
}

fn pod_summary(pod: &Pod) -> PodSummary {
    PodSummary {
        name: pod.name_any(),
        phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
        node: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
    }
}

/// Create a kube client from an optional kubeconfig path, using default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from an optional kubeconfig path with custom timeouts
///
/// Without a path the configuration is inferred (KUBECONFIG, `~/.kube/config`
/// or the in-cluster service account).
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::config(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::config(format!("failed to load kubeconfig: {}", e)))?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::config(format!("failed to infer kube config: {}", e)))?,
    };
    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config)
        .map_err(|e| Error::config(format!("failed to create client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodSpec, PodStatus};
    use kube::api::ObjectMeta;

    #[test]
    fn pod_summary_reads_phase_and_node() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("train-x7k2p".to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some("gpu-node-1".to_string()),
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
        };
        assert_eq!(
            pod_summary(&pod),
            PodSummary {
                name: "train-x7k2p".to_string(),
                phase: Some("Running".to_string()),
                node: Some("gpu-node-1".to_string()),
            }
        );
    }

    #[test]
    fn pod_summary_tolerates_unscheduled_pods() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("pending".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = pod_summary(&pod);
        assert_eq!(summary.name, "pending");
        assert!(summary.phase.is_none());
        assert!(summary.node.is_none());
    }

    #[tokio::test]
    async fn mock_client_can_script_submissions() {
        let mut mock = MockClusterClient::new();
        mock.expect_submit_job().returning(|job| {
            Ok(SubmittedJob {
                name: job.name().to_string(),
                uid: Some("uid-1".to_string()),
            })
        });
        mock.expect_list_pods().returning(|| Ok(Vec::new()));

        let def = batchlaunch_job::JobDefinition {
            job_name: "train".to_string(),
            image: "img:1".to_string(),
            command: Some(batchlaunch_job::Command::Shell("true".to_string())),
            ..Default::default()
        };
        let job = batchlaunch_job::synthesize(&def).unwrap();
        let submitted = mock.submit_job(&job).await.unwrap();
        assert_eq!(submitted.name, "train");
        assert!(mock.list_pods().await.unwrap().is_empty());
    }
}
