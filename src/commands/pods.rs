//! Pods command - list the pods in a namespace

use std::path::PathBuf;

use clap::Args;

use batchlaunch_launcher::{ClusterClient, KubeClusterClient, PodSummary};

use crate::Result;

/// Pods command arguments
#[derive(Args, Debug)]
pub struct PodsArgs {
    /// Namespace to list pods in
    #[arg(long, short = 'n')]
    pub namespace: String,

    /// Path to kubeconfig file (default: inferred)
    #[arg(long, env = "BATCHLAUNCH_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,
}

/// Run the pods command
pub async fn run(args: PodsArgs) -> Result<()> {
    let client = super::kube_client(args.kubeconfig.as_deref()).await?;
    let pods = KubeClusterClient::new(client, &args.namespace)
        .list_pods()
        .await?;

    if pods.is_empty() {
        println!("No pods found in namespace '{}'", args.namespace);
        return Ok(());
    }
    println!("{}", format_pods(&pods));
    Ok(())
}

fn format_pods(pods: &[PodSummary]) -> String {
    let mut lines = vec![format!("{:<40} {:<12} {}", "NAME", "PHASE", "NODE")];
    for pod in pods {
        lines.push(format!(
            "{:<40} {:<12} {}",
            pod.name,
            pod.phase.as_deref().unwrap_or("-"),
            pod.node.as_deref().unwrap_or("-")
        ));
    }
    lines.join("\n")
}
