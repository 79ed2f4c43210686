//! CLI commands

use std::path::Path;

use kube::Client;
use tracing::debug;

use crate::Result;

pub mod launch;
pub mod pods;

/// Connect to the cluster, from the given kubeconfig or the inferred config
pub(crate) async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => debug!(kubeconfig = %path.display(), "connecting to cluster"),
        None => debug!("connecting to cluster with inferred config"),
    }
    Ok(batchlaunch_launcher::create_client(kubeconfig).await?)
}
