//! Launch command - compile and submit every job in a batch configuration

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use batchlaunch_launcher::{BatchConfig, BatchLauncher, KubeClusterClient, LaunchOptions};

use crate::{Error, Result};

/// Launch command arguments
#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Path to the batch configuration YAML
    #[arg(long = "cfg", value_name = "FILE")]
    pub cfg: PathBuf,

    /// Only launch the named job (repeatable)
    #[arg(long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,

    /// Resolve and validate jobs without submitting them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the namespace from the configuration
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Path to kubeconfig file (default: inferred)
    #[arg(long, env = "BATCHLAUNCH_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,
}

/// Run the launch command
///
/// Prints one line per job and the failure total, or the resolved definitions
/// on a dry run. Fails when any job failed.
pub async fn run(args: LaunchArgs, verbose: bool) -> Result<()> {
    let mut config = BatchConfig::load(&args.cfg)?;
    if let Some(namespace) = args.namespace {
        config = config.with_namespace(namespace);
    }
    info!(
        cfg = %args.cfg.display(),
        namespace = %config.namespace,
        "loaded batch configuration"
    );

    let namespace = config.namespace.clone();
    let options = LaunchOptions::default()
        .with_jobs(args.jobs)
        .dry_run(args.dry_run)
        .verbose(verbose);

    let mut launcher = BatchLauncher::new(config, options);
    if !args.dry_run {
        let client = super::kube_client(args.kubeconfig.as_deref()).await?;
        launcher = launcher.with_client(Arc::new(KubeClusterClient::new(client, namespace)));
    }

    let report = launcher.run().await?;
    println!("{}", report.render(verbose));

    let failed = report.failure_count();
    if failed > 0 {
        return Err(Error::JobsFailed {
            failed,
            total: report.records.len(),
        });
    }
    Ok(())
}
