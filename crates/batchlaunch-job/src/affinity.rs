//! Node affinity for placement constraints
//!
//! All predicates go into a single required node selector term, so a node must
//! satisfy every one of them. Predicates are emitted in a fixed order: GPU, region,
//! hostname.

use tracing::debug;

use crate::k8s::{Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm};
use crate::resources::is_known_gpu;

/// GPU product label published by NVIDIA GPU feature discovery
pub const GPU_PRODUCT_LABEL: &str = "nvidia.com/gpu.product";
/// Per-GPU memory label (MiB) published by NVIDIA GPU feature discovery
pub const GPU_MEMORY_LABEL: &str = "nvidia.com/gpu.memory";
/// Well-known topology region label
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";
/// Well-known hostname label
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

const MIB_PER_GIB: u64 = 1024;

/// Build the ordered node label requirements for a job.
///
/// A GPU type with a dedicated extended resource needs no product label, since the
/// resource request already restricts placement. Unknown types are pinned by
/// label instead. `gpu_type` and `min_gpu_memory` are never both set on a valid
/// definition.
pub fn node_requirements(
    gpu_count: u64,
    gpu_type: Option<&str>,
    min_gpu_memory: Option<u64>,
    region: Option<&str>,
    hostname: Option<&str>,
) -> Vec<NodeSelectorRequirement> {
    let mut requirements = Vec::new();

    if gpu_count > 0 {
        match (gpu_type, min_gpu_memory) {
            (Some(product), _) if !is_known_gpu(product) => {
                debug!(gpu_type = %product, "pinning GPU product by node label");
                requirements.push(NodeSelectorRequirement::equals(GPU_PRODUCT_LABEL, product));
            }
            (_, Some(gib)) if gib > 0 => {
                debug!(min_gpu_memory_gib = gib, "requiring minimum GPU memory");
                requirements.push(NodeSelectorRequirement::greater_than(
                    GPU_MEMORY_LABEL,
                    gib.saturating_mul(MIB_PER_GIB),
                ));
            }
            _ => {}
        }
    }

    if let Some(region) = region {
        requirements.push(NodeSelectorRequirement::equals(REGION_LABEL, region));
    }

    if let Some(hostname) = hostname {
        requirements.push(NodeSelectorRequirement::equals(HOSTNAME_LABEL, hostname));
    }

    requirements
}

/// Build the pod affinity for a job, or `None` when it has no placement constraints.
pub fn build_affinity(
    gpu_count: u64,
    gpu_type: Option<&str>,
    min_gpu_memory: Option<u64>,
    region: Option<&str>,
    hostname: Option<&str>,
) -> Option<Affinity> {
    let requirements = node_requirements(gpu_count, gpu_type, min_gpu_memory, region, hostname);
    if requirements.is_empty() {
        return None;
    }

    Some(Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: requirements,
                }],
            }),
        }),
    })
}
