//! Resource requests and limits
//!
//! CPU and memory limits are normalized to never fall below their requests:
//! `limit = max(min, max)`. An inverted range in the config is silently repaired
//! rather than rejected. GPUs are requested whole, with identical request and
//! limit, under an extended resource name picked from the GPU product.

use std::collections::BTreeMap;

use crate::k8s::{ResourceQuantity, ResourceRequirements};

/// Extended resource for GPUs of unspecified or unrecognized type
pub const GENERIC_GPU_RESOURCE: &str = "nvidia.com/gpu";

/// GPU products exposed under their own extended resource name.
///
/// Nodes advertising these resources are already partitioned by product, so a job
/// requesting one needs no extra node label predicate. The MIG entry is a single
/// 1g.10gb slice of an A100, the only fractional accelerator offered.
const KNOWN_GPUS: &[(&str, &str)] = &[
    ("NVIDIA-A100-SXM4-80GB", "nvidia.com/a100"),
    ("NVIDIA-A100-80GB-PCIe", "nvidia.com/a100"),
    ("NVIDIA-A100-80GB-PCIe-MIG-1g.10gb", "nvidia.com/mig-1g.10gb"),
];

/// Extended resource name for a GPU product, if it has a dedicated one
pub fn known_gpu_resource(gpu_type: &str) -> Option<&'static str> {
    KNOWN_GPUS
        .iter()
        .find(|(product, _)| *product == gpu_type)
        .map(|(_, resource)| *resource)
}

/// Returns true if the GPU product has a dedicated extended resource
pub fn is_known_gpu(gpu_type: &str) -> bool {
    known_gpu_resource(gpu_type).is_some()
}

/// Extended resource to request GPUs under
pub fn gpu_resource_key(gpu_type: Option<&str>) -> &'static str {
    gpu_type
        .and_then(known_gpu_resource)
        .unwrap_or(GENERIC_GPU_RESOURCE)
}

/// Compute container requests and limits.
///
/// CPU is in cores and memory in GiB. The GPU count appears in both requests and
/// limits, even when zero.
pub fn compute_requests_and_limits(
    min_cpu: u64,
    max_cpu: u64,
    min_ram: u64,
    max_ram: u64,
    gpu_count: u64,
    gpu_type: Option<&str>,
) -> ResourceRequirements {
    let gpu_key = gpu_resource_key(gpu_type);
    let quantity = |cpu: u64, ram_gib: u64| ResourceQuantity {
        cpu: Some(cpu.to_string()),
        memory: Some(format!("{ram_gib}Gi")),
        extended: BTreeMap::from([(gpu_key.to_string(), gpu_count.to_string())]),
    };

    ResourceRequirements {
        requests: Some(quantity(min_cpu, min_ram)),
        limits: Some(quantity(min_cpu.max(max_cpu), min_ram.max(max_ram))),
    }
}
