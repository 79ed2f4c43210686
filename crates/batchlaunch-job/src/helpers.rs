//! Shared helper functions for job compilation

use std::collections::BTreeMap;

use serde_json::Value;

use crate::k8s::{EnvVar, Toleration, Volume, VolumeMount};

/// Name of the shared-memory volume
pub const SHM_VOLUME_NAME: &str = "dshm";
/// Mount path of the shared-memory volume
pub const SHM_MOUNT_PATH: &str = "/dev/shm";

// =============================================================================
// Volumes
// =============================================================================

/// Build PVC volumes and mounts, one pair per entry.
///
/// The map key names both the volume and the claim it binds to.
pub(crate) fn pvc_volumes(volumes: &BTreeMap<String, String>) -> (Vec<Volume>, Vec<VolumeMount>) {
    volumes
        .iter()
        .map(|(claim, mount_path)| {
            (
                Volume::from_pvc(claim, claim),
                VolumeMount {
                    name: claim.clone(),
                    mount_path: mount_path.clone(),
                },
            )
        })
        .unzip()
}

/// Build the memory-backed `/dev/shm` volume and mount.
///
/// PyTorch DataLoader workers and NCCL use shared memory for IPC, and the
/// container runtime default of 64MB is far too small for them.
pub(crate) fn shm_volume() -> (Volume, VolumeMount) {
    (
        Volume::from_empty_dir(SHM_VOLUME_NAME, Some("Memory".to_string())),
        VolumeMount {
            name: SHM_VOLUME_NAME.to_string(),
            mount_path: SHM_MOUNT_PATH.to_string(),
        },
    )
}

// =============================================================================
// Environment
// =============================================================================

/// Build literal env vars, stringifying non-string values.
pub(crate) fn env_vars(env: &BTreeMap<String, Value>) -> Vec<EnvVar> {
    env.iter()
        .map(|(name, value)| EnvVar::literal(name, env_value_string(value)))
        .collect()
}

/// String form of a config value as seen by the container.
///
/// Strings are used as-is, null becomes empty and anything else is rendered as JSON.
pub(crate) fn env_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Scheduling
// =============================================================================

/// Build one NoSchedule toleration per taint key, matching any taint value.
pub(crate) fn taint_tolerations(keys: &[String]) -> Vec<Toleration> {
    keys.iter()
        .map(|key| Toleration {
            key: Some(key.clone()),
            operator: Some("Exists".to_string()),
            effect: Some("NoSchedule".to_string()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pvc_volumes_pair_claims_with_mounts() {
        let volumes = BTreeMap::from([
            ("datasets".to_string(), "/data".to_string()),
            ("checkpoints".to_string(), "/ckpt".to_string()),
        ]);
        let (vols, mounts) = pvc_volumes(&volumes);

        assert_eq!(vols.len(), 2);
        assert_eq!(mounts.len(), 2);
        for (vol, mount) in vols.iter().zip(&mounts) {
            assert_eq!(vol.name, mount.name);
            assert_eq!(
                vol.persistent_volume_claim.as_ref().unwrap().claim_name,
                vol.name
            );
        }
        let ckpt = mounts.iter().find(|m| m.name == "checkpoints").unwrap();
        assert_eq!(ckpt.mount_path, "/ckpt");
    }

    #[test]
    fn shm_volume_is_memory_backed() {
        let (vol, mount) = shm_volume();
        assert_eq!(vol.name, "dshm");
        assert_eq!(
            vol.empty_dir.unwrap().medium.as_deref(),
            Some("Memory")
        );
        assert_eq!(mount.mount_path, "/dev/shm");
    }

    #[test]
    fn env_values_are_stringified() {
        assert_eq!(env_value_string(&json!("plain")), "plain");
        assert_eq!(env_value_string(&json!(42)), "42");
        assert_eq!(env_value_string(&json!(0.5)), "0.5");
        assert_eq!(env_value_string(&json!(true)), "true");
        assert_eq!(env_value_string(&Value::Null), "");
        assert_eq!(env_value_string(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn env_vars_keep_names() {
        let env = BTreeMap::from([
            ("EPOCHS".to_string(), json!(10)),
            ("WANDB_MODE".to_string(), json!("offline")),
        ]);
        let vars = env_vars(&env);
        assert_eq!(
            vars,
            vec![
                EnvVar::literal("EPOCHS", "10"),
                EnvVar::literal("WANDB_MODE", "offline"),
            ]
        );
    }

    #[test]
    fn tolerations_exist_with_no_schedule() {
        let tolerations = taint_tolerations(&["nvidia.com/gpu".to_string(), "spot".to_string()]);
        assert_eq!(tolerations.len(), 2);
        assert_eq!(tolerations[0].key.as_deref(), Some("nvidia.com/gpu"));
        assert_eq!(tolerations[0].operator.as_deref(), Some("Exists"));
        assert_eq!(tolerations[0].effect.as_deref(), Some("NoSchedule"));
        assert!(tolerations[1].value.is_none());
    }
}
