//! Audit inventory logic
//!
//! Audit rows are merge-oriented: re-reported facts refresh `last_seen`
//! instead of duplicating, and hardware no longer reported is flipped to
//! obsolete rather than deleted.

use muster_api::entity::{AuditHardwareOnHost, AuditSoftwareOnClient, merge_objects};
use muster_api::{Entity, Filter};
use muster_backend::contract::{ConfigDataBackend, ObjectBackend};

/// Merge-insert a software audit row, keeping the original `first_seen`
pub async fn write_audit_software_on_client(
    backend: &dyn ConfigDataBackend,
    mut obj: AuditSoftwareOnClient,
) -> anyhow::Result<()> {
    let existing: Vec<AuditSoftwareOnClient> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("name", obj.name.clone())
                .with("version", obj.version.clone())
                .with("subVersion", obj.sub_version.clone())
                .with("language", obj.language.clone())
                .with("architecture", obj.architecture.clone())
                .with("clientId", obj.client_id.clone()),
        )
        .await?;

    obj.fill_defaults();
    let row = match existing.into_iter().next() {
        Some(prior) => {
            let mut merged = merge_objects(&prior, &obj);
            merged.first_seen = prior.first_seen.clone();
            merged.last_seen = Some(muster_common::timestamp());
            merged
        }
        None => obj,
    };
    backend.insert_object(row).await
}

/// Merge-insert a hardware audit row, reviving obsolete rows and keeping
/// the original `first_seen`
pub async fn write_audit_hardware_on_host(
    backend: &dyn ConfigDataBackend,
    mut obj: AuditHardwareOnHost,
) -> anyhow::Result<()> {
    let existing: Vec<AuditHardwareOnHost> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("hostId", obj.host_id.clone())
                .with("hardwareClass", obj.hardware_class.clone()),
        )
        .await?;
    let prior = existing.into_iter().find(|row| row.ident() == obj.ident());

    obj.fill_defaults();
    let row = match prior {
        Some(prior) => {
            let mut merged = merge_objects(&prior, &obj);
            merged.first_seen = prior.first_seen.clone();
            merged.last_seen = Some(muster_common::timestamp());
            merged.state = Some(1);
            merged
        }
        None => obj,
    };
    backend.insert_object(row).await
}

/// Flip every present hardware row of a host to obsolete
pub async fn set_hardware_obsolete(
    backend: &dyn ConfigDataBackend,
    host_id: &str,
) -> anyhow::Result<()> {
    let rows: Vec<AuditHardwareOnHost> = backend
        .get_objects(
            &[],
            Filter::new().with("hostId", host_id).with("state", 1),
        )
        .await?;
    for mut row in rows {
        row.state = Some(0);
        backend.insert_object(row).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::entity::AuditSoftware;
    use muster_backend::MemoryBackend;
    use serde_json::Value;

    #[tokio::test]
    async fn test_software_reinsert_merges() {
        let backend = MemoryBackend::new();
        let software = AuditSoftware::new("firefox", "140.0", "", "en", "x64");

        let mut first = AuditSoftwareOnClient::new(&software, "client1.example.org");
        first.first_seen = Some("2026-01-01 08:00:00".to_string());
        first.last_seen = Some("2026-01-01 08:00:00".to_string());
        write_audit_software_on_client(&backend, first).await.unwrap();

        let again = AuditSoftwareOnClient::new(&software, "client1.example.org");
        write_audit_software_on_client(&backend, again).await.unwrap();

        let rows: Vec<AuditSoftwareOnClient> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_seen.as_deref(), Some("2026-01-01 08:00:00"));
        assert_ne!(rows[0].last_seen, rows[0].first_seen);
    }

    #[tokio::test]
    async fn test_hardware_set_obsolete_and_revive() {
        let backend = MemoryBackend::new();
        let mut disk = AuditHardwareOnHost::new("client1.example.org", "HARDDISK_DRIVE");
        let mut info = serde_json::Map::new();
        info.insert("serial".to_string(), Value::String("A1".to_string()));
        disk.info = Some(info);

        write_audit_hardware_on_host(&backend, disk.clone()).await.unwrap();
        set_hardware_obsolete(&backend, "client1.example.org").await.unwrap();

        let rows: Vec<AuditHardwareOnHost> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows[0].state, Some(0));

        // Re-reporting the same device flips it back to present
        write_audit_hardware_on_host(&backend, disk).await.unwrap();
        let rows: Vec<AuditHardwareOnHost> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, Some(1));
    }
}
