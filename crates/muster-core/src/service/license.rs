//! License management logic
//!
//! Referential integrity of the license family, in-use delete refusal, and
//! the pool allocation algorithm.

use tracing::{debug, warn};

use muster_api::entity::{
    AuditSoftware, LicenseContract, LicenseOnClient, LicensePool, SoftwareLicense,
    SoftwareLicenseToLicensePool,
};
use muster_api::{Filter, FilterValue};
use muster_backend::contract::{ConfigDataBackend, ObjectBackend, PoolSelector};
use muster_common::MusterError;

/// Check the owning contract of a license exists
pub async fn require_license_contract(
    backend: &dyn ConfigDataBackend,
    contract_id: &str,
) -> anyhow::Result<LicenseContract> {
    let contracts: Vec<LicenseContract> = backend
        .get_objects(&[], Filter::new().with("id", contract_id))
        .await?;
    contracts
        .into_iter()
        .next()
        .ok_or_else(|| MusterError::referential_integrity("LicenseContract", contract_id).into())
}

/// Check both sides of a license-to-pool assignment exist
pub async fn require_license_and_pool(
    backend: &dyn ConfigDataBackend,
    software_license_id: &str,
    license_pool_id: &str,
) -> anyhow::Result<(SoftwareLicense, LicensePool)> {
    let licenses: Vec<SoftwareLicense> = backend
        .get_objects(&[], Filter::new().with("id", software_license_id))
        .await?;
    let license = licenses.into_iter().next().ok_or_else(|| {
        MusterError::referential_integrity("SoftwareLicense", software_license_id)
    })?;

    let pools: Vec<LicensePool> = backend
        .get_objects(&[], Filter::new().with("id", license_pool_id))
        .await?;
    let pool = pools
        .into_iter()
        .next()
        .ok_or_else(|| MusterError::referential_integrity("LicensePool", license_pool_id))?;

    Ok((license, pool))
}

/// Check a license is actually offered through a pool
pub async fn require_pool_assignment(
    backend: &dyn ConfigDataBackend,
    software_license_id: &str,
    license_pool_id: &str,
) -> anyhow::Result<SoftwareLicenseToLicensePool> {
    let junctions: Vec<SoftwareLicenseToLicensePool> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("softwareLicenseId", software_license_id)
                .with("licensePoolId", license_pool_id),
        )
        .await?;
    junctions.into_iter().next().ok_or_else(|| {
        MusterError::referential_integrity(
            "SoftwareLicenseToLicensePool",
            format!("{};{}", software_license_id, license_pool_id),
        )
        .into()
    })
}

/// Refuse deletion of pools still referenced by an active assignment, then
/// drop the pool's junction rows
pub async fn delete_license_pools(
    backend: &dyn ConfigDataBackend,
    pools: Vec<LicensePool>,
) -> anyhow::Result<()> {
    for pool in &pools {
        let active: Vec<LicenseOnClient> = backend
            .get_objects(&[], Filter::new().with("licensePoolId", pool.id.clone()))
            .await?;
        if !active.is_empty() {
            return Err(MusterError::LicenseInUse(format!(
                "license pool '{}' has {} active client assignments",
                pool.id,
                active.len()
            ))
            .into());
        }

        let junctions: Vec<SoftwareLicenseToLicensePool> = backend
            .get_objects(&[], Filter::new().with("licensePoolId", pool.id.clone()))
            .await?;
        backend.delete_objects(junctions).await?;
    }
    backend.delete_objects(pools).await
}

/// Refuse deletion of license-to-pool assignments backing an active client
/// assignment
pub async fn delete_pool_assignments(
    backend: &dyn ConfigDataBackend,
    junctions: Vec<SoftwareLicenseToLicensePool>,
) -> anyhow::Result<()> {
    for junction in &junctions {
        let active: Vec<LicenseOnClient> = backend
            .get_objects(
                &[],
                Filter::new()
                    .with("softwareLicenseId", junction.software_license_id.clone())
                    .with("licensePoolId", junction.license_pool_id.clone()),
            )
            .await?;
        if !active.is_empty() {
            return Err(MusterError::LicenseInUse(format!(
                "license '{}' in pool '{}' is assigned to {} clients",
                junction.software_license_id,
                junction.license_pool_id,
                active.len()
            ))
            .into());
        }
    }
    backend.delete_objects(junctions).await
}

async fn resolve_pool(
    backend: &dyn ConfigDataBackend,
    selector: &PoolSelector,
) -> anyhow::Result<LicensePool> {
    let pools: Vec<LicensePool> = match selector {
        PoolSelector::PoolId(pool_id) => {
            backend
                .get_objects(&[], Filter::new().with("id", pool_id.clone()))
                .await?
        }
        PoolSelector::ProductId(product_id) => {
            backend
                .get_objects(
                    &[],
                    Filter::new().with("productIds", product_id.clone()),
                )
                .await?
        }
        PoolSelector::WindowsSoftwareId(software_id) => {
            let audited: Vec<AuditSoftware> = backend
                .get_objects(
                    &[],
                    Filter::new().with("windowsSoftwareId", software_id.clone()),
                )
                .await?;
            let mut product_ids: Vec<FilterValue> = Vec::new();
            for software in audited {
                product_ids.push(FilterValue::String(software.name));
            }
            if product_ids.is_empty() {
                return Err(MusterError::missing_data(format!(
                    "no audited software matches windows software id '{}'",
                    software_id
                ))
                .into());
            }
            backend
                .get_objects(
                    &[],
                    Filter::new().with("productIds", FilterValue::List(product_ids)),
                )
                .await?
        }
    };

    pools.into_iter().next().ok_or_else(|| {
        MusterError::missing_data(format!("no license pool matches {:?}", selector)).into()
    })
}

/// Reuse or allocate a license for one client out of one pool
///
/// An existing assignment for the (pool, client) pair is returned as-is.
/// Otherwise the pool's licenses are scanned in junction order; licenses
/// bound to another host, expired, or at their installation cap are
/// skipped. No candidate left is a missing-data error.
pub async fn get_or_create_license_on_client(
    backend: &dyn ConfigDataBackend,
    client_id: &str,
    selector: PoolSelector,
) -> anyhow::Result<LicenseOnClient> {
    let pool = resolve_pool(backend, &selector).await?;

    let existing: Vec<LicenseOnClient> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("licensePoolId", pool.id.clone())
                .with("clientId", client_id),
        )
        .await?;
    if let Some(assignment) = existing.into_iter().next() {
        debug!(pool = %pool.id, client = %client_id, "reusing existing license assignment");
        return Ok(assignment);
    }

    let junctions: Vec<SoftwareLicenseToLicensePool> = backend
        .get_objects(&[], Filter::new().with("licensePoolId", pool.id.clone()))
        .await?;

    let today = muster_common::timestamp();
    for junction in &junctions {
        let licenses: Vec<SoftwareLicense> = backend
            .get_objects(
                &[],
                Filter::new().with("id", junction.software_license_id.clone()),
            )
            .await?;
        let Some(license) = licenses.into_iter().next() else {
            warn!(
                license = %junction.software_license_id,
                "pool references a missing license, skipping"
            );
            continue;
        };

        if let Some(bound) = &license.bound_to_host
            && bound != client_id
        {
            continue;
        }
        if let Some(expiration) = &license.expiration_date
            && !expiration.is_empty()
            && expiration.as_str() < today.as_str()
        {
            continue;
        }
        if let Some(cap) = license.installation_cap() {
            let used: Vec<LicenseOnClient> = backend
                .get_objects(
                    &[],
                    Filter::new().with("softwareLicenseId", license.id.clone()),
                )
                .await?;
            if used.len() as u32 >= cap {
                continue;
            }
        }

        let mut assignment = LicenseOnClient::new(license.id.clone(), pool.id.clone(), client_id);
        assignment.license_key = junction.license_key.clone().or_else(|| {
            junctions
                .iter()
                .find(|j| {
                    j.software_license_id == license.id && j.license_key.is_some()
                })
                .and_then(|j| j.license_key.clone())
        });
        backend.insert_object(assignment.clone()).await?;
        debug!(
            license = %assignment.software_license_id,
            pool = %pool.id,
            client = %client_id,
            "license allocated"
        );
        return Ok(assignment);
    }

    Err(MusterError::missing_data(format!(
        "no license available in pool '{}' for client '{}'",
        pool.id, client_id
    ))
    .into())
}
