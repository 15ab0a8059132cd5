//! Shared mediation-policy synchronization.
//!
//! Both directions treat API-scoped (`shared=false`) and global
//! (`shared=true`) policies the same way; only the endpoint scope and the
//! base directory differ. The archive never stores a policy uuid, so import
//! reconciles conflicts by scanning the remote listing for a matching name —
//! see [`find_policy`].

use std::path::{Path, PathBuf};

use serde_json::Map;
use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::layout;
use crate::catalog::{
    CatalogClient, CatalogError, MediationDirection, MediationList, MediationPolicy,
    MediationRef, MediationScope,
};

// =============================================================================
// Error Types
// =============================================================================

/// Errors for a single mediation policy's export or replay.
#[derive(Debug, Error)]
pub enum MediationError {
    /// Catalog request failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O error reading or writing archived policy content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced policy is not present in the remote listing.
    #[error("mediation policy '{0}' not found in the catalog listing")]
    NotListed(String),

    /// The fetched policy carried no config content.
    #[error("mediation policy '{0}' has no config content")]
    MissingConfig(String),

    /// A conflict could not be resolved by name lookup.
    #[error("mediation policy '{0}' conflicts but no remote policy matches its name")]
    ConflictUnresolved(String),
}

/// Result type for mediation operations.
pub type Result<T> = std::result::Result<T, MediationError>;

/// Terminal state of one policy replay during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediationOutcome {
    Created,
    Updated,
    /// Policy already exists and updates are disabled.
    Skipped,
}

// =============================================================================
// Name Join
// =============================================================================

/// Locate a policy in a listing by name and direction.
///
/// This is the only link between archived and remote mediation policies; a
/// name collision among policies of the same direction and scope resolves to
/// the first match.
pub fn find_policy<'a>(
    listing: &'a MediationList,
    name: &str,
    direction: MediationDirection,
) -> Option<&'a MediationPolicy> {
    listing
        .list
        .iter()
        .find(|p| p.name == name && p.direction == direction)
}

/// Relative path of a policy's config below a scope base directory.
fn policy_path(reference: &MediationRef) -> PathBuf {
    layout::global_mediation_path(reference.direction, &reference.name)
}

// =============================================================================
// MediationSync
// =============================================================================

/// Shared export/replay logic for mediation policies.
pub struct MediationSync<'a> {
    client: &'a CatalogClient,
}

impl<'a> MediationSync<'a> {
    pub fn new(client: &'a CatalogClient) -> Self {
        Self { client }
    }

    /// Export every referenced policy's config under `base/mediation/`.
    ///
    /// `base` is the API folder for API-scoped policies and the archive root
    /// for shared ones. A failing policy is logged and skipped; the rest are
    /// still written. Returns the number of policies persisted.
    pub async fn export_policies(
        &self,
        references: &[&MediationRef],
        scope: MediationScope<'_>,
        base: &Path,
    ) -> usize {
        if references.is_empty() {
            return 0;
        }
        let listing = match self.client.list_mediation(scope).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("failed to list mediation policies: {}", e);
                return 0;
            }
        };

        let mut written = 0;
        for reference in references {
            match self.export_policy(reference, scope, base, &listing).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(
                        "skipping mediation policy '{}' ({}): {}",
                        reference.name, reference.direction, e
                    );
                }
            }
        }
        written
    }

    async fn export_policy(
        &self,
        reference: &MediationRef,
        scope: MediationScope<'_>,
        base: &Path,
        listing: &MediationList,
    ) -> Result<()> {
        let listed = find_policy(listing, &reference.name, reference.direction)
            .ok_or_else(|| MediationError::NotListed(reference.name.clone()))?;
        let id = listed
            .id
            .as_deref()
            .ok_or_else(|| MediationError::NotListed(reference.name.clone()))?;

        let policy = self.client.get_mediation(scope, id).await?;
        let config = policy
            .config
            .ok_or_else(|| MediationError::MissingConfig(reference.name.clone()))?;

        let target = base.join(policy_path(reference));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, config).await?;
        debug!("exported mediation policy '{}'", reference.name);
        Ok(())
    }

    /// Replay every referenced policy from the archive into the catalog.
    ///
    /// API-scoped references read below `api_base`, shared references below
    /// `global_base`. Failures are logged per policy and never abort the
    /// remaining ones.
    pub async fn import_policies(
        &self,
        references: &[MediationRef],
        api_uuid: &str,
        api_base: &Path,
        global_base: &Path,
        update_enabled: bool,
    ) {
        for reference in references {
            let (scope, base) = if reference.shared {
                (MediationScope::Global, global_base)
            } else {
                (MediationScope::Api(api_uuid), api_base)
            };
            match self
                .import_policy(reference, scope, base, update_enabled)
                .await
            {
                Ok(MediationOutcome::Skipped) => {
                    warn!(
                        "mediation policy '{}' already exists; updates disabled, skipping",
                        reference.name
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "failed to replay mediation policy '{}' ({}): {}",
                        reference.name, reference.direction, e
                    );
                }
            }
        }
    }

    /// Replay one policy: create, or on conflict resolve the existing uuid by
    /// name and overwrite it.
    pub async fn import_policy(
        &self,
        reference: &MediationRef,
        scope: MediationScope<'_>,
        base: &Path,
        update_enabled: bool,
    ) -> Result<MediationOutcome> {
        let path = base.join(policy_path(reference));
        let config = tokio::fs::read_to_string(&path).await?;

        let payload = MediationPolicy {
            id: None,
            name: reference.name.clone(),
            direction: reference.direction,
            shared: reference.shared,
            config: Some(config),
            extra: Map::new(),
        };

        match self.client.create_mediation(scope, &payload).await {
            Ok(_) => Ok(MediationOutcome::Created),
            Err(CatalogError::Conflict) if update_enabled => {
                let listing = self.client.list_mediation(scope).await?;
                let existing = find_policy(&listing, &reference.name, reference.direction)
                    .and_then(|p| p.id.as_deref())
                    .ok_or_else(|| MediationError::ConflictUnresolved(reference.name.clone()))?;
                self.client
                    .update_mediation(scope, existing, &payload)
                    .await?;
                Ok(MediationOutcome::Updated)
            }
            Err(CatalogError::Conflict) => Ok(MediationOutcome::Skipped),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(&str, &str, MediationDirection)]) -> MediationList {
        MediationList {
            list: entries
                .iter()
                .map(|(id, name, direction)| MediationPolicy {
                    id: Some(id.to_string()),
                    name: name.to_string(),
                    direction: *direction,
                    shared: true,
                    config: None,
                    extra: Map::new(),
                })
                .collect(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_find_policy_by_name_and_direction() {
        let listing = listing(&[
            ("m1", "log_in_message", MediationDirection::In),
            ("m2", "log_in_message", MediationDirection::Out),
        ]);
        let found = find_policy(&listing, "log_in_message", MediationDirection::Out).unwrap();
        assert_eq!(found.id.as_deref(), Some("m2"));
    }

    #[test]
    fn test_find_policy_survives_uuid_change() {
        // The archive stores no uuid; a policy whose remote id changed since
        // export is still resolved by name.
        let listing = listing(&[("fresh-uuid-999", "log_in_message", MediationDirection::In)]);
        let found = find_policy(&listing, "log_in_message", MediationDirection::In).unwrap();
        assert_eq!(found.id.as_deref(), Some("fresh-uuid-999"));
    }

    #[test]
    fn test_find_policy_missing() {
        let listing = listing(&[("m1", "other", MediationDirection::In)]);
        assert!(find_policy(&listing, "log_in_message", MediationDirection::In).is_none());
    }

    #[test]
    fn test_policy_paths_by_scope() {
        let reference = MediationRef {
            name: "log_in_message".to_string(),
            direction: MediationDirection::In,
            shared: false,
            extra: Map::new(),
        };
        assert_eq!(
            policy_path(&reference),
            PathBuf::from("mediation/in/log_in_message")
        );
    }
}
