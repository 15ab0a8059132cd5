//! Configuration types for apiport-rs.
//!
//! This module defines the structures used to represent application
//! configuration as parsed from an INI-format config file. The resulting
//! [`Config`] is an explicit value handed to every operation; there is no
//! process-wide configuration state.

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Config Sections
// =============================================================================

/// [catalog] section - remote catalog endpoints and client identity.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog's publisher REST surface.
    pub publisher_url: String,
    /// Token endpoint used by the password-grant token provider.
    pub token_url: String,
    /// Dynamic client registration endpoint.
    pub registration_url: String,
    /// Client name sent when registering.
    pub client_name: String,
}

/// [network] section - HTTP client behavior.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Whether to validate TLS certificates.
    pub verify_tls: bool,
    /// Connect timeout for every request.
    pub connect_timeout: Duration,
    /// Total per-request timeout. There is no automatic retry.
    pub request_timeout: Duration,
}

/// [export] section - where export runs place their archive.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory the zip is written into.
    pub destination: PathBuf,
    /// Archive file name, without the `.zip` suffix.
    pub archive_name: String,
}

/// [import] section - reconciliation policy.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Update APIs (and their sub-resources) that already exist remotely.
    /// When false, an existing API is reported as a conflict and skipped.
    pub update_existing: bool,
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub network: NetworkConfig,
    pub export: ExportConfig,
    pub import: ImportConfig,
}
