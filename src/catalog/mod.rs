//! The remote API catalog: typed payloads, REST client, token acquisition.

mod client;
mod token;
mod types;

pub use client::{build_http_client, CatalogClient, CatalogError, MediationScope};
pub use token::{
    register_client, ConsumerCredentials, PasswordGrantProvider, StaticTokenProvider,
    TokenError, TokenProvider, EXPORT_SCOPE, IMPORT_SCOPE,
};
pub use types::{
    ApiDescriptor, ApiIdentity, DocumentDescriptor, DocumentList, DocumentSourceType,
    MediationDirection, MediationList, MediationPolicy, MediationRef,
};
