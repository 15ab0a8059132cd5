//! Typed HTTP client for the catalog's publisher REST surface.
//!
//! Wraps every endpoint the synchronization engine touches in a typed
//! request/response method, mapping expected HTTP statuses to
//! [`CatalogError`] kinds so callers reconcile on values instead of raw
//! status codes.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use crate::config::{CatalogConfig, NetworkConfig};

use super::types::{
    ApiDescriptor, DocumentDescriptor, DocumentList, MediationList, MediationPolicy,
};

/// Multipart part name used by binary uploads.
const MULTIPART_FILE_PART: &str = "file";

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by catalog requests.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The addressed resource does not exist (HTTP 404).
    #[error("resource not found")]
    NotFound,

    /// The resource already exists (HTTP 409).
    #[error("resource already exists")]
    Conflict,

    /// Any other non-success status.
    #[error("unexpected status {status}: {body}")]
    Unexpected { status: StatusCode, body: String },

    /// Transport-level failure (connect, timeout, TLS, decode).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl CatalogError {
    /// Whether this error is a transient transport problem rather than a
    /// definite answer from the catalog.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Network(_))
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

// =============================================================================
// Mediation Scope
// =============================================================================

/// Addressing for mediation-policy endpoints: scoped to one API, or global.
#[derive(Debug, Clone, Copy)]
pub enum MediationScope<'a> {
    /// Policies belonging to the API with this uuid.
    Api(&'a str),
    /// Catalog-wide shared policies.
    Global,
}

// =============================================================================
// Client
// =============================================================================

/// Build the shared HTTP client used for every request in a run.
///
/// Connection pooling is handled by reqwest; the same client is reused across
/// all sequential calls. Timeouts come from configuration; there is no
/// automatic retry.
pub fn build_http_client(network: &NetworkConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(network.connect_timeout)
        .timeout(network.request_timeout)
        .danger_accept_invalid_certs(!network.verify_tls)
        .build()
}

/// A typed client for the catalog's publisher REST surface.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CatalogClient {
    /// Create a client from configuration, building the underlying HTTP
    /// client with the configured timeouts and TLS policy.
    pub fn new(
        catalog: &CatalogConfig,
        network: &NetworkConfig,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = build_http_client(network)?;
        Ok(Self::with_client(client, &catalog.publisher_url, token))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn apis_url(&self) -> String {
        format!("{}/apis", self.base_url)
    }

    fn api_url(&self, id: &str) -> String {
        format!("{}/apis/{}", self.base_url, id)
    }

    fn thumbnail_url(&self, uuid: &str) -> String {
        format!("{}/apis/{}/thumbnail", self.base_url, uuid)
    }

    fn documents_url(&self, uuid: &str) -> String {
        format!("{}/apis/{}/documents", self.base_url, uuid)
    }

    fn document_url(&self, uuid: &str, document_id: &str) -> String {
        format!("{}/apis/{}/documents/{}", self.base_url, uuid, document_id)
    }

    fn document_content_url(&self, uuid: &str, document_id: &str) -> String {
        format!(
            "{}/apis/{}/documents/{}/content",
            self.base_url, uuid, document_id
        )
    }

    fn wsdl_url(&self, uuid: &str) -> String {
        format!("{}/apis/{}/wsdl", self.base_url, uuid)
    }

    fn mediation_url(&self, scope: MediationScope<'_>) -> String {
        match scope {
            MediationScope::Api(uuid) => {
                format!("{}/apis/{}/policies/mediation", self.base_url, uuid)
            }
            MediationScope::Global => format!("{}/policies/mediation", self.base_url),
        }
    }

    fn mediation_item_url(&self, scope: MediationScope<'_>, id: &str) -> String {
        format!("{}/{}", self.mediation_url(scope), id)
    }

    // =========================================================================
    // APIs
    // =========================================================================

    /// Fetch one API by catalog id (`provider-name-version`) or uuid.
    pub async fn get_api(&self, id: &str) -> Result<ApiDescriptor> {
        let response = self
            .client
            .get(self.api_url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Create an API. 409 maps to [`CatalogError::Conflict`].
    pub async fn create_api(&self, api: &ApiDescriptor) -> Result<ApiDescriptor> {
        let response = self
            .client
            .post(self.apis_url())
            .bearer_auth(&self.token)
            .json(api)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::CREATED).await?;
        Ok(response.json().await?)
    }

    /// Overwrite an existing API's payload.
    pub async fn update_api(&self, uuid: &str, api: &ApiDescriptor) -> Result<ApiDescriptor> {
        let response = self
            .client
            .put(self.api_url(uuid))
            .bearer_auth(&self.token)
            .json(api)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    // =========================================================================
    // Thumbnail
    // =========================================================================

    /// Fetch an API's thumbnail. Returns the raw bytes and the response
    /// `Content-Type`, when the server declared one.
    pub async fn get_thumbnail(&self, uuid: &str) -> Result<(Bytes, Option<String>)> {
        let response = self
            .client
            .get(self.thumbnail_url(uuid))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_success(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Ok((response.bytes().await?, content_type))
    }

    /// Upload an API's thumbnail as multipart form data.
    pub async fn upload_thumbnail(
        &self,
        uuid: &str,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part(MULTIPART_FILE_PART, part);
        let response = self
            .client
            .post(self.thumbnail_url(uuid))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Fetch an API's document listing.
    pub async fn list_documents(&self, uuid: &str) -> Result<DocumentList> {
        let response = self
            .client
            .get(self.documents_url(uuid))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Create one document entry; the response carries the server-assigned
    /// document id.
    pub async fn create_document(
        &self,
        uuid: &str,
        document: &DocumentDescriptor,
    ) -> Result<DocumentDescriptor> {
        let response = self
            .client
            .post(self.documents_url(uuid))
            .bearer_auth(&self.token)
            .json(document)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::CREATED).await?;
        Ok(response.json().await?)
    }

    /// Delete one document.
    pub async fn delete_document(&self, uuid: &str, document_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.document_url(uuid, document_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Fetch one document's content.
    pub async fn get_document_content(&self, uuid: &str, document_id: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.document_content_url(uuid, document_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(response.bytes().await?)
    }

    /// Upload one document's content as multipart form data.
    pub async fn upload_document_content(
        &self,
        uuid: &str,
        document_id: &str,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part(MULTIPART_FILE_PART, part);
        let response = self
            .client
            .post(self.document_content_url(uuid, document_id))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    // =========================================================================
    // WSDL
    // =========================================================================

    /// Fetch an API's WSDL definition.
    pub async fn get_wsdl(&self, uuid: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.wsdl_url(uuid))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(response.bytes().await?)
    }

    /// Attach a WSDL definition to a newly created API.
    pub async fn create_wsdl(&self, uuid: &str, wsdl: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .post(self.wsdl_url(uuid))
            .bearer_auth(&self.token)
            .body(wsdl)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Replace an existing API's WSDL definition.
    pub async fn update_wsdl(&self, uuid: &str, wsdl: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(self.wsdl_url(uuid))
            .bearer_auth(&self.token)
            .body(wsdl)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    // =========================================================================
    // Mediation Policies
    // =========================================================================

    /// List mediation policies in the given scope.
    pub async fn list_mediation(&self, scope: MediationScope<'_>) -> Result<MediationList> {
        let response = self
            .client
            .get(self.mediation_url(scope))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Fetch one mediation policy, including its `config` content.
    pub async fn get_mediation(
        &self,
        scope: MediationScope<'_>,
        id: &str,
    ) -> Result<MediationPolicy> {
        let response = self
            .client
            .get(self.mediation_item_url(scope, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Create a mediation policy. 409 maps to [`CatalogError::Conflict`].
    pub async fn create_mediation(
        &self,
        scope: MediationScope<'_>,
        policy: &MediationPolicy,
    ) -> Result<MediationPolicy> {
        let response = self
            .client
            .post(self.mediation_url(scope))
            .bearer_auth(&self.token)
            .json(policy)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::CREATED).await?;
        Ok(response.json().await?)
    }

    /// Overwrite one mediation policy.
    pub async fn update_mediation(
        &self,
        scope: MediationScope<'_>,
        id: &str,
        policy: &MediationPolicy,
    ) -> Result<MediationPolicy> {
        let response = self
            .client
            .put(self.mediation_item_url(scope, id))
            .bearer_auth(&self.token)
            .json(policy)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Delete one mediation policy.
    pub async fn delete_mediation(&self, scope: MediationScope<'_>, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.mediation_item_url(scope, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}

// =============================================================================
// Status Mapping
// =============================================================================

/// Map a response to `Ok` only for the exact expected status.
async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    Err(error_for(status, response).await)
}

/// Map a response to `Ok` for any 2xx status.
async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(error_for(status, response).await)
}

async fn error_for(status: StatusCode, response: Response) -> CatalogError {
    match status {
        StatusCode::NOT_FOUND => CatalogError::NotFound,
        StatusCode::CONFLICT => CatalogError::Conflict,
        _ => {
            let body = response.text().await.unwrap_or_default();
            CatalogError::Unexpected { status, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CatalogClient {
        CatalogClient::with_client(
            Client::new(),
            "https://apim.example.com/publisher/",
            "token",
        )
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let c = client();
        assert_eq!(
            c.api_url("acme-PetStore-1.0.0"),
            "https://apim.example.com/publisher/apis/acme-PetStore-1.0.0"
        );
    }

    #[test]
    fn test_document_urls() {
        let c = client();
        assert_eq!(
            c.document_content_url("u1", "d1"),
            "https://apim.example.com/publisher/apis/u1/documents/d1/content"
        );
        assert_eq!(
            c.document_url("u1", "d1"),
            "https://apim.example.com/publisher/apis/u1/documents/d1"
        );
    }

    #[test]
    fn test_mediation_urls_per_scope() {
        let c = client();
        assert_eq!(
            c.mediation_url(MediationScope::Api("u1")),
            "https://apim.example.com/publisher/apis/u1/policies/mediation"
        );
        assert_eq!(
            c.mediation_url(MediationScope::Global),
            "https://apim.example.com/publisher/policies/mediation"
        );
        assert_eq!(
            c.mediation_item_url(MediationScope::Global, "m1"),
            "https://apim.example.com/publisher/policies/mediation/m1"
        );
    }
}
