//! Typed payloads for the catalog REST surface.
//!
//! Descriptors are deserialized once at the client boundary. Fields the
//! engine never inspects ride along in a flattened map so an exported payload
//! round-trips through the archive without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// API Identity
// =============================================================================

/// Composite key identifying one API in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiIdentity {
    pub provider: String,
    pub name: String,
    pub version: String,
}

impl ApiIdentity {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Server-side id string: `provider-name-version`.
    pub fn catalog_id(&self) -> String {
        format!("{}-{}-{}", self.provider, self.name, self.version)
    }
}

impl std::fmt::Display for ApiIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.catalog_id())
    }
}

// =============================================================================
// API Descriptor
// =============================================================================

/// An API payload as served by (and posted to) the catalog.
///
/// `id` is the server-assigned uuid; it is absent until the API has been
/// created or looked up. Identity fields are never rewritten by this tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub provider: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(
        rename = "thumbnailUri",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_uri: Option<String>,
    #[serde(rename = "wsdlUri", default, skip_serializing_if = "Option::is_none")]
    pub wsdl_uri: Option<String>,
    #[serde(
        rename = "apiDefinition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub api_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<MediationRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiDescriptor {
    /// The identity triple of this payload.
    pub fn identity(&self) -> ApiIdentity {
        ApiIdentity::new(&self.provider, &self.name, &self.version)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Origin of a document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentSourceType {
    File,
    Inline,
    Url,
    /// Any source type this tool does not archive content for.
    #[serde(other)]
    Other,
}

impl DocumentSourceType {
    /// Whether documents of this type carry a content payload to archive.
    pub fn has_content(self) -> bool {
        matches!(self, DocumentSourceType::File | DocumentSourceType::Inline)
    }
}

/// One entry of an API's document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    #[serde(
        rename = "documentId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub document_id: Option<String>,
    pub name: String,
    #[serde(rename = "sourceType")]
    pub source_type: DocumentSourceType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The document listing payload (`docs.json` in the archive).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default)]
    pub list: Vec<DocumentDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Mediation Policies
// =============================================================================

/// Direction a mediation policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediationDirection {
    In,
    Out,
    Fault,
}

impl MediationDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            MediationDirection::In => "in",
            MediationDirection::Out => "out",
            MediationDirection::Fault => "fault",
        }
    }
}

impl std::fmt::Display for MediationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a mediation policy inside an API payload's `sequences`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationRef {
    pub name: String,
    #[serde(rename = "type")]
    pub direction: MediationDirection,
    #[serde(default)]
    pub shared: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A mediation policy as listed or fetched from the catalog.
///
/// `id` is never written to the archive; import re-derives it by scanning
/// the remote listing for a matching name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub direction: MediationDirection,
    #[serde(default)]
    pub shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The mediation-policy listing payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediationList {
    #[serde(default)]
    pub list: Vec<MediationPolicy>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_id() {
        let api = ApiIdentity::new("acme", "PetStore", "1.0.0");
        assert_eq!(api.catalog_id(), "acme-PetStore-1.0.0");
    }

    #[test]
    fn test_descriptor_passthrough_round_trip() {
        let payload = serde_json::json!({
            "id": "uuid-123",
            "provider": "acme",
            "name": "PetStore",
            "version": "1.0.0",
            "status": "PUBLISHED",
            "context": "/petstore",
            "isDefaultVersion": true,
            "tiers": ["Gold"],
        });
        let descriptor: ApiDescriptor = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(descriptor.id.as_deref(), Some("uuid-123"));
        assert_eq!(descriptor.status.as_deref(), Some("PUBLISHED"));
        // Fields the engine never inspects survive re-serialization.
        let round_tripped = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(round_tripped, payload);
    }

    #[test]
    fn test_document_source_types() {
        let doc: DocumentDescriptor = serde_json::from_value(serde_json::json!({
            "documentId": "d1",
            "name": "HowTo",
            "sourceType": "INLINE",
        }))
        .unwrap();
        assert_eq!(doc.source_type, DocumentSourceType::Inline);
        assert!(doc.source_type.has_content());

        let doc: DocumentDescriptor = serde_json::from_value(serde_json::json!({
            "name": "External",
            "sourceType": "URL",
        }))
        .unwrap();
        assert!(!doc.source_type.has_content());

        // Unknown source types deserialize explicitly rather than failing.
        let doc: DocumentDescriptor = serde_json::from_value(serde_json::json!({
            "name": "Odd",
            "sourceType": "MARKDOWN",
        }))
        .unwrap();
        assert_eq!(doc.source_type, DocumentSourceType::Other);
    }

    #[test]
    fn test_sequences_partition_by_shared() {
        let descriptor: ApiDescriptor = serde_json::from_value(serde_json::json!({
            "provider": "acme",
            "name": "PetStore",
            "version": "1.0.0",
            "sequences": [
                {"name": "log_in_message", "type": "in", "shared": true},
                {"name": "custom_out", "type": "out"},
            ],
        }))
        .unwrap();
        assert_eq!(descriptor.sequences.len(), 2);
        assert!(descriptor.sequences[0].shared);
        assert_eq!(descriptor.sequences[0].direction, MediationDirection::In);
        assert!(!descriptor.sequences[1].shared);
    }
}
