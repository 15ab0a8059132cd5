//! Canonical archive layout.
//!
//! Maps an API identity and an artifact kind to the relative path that
//! artifact occupies inside an archive root. The mapping is deterministic and
//! bijective: export writes through it and import parses folder names back
//! through [`parse_api_folder`].

use std::path::PathBuf;

use crate::catalog::{ApiIdentity, DocumentSourceType, MediationDirection};

/// Folder holding an API's metadata files.
pub const META_INFO_DIRECTORY: &str = "meta-information";
/// Folder holding an API's document summary and contents.
pub const DOCS_DIRECTORY: &str = "docs";
/// Subfolder for FILE-sourced document contents.
pub const FILE_CONTENTS_DIRECTORY: &str = "FileContents";
/// Subfolder for INLINE-sourced document contents.
pub const INLINE_CONTENTS_DIRECTORY: &str = "InlineContents";
/// Folder holding mediation policies, per API and at the archive root.
pub const MEDIATION_DIRECTORY: &str = "mediation";
/// Base name of the archived thumbnail, completed with a sniffed extension.
pub const ICON_BASENAME: &str = "icon";

// =============================================================================
// Artifact Kinds
// =============================================================================

/// An artifact stored inside an API's archive folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// The normalized API payload (`meta-information/api.json`).
    Metadata,
    /// The swagger / API definition (`meta-information/swagger.json`).
    Swagger,
    /// The thumbnail image with its resolved file extension.
    Thumbnail { extension: String },
    /// The document listing (`docs/docs.json`).
    DocumentSummary,
    /// One document's content, keyed by document name.
    DocumentContent {
        source_type: DocumentSourceType,
        name: String,
    },
    /// One API-scoped mediation policy's configuration.
    Mediation {
        direction: MediationDirection,
        name: String,
    },
    /// The WSDL definition (`{name}-{version}.wsdl`).
    Wsdl,
}

// =============================================================================
// Path Mapping
// =============================================================================

/// Folder name for one API inside the archive root.
pub fn api_folder(api: &ApiIdentity) -> String {
    format!("{}-{}", api.name, api.version)
}

/// Relative path of an artifact, from the archive root.
///
/// `DocumentContent` for a URL-sourced document has no path; such documents
/// are recorded in the summary only and this returns `None` for them.
pub fn path_for(api: &ApiIdentity, artifact: &Artifact) -> Option<PathBuf> {
    let root = PathBuf::from(api_folder(api));
    let path = match artifact {
        Artifact::Metadata => root.join(META_INFO_DIRECTORY).join("api.json"),
        Artifact::Swagger => root.join(META_INFO_DIRECTORY).join("swagger.json"),
        Artifact::Thumbnail { extension } => {
            root.join(format!("{}.{}", ICON_BASENAME, extension))
        }
        Artifact::DocumentSummary => root.join(DOCS_DIRECTORY).join("docs.json"),
        Artifact::DocumentContent { source_type, name } => {
            let subdir = match source_type {
                DocumentSourceType::File => FILE_CONTENTS_DIRECTORY,
                DocumentSourceType::Inline => INLINE_CONTENTS_DIRECTORY,
                _ => return None,
            };
            root.join(DOCS_DIRECTORY).join(subdir).join(name)
        }
        Artifact::Mediation { direction, name } => root
            .join(MEDIATION_DIRECTORY)
            .join(direction.as_str())
            .join(name),
        Artifact::Wsdl => root.join(format!("{}-{}.wsdl", api.name, api.version)),
    };
    Some(path)
}

/// Relative path of a global (catalog-wide) mediation policy's configuration.
///
/// Global policies live under `mediation/` at the archive root, outside any
/// API folder.
pub fn global_mediation_path(direction: MediationDirection, name: &str) -> PathBuf {
    PathBuf::from(MEDIATION_DIRECTORY)
        .join(direction.as_str())
        .join(name)
}

/// Recover `(name, version)` from a folder name produced by [`api_folder`].
///
/// Splits at the last `-`, so API names containing hyphens round-trip.
/// Versions containing hyphens are not representable in this layout.
pub fn parse_api_folder(folder: &str) -> Option<(String, String)> {
    let (name, version) = folder.rsplit_once('-')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn petstore() -> ApiIdentity {
        ApiIdentity::new("acme", "PetStore", "1.0.0")
    }

    #[test]
    fn test_api_folder_name() {
        assert_eq!(api_folder(&petstore()), "PetStore-1.0.0");
    }

    #[test]
    fn test_fixed_artifact_paths() {
        let api = petstore();
        assert_eq!(
            path_for(&api, &Artifact::Metadata).unwrap(),
            PathBuf::from("PetStore-1.0.0/meta-information/api.json")
        );
        assert_eq!(
            path_for(&api, &Artifact::Swagger).unwrap(),
            PathBuf::from("PetStore-1.0.0/meta-information/swagger.json")
        );
        assert_eq!(
            path_for(&api, &Artifact::DocumentSummary).unwrap(),
            PathBuf::from("PetStore-1.0.0/docs/docs.json")
        );
        assert_eq!(
            path_for(
                &api,
                &Artifact::Thumbnail {
                    extension: "png".to_string()
                }
            )
            .unwrap(),
            PathBuf::from("PetStore-1.0.0/icon.png")
        );
        assert_eq!(
            path_for(&api, &Artifact::Wsdl).unwrap(),
            PathBuf::from("PetStore-1.0.0/PetStore-1.0.0.wsdl")
        );
    }

    #[test]
    fn test_document_content_paths() {
        let api = petstore();
        assert_eq!(
            path_for(
                &api,
                &Artifact::DocumentContent {
                    source_type: DocumentSourceType::File,
                    name: "HowTo.pdf".to_string()
                }
            )
            .unwrap(),
            PathBuf::from("PetStore-1.0.0/docs/FileContents/HowTo.pdf")
        );
        assert_eq!(
            path_for(
                &api,
                &Artifact::DocumentContent {
                    source_type: DocumentSourceType::Inline,
                    name: "Notes".to_string()
                }
            )
            .unwrap(),
            PathBuf::from("PetStore-1.0.0/docs/InlineContents/Notes")
        );
        // URL documents carry no content and map to no path.
        assert!(path_for(
            &api,
            &Artifact::DocumentContent {
                source_type: DocumentSourceType::Url,
                name: "External".to_string()
            }
        )
        .is_none());
    }

    #[test]
    fn test_mediation_paths() {
        let api = petstore();
        assert_eq!(
            path_for(
                &api,
                &Artifact::Mediation {
                    direction: MediationDirection::In,
                    name: "log_in_message".to_string()
                }
            )
            .unwrap(),
            PathBuf::from("PetStore-1.0.0/mediation/in/log_in_message")
        );
        assert_eq!(
            global_mediation_path(MediationDirection::Fault, "json_fault"),
            PathBuf::from("mediation/fault/json_fault")
        );
    }

    #[test]
    fn test_folder_round_trip() {
        let api = petstore();
        let folder = api_folder(&api);
        let (name, version) = parse_api_folder(&folder).unwrap();
        assert_eq!(name, "PetStore");
        assert_eq!(version, "1.0.0");
    }

    #[test]
    fn test_parse_hyphenated_name() {
        let (name, version) = parse_api_folder("pet-store-2.1").unwrap();
        assert_eq!(name, "pet-store");
        assert_eq!(version, "2.1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_api_folder("noversion").is_none());
        assert!(parse_api_folder("-1.0.0").is_none());
        assert!(parse_api_folder("PetStore-").is_none());
    }
}
