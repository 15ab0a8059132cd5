//! Archive layout and zip packaging.

pub mod layout;
pub mod package;

pub use layout::{api_folder, global_mediation_path, parse_api_folder, path_for, Artifact};
pub use package::{unzip_to, zip_directory, PackageError};
