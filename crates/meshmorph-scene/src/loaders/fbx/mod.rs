use crate::{Scene, SceneError, SceneLoader};
use meshmorph_utils::log::debug;
use std::path::Path;

mod ascii;
mod binary;
mod convert;
mod document;

pub use ascii::parse_ascii;
pub use binary::{is_binary, parse_binary, BINARY_MAGIC};
pub use convert::{build_scene, read_axis_system};
pub use document::*;

/// Parses binary or ASCII FBX data, detected from the header.
pub fn parse_fbx(data: &[u8]) -> Result<FbxDocument, FbxError> {
    if is_binary(data) {
        parse_binary(data)
    } else {
        parse_ascii(&String::from_utf8_lossy(data))
    }
}

#[derive(Debug, Copy, Clone)]
pub struct FbxLoader {}

impl std::fmt::Display for FbxLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fbx-loader")
    }
}

impl Default for FbxLoader {
    fn default() -> Self {
        Self {}
    }
}

impl FbxLoader {
    pub fn load_bytes(&self, data: &[u8], path: &Path, name: &str) -> Result<Scene, SceneError> {
        let document = parse_fbx(data).map_err(|e| SceneError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(
            "parsed {} ({} top level records, version {})",
            path.display(),
            document.nodes.len(),
            document.version
        );

        Ok(build_scene(&document, name))
    }
}

impl SceneLoader for FbxLoader {
    fn load(&self, path: &Path, name: &str) -> Result<Scene, SceneError> {
        let data = std::fs::read(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(&data, path, name)
    }
}
