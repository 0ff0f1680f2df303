use crate::{Scene, SceneError};
use std::collections::HashMap;
use std::path::Path;

pub mod fbx;

pub trait SceneLoader: std::fmt::Display + std::fmt::Debug + Send + Sync {
    fn load(&self, path: &Path, name: &str) -> Result<Scene, SceneError>;
}

/// File loaders keyed by lower case file extension.
#[derive(Debug)]
pub struct SceneLoaders {
    loaders: HashMap<String, Box<dyn SceneLoader>>,
}

impl Default for SceneLoaders {
    fn default() -> Self {
        Self {
            loaders: Self::create_loaders(),
        }
    }
}

impl SceneLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without any loader.
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    pub fn register<T: Into<String>>(&mut self, extension: T, loader: Box<dyn SceneLoader>) {
        self.loaders.insert(extension.into().to_lowercase(), loader);
    }

    pub fn get(&self, extension: &str) -> Option<&dyn SceneLoader> {
        self.loaders
            .get(extension.to_lowercase().as_str())
            .map(|l| l.as_ref())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(|k| k.as_str())
    }

    pub fn load<S: AsRef<Path>>(&self, path: S, name: &str) -> Result<Scene, SceneError> {
        let path = path.as_ref();
        let extension = match path.extension().and_then(|e| e.to_str()) {
            Some(extension) => extension.to_lowercase(),
            None => return Err(SceneError::NoFileExtension),
        };

        match self.loaders.get(extension.as_str()) {
            Some(loader) => {
                meshmorph_utils::log::debug!("loading {} with {}", path.display(), loader);
                loader.load(path, name)
            }
            None => Err(SceneError::NoFileLoader(extension)),
        }
    }

    fn create_loaders() -> HashMap<String, Box<dyn SceneLoader>> {
        let mut loaders: HashMap<String, Box<dyn SceneLoader>> = HashMap::new();
        loaders.insert(String::from("fbx"), Box::new(fbx::FbxLoader::default()));
        loaders
    }
}
