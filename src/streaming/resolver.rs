//! Dataset name to file path resolution

use std::path::{Path, PathBuf};

use crate::core::config::StreamConfig;

/// Maps a logical dataset name to a point file
pub trait PathResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Looks for `<name>.<extension>` in each directory, first hit wins
#[derive(Clone, Debug)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
    extension: String,
}

impl SearchPaths {
    pub fn new(dirs: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dirs,
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.search_paths.clone(), config.bin_extension.clone())
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn file_name(&self, name: &str) -> String {
        if self.extension.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", name, self.extension)
        }
    }
}

impl PathResolver for SearchPaths {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file_name = self.file_name(name);
        let found = self
            .dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file());
        if found.is_none() {
            log::debug!("Dataset '{}' not found in {} search paths", name, self.dirs.len());
        }
        found
    }
}

impl<F> PathResolver for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

/// Resolver that treats names as literal paths
pub fn literal_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    path.is_file().then(|| path.to_path_buf())
}
