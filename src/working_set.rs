//! Resolved dependency locations.
//!
//! Resolution itself happens elsewhere; provisioning only consumes the
//! ordered list of locations it produces. The list serves twice: it extends
//! launcher search paths and, joined with newlines, it is the fingerprint
//! persisted in `etc/.eggs` for change detection.

use std::path::PathBuf;

use crate::error::Result;
use crate::options::{Options, lines};

/// Supplies the ordered working set of dependency locations
pub trait DependencyResolver {
    /// Resolve the current working set
    fn resolve(&self) -> Result<Vec<PathBuf>>;
}

/// Working set listed verbatim in the `eggs` option, one location per line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedDependencies {
    locations: Vec<PathBuf>,
}

impl ListedDependencies {
    pub fn new(locations: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the `eggs` option; an unset option is an empty working set
    pub fn from_options(options: &Options) -> Self {
        Self::new(lines(options.get_or("eggs", "")))
    }
}

impl DependencyResolver for ListedDependencies {
    fn resolve(&self) -> Result<Vec<PathBuf>> {
        Ok(self.locations.clone())
    }
}

/// The sentinel fingerprint: locations joined by `\n`, no trailing newline
pub fn fingerprint(locations: &[PathBuf]) -> String {
    join_paths(locations, "\n")
}

/// Join locations with a platform search-path separator
pub fn join_paths(locations: &[PathBuf], separator: &str) -> String {
    locations
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(separator)
}
