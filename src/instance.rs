//! Provisioning orchestrator
//!
//! An instance tree is either fully provisioned or absent. `install` wipes
//! and rebuilds it from scratch; `update` rebuilds only when the working set
//! differs from the snapshot saved in `etc/.eggs` at the last install.
//!
//! # Stage Flow
//!
//! ```text
//! Scaffolding          (failure: tree left as the tool left it)
//!     ↓
//! SavingWorkingSet     ┐
//!     ↓                │
//! Supervision          │
//!     ↓                │
//! ZopeConf             │ failure: tree removed, error re-raised
//!     ↓                │
//! PatchingScripts      │
//!     ↓                │
//! InstallingScripts    │
//!     ↓                │
//! PackageIncludes      ┘
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::options::{Options, RecipeOptions};
use crate::package_includes::build_package_includes;
use crate::scaffold::{InstanceScaffolder, MkZopeInstance};
use crate::script_patcher::patch_binaries;
use crate::supervise::{create_daemontools_structure, install_scripts};
use crate::working_set::{DependencyResolver, ListedDependencies, fingerprint};
use crate::zope_conf::write_zope_conf;

/// Working set snapshot, relative to the instance tree
pub const SENTINEL: &str = "etc/.eggs";

// ============================================================================
// Stages
// ============================================================================

/// Install stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Running the external scaffolding tool
    Scaffolding = 0,
    /// Writing the working set snapshot
    SavingWorkingSet = 1,
    /// Creating daemontools directories
    Supervision = 2,
    /// Rendering zope.conf
    ZopeConf = 3,
    /// Splicing dependency paths into launchers
    PatchingScripts = 4,
    /// Writing run scripts, repozo and the control script
    InstallingScripts = 5,
    /// Writing package include stubs
    PackageIncludes = 6,
}

impl InstallStage {
    pub const fn order(self) -> u8 {
        self as u8
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Scaffolding => "Scaffolding instance",
            Self::SavingWorkingSet => "Saving working set",
            Self::Supervision => "Creating supervision directories",
            Self::ZopeConf => "Writing zope.conf",
            Self::PatchingScripts => "Patching launcher scripts",
            Self::InstallingScripts => "Installing scripts",
            Self::PackageIncludes => "Building package includes",
        }
    }

    /// All stages in order
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::Scaffolding,
            Self::SavingWorkingSet,
            Self::Supervision,
            Self::ZopeConf,
            Self::PatchingScripts,
            Self::InstallingScripts,
            Self::PackageIncludes,
        ]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Update Outcome
// ============================================================================

/// What `update` did to the instance tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Working set matched the snapshot; nothing was touched
    Unchanged(PathBuf),
    /// The tree was wiped and installed again
    Rebuilt(PathBuf),
}

impl UpdateOutcome {
    pub fn location(&self) -> &Path {
        match self {
            Self::Unchanged(location) | Self::Rebuilt(location) => location,
        }
    }

    pub fn rebuilt(&self) -> bool {
        matches!(self, Self::Rebuilt(_))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// One provisioned instance and the collaborators that build it
pub struct Instance<S, R> {
    recipe: RecipeOptions,
    scaffolder: S,
    resolver: R,
}

impl Instance<MkZopeInstance, ListedDependencies> {
    /// Wire up the subprocess scaffolder and the `eggs` working set
    pub fn from_options(options: &Options) -> Result<Self> {
        let recipe = RecipeOptions::from_options(options)?;
        let scaffolder = MkZopeInstance::from_recipe(&recipe);
        let resolver = ListedDependencies::from_options(options);
        Ok(Self::new(recipe, scaffolder, resolver))
    }
}

impl<S: InstanceScaffolder, R: DependencyResolver> Instance<S, R> {
    pub fn new(recipe: RecipeOptions, scaffolder: S, resolver: R) -> Self {
        Self {
            recipe,
            scaffolder,
            resolver,
        }
    }

    pub fn recipe(&self) -> &RecipeOptions {
        &self.recipe
    }

    /// Wipe the tree and provision it from scratch. Returns its location.
    pub fn install(&self) -> Result<PathBuf> {
        let locations = self.resolver.resolve()?;
        self.install_with(&locations)
    }

    /// Rebuild only when the working set differs from the saved snapshot
    pub fn update(&self) -> Result<UpdateOutcome> {
        let location = &self.recipe.location;
        let locations = self.resolver.resolve()?;

        if !location.exists() {
            info!("{} does not exist, installing", location.display());
            return self.install_with(&locations).map(UpdateOutcome::Rebuilt);
        }

        let sentinel = location.join(SENTINEL);
        let saved = if sentinel.is_file() {
            Some(fs::read(&sentinel)?)
        } else {
            None
        };

        match saved {
            Some(saved) if saved == fingerprint(&locations).as_bytes() => {
                info!("Working set unchanged, leaving {} alone", location.display());
                Ok(UpdateOutcome::Unchanged(location.clone()))
            }
            Some(_) => {
                info!("Working set changed, reinstalling {}", location.display());
                self.install_with(&locations).map(UpdateOutcome::Rebuilt)
            }
            None => {
                info!(
                    "No working set snapshot in {}, reinstalling",
                    location.display()
                );
                self.install_with(&locations).map(UpdateOutcome::Rebuilt)
            }
        }
    }

    fn install_with(&self, locations: &[PathBuf]) -> Result<PathBuf> {
        let location = &self.recipe.location;

        if fs::symlink_metadata(location).is_ok() {
            debug!("Removing existing {}", location.display());
            remove_tree(location)?;
        }

        info!("{}", InstallStage::Scaffolding);
        if let Err(e) = self.scaffolder.scaffold(location, &self.recipe.user) {
            warn!(
                "Scaffolding {} failed, leaving whatever the tool created",
                location.display()
            );
            return Err(e);
        }

        let mut stage = InstallStage::SavingWorkingSet;
        let mut outside = Vec::new();
        if let Err(e) = self.provision(locations, &mut stage, &mut outside) {
            warn!("{} failed, removing {}", stage, location.display());
            for path in outside.iter().map(PathBuf::as_path).chain([location.as_path()]) {
                if fs::symlink_metadata(path).is_err() {
                    continue;
                }
                if let Err(cleanup) = remove_tree(path) {
                    error!("Could not remove {}: {}", path.display(), cleanup);
                }
            }
            return Err(e);
        }

        info!("Instance ready at {}", location.display());
        Ok(location.clone())
    }

    /// Everything after scaffolding. `stage` tracks the step in progress so
    /// the caller can report where a failure happened; `outside` collects
    /// files written beyond the instance tree.
    fn provision(
        &self,
        locations: &[PathBuf],
        stage: &mut InstallStage,
        outside: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let recipe = &self.recipe;
        let location = &recipe.location;

        enter(stage, InstallStage::SavingWorkingSet);
        fs::write(location.join(SENTINEL), fingerprint(locations))?;

        enter(stage, InstallStage::Supervision);
        create_daemontools_structure(location)?;

        enter(stage, InstallStage::ZopeConf);
        write_zope_conf(recipe)?;

        enter(stage, InstallStage::PatchingScripts);
        patch_binaries(location, locations, &recipe.executable)?;

        enter(stage, InstallStage::InstallingScripts);
        install_scripts(recipe, locations, outside)?;

        enter(stage, InstallStage::PackageIncludes);
        build_package_includes(location, &recipe.zope2_location, &recipe.zcml)?;

        Ok(())
    }
}

fn enter(stage: &mut InstallStage, next: InstallStage) {
    *stage = next;
    info!("{}", next);
}

fn remove_tree(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}
