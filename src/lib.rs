//! zope2instance Library
//!
//! Provisions a Zope 2 instance tree: scaffolding through `mkzopeinstance.py`,
//! zope.conf rendering, launcher script patching, daemontools supervision
//! scripts and ZCML package include stubs, with working-set based change
//! detection between runs.

pub mod cli;
pub mod error;
pub mod instance;
pub mod options;
pub mod package_includes;
pub mod scaffold;
pub mod script_patcher;
pub mod supervise;
pub mod templates;
pub mod types;
pub mod working_set;
pub mod zope_conf;

// Re-export main types for convenience
pub use error::{ProvisionError, Result};
pub use instance::{InstallStage, Instance, UpdateOutcome};
pub use options::{Options, RecipeOptions};
pub use package_includes::{IncludeDirective, IncludeMode};
pub use scaffold::{
    InstanceScaffolder, MkZopeInstance, MkZopeInstanceArgs, ToolArgs, ToolOutput, run_tool,
};
pub use types::{IncludeSuffix, SecurityImplementation, Toggle};
pub use working_set::{DependencyResolver, ListedDependencies};
