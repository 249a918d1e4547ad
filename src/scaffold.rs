//! External instance scaffolding
//!
//! The instance skeleton is produced by Zope's own `mkzopeinstance.py`. This
//! module owns the one sanctioned way to run it: typed arguments through
//! `ToolArgs`, executed by `run_tool`, which blocks until the tool exits.
//!
//! # Contract
//!
//! The tool must exit 0 and leave at least `etc/` and
//! `bin/{runzope,zopectl,runzope.bat}` behind in the target directory. A
//! non-zero exit aborts provisioning before anything else is written. Whatever
//! the failed tool created is left in place.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::error::{ProvisionError, Result};
use crate::options::RecipeOptions;

// ============================================================================
// Typed Tool Arguments
// ============================================================================

/// Trait for typed tool arguments.
///
/// The struct definition is the contract between this crate and the tool's
/// argument parser; `to_cli_args` must produce flags exactly as it expects.
pub trait ToolArgs {
    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Full path of the tool script handed to the interpreter.
    fn script_path(&self) -> PathBuf;
}

/// Arguments for `<zope2-location>/utilities/mkzopeinstance.py`.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use zope2instance::scaffold::{MkZopeInstanceArgs, ToolArgs};
///
/// let args = MkZopeInstanceArgs {
///     zope2_location: PathBuf::from("/opt/zope"),
///     location: PathBuf::from("/srv/parts/instance"),
///     user: "admin:admin".to_string(),
/// };
///
/// assert_eq!(
///     args.to_cli_args(),
///     vec!["-d", "/srv/parts/instance", "-u", "admin:admin"]
/// );
/// assert_eq!(
///     args.script_path(),
///     PathBuf::from("/opt/zope/utilities/mkzopeinstance.py")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkZopeInstanceArgs {
    /// Zope 2 software home holding `utilities/`
    pub zope2_location: PathBuf,
    /// Target instance directory (`-d`)
    pub location: PathBuf,
    /// Initial manager identity (`-u`)
    pub user: String,
}

impl ToolArgs for MkZopeInstanceArgs {
    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-d".to_string(),
            self.location.display().to_string(),
            "-u".to_string(),
            self.user.clone(),
        ]
    }

    fn script_path(&self) -> PathBuf {
        self.zope2_location.join("utilities").join("mkzopeinstance.py")
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Output from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output from the tool.
    pub stdout: String,
    /// Standard error from the tool.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the tool exited successfully (exit code 0).
    pub success: bool,
}

impl ToolOutput {
    /// Turn an unsuccessful exit into a `Scaffold` error.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ProvisionError::Scaffold {
                status: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run a tool script under `interpreter` and wait for it to exit.
///
/// Spawn failures (interpreter missing) are IO errors; a non-zero exit is
/// reported in the returned `ToolOutput`, not as an error.
pub fn run_tool<T: ToolArgs>(interpreter: &str, args: &T) -> Result<ToolOutput> {
    let script_path = args.script_path();
    let cli_args = args.to_cli_args();

    info!(
        "run_tool: {} {} args={:?}",
        interpreter,
        script_path.display(),
        cli_args
    );

    let output = Command::new(interpreter)
        .arg(&script_path)
        .args(&cli_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();
    let success = output.status.success();

    if success {
        info!("Tool {} executed successfully", script_path.display());
    } else {
        warn!(
            "Tool {} failed with exit code {}",
            script_path.display(),
            exit_code.unwrap_or(-1)
        );
    }

    Ok(ToolOutput {
        stdout,
        stderr,
        exit_code,
        success,
    })
}

// ============================================================================
// Scaffolder Contract
// ============================================================================

/// Creates the bare instance skeleton at `location`
pub trait InstanceScaffolder {
    fn scaffold(&self, location: &Path, user: &str) -> Result<()>;
}

/// Scaffolds by running `mkzopeinstance.py` under the configured interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkZopeInstance {
    pub executable: String,
    pub zope2_location: PathBuf,
}

impl MkZopeInstance {
    pub fn from_recipe(recipe: &RecipeOptions) -> Self {
        Self {
            executable: recipe.executable.clone(),
            zope2_location: recipe.zope2_location.clone(),
        }
    }
}

impl InstanceScaffolder for MkZopeInstance {
    fn scaffold(&self, location: &Path, user: &str) -> Result<()> {
        let args = MkZopeInstanceArgs {
            zope2_location: self.zope2_location.clone(),
            location: location.to_path_buf(),
            user: user.to_string(),
        };
        run_tool(&self.executable, &args)?.ensure_success()?;
        Ok(())
    }
}
