//! daemontools supervision layout and installed scripts
//!
//! The instance root doubles as a daemontools service directory: `run` and
//! `log/run` start Zope and its multilog logger, `supervise/` and
//! `log/supervise/` hold the supervisor's control files. Besides those this
//! module writes the `bin/repozo` backup helper (standalone storage only)
//! and the control script in the bin directory.

use minijinja::context;
use std::fs;
use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::options::RecipeOptions;
use crate::templates;
use crate::working_set::join_paths;

/// Owner and group rwx plus setgid, for the supervisor's control directories
pub const SUPERVISE_PERMS: u32 = 0o2770;
/// Owner and group rwx, for generated scripts
pub const SCRIPT_PERMS: u32 = 0o770;

/// Create `supervise/`, `log/supervise/` and `log/main/`.
///
/// The tree is freshly scaffolded, so every directory must be new.
pub fn create_daemontools_structure(location: &Path) -> Result<()> {
    let supervise_dir = location.join("supervise");
    let log_dir = location.join("log");
    let log_supervise_dir = log_dir.join("supervise");
    let log_main_dir = log_dir.join("main");

    fs::create_dir(&supervise_dir)?;
    if !log_dir.exists() {
        fs::create_dir(&log_dir)?;
    }
    fs::create_dir(&log_supervise_dir)?;
    fs::create_dir(&log_main_dir)?;

    for dir in [&supervise_dir, &log_supervise_dir] {
        fs::set_permissions(dir, fs::Permissions::from_mode(SUPERVISE_PERMS))?;
    }

    debug!("Created daemontools structure in {}", location.display());
    Ok(())
}

fn write_script(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_PERMS))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Search path of the control script: the instance, the Zope software home,
/// then every dependency location
pub fn control_python_path(recipe: &RecipeOptions, locations: &[PathBuf]) -> String {
    let mut paths = vec![
        recipe.location.clone(),
        recipe.zope2_location.join("lib").join("python"),
    ];
    paths.extend_from_slice(locations);
    join_paths(&paths, ":")
}

/// Install every generated script: the control script, `run`, `log/run`
/// and, unless running as a ZEO client, the repozo helper and its link.
///
/// Paths written outside the instance tree are pushed onto `outside` as soon
/// as they exist, so a caller rolling back also sees partial progress.
pub fn install_scripts(
    recipe: &RecipeOptions,
    locations: &[PathBuf],
    outside: &mut Vec<PathBuf>,
) -> Result<()> {
    let location = recipe.location.display().to_string();
    let bin_directory = recipe.bin_directory.display().to_string();
    let zope2_location = recipe.zope2_location.display().to_string();

    fs::create_dir_all(&recipe.bin_directory)?;
    let ctl_path = recipe.bin_directory.join(&recipe.name);
    let ctl = templates::render(
        templates::CTL_SCRIPT,
        context! {
            name => &recipe.name,
            location => &location,
            python_path => control_python_path(recipe, locations),
            zope_conf => recipe.zope_conf_path().display().to_string(),
        },
    )?;
    outside.push(ctl_path.clone());
    write_script(&ctl_path, &ctl)?;

    let script_ctx = context! {
        bin_directory => &bin_directory,
        zope2_location => &zope2_location,
        location => &location,
    };

    let run = templates::render(templates::RUN_SCRIPT, script_ctx.clone())?;
    write_script(&recipe.location.join("run"), &run)?;

    let log_run = templates::render(templates::LOG_RUN_SCRIPT, script_ctx.clone())?;
    write_script(&recipe.location.join("log").join("run"), &log_run)?;

    if !recipe.zeo_client.as_bool() {
        let repozo_path = recipe.location.join("bin").join("repozo");
        let repozo = templates::render(templates::REPOZO_SCRIPT, script_ctx)?;
        write_script(&repozo_path, &repozo)?;

        let link = recipe.bin_directory.join("repozo");
        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link)?;
        }
        outside.push(link.clone());
        symlink(&repozo_path, &link)?;
        debug!("Linked {} -> {}", link.display(), repozo_path.display());
    }

    info!("Installed scripts for {}", recipe.name);
    Ok(())
}
