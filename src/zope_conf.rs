//! zope.conf rendering
//!
//! `render_zope_conf` is a pure function of the resolved options: it picks
//! the standalone or ZEO client template and fills it in. `write_zope_conf`
//! adds the filesystem side, creating log and storage directories before the
//! rendered text lands in `etc/zope.conf`.

use minijinja::{Value, context};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::options::RecipeOptions;
use crate::templates;
use crate::types::SecurityImplementation;

/// Variables shared by the standalone and ZEO client templates
#[derive(Debug, Serialize)]
struct ZopeConfContext<'a> {
    instance_home: &'a str,
    products_lines: String,
    debug_mode: &'a str,
    security_implementation: String,
    verbose_security: &'a str,
    event_log: String,
    z_log: String,
    file_storage: String,
    http_address: &'a str,
    zeo_address: &'a str,
    zeo_dbs: String,
    zope_conf_additional: &'a str,
}

/// Render zope.conf text for `recipe`
pub fn render_zope_conf(recipe: &RecipeOptions) -> Result<String> {
    let instance_home = recipe.location.display().to_string();
    let products_lines = recipe
        .products
        .iter()
        .map(|p| format!("products {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    let security_implementation =
        SecurityImplementation::for_verbose_security(&recipe.verbose_security);

    let (template, zeo_dbs) = if recipe.zeo_client.as_bool() {
        let mut zeo_dbs = String::new();
        for db in &recipe.dbs {
            zeo_dbs.push_str(&templates::render(
                templates::ZEO_DB,
                context! {
                    db_name => db,
                    zeo_address => &recipe.zeo_address,
                    instance_home => &instance_home,
                },
            )?);
        }
        (templates::ZEO_CONF, zeo_dbs)
    } else {
        (templates::ZOPE_CONF, String::new())
    };
    debug!("Rendering zope.conf from template {}", template);

    let ctx = ZopeConfContext {
        instance_home: &instance_home,
        products_lines,
        debug_mode: &recipe.debug_mode,
        security_implementation: security_implementation.to_string(),
        verbose_security: &recipe.verbose_security,
        event_log: recipe.event_log.display().to_string(),
        z_log: recipe.z_log.display().to_string(),
        file_storage: recipe.file_storage.display().to_string(),
        http_address: &recipe.http_address,
        zeo_address: &recipe.zeo_address,
        zeo_dbs,
        zope_conf_additional: &recipe.zope_conf_additional,
    };
    templates::render(template, Value::from_serialize(&ctx))
}

/// Create the parent directories of the event log, access log and file
/// storage when they are missing
pub fn ensure_data_directories(recipe: &RecipeOptions) -> Result<()> {
    for file in [&recipe.event_log, &recipe.z_log, &recipe.file_storage] {
        if let Some(parent) = file.parent() {
            ensure_dir(parent)?;
        }
    }
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        debug!("Creating directory {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Render zope.conf and write it under the instance tree
pub fn write_zope_conf(recipe: &RecipeOptions) -> Result<PathBuf> {
    ensure_data_directories(recipe)?;

    let text = render_zope_conf(recipe)?;
    let path = recipe.zope_conf_path();
    fs::write(&path, text)?;
    info!("Wrote {}", path.display());
    Ok(path)
}
