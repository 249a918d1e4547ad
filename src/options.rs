//! The flat option map driving a provisioning run.
//!
//! Options are plain strings keyed by name, exactly as a buildout section
//! would supply them. `Options` holds the raw map and knows how to load it;
//! `RecipeOptions` resolves the recognized keys, applies defaults and turns
//! relative paths into absolute ones.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::types::Toggle;

// ============================================================================
// Raw Option Map
// ============================================================================

/// Raw option map, key to string value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    /// Create an empty option map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an option map from key/value pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load options from a JSON file holding one flat object.
    ///
    /// String values are taken verbatim. Arrays of strings become newline
    /// separated lists, which is how list-valued options are spelled.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_json(&content).map_err(|e| match e {
            ProvisionError::Config(msg) => {
                ProvisionError::config(format!("{}: {}", path.as_ref().display(), msg))
            }
            other => other,
        })
    }

    /// Parse options from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, Value> = serde_json::from_str(content)?;

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                Value::String(s) => s,
                Value::Array(items) => {
                    let mut lines = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) => lines.push(s),
                            other => {
                                return Err(ProvisionError::config(format!(
                                    "option '{}' must list strings, found {}",
                                    key, other
                                )));
                            }
                        }
                    }
                    lines.join("\n")
                }
                other => {
                    return Err(ProvisionError::config(format!(
                        "option '{}' must be a string, found {}",
                        key, other
                    )));
                }
            };
            values.insert(key, text);
        }

        Ok(Self { values })
    }

    /// Apply a `key=value` override; the value may itself contain `=`
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            ProvisionError::config(format!("expected key=value, got '{}'", assignment))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ProvisionError::config(format!(
                "empty option name in '{}'",
                assignment
            )));
        }
        self.set(key, value);
        Ok(())
    }

    /// Set an option, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up an option
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up an option, falling back to `default` when unset
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Look up an option that has no default
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ProvisionError::config(format!("missing required option '{}'", key)))
    }

    /// Iterate over all options in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ============================================================================
// Resolved Recipe Options
// ============================================================================

/// Every recognized option, resolved and defaulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeOptions {
    /// Part name; also names the control script
    pub name: String,
    /// Base directory that relative paths resolve against
    pub directory: PathBuf,
    /// Where the control script and the repozo link are placed
    pub bin_directory: PathBuf,
    /// The instance tree
    pub location: PathBuf,
    /// Interpreter for the scaffolding tool
    pub executable: String,
    /// Zope 2 software home
    pub zope2_location: PathBuf,
    /// Initial manager identity (`name:password`)
    pub user: String,
    /// Extra product directories, absolute
    pub products: Vec<PathBuf>,
    pub debug_mode: String,
    pub verbose_security: String,
    pub http_address: String,
    /// Event log file, absolute
    pub event_log: PathBuf,
    /// Access log file, absolute
    pub z_log: PathBuf,
    /// FileStorage data file, absolute
    pub file_storage: PathBuf,
    pub zeo_client: Toggle,
    pub zeo_address: String,
    /// Additional ZEO databases
    pub dbs: Vec<String>,
    /// Appended verbatim to zope.conf
    pub zope_conf_additional: String,
    /// Package include directives, unparsed
    pub zcml: Vec<String>,
}

impl RecipeOptions {
    /// Resolve recognized options, using the process working directory when
    /// `directory` is unset
    pub fn from_options(options: &Options) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let directory = match options.get("directory") {
            Some(dir) => absolutize(&cwd, Path::new(dir)),
            None => cwd,
        };
        Self::resolve(options, directory)
    }

    fn resolve(options: &Options, directory: PathBuf) -> Result<Self> {
        let name = options.get_or("name", "instance").to_string();

        let parts_directory = options
            .get("parts-directory")
            .map(|p| absolutize(&directory, Path::new(p)))
            .unwrap_or_else(|| directory.join("parts"));
        let bin_directory = options
            .get("bin-directory")
            .map(|p| absolutize(&directory, Path::new(p)))
            .unwrap_or_else(|| directory.join("bin"));
        let location = options
            .get("location")
            .map(|p| absolutize(&directory, Path::new(p)))
            .unwrap_or_else(|| parts_directory.join(&name));

        let zope2_location = absolutize(&directory, Path::new(options.require("zope2-location")?));
        let user = options.require("user")?.to_string();

        let products = lines(options.get_or("products", ""))
            .map(|p| absolutize(&directory, Path::new(p)))
            .collect();

        let resolve_file = |key: &str, default: &str| {
            absolutize(&directory, Path::new(options.get_or(key, default)))
        };

        Ok(Self {
            event_log: resolve_file("event-log", "var/log/event.log"),
            z_log: resolve_file("z-log", "var/log/Z2.log"),
            file_storage: resolve_file("file-storage", "var/filestorage/Data.fs"),
            name,
            bin_directory,
            location,
            executable: options.get_or("executable", "python").to_string(),
            zope2_location,
            user,
            products,
            debug_mode: options.get_or("debug-mode", "off").to_string(),
            verbose_security: options.get_or("verbose-security", "off").to_string(),
            http_address: options.get_or("http-address", "8080").to_string(),
            zeo_client: Toggle::from_option(options.get_or("zeo-client", "")),
            zeo_address: options.get_or("zeo-address", "8100").to_string(),
            dbs: lines(options.get_or("dbs", "")).map(str::to_string).collect(),
            zope_conf_additional: options.get_or("zope-conf-additional", "").to_string(),
            zcml: options
                .get_or("zcml", "")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            directory,
        })
    }

    /// Path of the rendered configuration file
    pub fn zope_conf_path(&self) -> PathBuf {
        self.location.join("etc").join("zope.conf")
    }
}

/// Non-empty, trimmed lines of a newline-separated list option
pub fn lines(value: &str) -> impl Iterator<Item = &str> {
    value.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Join `path` onto `base` unless already absolute, then drop `.` and fold
/// `..` components lexically. The filesystem is never consulted.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
