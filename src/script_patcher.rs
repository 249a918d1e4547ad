//! Launcher script surgery
//!
//! `mkzopeinstance.py` generates launcher scripts whose search path only
//! covers the Zope software home. Patching splices the resolved dependency
//! locations in next to a fixed placeholder substring. This is literal
//! match-and-replace, not a shell or batch parser: a script without the
//! placeholder is rejected with `ProvisionError::Script`.
//!
//! `bin/test.bat` is derived from the patched `bin/runzope.bat` the same way.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProvisionError, Result};
use crate::working_set::join_paths;

/// Shell launchers patched with a colon-joined path
pub const UNIX_SCRIPTS: [&str; 2] = ["runzope", "zopectl"];
/// Search path placeholder in the shell launchers
pub const UNIX_PLACEHOLDER: &str = "$SOFTWARE_HOME:$PYTHONPATH";

/// Batch launcher patched with a semicolon-joined path
pub const WINDOWS_SCRIPT: &str = "runzope.bat";
/// Search path placeholder in the batch launcher
pub const WINDOWS_PLACEHOLDER: &str = "PYTHONPATH=%SOFTWARE_HOME%";
/// Interpreter assignment lines that get replaced
pub const PYTHON_ASSIGNMENT: &str = "@set PYTHON=";
/// Line index the interpreter assignment is reinserted at
const PYTHON_ASSIGNMENT_LINE: usize = 2;

/// Test launcher derived from the batch launcher
pub const TEST_SCRIPT: &str = "test.bat";
const ZOPE_RUN_ENTRY: &str = r"@set ZOPE_RUN=%SOFTWARE_HOME%\Zope2\Startup\run.py";
const TEST_RUN_ENTRY: &str = "@set ZOPE_RUN=%ZOPE_HOME%\\test.py\n@set ERRLEV=0";
const ZOPE_RUN_INVOCATION: &str = r#""%ZOPE_RUN%" -C "%CONFIG_FILE%" %1 %2 %3 %4 %5 %6 %7"#;
const TEST_RUN_INVOCATION: &str = concat!(
    r#""%ZOPE_RUN%" --config-file "%CONFIG_FILE%" %1 %2 %3 %4 %5 %6 %7 %8 %9"#,
    "\n",
    "@IF %ERRORLEVEL% NEQ 0 SET ERRLEV=1",
    "\n",
    r#"@ECHO "%ERRLEV%">%INSTANCE_HOME%\testsexitcode.err"#,
);

// ============================================================================
// Text Transformations
// ============================================================================

/// Replace the first occurrence of `placeholder`, or `None` when absent
fn splice(text: &str, placeholder: &str, replacement: &str) -> Option<String> {
    text.contains(placeholder)
        .then(|| text.replacen(placeholder, replacement, 1))
}

/// Insert colon-joined `locations` into a shell launcher
pub fn patch_unix_script(text: &str, locations: &[PathBuf]) -> Option<String> {
    if locations.is_empty() {
        return text.contains(UNIX_PLACEHOLDER).then(|| text.to_string());
    }
    let replacement = format!(
        "$SOFTWARE_HOME:{}:$PYTHONPATH",
        join_paths(locations, ":")
    );
    splice(text, UNIX_PLACEHOLDER, &replacement)
}

/// Rewrite the batch launcher: pin the interpreter and insert
/// semicolon-joined `locations`.
///
/// Every line starting with `@set PYTHON=` is dropped and a single
/// assignment for `executable` is inserted as the third line. Lines are
/// rejoined with `\n`.
pub fn patch_windows_script(text: &str, locations: &[PathBuf], executable: &str) -> Option<String> {
    let mut lines: Vec<String> = text
        .lines()
        .filter(|line| !line.starts_with(PYTHON_ASSIGNMENT))
        .map(str::to_string)
        .collect();
    let at = PYTHON_ASSIGNMENT_LINE.min(lines.len());
    lines.insert(at, format!("{}{}", PYTHON_ASSIGNMENT, executable));
    let script = lines.join("\n");

    if locations.is_empty() {
        return script.contains(WINDOWS_PLACEHOLDER).then_some(script);
    }
    let replacement = format!(
        "PYTHONPATH=%SOFTWARE_HOME%;{};%PYTHONPATH%",
        join_paths(locations, ";")
    );
    splice(&script, WINDOWS_PLACEHOLDER, &replacement)
}

/// Derive the test launcher from a (patched) batch launcher
pub fn derive_test_script(runzope_bat: &str) -> String {
    runzope_bat
        .replace(ZOPE_RUN_ENTRY, TEST_RUN_ENTRY)
        .replace(ZOPE_RUN_INVOCATION, TEST_RUN_INVOCATION)
}

// ============================================================================
// Filesystem Side
// ============================================================================

fn missing_placeholder(path: &Path, placeholder: &str) -> ProvisionError {
    ProvisionError::script(format!(
        "{} does not contain '{}'",
        path.display(),
        placeholder
    ))
}

/// Patch every generated launcher under `<location>/bin` and write
/// `bin/test.bat`
pub fn patch_binaries(location: &Path, locations: &[PathBuf], executable: &str) -> Result<()> {
    let bin = location.join("bin");

    for name in UNIX_SCRIPTS {
        let path = bin.join(name);
        let script = fs::read_to_string(&path)?;
        let patched = patch_unix_script(&script, locations)
            .ok_or_else(|| missing_placeholder(&path, UNIX_PLACEHOLDER))?;
        fs::write(&path, patched)?;
        debug!("Patched {}", path.display());
    }

    let path = bin.join(WINDOWS_SCRIPT);
    let script = fs::read_to_string(&path)?;
    let patched = patch_windows_script(&script, locations, executable)
        .ok_or_else(|| missing_placeholder(&path, WINDOWS_PLACEHOLDER))?;
    fs::write(&path, &patched)?;
    debug!("Patched {}", path.display());

    let test_path = bin.join(TEST_SCRIPT);
    fs::write(&test_path, derive_test_script(&patched))?;

    info!(
        "Patched launcher scripts in {} with {} extra path(s)",
        bin.display(),
        locations.len()
    );
    Ok(())
}
