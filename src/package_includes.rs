//! Package include stubs (`etc/package-includes`)
//!
//! Each include directive becomes one single-line zcml file that Zope's
//! startup include mechanism picks up. A directive reads
//! `package[-suffix][:filename]`:
//!
//! | Directive            | Stub file                        | Includes          |
//! |----------------------|----------------------------------|-------------------|
//! | `my.pkg`             | `001-my.pkg-configure.zcml`      | `configure.zcml`  |
//! | `my.pkg-meta`        | `001-my.pkg-meta.zcml`           | `meta.zcml`       |
//! | `my.pkg:custom.zcml` | `001-my.pkg-configure.zcml`      | `custom.zcml`     |
//!
//! A lone `*` among the directives keeps existing stubs (additive mode);
//! without it the stub directory is emptied first.

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::{ProvisionError, Result};
use crate::types::IncludeSuffix;

/// Token that switches to additive mode
pub const WILDCARD: &str = "*";

/// Dotted identifier over ASCII word characters
static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?-u:\w)+([.](?-u:\w)+)*$").expect("package name pattern is valid")
});

// ============================================================================
// Directive Parsing
// ============================================================================

/// One parsed include directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// Dotted package name
    pub package: String,
    /// Which zcml slot the stub fills
    pub suffix: IncludeSuffix,
    /// File inside the package to include
    pub filename: String,
}

impl IncludeDirective {
    /// Stub file name for the directive at 1-based `index`
    pub fn stub_name(&self, index: usize) -> String {
        format!("{:03}-{}-{}.zcml", index, self.package, self.suffix)
    }

    /// Contents of the stub file
    pub fn stub_content(&self) -> String {
        format!("<include package=\"{}\" file=\"{}\" />\n", self.package, self.filename)
    }
}

impl FromStr for IncludeDirective {
    type Err = ProvisionError;

    /// Errors always carry the original token.
    fn from_str(token: &str) -> Result<Self> {
        let invalid = || ProvisionError::invalid_include(token);

        let (rest, filename) = match token.split_once(':') {
            Some((rest, filename)) => {
                if filename.is_empty() || filename.contains(':') {
                    return Err(invalid());
                }
                (rest, Some(filename))
            }
            None => (token, None),
        };

        let (package, suffix) = match rest.split_once('-') {
            Some((package, suffix)) => {
                let suffix = suffix.parse::<IncludeSuffix>().map_err(|_| invalid())?;
                (package, suffix)
            }
            None => (rest, IncludeSuffix::default()),
        };

        if !PACKAGE_NAME.is_match(package) {
            return Err(invalid());
        }

        Ok(Self {
            package: package.to_string(),
            suffix,
            filename: filename.map_or_else(|| suffix.default_filename(), str::to_string),
        })
    }
}

impl fmt::Display for IncludeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}:{}", self.package, self.suffix, self.filename)
    }
}

/// Whether existing stubs survive a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeMode {
    /// Stub directory is emptied first
    Replace,
    /// Existing stubs are kept; triggered by `*`
    Additive,
}

/// Split off the wildcard: the first `*` selects additive mode and is
/// dropped, every other token is kept in order
pub fn split_wildcard(tokens: &[String]) -> (IncludeMode, Vec<&str>) {
    let mut remaining: Vec<&str> = tokens.iter().map(String::as_str).collect();
    match remaining.iter().position(|t| *t == WILDCARD) {
        Some(at) => {
            remaining.remove(at);
            (IncludeMode::Additive, remaining)
        }
        None => (IncludeMode::Replace, remaining),
    }
}

/// Parse every directive, stopping at the first invalid one
pub fn parse_directives(tokens: &[String]) -> Result<(IncludeMode, Vec<IncludeDirective>)> {
    let (mode, remaining) = split_wildcard(tokens);
    let directives = remaining
        .into_iter()
        .map(|t| t.parse::<IncludeDirective>())
        .collect::<Result<Vec<IncludeDirective>>>()?;
    Ok((mode, directives))
}

// ============================================================================
// Stub Generation
// ============================================================================

/// Fallback `site.zcml` shipped with Five, for Zope releases without one
pub fn site_zcml_skeleton(zope2_location: &Path) -> PathBuf {
    zope2_location
        .join("lib")
        .join("python")
        .join("Products")
        .join("Five")
        .join("skel")
        .join("site.zcml")
}

/// Write one stub per directive into `<location>/etc/package-includes`.
///
/// No-op without directives. Returns the stub paths written, in directive
/// order. Stubs written before an invalid directive stay on disk; callers
/// own the cleanup.
pub fn build_package_includes(
    location: &Path,
    zope2_location: &Path,
    tokens: &[String],
) -> Result<Vec<PathBuf>> {
    if tokens.is_empty() {
        debug!("No package includes configured");
        return Ok(Vec::new());
    }

    let etc = location.join("etc");
    let site_zcml = etc.join("site.zcml");
    if !site_zcml.exists() {
        let skeleton = site_zcml_skeleton(zope2_location);
        debug!("Copying {} to {}", skeleton.display(), site_zcml.display());
        fs::copy(&skeleton, &site_zcml)?;
    }

    let includes = etc.join("package-includes");
    if !includes.exists() {
        fs::create_dir(&includes)?;
    }

    let (mode, remaining) = split_wildcard(tokens);
    match mode {
        IncludeMode::Additive => {
            info!("Keeping existing package includes in {}", includes.display());
        }
        IncludeMode::Replace => {
            fs::remove_dir_all(&includes)?;
            fs::create_dir(&includes)?;
        }
    }

    let mut written = Vec::with_capacity(remaining.len());
    for (offset, token) in remaining.into_iter().enumerate() {
        let directive: IncludeDirective = token.parse()?;
        let path = includes.join(directive.stub_name(offset + 1));
        fs::write(&path, directive.stub_content())?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} package include stub(s)", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_plain_package_defaults_to_configure() {
        let d: IncludeDirective = "my.pkg".parse().unwrap();
        assert_eq!(d.package, "my.pkg");
        assert_eq!(d.suffix, IncludeSuffix::Configure);
        assert_eq!(d.filename, "configure.zcml");
    }

    #[test]
    fn test_suffix_selects_default_filename() {
        let d: IncludeDirective = "my.pkg-meta".parse().unwrap();
        assert_eq!(d.suffix, IncludeSuffix::Meta);
        assert_eq!(d.filename, "meta.zcml");
        assert_eq!(d.stub_content(), "<include package=\"my.pkg\" file=\"meta.zcml\" />\n");
    }

    #[test]
    fn test_explicit_filename_wins() {
        let d: IncludeDirective = "my.pkg:custom.zcml".parse().unwrap();
        assert_eq!(d.suffix, IncludeSuffix::Configure);
        assert_eq!(d.filename, "custom.zcml");

        let d: IncludeDirective = "my.pkg-overrides:other.zcml".parse().unwrap();
        assert_eq!(d.suffix, IncludeSuffix::Overrides);
        assert_eq!(d.filename, "other.zcml");
        assert_eq!(d.stub_name(7), "007-my.pkg-overrides.zcml");
    }

    #[test]
    fn test_invalid_tokens_name_the_original() {
        for token in [
            "bad!pkg",
            "pkg-badsuffix",
            "pkg-badsuffix:file.zcml",
            ".pkg",
            "pkg.",
            "my..pkg",
            "a-meta-meta",
            "a:b:c",
            "pkg:",
            "*",
            "",
            "café.pkg",
            "paquete\u{663}",
        ] {
            let err = token.parse::<IncludeDirective>().unwrap_err();
            assert!(
                matches!(err, ProvisionError::InvalidInclude(ref t) if t == token),
                "token {:?} gave {:?}",
                token,
                err
            );
        }
    }

    #[test]
    fn test_split_wildcard_removes_first_star_only() {
        let list = tokens(&["a", "*", "b", "*"]);
        let (mode, rest) = split_wildcard(&list);
        assert_eq!(mode, IncludeMode::Additive);
        assert_eq!(rest, vec!["a", "b", "*"]);

        let list = tokens(&["a", "b"]);
        assert_eq!(split_wildcard(&list).0, IncludeMode::Replace);
    }

    #[test]
    fn test_parse_directives_stops_at_first_error() {
        let err = parse_directives(&tokens(&["ok.pkg", "bad!pkg", "pkg-badsuffix"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid zcml: bad!pkg");
    }

    // ========================================================================
    // Stub Generation
    // ========================================================================

    fn instance() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("etc")).unwrap();
        fs::write(tmp.path().join("etc/site.zcml"), "<configure />\n").unwrap();
        tmp
    }

    fn stub_names(location: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(location.join("etc/package-includes"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_no_directives_is_noop() {
        let tmp = instance();
        let written = build_package_includes(tmp.path(), Path::new("/nonexistent"), &[]).unwrap();
        assert!(written.is_empty());
        assert!(!tmp.path().join("etc/package-includes").exists());
    }

    #[test]
    fn test_stubs_are_numbered_in_order_without_dedup() {
        let tmp = instance();
        build_package_includes(
            tmp.path(),
            Path::new("/nonexistent"),
            &tokens(&["my.pkg", "my.pkg-meta", "my.pkg"]),
        )
        .unwrap();

        assert_eq!(
            stub_names(tmp.path()),
            vec![
                "001-my.pkg-configure.zcml",
                "002-my.pkg-meta.zcml",
                "003-my.pkg-configure.zcml",
            ]
        );
        let stub = tmp.path().join("etc/package-includes/002-my.pkg-meta.zcml");
        let content = fs::read_to_string(stub).unwrap();
        assert_eq!(content, "<include package=\"my.pkg\" file=\"meta.zcml\" />\n");
    }

    #[test]
    fn test_replace_mode_clears_existing_stubs() {
        let tmp = instance();
        let includes = tmp.path().join("etc/package-includes");
        fs::create_dir_all(&includes).unwrap();
        fs::write(includes.join("001-old.pkg-configure.zcml"), "old").unwrap();

        build_package_includes(tmp.path(), Path::new("/nonexistent"), &tokens(&["new.pkg"]))
            .unwrap();

        assert_eq!(stub_names(tmp.path()), vec!["001-new.pkg-configure.zcml"]);
    }

    #[test]
    fn test_additive_mode_keeps_existing_stubs() {
        let tmp = instance();
        let includes = tmp.path().join("etc/package-includes");
        fs::create_dir_all(&includes).unwrap();
        fs::write(includes.join("050-old.pkg-configure.zcml"), "old").unwrap();

        build_package_includes(
            tmp.path(),
            Path::new("/nonexistent"),
            &tokens(&["*", "other.pkg"]),
        )
        .unwrap();

        assert_eq!(
            stub_names(tmp.path()),
            vec!["001-other.pkg-configure.zcml", "050-old.pkg-configure.zcml"]
        );
    }

    #[test]
    fn test_site_zcml_copied_only_when_absent() {
        let tmp = TempDir::new().unwrap();
        let zope2 = tmp.path().join("zope2");
        let skeleton = site_zcml_skeleton(&zope2);
        fs::create_dir_all(skeleton.parent().unwrap()).unwrap();
        fs::write(&skeleton, "<configure>skel</configure>\n").unwrap();

        let location = tmp.path().join("instance");
        fs::create_dir_all(location.join("etc")).unwrap();
        build_package_includes(&location, &zope2, &tokens(&["a.pkg"])).unwrap();
        assert_eq!(
            fs::read_to_string(location.join("etc/site.zcml")).unwrap(),
            "<configure>skel</configure>\n"
        );

        fs::write(location.join("etc/site.zcml"), "custom").unwrap();
        build_package_includes(&location, &zope2, &tokens(&["a.pkg"])).unwrap();
        assert_eq!(fs::read_to_string(location.join("etc/site.zcml")).unwrap(), "custom");
    }

    #[test]
    fn test_invalid_directive_aborts_remaining() {
        let tmp = instance();
        let err = build_package_includes(
            tmp.path(),
            Path::new("/nonexistent"),
            &tokens(&["first.pkg", "pkg-badsuffix", "never.pkg"]),
        )
        .unwrap_err();

        assert!(matches!(err, ProvisionError::InvalidInclude(ref t) if t == "pkg-badsuffix"));
        assert_eq!(stub_names(tmp.path()), vec!["001-first.pkg-configure.zcml"]);
    }
}
