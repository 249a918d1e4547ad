//! Type-safe option values
//!
//! Options arrive as strings. The handful of values that select behavior are
//! parsed into enums here so the rest of the crate matches exhaustively.

use strum::{Display, EnumIter, EnumString};

/// Boolean option value (`zeo-client` and friends)
///
/// Only `yes`, `true`, `on` and `1` (any case) switch a toggle on. Anything
/// else, including padded text and an unset option, reads as off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Toggle {
    #[strum(to_string = "on", serialize = "yes", serialize = "true", serialize = "1")]
    On,
    #[default]
    #[strum(to_string = "off", serialize = "no", serialize = "false", serialize = "0")]
    Off,
}

impl Toggle {
    /// Parse an option value, treating unrecognized text as off
    pub fn from_option(value: &str) -> Self {
        value.parse().unwrap_or(Self::Off)
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// `security-policy-implementation` value written to zope.conf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
pub enum SecurityImplementation {
    #[default]
    #[strum(serialize = "C")]
    C,
    #[strum(serialize = "python")]
    Python,
}

impl SecurityImplementation {
    /// The interpreted policy is used only when `verbose-security` is exactly `on`
    pub fn for_verbose_security(verbose_security: &str) -> Self {
        if verbose_security == "on" {
            Self::Python
        } else {
            Self::C
        }
    }
}

/// Suffix of a package include directive, selecting which zcml slot it fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum IncludeSuffix {
    #[default]
    Configure,
    Meta,
    Overrides,
}

impl IncludeSuffix {
    /// Filename included when the directive names none (`<suffix>.zcml`)
    pub fn default_filename(&self) -> String {
        format!("{}.zcml", self)
    }
}
