//! Server version parsing and comparison.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Errors produced while reading a version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// No version components were supplied.
    #[error("version must have at least one component")]
    Empty,

    /// More than major, minor and patch were supplied.
    #[error("version has {count} components; at most 3 are allowed")]
    TooManyComponents {
        /// Number of components supplied.
        count: usize,
    },

    /// A dotted component did not start with a number.
    #[error("invalid version component '{value}'")]
    InvalidComponent {
        /// The offending component.
        value: String,
    },

    /// The `buildInfo` reply carried no usable version.
    #[error("buildInfo reply has no version field")]
    MissingVersion,
}

/// A `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl ServerVersion {
    /// Build a version from all three components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Build a version from up to three components, padding with zeros.
    ///
    /// # Examples
    ///
    /// ```
    /// use connector_fixtures::ServerVersion;
    ///
    /// let version = ServerVersion::from_parts(&[3, 4]).expect("valid parts");
    /// assert_eq!(version, ServerVersion::new(3, 4, 0));
    /// ```
    pub fn from_parts(parts: &[u32]) -> Result<Self, VersionError> {
        match *parts {
            [] => Err(VersionError::Empty),
            [major] => Ok(Self::new(major, 0, 0)),
            [major, minor] => Ok(Self::new(major, minor, 0)),
            [major, minor, patch] => Ok(Self::new(major, minor, patch)),
            _ => Err(VersionError::TooManyComponents { count: parts.len() }),
        }
    }

    /// Parse a dotted server version such as `3.4.2` or `4.0.0-rc1`.
    ///
    /// Pre-release suffixes are ignored and components beyond the patch level
    /// are dropped.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let parts = trimmed
            .split('.')
            .take(3)
            .map(leading_number)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_parts(&parts)
    }

    /// Read the version from a `buildInfo` command reply.
    ///
    /// Prefers the numeric `versionArray` field and falls back to the
    /// `version` string.
    pub fn from_build_info(reply: &Value) -> Result<Self, VersionError> {
        if let Some(array) = reply.get("versionArray").and_then(Value::as_array) {
            let parts = array
                .iter()
                .take(3)
                .map(|part| {
                    part.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| VersionError::InvalidComponent {
                            value: part.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Self::from_parts(&parts);
        }

        reply
            .get("version")
            .and_then(Value::as_str)
            .ok_or(VersionError::MissingVersion)
            .and_then(Self::parse)
    }

    /// Major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch component.
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn leading_number(component: &str) -> Result<u32, VersionError> {
    let digits: String = component
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits
        .parse()
        .map_err(|_| VersionError::InvalidComponent {
            value: component.to_owned(),
        })
}
