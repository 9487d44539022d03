//! References to catalog entities and the name rules they follow.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Longest accepted entity name or namespace.
pub const NAME_MAX_LENGTH: usize = 63;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_\.]*$").expect("static valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("must be between 1 and 63 characters long, got {0}")]
    Length(usize),
    #[error("must only contain letters, digits, '-', '_' and '.'")]
    Pattern,
    /// `.` and `..` are path segments with special meaning in URLs.
    #[error("must not be '.' or '..'")]
    DotSegment,
}

/// Check `value` against the catalog's entity name restrictions.
///
/// Applies to names and namespaces alike.
pub fn validate_name(value: &str) -> Result<(), NameError> {
    let length = value.chars().count();
    if !(1..=NAME_MAX_LENGTH).contains(&length) {
        return Err(NameError::Length(length));
    }
    if !NAME_REGEX.is_match(value) {
        return Err(NameError::Pattern);
    }
    if matches!(value, "." | "..") {
        return Err(NameError::DotSegment);
    }
    Ok(())
}

/// Fully qualified reference to a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Renders the catalog's string form, e.g. `group:default/team-a`.
impl Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.kind.to_lowercase(),
            self.namespace,
            self.name
        )
    }
}
