//! VSS Path Model
//!
//! A `VssPath` is a location in the signal tree, written by clients in
//! dotted form (`Vehicle.Acceleration.Vertical`). The extended form allows
//! `*` as a full segment to enumerate leaves. Internally a path is a list
//! of validated segments; the normalized JSONPath-style query form (with
//! `children` indirections between branches) is produced by the tree, which
//! knows which segments are branches.
//!
//! # Accepted Forms
//!
//! - `Vehicle.Speed` - plain dotted path
//! - `Vehicle.Acceleration.*` - wildcard leaf enumeration
//!
//! # Rejected Forms
//!
//! - empty strings and empty segments (`Vehicle..Speed`, trailing dots)
//! - whitespace anywhere in the path
//! - `*` embedded inside a segment (`Vehicle.Spe*`)

use std::fmt;

use crate::error::ServerError;

/// A parsed, validated path into the signal tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VssPath {
    segments: Vec<String>,
}

impl VssPath {
    /// Parse a dotted path
    ///
    /// Accepts the extended form where `*` appears as a full segment.
    /// Returns `InvalidPath` for empty input, empty segments, whitespace,
    /// or a `*` embedded in a larger segment.
    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        if raw.is_empty() {
            return Err(ServerError::invalid_path("path is empty"));
        }

        let mut segments = Vec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(ServerError::invalid_path(format!(
                    "empty segment in path {}",
                    raw
                )));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(ServerError::invalid_path(format!(
                    "whitespace in path {}",
                    raw
                )));
            }
            if segment.contains('*') && segment != "*" {
                return Err(ServerError::invalid_path(format!(
                    "wildcard must be a full segment in path {}",
                    raw
                )));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Build a path directly from segments, without re-validation
    ///
    /// Used by the tree when constructing the dotted paths of enumerated
    /// leaves, whose segments all come from the loaded spec document.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// The validated segments of this path
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether any segment is the `*` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s == "*")
    }

    /// Replace the trailing `*` with a concrete leaf name
    ///
    /// Used by wildcard set, where each element of the value array names
    /// the leaf that completes the path. A path without a wildcard gets the
    /// name appended instead, mirroring the original wire behavior.
    pub fn complete_wildcard(&self, leaf_name: &str) -> Self {
        let mut segments = self.segments.clone();
        match segments.iter().position(|s| s == "*") {
            Some(idx) => {
                segments.truncate(idx);
                segments.push(leaf_name.to_string());
            }
            None => segments.push(leaf_name.to_string()),
        }
        Self { segments }
    }
}

impl fmt::Display for VssPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        let path = VssPath::parse("Vehicle.Acceleration.Vertical").unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.to_string(), "Vehicle.Acceleration.Vertical");
        assert!(!path.is_wildcard());
    }

    #[test]
    fn test_parse_wildcard_segment() {
        let path = VssPath::parse("Vehicle.Acceleration.*").unwrap();
        assert!(path.is_wildcard());
    }

    #[test]
    fn test_reject_empty_path() {
        assert!(VssPath::parse("").is_err());
    }

    #[test]
    fn test_reject_consecutive_dots() {
        assert!(VssPath::parse("Vehicle..Speed").is_err());
        assert!(VssPath::parse(".Vehicle").is_err());
        assert!(VssPath::parse("Vehicle.").is_err());
    }

    #[test]
    fn test_reject_whitespace() {
        assert!(VssPath::parse("Vehicle. Speed").is_err());
        assert!(VssPath::parse("Vehicle.Spe ed").is_err());
    }

    #[test]
    fn test_reject_embedded_wildcard() {
        assert!(VssPath::parse("Vehicle.Spe*").is_err());
    }

    #[test]
    fn test_complete_wildcard_replaces_star() {
        let path = VssPath::parse("Vehicle.Acceleration.*").unwrap();
        let done = path.complete_wildcard("Lateral");
        assert_eq!(done.to_string(), "Vehicle.Acceleration.Lateral");
    }

    #[test]
    fn test_complete_wildcard_appends_without_star() {
        let path = VssPath::parse("Vehicle.Acceleration").unwrap();
        let done = path.complete_wildcard("Lateral");
        assert_eq!(done.to_string(), "Vehicle.Acceleration.Lateral");
    }
}
