//! Permission Sets
//!
//! A verified token carries a claim object mapping path globs to the rights
//! `"r"`, `"w"`, or `"rw"`. The projection of those claims onto a channel is
//! a `PermissionSet`, an ordered list of `(glob, Access)` entries.
//!
//! # Glob Semantics
//!
//! - `*` matches exactly one path segment
//! - `**` matches zero or more segments
//! - any other segment matches literally
//!
//! When several globs match a path, the one with the longest literal prefix
//! (leading segments before the first wildcard) decides the rights; ties go
//! to the glob declared first in the token.

use serde_json::{Map, Value};

/// Read/write rights granted by one claim entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Access {
    pub read: bool,
    pub write: bool,
}

impl Access {
    /// Parse a rights string; unknown characters are ignored
    fn parse(rights: &str) -> Self {
        Self {
            read: rights.contains('r'),
            write: rights.contains('w'),
        }
    }
}

/// The permissions installed on a channel
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    entries: Vec<(String, Access)>,
}

impl PermissionSet {
    /// A set that grants nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Project token claims into a permission set, preserving declaration order
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let mut entries = Vec::with_capacity(claims.len());
        for (glob, rights) in claims {
            let rights = rights.as_str().unwrap_or_default();
            entries.push((glob.clone(), Access::parse(rights)));
        }
        Self { entries }
    }

    /// Add an entry; used when building sets by hand in tests
    pub fn grant(&mut self, glob: impl Into<String>, access: Access) {
        self.entries.push((glob.into(), access));
    }

    /// Whether some matching glob grants read on `path`
    pub fn can_read(&self, path: &str) -> bool {
        self.best_match(path).map_or(false, |access| access.read)
    }

    /// Whether some matching glob grants write on `path`
    pub fn can_write(&self, path: &str) -> bool {
        self.best_match(path).map_or(false, |access| access.write)
    }

    /// The rights of the most specific matching glob
    fn best_match(&self, path: &str) -> Option<Access> {
        let mut best: Option<(usize, Access)> = None;
        for (glob, access) in &self.entries {
            if !glob_matches(glob, path) {
                continue;
            }
            let specificity = literal_prefix_len(glob);
            // Strictly-greater keeps the earliest entry on ties.
            if best.map_or(true, |(current, _)| specificity > current) {
                best = Some((specificity, *access));
            }
        }
        best.map(|(_, access)| access)
    }
}

/// Number of leading literal segments before the first wildcard
fn literal_prefix_len(glob: &str) -> usize {
    glob.split('.')
        .take_while(|segment| !segment.contains('*'))
        .count()
}

/// Match a path glob against a dotted path, segment-wise
pub fn glob_matches(glob: &str, path: &str) -> bool {
    let glob: Vec<&str> = glob.split('.').collect();
    let path: Vec<&str> = path.split('.').collect();
    match_segments(&glob, &path)
}

fn match_segments(glob: &[&str], path: &[&str]) -> bool {
    match glob.first() {
        None => path.is_empty(),
        Some(&"**") => (0..=path.len()).any(|skip| match_segments(&glob[1..], &path[skip..])),
        Some(&"*") => !path.is_empty() && match_segments(&glob[1..], &path[1..]),
        Some(&literal) => {
            path.first() == Some(&literal) && match_segments(&glob[1..], &path[1..])
        }
    }
}
