//! Dependency declarations - WHERE a dependency comes from.
//!
//! A `Declaration` is one project's source-of-truth for a dependency:
//! a hosted registry range, a local path, a source-control location, or a
//! named SDK. The algebra here decides whether two declarations of the same
//! name could be satisfied by one real resolution, and what the merged
//! declaration is when they can.

use std::path::{Path, PathBuf};

use semver::VersionReq;
use url::Url;

use crate::resolver::range;

/// One dependency declaration. Exactly one variant is active; variants are
/// never coerced into each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// Registry-hosted, with an optional non-default registry and a version
    /// range (possibly unconstrained).
    Hosted {
        /// Registry URL; `None` means the default registry.
        registry: Option<Url>,
        /// Version requirement; an empty comparator list means `any`.
        range: VersionReq,
    },

    /// A local filesystem path, normalized at construction.
    Path {
        /// Absolute, normalized path to the package.
        path: PathBuf,
    },

    /// A source-control location.
    SourceControl {
        /// Remote URL.
        url: Url,
        /// Branch, tag, or revision.
        reference: Option<String>,
        /// Sub-path within the repository.
        subdir: Option<PathBuf>,
    },

    /// A package shipped with a named SDK.
    Sdk {
        /// SDK identifier.
        name: String,
    },
}

impl Declaration {
    /// Create a hosted declaration on the default registry.
    pub fn hosted(range: VersionReq) -> Self {
        Declaration::Hosted {
            registry: None,
            range,
        }
    }

    /// Create an unconstrained hosted declaration.
    pub fn any() -> Self {
        Declaration::hosted(VersionReq::STAR)
    }

    /// Create a path declaration. Relative paths are resolved against
    /// `base` (the declaring manifest's directory) and normalized.
    pub fn path(path: &Path, base: &Path) -> Self {
        let absolute = crate::util::fs::absolutize(path, base);
        Declaration::Path {
            path: crate::util::fs::normalize_path(&absolute),
        }
    }

    /// Symmetric predicate: true iff both declarations could be satisfied by
    /// one real resolution.
    pub fn compatible_with(&self, other: &Declaration) -> bool {
        match (self, other) {
            (
                Declaration::Hosted { registry: a, range: ra },
                Declaration::Hosted { registry: b, range: rb },
            ) => a == b && range::intersects(ra, rb),

            (Declaration::Path { path: a }, Declaration::Path { path: b }) => a == b,

            (
                Declaration::SourceControl { url: ua, reference: fa, subdir: sa },
                Declaration::SourceControl { url: ub, reference: fb, subdir: sb },
            ) => ua == ub && fa == fb && sa == sb,

            (Declaration::Sdk { name: a }, Declaration::Sdk { name: b }) => a == b,

            // Cross-variant pairs are always incompatible.
            _ => false,
        }
    }

    /// Merge two compatible declarations; `None` when incompatible.
    ///
    /// For hosted pairs the result carries the range intersection (registry
    /// identity from the receiver). Every other variant is a singleton, so
    /// the receiver comes back unchanged.
    pub fn intersect(&self, other: &Declaration) -> Option<Declaration> {
        if !self.compatible_with(other) {
            return None;
        }
        match (self, other) {
            (
                Declaration::Hosted { registry, range: ra },
                Declaration::Hosted { range: rb, .. },
            ) => Some(Declaration::Hosted {
                registry: registry.clone(),
                range: range::req_intersection(ra, rb),
            }),
            _ => Some(self.clone()),
        }
    }

    /// A short human rendering for conflict reports.
    pub fn describe(&self) -> String {
        match self {
            Declaration::Hosted { range, .. } => {
                format!("Hosted with version constraint: {}", range::display_req(range))
            }
            Declaration::Path { path } => format!("From path {}", path.display()),
            Declaration::SourceControl { url, reference, subdir } => {
                let mut out = format!("From source-control url {}", url);
                if let Some(reference) = reference {
                    out.push_str(&format!(" ref {}", reference));
                }
                if let Some(subdir) = subdir {
                    out.push_str(&format!(" path {}", subdir.display()));
                }
                out
            }
            Declaration::Sdk { name } => format!("From SDK: {}", name),
        }
    }

    /// The version range, for hosted declarations.
    pub fn version_range(&self) -> Option<&VersionReq> {
        match self {
            Declaration::Hosted { range, .. } => Some(range),
            _ => None,
        }
    }

    /// Whether this is an unconstrained hosted declaration.
    pub fn is_any(&self) -> bool {
        matches!(self, Declaration::Hosted { range, .. } if range.comparators.is_empty())
    }
}

impl std::fmt::Display for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
