//! Semver requirement mathematics.
//!
//! `semver::VersionReq` has no set operations, so compatibility checks go
//! through `pubgrub::Range`: each comparator becomes a range, comparators
//! AND together, and emptiness of an intersection decides whether two
//! requirements can be satisfied by one real version.

use pubgrub::Range;
use semver::{Comparator, Op, Version, VersionReq};

/// Convert a semver VersionReq to a PubGrub Range.
pub fn version_req_to_range(req: &VersionReq) -> Range<Version> {
    if req.comparators.is_empty() {
        return Range::full();
    }

    let mut range = Range::full();

    for comp in &req.comparators {
        let comp_range = comparator_to_range(comp);
        range = range.intersection(&comp_range);
    }

    range
}

/// Whether two requirements admit at least one common version.
pub fn intersects(a: &VersionReq, b: &VersionReq) -> bool {
    !version_req_to_range(a)
        .intersection(&version_req_to_range(b))
        .is_empty()
}

/// The textual intersection of two requirements.
///
/// Semver ANDs comparators, so the conjunction of both comparator lists is
/// exactly the mathematical intersection. Duplicate comparators are dropped,
/// which also makes the operation idempotent: `intersect(r, r) == r`.
/// Callers must have established compatibility via [`intersects`] first.
pub fn req_intersection(a: &VersionReq, b: &VersionReq) -> VersionReq {
    let mut comparators = a.comparators.clone();
    for comp in &b.comparators {
        if !comparators.contains(comp) {
            comparators.push(comp.clone());
        }
    }
    VersionReq { comparators }
}

/// Render a requirement the way synthesized manifests expect: the
/// unconstrained requirement is the literal token `any`.
pub fn display_req(req: &VersionReq) -> String {
    if req.comparators.is_empty() {
        "any".to_string()
    } else {
        req.to_string()
    }
}

/// Parse a requirement, accepting the literal `any` for the unconstrained
/// range.
pub fn parse_req(s: &str) -> Result<VersionReq, semver::Error> {
    if s.trim() == "any" {
        Ok(VersionReq::STAR)
    } else {
        s.parse()
    }
}

/// The comparator's lower-bound version, zero-filling omitted components and
/// keeping any pre-release tag.
fn comparator_version(comp: &Comparator) -> Version {
    Version {
        major: comp.major,
        minor: comp.minor.unwrap_or(0),
        patch: comp.patch.unwrap_or(0),
        pre: comp.pre.clone(),
        build: semver::BuildMetadata::EMPTY,
    }
}

/// First version above every release carrying the comparator's named prefix:
/// `1.2` -> 1.3.0, `1` -> 2.0.0.
fn prefix_upper(comp: &Comparator) -> Version {
    match comp.minor {
        Some(minor) => Version::new(comp.major, minor + 1, 0),
        None => Version::new(comp.major + 1, 0, 0),
    }
}

/// Convert a single semver Comparator to a PubGrub Range.
///
/// Partial comparators name a whole prefix, not a zero-filled version:
/// `=1.2` is all of 1.2.x, `>1.2` starts at 1.3.0, `<=1.2` ends below 1.3.0.
fn comparator_to_range(comp: &Comparator) -> Range<Version> {
    let version = comparator_version(comp);

    match comp.op {
        Op::Exact if comp.patch.is_some() => Range::singleton(version),
        Op::Exact => Range::between(version, prefix_upper(comp)),

        Op::Greater if comp.patch.is_some() => Range::strictly_higher_than(version),
        Op::Greater => Range::higher_than(prefix_upper(comp)),

        Op::GreaterEq => Range::higher_than(version),

        Op::Less => Range::strictly_lower_than(version),

        Op::LessEq if comp.patch.is_some() => Range::lower_than(version),
        Op::LessEq => Range::strictly_lower_than(prefix_upper(comp)),

        // ~1.2.3 means >=1.2.3 <1.3.0; ~1 means >=1.0.0 <2.0.0
        Op::Tilde => Range::between(version, prefix_upper(comp)),

        Op::Caret => {
            // ^1.2.3 means >=1.2.3 <2.0.0
            // ^0.2.3 means >=0.2.3 <0.3.0
            // ^0.0.3 means >=0.0.3 <0.0.4
            // Partial forms widen to the named prefix: ^0.0 is <0.1.0.
            let upper = if comp.major > 0 || comp.minor.is_none() {
                Version::new(comp.major + 1, 0, 0)
            } else if version.minor > 0 || comp.patch.is_none() {
                Version::new(0, version.minor + 1, 0)
            } else {
                Version::new(0, 0, version.patch + 1)
            };
            Range::between(version, upper)
        }

        // x.y.* means >=x.y.0 <x.(y+1).0
        Op::Wildcard => Range::between(version, prefix_upper(comp)),

        _ => Range::full(),
    }
}
