//! Version-requirement mathematics shared by the constraint algebra.

pub mod range;

pub use range::{display_req, intersects, parse_req, req_intersection, version_req_to_range};
