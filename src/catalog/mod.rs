//! Catalog registrations and lookups backing target resolution.
//!
//! The catalog itself lives in the host system; this module only defines the
//! registration records and the lookup seam the resolver consumes, so the
//! whole resolution path can be exercised against an in-memory
//! implementation.

pub mod resolve;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The schema prefix used when a request does not name one.
pub const DEFAULT_DB_PREFIX: &str = "main";

/// Registration record for a geometry attribute of an indexed collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryColumn {
	/// Collection name, in canonical catalog casing
	pub table: String,
	/// Geometry attribute name, in canonical catalog casing
	pub column: String,
	/// Reference system identifier
	pub srid: i32,
	/// Whether the reference system measures coordinates in angular units,
	/// requiring geodesic formulas for ground distance
	pub geographic: bool,
	/// Whether an R*Tree index is maintained for this attribute
	pub index_enabled: bool,
}

/// Registration record for a spatial view: a read-only indirection over a
/// base indexed collection with its own row-identifier mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialView {
	/// View name
	pub view: String,
	/// Geometry attribute exposed by the view
	pub view_column: String,
	/// View attribute carrying the base-collection row identifier
	pub rowid_column: String,
	/// Base collection the view projects
	pub base_table: String,
	/// Indexed geometry attribute on the base collection
	pub base_column: String,
	/// Whether the registration is active
	pub enabled: bool,
}

/// Immutable outcome of target resolution: the concrete indexed attribute a
/// search runs against. Produced once per search and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTarget {
	pub table: String,
	pub column: String,
	pub geographic: bool,
}

/// Catalog lookups consumed by [`resolve::resolve_target`].
///
/// Implementations must scope both lookups to the given schema prefix and
/// match `table` / `view` names case-insensitively (see [`names_match`]),
/// mirroring how the host catalog compares identifiers.
pub trait CatalogProvider {
	/// Every geometry-column registration for the named collection.
	fn geometry_columns(&self, db_prefix: &str, table: &str) -> Result<Vec<GeometryColumn>>;

	/// Every spatial-view registration naming the given view.
	fn spatial_views(&self, db_prefix: &str, view: &str) -> Result<Vec<SpatialView>>;
}

/// Identifier comparison used throughout catalog matching.
pub fn names_match(a: &str, b: &str) -> bool {
	a.eq_ignore_ascii_case(b)
}
