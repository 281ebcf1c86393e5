pub mod knn;

use anyhow::Result;
use geo_types::{Geometry, Rect};

use crate::catalog::ResolvedTarget;

/// Row identifier within an indexed collection.
pub type RowId = i64;

/// The external R*Tree-style spatial index the engine queries.
///
/// The index is pre-built and maintained by the host system; this crate only
/// ever reads from it. Both methods may touch storage and are therefore
/// fallible; a failure aborts the in-flight search round and is never
/// retried.
pub trait SpatialIndex {
	/// Row identifiers whose indexed bounding box intersects `frame`.
	///
	/// Implementations should return rows ordered by increasing true
	/// distance from the centre of the frame when they can, and may cap the
	/// result at `limit` entries; the engine re-ranks by exact distance
	/// either way.
	fn query_intersecting(
		&self,
		target: &ResolvedTarget,
		frame: &Rect<f64>,
		limit: usize,
	) -> Result<Vec<RowId>>;

	/// The stored geometry for a row returned by a previous probe, or `None`
	/// when the row has vanished in between.
	fn geometry(&self, target: &ResolvedTarget, rowid: RowId) -> Result<Option<Geometry<f64>>>;
}
