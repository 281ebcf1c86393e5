//! The read-only table surface: parameter binding, the search snapshot and
//! the cursor handed to the host engine.

pub mod args;
pub mod cursor;
pub mod legacy;

use std::sync::Arc;

use anyhow::{Result, bail};
use geo_types::Point;

use crate::catalog::resolve::resolve_target;
use crate::catalog::{CatalogProvider, DEFAULT_DB_PREFIX};
use crate::err::Error;
use crate::geom;
use crate::idx::knn::{self, KnnEntry};
use crate::idx::{RowId, SpatialIndex};
use crate::vtab::args::{Constraint, KnnParams, Value};
use crate::vtab::cursor::KnnCursor;

/// Immutable outcome of one filter call.
///
/// Every cursor owns a reference-counted snapshot produced when its filter
/// ran, so re-filtering the endpoint can never invalidate a cursor that is
/// still being read.
#[derive(Debug)]
pub struct KnnSnapshot {
	db_prefix: String,
	table: String,
	column: String,
	geographic: bool,
	ref_geometry: Vec<u8>,
	reference: Point<f64>,
	max_items: usize,
	expand: bool,
	entries: Vec<KnnEntry>,
}

impl KnnSnapshot {
	/// The ranked entries, ascending by meter distance.
	pub fn entries(&self) -> &[KnnEntry] {
		&self.entries
	}

	/// The resolved collection name (the base collection when the request
	/// named a spatial view).
	pub fn table(&self) -> &str {
		&self.table
	}

	/// The resolved geometry attribute name.
	pub fn column(&self) -> &str {
		&self.column
	}

	/// Whether distances were ranked geodesically.
	pub fn is_geographic(&self) -> bool {
		self.geographic
	}

	/// The decoded reference point.
	pub fn reference(&self) -> Point<f64> {
		self.reference
	}
}

/// One logical KNN search endpoint over a catalog and a spatial index.
pub struct KnnTable<C, I> {
	catalog: C,
	index: I,
}

impl<C: CatalogProvider, I: SpatialIndex> KnnTable<C, I> {
	pub fn new(catalog: C, index: I) -> Self {
		Self {
			catalog,
			index,
		}
	}

	/// Binds the pushed-down constraint set, runs the search and returns a
	/// cursor over the ranked result.
	///
	/// This call never fails: an unrecognizable constraint set, a reference
	/// geometry that is not a single point, or a target without a usable
	/// index all produce an empty cursor, keeping speculative planner probes
	/// side-effect free.
	pub fn filter(&self, constraints: &[Constraint]) -> KnnCursor {
		let Some(params) = KnnParams::from_constraints(constraints) else {
			return KnnCursor::unsatisfiable();
		};
		match self.run(&params) {
			Ok(snapshot) => KnnCursor::open(Arc::new(snapshot)),
			Err(error) => {
				match error.downcast_ref::<Error>() {
					Some(cause) if cause.degrades_to_empty() => {
						trace!(%cause, "KNN request degraded to an empty result")
					}
					_ => warn!(%error, "KNN catalog lookup failed"),
				}
				KnnCursor::unsatisfiable()
			}
		}
	}

	fn run(&self, params: &KnnParams) -> Result<KnnSnapshot> {
		let db_prefix =
			params.db_prefix.clone().unwrap_or_else(|| DEFAULT_DB_PREFIX.to_string());
		let reference = geom::decode_point(&params.geometry)?;
		let target =
			resolve_target(&self.catalog, &db_prefix, &params.table, params.column.as_deref())?;
		let entries = knn::search(
			&self.index,
			&target,
			reference,
			params.radius,
			params.max_items,
			params.expand,
		);
		Ok(KnnSnapshot {
			db_prefix,
			table: target.table,
			column: target.column,
			geographic: target.geographic,
			ref_geometry: params.geometry.clone(),
			reference,
			max_items: params.max_items,
			expand: params.expand,
			entries,
		})
	}

	/// Insertion is never permitted.
	pub fn insert(&self, _rowid: Option<RowId>, _values: &[Value]) -> Result<()> {
		bail!(Error::ReadOnly)
	}

	/// Updates are never permitted.
	pub fn update(&self, _rowid: RowId, _values: &[Value]) -> Result<()> {
		bail!(Error::ReadOnly)
	}

	/// Deletion is never permitted.
	pub fn delete(&self, _rowid: RowId) -> Result<()> {
		bail!(Error::ReadOnly)
	}
}

#[cfg(test)]
mod tests {
	use geo_types::Point;
	use test_log::test;

	use super::*;
	use crate::vtab::args::Column;
	use crate::testutil::{MemCatalog, MemIndex, grid_index};

	fn table() -> KnnTable<MemCatalog, MemIndex> {
		let mut catalog = MemCatalog::default();
		catalog.add_column("main", "grid", "geom", 32632, false, true);
		catalog.add_view("main", "grid_vw", "geom", "rowid", "grid", "geom", true);
		KnnTable::new(catalog, grid_index())
	}

	fn geo_table() -> KnnTable<MemCatalog, MemIndex> {
		let mut catalog = MemCatalog::default();
		catalog.add_column("main", "places", "geom", 4326, true, true);
		let mut index = MemIndex::default();
		// one degree east and two degrees east of the origin
		index.add(1, Point::new(1.0, 0.0).into());
		index.add(2, Point::new(2.0, 0.0).into());
		KnnTable::new(catalog, index)
	}

	fn constraints(table: &str, point: (f64, f64), radius: f64) -> Vec<Constraint> {
		vec![
			Constraint::new(Column::TableName, Value::Text(table.to_string())),
			Constraint::new(
				Column::RefGeometry,
				Value::Blob(geom::encode_point(&Point::new(point.0, point.1))),
			),
			Constraint::new(Column::Radius, Value::Float(radius)),
		]
	}

	#[test]
	fn filter_produces_ranked_entries() {
		let mut set = constraints("grid", (1.0, 1.0), 5.0);
		set.push(Constraint::new(Column::MaxItems, Value::Int(3)));
		let cursor = table().filter(&set);
		let snapshot = cursor.snapshot().unwrap();
		assert_eq!(snapshot.entries().len(), 3);
		assert_eq!(snapshot.entries()[0].dist_m, 0.0);
		assert_eq!(snapshot.entries()[1].dist_m, 1.0);
		assert_eq!(snapshot.entries()[2].dist_m, 1.0);
	}

	#[test]
	fn filter_through_a_view_resolves_the_base_collection() {
		let cursor = table().filter(&constraints("grid_vw", (1.0, 1.0), 5.0));
		let snapshot = cursor.snapshot().unwrap();
		assert_eq!(snapshot.table(), "grid");
		assert_eq!(snapshot.entries().len(), 3);
	}

	#[test]
	fn geographic_targets_rank_by_meters_and_report_both_distances() {
		let mut set = constraints("places", (0.0, 0.0), 3.0);
		set.push(Constraint::new(Column::MaxItems, Value::Int(2)));
		let cursor = geo_table().filter(&set);
		let snapshot = cursor.snapshot().unwrap();
		assert!(snapshot.is_geographic());
		let entries = snapshot.entries();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].rowid, 1);
		assert_eq!(entries[0].dist_crs, 1.0);
		assert!(entries[0].dist_m > 100_000.0, "meters, not degrees: {}", entries[0].dist_m);
		assert!(entries[1].dist_m > entries[0].dist_m);
	}

	#[test]
	fn malformed_requests_yield_an_empty_cursor_not_an_error() {
		// missing radius
		let set = vec![
			Constraint::new(Column::TableName, Value::Text("grid".to_string())),
			Constraint::new(
				Column::RefGeometry,
				Value::Blob(geom::encode_point(&Point::new(1.0, 1.0))),
			),
		];
		let cursor = table().filter(&set);
		assert!(cursor.at_end());
		assert!(cursor.snapshot().is_none());
	}

	#[test]
	fn non_point_reference_geometries_yield_an_empty_cursor() {
		let mut set = constraints("grid", (1.0, 1.0), 5.0);
		set.retain(|c| c.column != Column::RefGeometry);
		// a LINESTRING type code
		let mut blob = vec![1u8];
		blob.extend_from_slice(&2u32.to_le_bytes());
		blob.extend_from_slice(&0u32.to_le_bytes());
		set.push(Constraint::new(Column::RefGeometry, Value::Blob(blob)));
		let cursor = table().filter(&set);
		assert!(cursor.at_end());
		assert!(cursor.snapshot().is_none());
	}

	#[test]
	fn unresolvable_targets_yield_an_empty_cursor() {
		let cursor = table().filter(&constraints("nowhere", (1.0, 1.0), 5.0));
		assert!(cursor.at_end());
	}

	#[test]
	fn zero_matches_is_a_valid_snapshot() {
		// a valid request over a region with no features and no expansion
		let cursor = table().filter(&constraints("grid", (100.0, 100.0), 0.5));
		assert!(cursor.at_end());
		let snapshot = cursor.snapshot().unwrap();
		assert!(snapshot.entries().is_empty());
	}

	#[test]
	fn refiltering_does_not_disturb_an_open_cursor() {
		let table = table();
		let mut first = table.filter(&constraints("grid", (1.0, 1.0), 5.0));
		first.advance();
		let second = table.filter(&constraints("grid", (0.0, 0.0), 0.25));
		assert_eq!(second.snapshot().unwrap().entries().len(), 1);
		// the first cursor still reads its own snapshot
		assert_eq!(first.snapshot().unwrap().entries().len(), 3);
		assert!(!first.at_end());
	}

	#[test]
	fn writes_are_always_rejected() {
		let table = table();
		let err = table.insert(None, &[]).unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ReadOnly)));
		let err = table.update(1, &[]).unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ReadOnly)));
		let err = table.delete(1).unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ReadOnly)));
	}
}
