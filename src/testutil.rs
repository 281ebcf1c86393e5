//! In-memory stand-ins for the external collaborators, shared by the unit
//! tests across modules.

use std::cell::Cell;
use std::collections::HashSet;

use anyhow::{Result, bail};
use geo::algorithm::bounding_rect::BoundingRect;
use geo_types::{Geometry, Point, Rect};

use crate::catalog::{CatalogProvider, GeometryColumn, ResolvedTarget, SpatialView, names_match};
use crate::err::Error;
use crate::geom;
use crate::idx::{RowId, SpatialIndex};

#[derive(Default)]
pub(crate) struct MemCatalog {
	columns: Vec<(String, GeometryColumn)>,
	views: Vec<(String, SpatialView)>,
}

impl MemCatalog {
	pub(crate) fn add_column(
		&mut self,
		db_prefix: &str,
		table: &str,
		column: &str,
		srid: i32,
		geographic: bool,
		index_enabled: bool,
	) {
		self.columns.push((db_prefix.to_string(), GeometryColumn {
			table: table.to_string(),
			column: column.to_string(),
			srid,
			geographic,
			index_enabled,
		}));
	}

	#[allow(clippy::too_many_arguments)]
	pub(crate) fn add_view(
		&mut self,
		db_prefix: &str,
		view: &str,
		view_column: &str,
		rowid_column: &str,
		base_table: &str,
		base_column: &str,
		enabled: bool,
	) {
		self.views.push((db_prefix.to_string(), SpatialView {
			view: view.to_string(),
			view_column: view_column.to_string(),
			rowid_column: rowid_column.to_string(),
			base_table: base_table.to_string(),
			base_column: base_column.to_string(),
			enabled,
		}));
	}
}

impl CatalogProvider for MemCatalog {
	fn geometry_columns(&self, db_prefix: &str, table: &str) -> Result<Vec<GeometryColumn>> {
		Ok(self
			.columns
			.iter()
			.filter(|(prefix, c)| names_match(prefix, db_prefix) && names_match(&c.table, table))
			.map(|(_, c)| c.clone())
			.collect())
	}

	fn spatial_views(&self, db_prefix: &str, view: &str) -> Result<Vec<SpatialView>> {
		Ok(self
			.views
			.iter()
			.filter(|(prefix, v)| names_match(prefix, db_prefix) && names_match(&v.view, view))
			.map(|(_, v)| v.clone())
			.collect())
	}
}

/// Brute-force spatial index over in-memory geometries. Candidates are
/// returned ordered by planar distance from the frame centre and capped at
/// the requested limit, like a host engine with order-by-distance pushdown.
#[derive(Default)]
pub(crate) struct MemIndex {
	rows: Vec<(RowId, Geometry<f64>)>,
	hidden: HashSet<RowId>,
	queries: Cell<usize>,
}

impl MemIndex {
	pub(crate) fn add(&mut self, rowid: RowId, geometry: Geometry<f64>) {
		self.rows.push((rowid, geometry));
	}

	/// Keeps the row visible to index probes but makes its geometry fetch
	/// come back empty, like a row deleted between probe and fetch.
	pub(crate) fn hide(&mut self, rowid: RowId) {
		self.hidden.insert(rowid);
	}

	pub(crate) fn queries(&self) -> usize {
		self.queries.get()
	}
}

impl SpatialIndex for MemIndex {
	fn query_intersecting(
		&self,
		_target: &ResolvedTarget,
		frame: &Rect<f64>,
		limit: usize,
	) -> Result<Vec<RowId>> {
		self.queries.set(self.queries.get() + 1);
		let center = Point::from(frame.center());
		let mut hits: Vec<(f64, RowId)> = self
			.rows
			.iter()
			.filter_map(|(rowid, geometry)| {
				let bbox = geometry.bounding_rect()?;
				overlaps(frame, &bbox)
					.then(|| (geom::distances(&center, geometry, false).0, *rowid))
			})
			.collect();
		hits.sort_by(|a, b| a.0.total_cmp(&b.0));
		Ok(hits.into_iter().take(limit).map(|(_, rowid)| rowid).collect())
	}

	fn geometry(&self, _target: &ResolvedTarget, rowid: RowId) -> Result<Option<Geometry<f64>>> {
		if self.hidden.contains(&rowid) {
			return Ok(None);
		}
		Ok(self.rows.iter().find(|(id, _)| *id == rowid).map(|(_, g)| g.clone()))
	}
}

fn overlaps(a: &Rect<f64>, b: &Rect<f64>) -> bool {
	a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Index wrapper that fails the nth frame query.
pub(crate) struct FlakyIndex {
	inner: MemIndex,
	fail_on: usize,
	calls: Cell<usize>,
}

impl FlakyIndex {
	pub(crate) fn new(inner: MemIndex, fail_on: usize) -> Self {
		Self {
			inner,
			fail_on,
			calls: Cell::new(0),
		}
	}
}

impl SpatialIndex for FlakyIndex {
	fn query_intersecting(
		&self,
		target: &ResolvedTarget,
		frame: &Rect<f64>,
		limit: usize,
	) -> Result<Vec<RowId>> {
		self.calls.set(self.calls.get() + 1);
		if self.calls.get() == self.fail_on {
			bail!(Error::IndexUnavailable("simulated storage failure".to_string()));
		}
		self.inner.query_intersecting(target, frame, limit)
	}

	fn geometry(&self, target: &ResolvedTarget, rowid: RowId) -> Result<Option<Geometry<f64>>> {
		self.inner.geometry(target, rowid)
	}
}

/// A 3x3 grid of points at unit spacing, centred on (1,1); rowids 0..=8 in
/// row-major order, so the centre point is rowid 4.
pub(crate) fn grid_index() -> MemIndex {
	let mut index = MemIndex::default();
	for i in 0..9i64 {
		index.add(i, Point::new((i % 3) as f64, (i / 3) as f64).into());
	}
	index
}

pub(crate) fn planar_target() -> ResolvedTarget {
	ResolvedTarget {
		table: "grid".to_string(),
		column: "geom".to_string(),
		geographic: false,
	}
}
