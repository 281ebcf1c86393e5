//! Positional iteration over a search snapshot.

use std::sync::Arc;

use crate::vtab::KnnSnapshot;
use crate::vtab::args::{Column, Value};

/// A cursor over the ranked result of one filter call.
///
/// The cursor owns its snapshot; endpoint-level columns (the resolved names,
/// the reference geometry, the result cap and the expansion flag) stay
/// readable even once the cursor has moved past the last entry, as long as
/// the filter produced a valid snapshot at all. Per-entry columns answer
/// null past the end.
pub struct KnnCursor {
	snapshot: Option<Arc<KnnSnapshot>>,
	pos: usize,
}

impl KnnCursor {
	/// A cursor for a request that could not be satisfied: no snapshot, no
	/// rows, every column null.
	pub(crate) fn unsatisfiable() -> Self {
		Self {
			snapshot: None,
			pos: 0,
		}
	}

	/// Binds a freshly produced snapshot at position zero.
	pub(crate) fn open(snapshot: Arc<KnnSnapshot>) -> Self {
		Self {
			snapshot: Some(snapshot),
			pos: 0,
		}
	}

	/// The snapshot this cursor reads, when the filter was satisfiable.
	pub fn snapshot(&self) -> Option<&Arc<KnnSnapshot>> {
		self.snapshot.as_ref()
	}

	/// Moves back to the first entry.
	pub fn rewind(&mut self) {
		self.pos = 0;
	}

	/// Moves to the next entry.
	pub fn advance(&mut self) {
		self.pos += 1;
	}

	/// Whether the cursor has moved past the last entry.
	pub fn at_end(&self) -> bool {
		match &self.snapshot {
			Some(snapshot) => self.pos >= snapshot.entries.len(),
			None => true,
		}
	}

	/// The row identifier of the current entry.
	pub fn rowid(&self) -> Option<i64> {
		let snapshot = self.snapshot.as_ref()?;
		snapshot.entries.get(self.pos).map(|e| e.rowid)
	}

	/// The value of `column` at the current position.
	pub fn column(&self, column: Column) -> Value {
		let Some(snapshot) = &self.snapshot else {
			return Value::Null;
		};
		let entry = snapshot.entries.get(self.pos);
		match column {
			Column::DbPrefix => Value::Text(snapshot.db_prefix.clone()),
			Column::TableName => Value::Text(snapshot.table.clone()),
			Column::GeometryColumn => Value::Text(snapshot.column.clone()),
			Column::RefGeometry => Value::Blob(snapshot.ref_geometry.clone()),
			Column::MaxItems => Value::Int(snapshot.max_items as i64),
			Column::Expand => Value::Int(i64::from(snapshot.expand)),
			Column::Pos => Value::Int(self.pos as i64 + 1),
			Column::Radius => entry.map_or(Value::Null, |e| Value::Float(e.radius)),
			Column::Fid => entry.map_or(Value::Null, |e| Value::Int(e.rowid)),
			Column::DistanceCrs => entry.map_or(Value::Null, |e| Value::Float(e.dist_crs)),
			Column::DistanceM => entry.map_or(Value::Null, |e| Value::Float(e.dist_m)),
		}
	}
}
