//! The deprecated first-generation KNN data source.
//!
//! The original module was abandoned in favour of the progressive engine,
//! but database files created by older versions still reference it, so a
//! skeletal registration has to keep existing. It accepts any filter, never
//! produces a row and rejects every write.

use anyhow::{Result, bail};

use crate::err::Error;
use crate::idx::RowId;
use crate::vtab::args::{Constraint, Value};

/// Column names declared by the legacy data source, preserved for file
/// compatibility.
pub const LEGACY_COLUMNS: [&str; 7] =
	["f_table_name", "f_geometry_column", "ref_geometry", "max_items", "pos", "fid", "distance"];

/// The legacy endpoint. Stateless: there is nothing to search.
#[derive(Default)]
pub struct LegacyKnnTable;

impl LegacyKnnTable {
	pub fn new() -> Self {
		Self
	}

	/// Accepts any constraint set and produces an empty cursor.
	pub fn filter(&self, _constraints: &[Constraint]) -> LegacyKnnCursor {
		LegacyKnnCursor
	}

	pub fn insert(&self, _rowid: Option<RowId>, _values: &[Value]) -> Result<()> {
		bail!(Error::ReadOnly)
	}

	pub fn update(&self, _rowid: RowId, _values: &[Value]) -> Result<()> {
		bail!(Error::ReadOnly)
	}

	pub fn delete(&self, _rowid: RowId) -> Result<()> {
		bail!(Error::ReadOnly)
	}
}

/// A cursor that is at its end from the moment it opens.
pub struct LegacyKnnCursor;

impl LegacyKnnCursor {
	pub fn advance(&mut self) {}

	pub fn at_end(&self) -> bool {
		true
	}

	/// Every column reads null.
	pub fn column(&self, _index: usize) -> Value {
		Value::Null
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vtab::args::Column;

	#[test]
	fn any_filter_is_empty() {
		let table = LegacyKnnTable::new();
		let mut cursor = table.filter(&[Constraint::new(
			Column::TableName,
			Value::Text("anything".to_string()),
		)]);
		assert!(cursor.at_end());
		assert_eq!(cursor.column(0), Value::Null);
		cursor.advance();
		assert!(cursor.at_end());
	}

	#[test]
	fn writes_are_rejected() {
		let table = LegacyKnnTable::new();
		for err in [
			table.insert(None, &[]).unwrap_err(),
			table.update(1, &[]).unwrap_err(),
			table.delete(1).unwrap_err(),
		] {
			assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ReadOnly)));
		}
	}
}
