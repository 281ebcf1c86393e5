//! The constraint-pushdown boundary: loosely typed values offered by the
//! host engine, and the fallible parse that turns them into a typed
//! parameter set before any index access.

/// Largest admissible result cap.
pub const MAX_ITEMS_CAP: usize = 1024;

/// Result cap applied when the request does not name one.
pub const DEFAULT_MAX_ITEMS: usize = 3;

/// A value arriving through the host engine's generic constraint protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Int(i64),
	Float(f64),
	Text(String),
	Blob(Vec<u8>),
}

/// Columns exposed by the KNN virtual table, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
	/// Schema prefix the request is scoped to
	DbPrefix,
	/// Logical collection name
	TableName,
	/// Geometry attribute name
	GeometryColumn,
	/// Reference geometry blob
	RefGeometry,
	/// Per-entry search radius
	Radius,
	/// Result cap K
	MaxItems,
	/// Whether radius expansion is permitted
	Expand,
	/// 1-based ordinal position
	Pos,
	/// Row identifier of the ranked feature
	Fid,
	/// Distance in reference-system units
	DistanceCrs,
	/// Distance in meters
	DistanceM,
}

impl Column {
	pub const ALL: [Column; 11] = [
		Column::DbPrefix,
		Column::TableName,
		Column::GeometryColumn,
		Column::RefGeometry,
		Column::Radius,
		Column::MaxItems,
		Column::Expand,
		Column::Pos,
		Column::Fid,
		Column::DistanceCrs,
		Column::DistanceM,
	];

	pub fn name(&self) -> &'static str {
		match self {
			Column::DbPrefix => "db_prefix",
			Column::TableName => "f_table_name",
			Column::GeometryColumn => "f_geometry_column",
			Column::RefGeometry => "ref_geometry",
			Column::Radius => "radius",
			Column::MaxItems => "max_items",
			Column::Expand => "expand",
			Column::Pos => "pos",
			Column::Fid => "fid",
			Column::DistanceCrs => "distance_crs",
			Column::DistanceM => "distance_m",
		}
	}
}

/// One equality constraint pushed down by the host engine at filter time.
#[derive(Clone, Debug)]
pub struct Constraint {
	pub column: Column,
	pub value: Value,
}

impl Constraint {
	pub fn new(column: Column, value: Value) -> Self {
		Self {
			column,
			value,
		}
	}
}

/// Typed, validated KNN request parameters.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct KnnParams {
	pub db_prefix: Option<String>,
	pub table: String,
	pub column: Option<String>,
	pub geometry: Vec<u8>,
	pub radius: f64,
	pub max_items: usize,
	pub expand: bool,
}

impl KnnParams {
	/// Extracts typed parameters from the raw constraint set, or `None` when
	/// the set cannot describe a satisfiable request.
	///
	/// `None` is a policy outcome, not an error: malformed requests degrade
	/// to an empty result so that speculative probing by the host planner
	/// never aborts the enclosing query. A parameter supplied twice, a
	/// missing required parameter, or a value of the wrong type all land
	/// here. Constraints on the output columns are left for the host to
	/// apply and ignored.
	pub(crate) fn from_constraints(constraints: &[Constraint]) -> Option<KnnParams> {
		let mut db_prefix: Option<Option<String>> = None;
		let mut table: Option<String> = None;
		let mut column: Option<Option<String>> = None;
		let mut geometry: Option<Vec<u8>> = None;
		let mut radius: Option<f64> = None;
		let mut max_items: Option<usize> = None;
		let mut expand: Option<bool> = None;
		for constraint in constraints {
			let duplicate = match (&constraint.column, &constraint.value) {
				(Column::DbPrefix, Value::Null) => db_prefix.replace(None).is_some(),
				(Column::DbPrefix, Value::Text(v)) => db_prefix.replace(Some(v.clone())).is_some(),
				(Column::TableName, Value::Text(v)) => table.replace(v.clone()).is_some(),
				(Column::GeometryColumn, Value::Null) => column.replace(None).is_some(),
				(Column::GeometryColumn, Value::Text(v)) => {
					column.replace(Some(v.clone())).is_some()
				}
				(Column::RefGeometry, Value::Blob(v)) => geometry.replace(v.clone()).is_some(),
				(Column::Radius, Value::Float(v)) if *v > 0.0 => radius.replace(*v).is_some(),
				(Column::Radius, Value::Int(v)) if *v > 0 => {
					radius.replace(*v as f64).is_some()
				}
				(Column::MaxItems, Value::Int(v)) => {
					max_items.replace((*v).clamp(1, MAX_ITEMS_CAP as i64) as usize).is_some()
				}
				(Column::Expand, Value::Int(v)) => expand.replace(*v != 0).is_some(),
				(
					Column::Pos | Column::Fid | Column::DistanceCrs | Column::DistanceM,
					_,
				) => false,
				(other, value) => {
					trace!(column = other.name(), ?value, "constraint value has the wrong type");
					return None;
				}
			};
			if duplicate {
				trace!(column = constraint.column.name(), "duplicate constraint");
				return None;
			}
		}
		let (Some(table), Some(geometry), Some(radius)) = (table, geometry, radius) else {
			trace!("a required parameter is missing");
			return None;
		};
		Some(KnnParams {
			db_prefix: db_prefix.flatten(),
			table,
			column: column.flatten(),
			geometry,
			radius,
			max_items: max_items.unwrap_or(DEFAULT_MAX_ITEMS),
			expand: expand.unwrap_or(false),
		})
	}
}
