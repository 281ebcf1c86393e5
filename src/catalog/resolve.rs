//! Target resolution: mapping a logical collection name and an optional
//! attribute name to the concrete indexed geometry attribute a search runs
//! against.

use anyhow::{Result, bail};

use crate::catalog::{CatalogProvider, GeometryColumn, ResolvedTarget, names_match};
use crate::err::Error;

/// Resolves `(table, column)` within `db_prefix` to a concrete indexed
/// geometry attribute.
///
/// Resolution is a two-case lookup: a direct geometry-column registration
/// first, then exactly one level of spatial-view indirection onto a base
/// collection. When no attribute name is given, exactly one candidate must
/// match; zero candidates fail with [`Error::TargetNotFound`] and two or more
/// with [`Error::TargetAmbiguous`]. Neither is silently defaulted — the
/// caller degrades both to an empty result at the table boundary.
pub fn resolve_target(
	catalog: &dyn CatalogProvider,
	db_prefix: &str,
	table: &str,
	column: Option<&str>,
) -> Result<ResolvedTarget> {
	if let Some(direct) = match_columns(&catalog.geometry_columns(db_prefix, table)?, column, table)?
	{
		debug!(table = direct.table, column = direct.column, "resolved indexed geometry column");
		return Ok(ResolvedTarget {
			table: direct.table,
			column: direct.column,
			geographic: direct.geographic,
		});
	}
	resolve_view(catalog, db_prefix, table, column)
}

/// The single-indirection case: the request names a spatial view, whose base
/// collection carries the actual index. Views over views are not chased —
/// the base name must itself resolve as a plain geometry column.
fn resolve_view(
	catalog: &dyn CatalogProvider,
	db_prefix: &str,
	table: &str,
	column: Option<&str>,
) -> Result<ResolvedTarget> {
	let views: Vec<_> = catalog
		.spatial_views(db_prefix, table)?
		.into_iter()
		.filter(|v| v.enabled && column.is_none_or(|name| names_match(&v.view_column, name)))
		.collect();
	let view = match views.len() {
		0 => bail!(Error::TargetNotFound {
			table: table.to_string(),
		}),
		1 => &views[0],
		_ => bail!(Error::TargetAmbiguous {
			table: table.to_string(),
		}),
	};
	let base = match_columns(
		&catalog.geometry_columns(db_prefix, &view.base_table)?,
		Some(&view.base_column),
		table,
	)?;
	match base {
		Some(base) => {
			debug!(
				view = view.view,
				table = base.table,
				column = base.column,
				"resolved spatial view onto its base collection"
			);
			Ok(ResolvedTarget {
				table: base.table,
				column: base.column,
				geographic: base.geographic,
			})
		}
		None => bail!(Error::TargetNotFound {
			table: table.to_string(),
		}),
	}
}

/// Filters registrations down to usable candidates and enforces uniqueness.
/// `Ok(None)` means "no candidate" so the caller can try view indirection;
/// ambiguity is always terminal.
fn match_columns(
	registrations: &[GeometryColumn],
	column: Option<&str>,
	requested: &str,
) -> Result<Option<GeometryColumn>> {
	let mut hits = registrations
		.iter()
		.filter(|c| c.index_enabled && column.is_none_or(|name| names_match(&c.column, name)));
	match (hits.next(), hits.next()) {
		(Some(hit), None) => Ok(Some(hit.clone())),
		(None, _) => Ok(None),
		(Some(_), Some(_)) => bail!(Error::TargetAmbiguous {
			table: requested.to_string(),
		}),
	}
}
