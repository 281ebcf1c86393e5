//! The progressive radius-expanding nearest-neighbour engine.
//!
//! The caller asks for the K nearest features without knowing how large a
//! search radius captures them. The engine runs bounded-box probes against
//! the spatial index with a geometrically growing frame: every round queries
//! the minimal rectangle enclosing the current search circle, ranks the
//! candidates by true distance, and either returns a full buffer or doubles
//! the radius and starts over. Doubling keeps the number of rounds
//! logarithmic in the true nearest-K radius; a hard cap bounds the cost on
//! pathologically sparse data.

use geo_types::Point;

use crate::catalog::ResolvedTarget;
use crate::geom;
use crate::idx::{RowId, SpatialIndex};

/// Radius doublings attempted before giving up. After this many the frame
/// has grown ~65536x, which is treated as a hard give-up, not an error.
pub const MAX_ROUNDS: u32 = 16;

/// One ranked candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct KnnEntry {
	/// Row identifier within the resolved collection
	pub rowid: RowId,
	/// Search radius in effect during the round that produced this entry.
	/// When expansion ran, this is the round radius, not the smallest radius
	/// at which the row could have been found.
	pub radius: f64,
	/// Distance in reference-system units
	pub dist_crs: f64,
	/// Distance in meters; equal to `dist_crs` for planar systems
	pub dist_m: f64,
}

/// Runs the search and returns at most `max_items` entries ordered ascending
/// by meter distance.
///
/// Finding fewer than `max_items` features is not an error: the result is
/// partial when expansion is disabled or the round cap is hit, and empty when
/// nothing intersects any frame. An index failure aborts the search and
/// returns whatever the current round had collected.
pub(crate) fn search(
	index: &dyn SpatialIndex,
	target: &ResolvedTarget,
	point: Point<f64>,
	initial_radius: f64,
	max_items: usize,
	expand: bool,
) -> Vec<KnnEntry> {
	let mut buffer: Vec<KnnEntry> = Vec::with_capacity(max_items);
	let mut radius = initial_radius;
	'rounds: for round in 0..=MAX_ROUNDS {
		let frame = geom::search_frame(&point, radius);
		// rows can vanish between the index probe and the geometry fetch; a
		// deeper re-probe keeps them from consuming result slots
		let mut limit = max_items;
		loop {
			let rows = match index.query_intersecting(target, &frame, limit) {
				Ok(rows) => rows,
				Err(error) => {
					warn!(%error, round, radius, "spatial index query failed, aborting the search");
					break 'rounds;
				}
			};
			debug!(round, radius, candidates = rows.len(), "search frame probed");
			let exhausted = rows.len() < limit;
			buffer.clear();
			let mut vanished = 0usize;
			for rowid in rows {
				let geometry = match index.geometry(target, rowid) {
					Ok(Some(geometry)) => geometry,
					Ok(None) => {
						vanished += 1;
						continue;
					}
					Err(error) => {
						warn!(%error, rowid, "geometry fetch failed, aborting the search");
						break 'rounds;
					}
				};
				let (dist_crs, dist_m) = geom::distances(&point, &geometry, target.geographic);
				buffer.push(KnnEntry {
					rowid,
					radius,
					dist_crs,
					dist_m,
				});
				if buffer.len() >= max_items {
					break;
				}
			}
			if buffer.len() >= max_items || vanished == 0 || exhausted {
				break;
			}
			// the capped probe spent slots on vanished rows while the frame
			// still holds unseen candidates; probe again, deeper
			limit = max_items + vanished;
		}
		if buffer.len() >= max_items || !expand {
			break;
		}
		if round == MAX_ROUNDS {
			warn!(radius, found = buffer.len(), "radius expansion exhausted, returning a partial result");
			break;
		}
		// a larger frame yields a strict superset of these candidates, so
		// the partial buffer is rebuilt, not merged
		buffer.clear();
		radius *= 2.0;
	}
	// candidates arrive best-effort pre-ordered; make the order exact, on
	// the abort paths too
	buffer.sort_by(|a, b| a.dist_m.total_cmp(&b.dist_m));
	buffer
}
