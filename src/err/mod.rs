use thiserror::Error;

/// An error raised by the KNN virtual table or one of its collaborators.
///
/// Resolution and validation failures are deliberately *not* surfaced through
/// this type at the table boundary: a malformed or unresolvable request
/// degrades to an empty result set so that speculative probing by the host
/// query planner stays side-effect free. Only caller misuse (writes) and
/// collaborator failures are reported as hard errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// No spatially indexed geometry attribute matched the requested target
	#[error("No usable spatial index was found for '{table}'")]
	TargetNotFound {
		table: String,
	},

	/// More than one indexed geometry attribute matched an unqualified request
	#[error("The spatial index lookup for '{table}' was ambiguous")]
	TargetAmbiguous {
		table: String,
	},

	/// The reference geometry blob could not be decoded
	#[error("The reference geometry could not be decoded: {0}")]
	InvalidGeometry(String),

	/// The reference geometry did not decode to exactly one point
	#[error("The reference geometry is not a single point")]
	NotSinglePoint,

	/// The underlying spatial index query could not be prepared or executed
	#[error("The spatial index query could not be executed: {0}")]
	IndexUnavailable(String),

	/// Any attempt to insert, update or delete through the data source
	#[error("The KNN virtual table is read-only")]
	ReadOnly,
}

impl Error {
	/// Whether this error is recovered into an empty result set at the
	/// virtual table boundary rather than propagated to the caller.
	pub(crate) fn degrades_to_empty(&self) -> bool {
		matches!(
			self,
			Self::TargetNotFound {
				..
			} | Self::TargetAmbiguous {
				..
			} | Self::InvalidGeometry(_)
				| Self::NotSinglePoint
		)
	}
}
