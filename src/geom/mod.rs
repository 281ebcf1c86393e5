//! Geometry primitives for the KNN engine: the binary point codec, the
//! search-frame construction and the distance computations.
//!
//! Reference geometries arrive as WKB blobs and must decode to exactly one
//! point; anything else makes the request unsatisfiable. Candidate features
//! can be any geometry kind, so distance dispatch covers the full set.

use geo::algorithm::closest_point::ClosestPoint;
use geo::algorithm::euclidean_distance::EuclideanDistance;
use geo::algorithm::geodesic_distance::GeodesicDistance;
use geo::Closest;
use geo_types::{Coord, Geometry, Point, Rect};

use crate::err::Error;

const WKB_POINT: u32 = 1;
const WKB_MULTI_POINT: u32 = 4;
const WKB_COLLECTION: u32 = 7;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Decodes a WKB blob that must describe exactly one point.
///
/// Both byte orders and the Z/M/ZM variants (ISO type offsets and EWKB type
/// flags) are accepted; the extra ordinates are read and discarded. A
/// multi-point or collection wrapping a single point is accepted too, since
/// the source systems register reference geometries that way. Every other
/// shape fails with [`Error::NotSinglePoint`].
pub fn decode_point(blob: &[u8]) -> Result<Point<f64>, Error> {
	let mut reader = WkbReader::new(blob);
	let point = read_single_point(&mut reader, 0)?;
	if !reader.at_end() {
		return Err(Error::InvalidGeometry("trailing bytes after the geometry".to_string()));
	}
	Ok(point)
}

/// Encodes a point as little-endian 2D WKB.
pub fn encode_point(point: &Point<f64>) -> Vec<u8> {
	let mut blob = Vec::with_capacity(21);
	blob.push(1u8);
	blob.extend_from_slice(&WKB_POINT.to_le_bytes());
	blob.extend_from_slice(&point.x().to_le_bytes());
	blob.extend_from_slice(&point.y().to_le_bytes());
	blob
}

/// The minimal axis-aligned rectangle enclosing a circle of the given centre
/// and radius, used as the spatial index query frame.
pub fn search_frame(center: &Point<f64>, radius: f64) -> Rect<f64> {
	Rect::new(
		Coord {
			x: center.x() - radius,
			y: center.y() - radius,
		},
		Coord {
			x: center.x() + radius,
			y: center.y() + radius,
		},
	)
}

/// Computes both distances from the reference point to a candidate feature:
/// the reference-system-unit distance and the meter distance.
///
/// For planar systems the two are the same Euclidean value. For geographic
/// systems the unit distance stays planar (angular units) while the meter
/// distance is geodesic over the ellipsoid; the two are not interchangeable
/// and both are reported to the caller.
pub fn distances(from: &Point<f64>, to: &Geometry<f64>, geographic: bool) -> (f64, f64) {
	let dist_crs = planar_distance(from, to);
	let dist_m = if geographic {
		geodesic_distance(from, to)
	} else {
		dist_crs
	};
	(dist_crs, dist_m)
}

fn planar_distance(from: &Point<f64>, to: &Geometry<f64>) -> f64 {
	match to {
		Geometry::Point(g) => from.euclidean_distance(g),
		Geometry::Line(g) => from.euclidean_distance(g),
		Geometry::LineString(g) => from.euclidean_distance(g),
		Geometry::Polygon(g) => from.euclidean_distance(g),
		Geometry::Rect(g) => from.euclidean_distance(&g.to_polygon()),
		Geometry::Triangle(g) => from.euclidean_distance(&g.to_polygon()),
		Geometry::MultiPoint(g) => {
			g.iter().map(|p| from.euclidean_distance(p)).fold(f64::INFINITY, f64::min)
		}
		Geometry::MultiLineString(g) => {
			g.iter().map(|l| from.euclidean_distance(l)).fold(f64::INFINITY, f64::min)
		}
		Geometry::MultiPolygon(g) => {
			g.iter().map(|p| from.euclidean_distance(p)).fold(f64::INFINITY, f64::min)
		}
		Geometry::GeometryCollection(g) => {
			g.iter().map(|m| planar_distance(from, m)).fold(f64::INFINITY, f64::min)
		}
	}
}

fn geodesic_distance(from: &Point<f64>, to: &Geometry<f64>) -> f64 {
	match to {
		Geometry::Point(g) => from.geodesic_distance(g),
		other => match closest_point_on(from, other) {
			Some(p) => from.geodesic_distance(&p),
			None => f64::INFINITY,
		},
	}
}

// Closest point by the planar metric, then measured geodesically. Exact for
// points; for extended geometries in angular units this is the same
// approximation the source systems apply.
fn closest_point_on(from: &Point<f64>, to: &Geometry<f64>) -> Option<Point<f64>> {
	let closest = match to {
		Geometry::Point(g) => g.closest_point(from),
		Geometry::Line(g) => g.closest_point(from),
		Geometry::LineString(g) => g.closest_point(from),
		Geometry::Polygon(g) => g.closest_point(from),
		Geometry::Rect(g) => g.to_polygon().closest_point(from),
		Geometry::Triangle(g) => g.to_polygon().closest_point(from),
		Geometry::MultiPoint(g) => g.closest_point(from),
		Geometry::MultiLineString(g) => g.closest_point(from),
		Geometry::MultiPolygon(g) => g.closest_point(from),
		Geometry::GeometryCollection(g) => {
			return g
				.iter()
				.filter_map(|m| closest_point_on(from, m))
				.min_by(|a, b| {
					from.euclidean_distance(a).total_cmp(&from.euclidean_distance(b))
				});
		}
	};
	match closest {
		Closest::SinglePoint(p) | Closest::Intersection(p) => Some(p),
		Closest::Indeterminate => None,
	}
}

fn read_single_point(reader: &mut WkbReader, depth: usize) -> Result<Point<f64>, Error> {
	// one wrapping level at most: MULTIPOINT(p) or GEOMETRYCOLLECTION(p)
	if depth > 1 {
		return Err(Error::NotSinglePoint);
	}
	let le = match reader.byte()? {
		0 => false,
		1 => true,
		other => {
			return Err(Error::InvalidGeometry(format!("invalid byte order marker {other}")));
		}
	};
	let mut type_code = reader.u32(le)?;
	let ewkb_z = type_code & EWKB_Z != 0;
	let ewkb_m = type_code & EWKB_M != 0;
	if type_code & EWKB_SRID != 0 {
		reader.u32(le)?;
	}
	type_code &= 0x0fff_ffff;
	let (base, iso_z, iso_m) = match type_code / 1000 {
		0 => (type_code, false, false),
		1 => (type_code - 1000, true, false),
		2 => (type_code - 2000, false, true),
		3 => (type_code - 3000, true, true),
		_ => {
			return Err(Error::InvalidGeometry(format!("unsupported geometry type {type_code}")));
		}
	};
	match base {
		WKB_POINT => {
			let x = reader.f64(le)?;
			let y = reader.f64(le)?;
			let extra = usize::from(ewkb_z || iso_z) + usize::from(ewkb_m || iso_m);
			for _ in 0..extra {
				reader.f64(le)?;
			}
			Ok(Point::new(x, y))
		}
		WKB_MULTI_POINT | WKB_COLLECTION => {
			if reader.u32(le)? != 1 {
				return Err(Error::NotSinglePoint);
			}
			read_single_point(reader, depth + 1)
		}
		2..=6 => Err(Error::NotSinglePoint),
		other => Err(Error::InvalidGeometry(format!("unsupported geometry type {other}"))),
	}
}

struct WkbReader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> WkbReader<'a> {
	fn new(buf: &'a [u8]) -> Self {
		Self {
			buf,
			pos: 0,
		}
	}

	fn at_end(&self) -> bool {
		self.pos >= self.buf.len()
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
		let end = self.pos + len;
		if end > self.buf.len() {
			return Err(Error::InvalidGeometry("truncated geometry blob".to_string()));
		}
		let bytes = &self.buf[self.pos..end];
		self.pos = end;
		Ok(bytes)
	}

	fn byte(&mut self) -> Result<u8, Error> {
		Ok(self.take(1)?[0])
	}

	fn u32(&mut self, le: bool) -> Result<u32, Error> {
		let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
		Ok(if le {
			u32::from_le_bytes(bytes)
		} else {
			u32::from_be_bytes(bytes)
		})
	}

	fn f64(&mut self, le: bool) -> Result<f64, Error> {
		let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
		Ok(if le {
			f64::from_le_bytes(bytes)
		} else {
			f64::from_be_bytes(bytes)
		})
	}
}
