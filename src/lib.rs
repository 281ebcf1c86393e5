//! # spatial-knn
//!
//! Approximate-then-exact K-nearest-neighbour search over an externally
//! maintained R*Tree-style spatial index, exposed as a read-only, table-like
//! data source.
//!
//! The caller supplies a reference point and a desired result count; the
//! engine drives repeated bounded-box queries against the spatial index with
//! a geometrically growing search frame, computes true distances (planar or
//! geodesic depending on the reference system of the resolved target), and
//! stops once enough features have been ranked or a safety bound is hit. The
//! caller never needs to guess how large a search radius captures K features.
//!
//! The spatial index itself, the geometry storage and the hosting query
//! engine are external collaborators reached through the [`idx::SpatialIndex`]
//! and [`catalog::CatalogProvider`] traits.

#[macro_use]
extern crate tracing;

pub mod catalog;
pub mod err;
pub mod geom;
pub mod idx;
#[cfg(test)]
mod testutil;
pub mod vtab;

pub use err::Error;
