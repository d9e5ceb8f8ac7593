//! Seams to external collaborators.
//!
//! Route computation is not done here. Whatever computes zone-to-zone travel
//! times (a routing server, or the distance-based estimate) sits behind
//! [`TravelTimeMatrixProvider`].

use crate::error::Result;
use crate::geometry::ZoneCentroid;
use crate::travel_time::{TravelTimeEdge, TravelTimeKey};

/// Provides zone-to-zone travel times for one mode (and period).
///
/// Edges are returned for ordered pairs of the given zones. Pairs the
/// provider cannot route are left out, so the result may be sparse.
pub trait TravelTimeMatrixProvider {
    fn travel_times(&self, zones: &[ZoneCentroid], key: &TravelTimeKey) -> Result<Vec<TravelTimeEdge>>;
}
