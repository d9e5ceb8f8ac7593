//! zone-assigner core
//!
//! Places synthetic activity chains in space: each trip gets a destination
//! zone consistent with its reported travel time and mode, work trips are
//! reconciled against observed origin-destination flows, and every trip is
//! finally pinned to a facility inside its zone.

pub mod config;
pub mod error;
pub mod estimate;
pub mod facility;
pub mod feasible;
pub mod geometry;
pub mod io;
pub mod model;
pub mod osrm;
pub mod pipeline;
pub mod sampling;
pub mod select;
pub mod supply;
pub mod traits;
pub mod travel_time;
pub mod work;

pub use error::{Error, Result};
