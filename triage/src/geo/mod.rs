//! Address-to-distance estimation.
//!
//! Same-area matching is purely textual; everything else goes through a
//! pluggable [`LocationResolver`] and is bucketed by great-circle distance.
//! Failed or slow lookups degrade to [`crate::model::DistanceClass::Far`].

pub mod address;
pub mod estimator;
pub mod gazetteer;
pub mod resolver;

pub use address::AddressParts;
pub use estimator::{DistanceEstimate, Epicenter, GeoDistanceEstimator};
pub use gazetteer::{Gazetteer, GazetteerEntry, GeoPoint};
pub use resolver::{Located, LocationResolver, Precision};
