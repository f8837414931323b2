use async_trait::async_trait;

use super::address::AddressParts;
use super::gazetteer::GeoPoint;
use crate::error::LookupFailure;

/// How finely a lookup matched the requested address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// The second-level unit itself was found.
    Municipality,
    /// Only the top-level unit was found; the point is its centroid.
    Prefecture,
}

/// A resolved point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    pub point: GeoPoint,
    pub precision: Precision,
}

impl Located {
    pub const fn new(point: GeoPoint, precision: Precision) -> Self {
        Self { point, precision }
    }
}

/// Turns administrative units into coordinates.
///
/// The built-in [`super::Gazetteer`] answers from memory; a geocoding
/// backend can be plugged in instead. Callers wrap every call in a timeout,
/// so implementations need not enforce one themselves.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn locate(&self, address: &AddressParts) -> Result<Located, LookupFailure>;

    /// Short name used in log fields.
    fn name(&self) -> &str {
        "resolver"
    }
}
