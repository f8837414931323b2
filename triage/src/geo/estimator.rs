//! Epicenter-to-location distance classification.

use std::sync::Arc;
use std::time::Duration;

use super::address::AddressParts;
use super::gazetteer::GeoPoint;
use super::resolver::{Located, LocationResolver, Precision};
use crate::error::LookupFailure;
use crate::model::DistanceClass;

/// The event epicenter, split and resolved once per run.
#[derive(Clone, Debug)]
pub struct Epicenter {
    parts: Option<AddressParts>,
    located: Result<Located, LookupFailure>,
}

impl Epicenter {
    pub fn point(&self) -> Option<GeoPoint> {
        self.located.as_ref().ok().map(|located| located.point)
    }
}

/// Outcome of one distance estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceEstimate {
    pub class: DistanceClass,
    /// Great-circle distance when both ends resolved.
    pub distance_km: Option<f64>,
    /// Set when the estimate degraded to FAR.
    pub issue: Option<LookupFailure>,
}

impl DistanceEstimate {
    fn same_area() -> Self {
        Self {
            class: DistanceClass::SameArea,
            distance_km: Some(0.0),
            issue: None,
        }
    }

    fn degraded(issue: LookupFailure) -> Self {
        Self {
            class: DistanceClass::Far,
            distance_km: None,
            issue: Some(issue),
        }
    }
}

/// Classifies how far a location is from the epicenter.
#[derive(Clone)]
pub struct GeoDistanceEstimator {
    resolver: Arc<dyn LocationResolver>,
    lookup_timeout: Duration,
}

impl GeoDistanceEstimator {
    pub fn new(resolver: Arc<dyn LocationResolver>, lookup_timeout: Duration) -> Self {
        Self {
            resolver,
            lookup_timeout,
        }
    }

    /// Split and resolve the epicenter. Never fails; an unresolvable
    /// epicenter turns every non-local estimate into FAR.
    pub async fn prepare_epicenter(&self, epicenter: &str) -> Epicenter {
        let parts = AddressParts::parse(epicenter);
        let located = match &parts {
            Some(parts) => self.locate(epicenter, parts).await,
            None => Err(LookupFailure::Unresolved {
                location: epicenter.to_string(),
            }),
        };
        if let Err(issue) = &located {
            tracing::warn!(epicenter, %issue, "Epicenter could not be resolved");
        }
        Epicenter { parts, located }
    }

    /// Classify `location` against an already prepared epicenter.
    pub async fn estimate_from(&self, epicenter: &Epicenter, location: &str) -> DistanceEstimate {
        let Some(parts) = AddressParts::parse(location) else {
            return DistanceEstimate::degraded(LookupFailure::Unresolved {
                location: location.to_string(),
            });
        };

        if epicenter
            .parts
            .as_ref()
            .is_some_and(|origin| origin.same_area(&parts))
        {
            return DistanceEstimate::same_area();
        }

        let origin = match &epicenter.located {
            Ok(located) => *located,
            Err(issue) => return DistanceEstimate::degraded(issue.clone()),
        };

        let target = match self.locate(location, &parts).await {
            Ok(located) => located,
            Err(issue) => return DistanceEstimate::degraded(issue),
        };

        // A prefecture centroid says nothing about distances inside that
        // prefecture.
        let coarse = origin.precision == Precision::Prefecture
            || target.precision == Precision::Prefecture;
        if coarse
            && epicenter
                .parts
                .as_ref()
                .is_some_and(|origin| origin.prefecture == parts.prefecture)
        {
            return DistanceEstimate::degraded(LookupFailure::Inconclusive {
                location: location.to_string(),
            });
        }

        let km = origin.point.distance_km(&target.point);
        DistanceEstimate {
            class: DistanceClass::from_km(km),
            distance_km: Some(km),
            issue: None,
        }
    }

    /// One-shot `estimate(epicenter, location)`.
    pub async fn estimate(&self, epicenter: &str, location: &str) -> DistanceEstimate {
        let prepared = self.prepare_epicenter(epicenter).await;
        self.estimate_from(&prepared, location).await
    }

    async fn locate(&self, raw: &str, parts: &AddressParts) -> Result<Located, LookupFailure> {
        match tokio::time::timeout(self.lookup_timeout, self.resolver.locate(parts)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(
                    resolver = self.resolver.name(),
                    location = raw,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Location lookup timed out"
                );
                Err(LookupFailure::Timeout {
                    location: raw.to_string(),
                    timeout_ms: self.lookup_timeout.as_millis() as u64,
                })
            }
        }
    }
}
