//! Local intensity estimation.
//!
//! A table lookup, not a physical attenuation model: the distance class picks
//! a step range and the magnitude picks which end of it applies. Large events
//! fall off more slowly.

use serde::{Deserialize, Serialize};

use crate::intensity::Intensity;
use crate::model::DistanceClass;

/// Step-down for one distance class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    /// Used when magnitude >= `large_event_magnitude`
    pub large_event: u8,
    /// Used otherwise
    pub smaller_event: u8,
}

impl StepRange {
    pub const fn new(large_event: u8, smaller_event: u8) -> Self {
        Self {
            large_event,
            smaller_event,
        }
    }
}

/// Attenuation knobs. Defaults reproduce the standard table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttenuationPolicy {
    #[serde(default = "default_large_event_magnitude")]
    pub large_event_magnitude: f64,

    /// Upper bound for FAR locations regardless of steps.
    #[serde(default = "default_far_ceiling")]
    pub far_ceiling: Intensity,

    #[serde(default = "default_near_50")]
    pub near_50: StepRange,

    #[serde(default = "default_near_100")]
    pub near_100: StepRange,

    #[serde(default = "default_near_200")]
    pub near_200: StepRange,
}

fn default_large_event_magnitude() -> f64 {
    8.0
}
fn default_near_50() -> StepRange {
    StepRange::new(1, 2)
}
fn default_near_100() -> StepRange {
    StepRange::new(2, 3)
}
fn default_near_200() -> StepRange {
    StepRange::new(3, 4)
}
fn default_far_ceiling() -> Intensity {
    Intensity::Three
}

impl Default for AttenuationPolicy {
    fn default() -> Self {
        Self {
            large_event_magnitude: default_large_event_magnitude(),
            near_50: default_near_50(),
            near_100: default_near_100(),
            near_200: default_near_200(),
            far_ceiling: default_far_ceiling(),
        }
    }
}

/// Derives the intensity expected at a location.
#[derive(Clone, Debug, Default)]
pub struct IntensityAttenuator {
    policy: AttenuationPolicy,
}

impl IntensityAttenuator {
    pub fn new(policy: AttenuationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AttenuationPolicy {
        &self.policy
    }

    /// Steps to subtract from the maximum intensity. FAR has no step; it is
    /// capped by `far_ceiling` instead.
    pub fn steps(&self, magnitude: f64, class: DistanceClass) -> u8 {
        let range = match class {
            DistanceClass::SameArea | DistanceClass::Far => return 0,
            DistanceClass::Near50 => self.policy.near_50,
            DistanceClass::Near100 => self.policy.near_100,
            DistanceClass::Near200 => self.policy.near_200,
        };
        if magnitude >= self.policy.large_event_magnitude {
            range.large_event
        } else {
            range.smaller_event
        }
    }

    /// `attenuate(max_intensity, magnitude, distance_class)`.
    ///
    /// Never exceeds `max_intensity` and never drops below zero.
    pub fn attenuate(
        &self,
        max_intensity: Intensity,
        magnitude: f64,
        class: DistanceClass,
    ) -> Intensity {
        match class {
            DistanceClass::Far => max_intensity.min(self.policy.far_ceiling),
            _ => max_intensity.step_down(self.steps(magnitude, class)),
        }
    }
}
