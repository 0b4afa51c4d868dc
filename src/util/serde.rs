//! Serializable identifiers, quantities and task descriptors shared across modules.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique task identifier.
pub type TaskId = u64;

/// Task priority. Higher values are more urgent.
pub type Priority = i32;

/// Number of milli-units in one whole resource unit.
pub const MILLIS_PER_UNIT: u64 = 1000;

/// Largest whole-unit amount a [`Quantity`] can hold.
pub const MAX_UNITS: u64 = u64::MAX / MILLIS_PER_UNIT;

/// One of the three depletable ship resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Electrical energy.
    Energy,
    /// Propellant.
    Fuel,
    /// Breathable oxygen.
    Oxygen,
}

impl ResourceKind {
    /// All resources in admission-check order.
    pub const ALL: [Self; 3] = [Self::Energy, Self::Fuel, Self::Oxygen];

    /// Lowercase name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Fuel => "fuel",
            Self::Oxygen => "oxygen",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-point resource amount with a resolution of one milli-unit.
///
/// Serialized as a floating point number of whole units so configuration
/// files can say `"energy": 12.5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(u64);

impl Quantity {
    /// The empty amount.
    pub const ZERO: Self = Self(0);

    /// Build from whole units, saturating above [`MAX_UNITS`].
    #[must_use]
    pub const fn units(units: u64) -> Self {
        Self(units.saturating_mul(MILLIS_PER_UNIT))
    }

    /// Build from raw milli-units.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Raw milli-units.
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Value in whole units as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MILLIS_PER_UNIT as f64
    }

    /// Subtract, returning `None` if the result would be negative.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Share of `self` consumed on tick `tick` (1-based) of `duration`.
    ///
    /// Shares are computed as the difference of cumulative floors, so the
    /// shares of all ticks add up to exactly `self`.
    #[must_use]
    pub fn tick_share(self, tick: u32, duration: u32) -> Self {
        debug_assert!(tick >= 1 && tick <= duration);
        let total = u128::from(self.0);
        let d = u128::from(duration);
        let upto = total * u128::from(tick) / d;
        let before = total * u128::from(tick - 1) / d;
        // upto - before <= total, which came from a u64
        Self(u64::try_from(upto - before).unwrap_or(u64::MAX))
    }
}

/// A unit amount that cannot be represented as a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid quantity {0}: must be finite, non-negative and at most {max} units", max = MAX_UNITS)]
pub struct InvalidQuantity(pub f64);

impl TryFrom<f64> for Quantity {
    type Error = InvalidQuantity;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn try_from(units: f64) -> Result<Self, Self::Error> {
        if !units.is_finite() || units < 0.0 {
            return Err(InvalidQuantity(units));
        }
        let millis = (units * MILLIS_PER_UNIT as f64).round();
        if millis >= u64::MAX as f64 {
            return Err(InvalidQuantity(units));
        }
        Ok(Self(millis as u64))
    }
}

impl From<Quantity> for f64 {
    fn from(q: Quantity) -> Self {
        q.as_f64()
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MILLIS_PER_UNIT;
        let frac = self.0 % MILLIS_PER_UNIT;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let s = format!("{frac:03}");
            write!(f, "{whole}.{}", s.trim_end_matches('0'))
        }
    }
}

/// One amount per resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Energy amount.
    pub energy: Quantity,
    /// Fuel amount.
    pub fuel: Quantity,
    /// Oxygen amount.
    pub oxygen: Quantity,
}

impl Resources {
    /// Build from whole units.
    #[must_use]
    pub const fn units(energy: u64, fuel: u64, oxygen: u64) -> Self {
        Self {
            energy: Quantity::units(energy),
            fuel: Quantity::units(fuel),
            oxygen: Quantity::units(oxygen),
        }
    }

    /// Amount for a single resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Quantity {
        match kind {
            ResourceKind::Energy => self.energy,
            ResourceKind::Fuel => self.fuel,
            ResourceKind::Oxygen => self.oxygen,
        }
    }

    /// Mutable amount for a single resource.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Quantity {
        match kind {
            ResourceKind::Energy => &mut self.energy,
            ResourceKind::Fuel => &mut self.fuel,
            ResourceKind::Oxygen => &mut self.oxygen,
        }
    }

    /// Per-resource share for one tick, see [`Quantity::tick_share`].
    #[must_use]
    pub fn tick_share(&self, tick: u32, duration: u32) -> Self {
        Self {
            energy: self.energy.tick_share(tick, duration),
            fuel: self.fuel.tick_share(tick, duration),
            oxygen: self.oxygen.tick_share(tick, duration),
        }
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "energy={} fuel={} oxygen={}", self.energy, self.fuel, self.oxygen)
    }
}

/// Descriptive task category. Does not influence scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Communication with Earth.
    Communication,
    /// Navigation.
    Navigation,
    /// Sample collection.
    SampleCollection,
    /// Scientific analysis.
    ScientificAnalysis,
    /// Life research.
    LifeResearch,
    /// Trajectory adjustments.
    TrajectoryAdjustment,
}

impl TaskKind {
    /// Every kind, used by the synthetic generator.
    pub const ALL: [Self; 6] = [
        Self::Communication,
        Self::Navigation,
        Self::SampleCollection,
        Self::ScientificAnalysis,
        Self::LifeResearch,
        Self::TrajectoryAdjustment,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Communication => "Communication with Earth",
            Self::Navigation => "Navigation",
            Self::SampleCollection => "Sample Collection",
            Self::ScientificAnalysis => "Scientific Analysis",
            Self::LifeResearch => "Life Research",
            Self::TrajectoryAdjustment => "Trajectory Adjustments",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
