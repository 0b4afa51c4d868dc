//! Depletable resource pool with atomic check-and-consume.
//!
//! The pool tracks a fixed capacity and a current level for each of the three
//! ship resources. Levels only ever go down: there is no refuel operation.
//!
//! All reads and writes of the levels go through one short-lived
//! `parking_lot::Mutex`, so a multi-resource consume is all-or-nothing and an
//! observer never sees a half-applied tick.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{Quantity, ResourceKind, Resources};

/// Point-in-time view of every resource level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Fixed capacities.
    pub capacity: Resources,
    /// Current levels.
    pub available: Resources,
}

impl ResourceSnapshot {
    /// Current level of `kind` as a percentage of its capacity.
    #[must_use]
    pub fn percent(&self, kind: ResourceKind) -> f64 {
        let cap = self.capacity.get(kind);
        if cap == Quantity::ZERO {
            return 0.0;
        }
        self.available.get(kind).as_f64() / cap.as_f64() * 100.0
    }
}

impl fmt::Display for ResourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "energy {:.1}% | fuel {:.1}% | oxygen {:.1}%",
            self.percent(ResourceKind::Energy),
            self.percent(ResourceKind::Fuel),
            self.percent(ResourceKind::Oxygen),
        )
    }
}

/// Pool of the three ship resources.
#[derive(Debug)]
pub struct ResourcePool {
    capacity: Resources,
    levels: Mutex<Resources>,
}

impl ResourcePool {
    /// Create a full pool with the given capacities.
    #[must_use]
    pub fn new(capacity: Resources) -> Self {
        Self {
            capacity,
            levels: Mutex::new(capacity),
        }
    }

    /// Create a pool whose current levels start below capacity.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` if any level exceeds its capacity.
    pub fn with_levels(capacity: Resources, levels: Resources) -> Result<Self, SchedulerError> {
        for kind in ResourceKind::ALL {
            if levels.get(kind) > capacity.get(kind) {
                return Err(SchedulerError::Config(format!(
                    "{kind} level {} exceeds capacity {}",
                    levels.get(kind),
                    capacity.get(kind)
                )));
            }
        }
        Ok(Self {
            capacity,
            levels: Mutex::new(levels),
        })
    }

    /// Fixed capacity of `kind`.
    #[must_use]
    pub const fn capacity_of(&self, kind: ResourceKind) -> Quantity {
        self.capacity.get(kind)
    }

    /// Current level of `kind`.
    #[must_use]
    pub fn available_of(&self, kind: ResourceKind) -> Quantity {
        self.levels.lock().get(kind)
    }

    /// Consistent view of all capacities and levels.
    #[must_use]
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            capacity: self.capacity,
            available: *self.levels.lock(),
        }
    }

    /// Check that every amount in `required` is currently available.
    ///
    /// Resources are checked in energy, fuel, oxygen order and the first
    /// shortfall is reported.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InsufficientResource` on the first shortfall.
    pub fn check_available(&self, required: &Resources) -> Result<(), SchedulerError> {
        let levels = self.levels.lock();
        Self::check_levels(&levels, required)
    }

    /// Atomically consume `amount` of a single resource.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InsufficientResource` and leaves the level
    /// unchanged if `amount` exceeds the current level.
    pub fn try_consume(&self, kind: ResourceKind, amount: Quantity) -> Result<(), SchedulerError> {
        let mut levels = self.levels.lock();
        let level = levels.get_mut(kind);
        match level.checked_sub(amount) {
            Some(rest) => {
                *level = rest;
                Ok(())
            }
            None => Err(SchedulerError::InsufficientResource {
                resource: kind,
                required: amount,
                available: *level,
            }),
        }
    }

    /// Atomically consume all three amounts, or none of them.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InsufficientResource` for the first resource
    /// that falls short; no level is changed in that case.
    pub fn try_consume_all(&self, amounts: &Resources) -> Result<(), SchedulerError> {
        let mut levels = self.levels.lock();
        Self::check_levels(&levels, amounts)?;
        for kind in ResourceKind::ALL {
            let level = levels.get_mut(kind);
            *level = *level - amounts.get(kind);
        }
        Ok(())
    }

    fn check_levels(levels: &Resources, required: &Resources) -> Result<(), SchedulerError> {
        for kind in ResourceKind::ALL {
            let available = levels.get(kind);
            let needed = required.get(kind);
            if needed > available {
                return Err(SchedulerError::InsufficientResource {
                    resource: kind,
                    required: needed,
                    available,
                });
            }
        }
        Ok(())
    }
}
