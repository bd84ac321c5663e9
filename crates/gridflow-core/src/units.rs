//! Unit-safe active power.
//!
//! Generation, load, injections and capacities are all active power in MW.
//! Wrapping them in [`Megawatts`] keeps raw `f64` tolerances and counters from
//! being mixed into power arithmetic by accident.
//!
//! ```
//! use gridflow_core::units::Megawatts;
//!
//! let gen = Megawatts(120.0);
//! let load = Megawatts(80.0);
//! assert_eq!((gen - load).value(), 40.0);
//! ```

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// Active power in megawatts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl Megawatts {
    pub const ZERO: Megawatts = Megawatts(0.0);

    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl Add for Megawatts {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Megawatts {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Megawatts {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Megawatts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|mw| mw.0).sum())
    }
}

impl std::fmt::Display for Megawatts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} MW", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_stays_in_megawatts() {
        let total: Megawatts = [Megawatts(10.0), Megawatts(5.5)].into_iter().sum();
        assert_eq!(total, Megawatts(15.5));
        assert_eq!((total - Megawatts(20.0)).value(), -4.5);
        assert_eq!(-total, Megawatts(-15.5));
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(Megawatts(5.0).to_string(), "5.0000 MW");
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&Megawatts(12.5)).unwrap();
        assert_eq!(json, "12.5");
    }
}
