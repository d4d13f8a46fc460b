pub mod cost;
pub mod energy;
pub mod percentage;
pub mod rate;
pub mod volume;

use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

/// Dimensional `f64` wrapper.
///
/// The const parameters are the exponents of energy (kWh), gas volume (m³), and cost (€),
/// so that `KilowattHours * KilowattHourRate` can only produce `Cost`.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
#[must_use]
pub struct Quantity<const ENERGY: isize, const VOLUME: isize, const COST: isize>(pub f64);

impl<const ENERGY: isize, const VOLUME: isize, const COST: isize> Quantity<ENERGY, VOLUME, COST> {
    pub const ZERO: Self = Self(0.0);

    pub fn min(mut self, rhs: Self) -> Self {
        if rhs < self {
            self = rhs;
        }
        self
    }

    pub fn max(mut self, rhs: Self) -> Self {
        if rhs > self {
            self = rhs;
        }
        self
    }

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }
}

impl<const ENERGY: isize, const VOLUME: isize, const COST: isize> Mul<f64>
    for Quantity<ENERGY, VOLUME, COST>
{
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl<const ENERGY: isize, const VOLUME: isize, const COST: isize> Div<f64>
    for Quantity<ENERGY, VOLUME, COST>
{
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl<const ENERGY: isize, const VOLUME: isize, const COST: isize> Div<Self>
    for Quantity<ENERGY, VOLUME, COST>
{
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}
