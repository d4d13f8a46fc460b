use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use crate::quantity::{Quantity, cost::Cost, rate::CubicMeterRate};

/// Natural gas volume.
pub type CubicMeters = Quantity<0, 1, 0>;

impl Display for CubicMeters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} m³", self.0)
    }
}

impl Debug for CubicMeters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}m³", self.0)
    }
}

impl Mul<CubicMeterRate> for CubicMeters {
    type Output = Cost;

    fn mul(self, rhs: CubicMeterRate) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}
