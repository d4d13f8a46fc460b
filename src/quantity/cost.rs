use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Euro.
pub type Cost = Quantity<0, 0, 1>;

impl Cost {
    pub const ONE_CENT: Self = Self(0.01);

    /// Round the cost to whole cents, for presentation.
    pub fn round_to_cents(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }

    /// Spread a yearly amount over twelve months.
    pub fn monthly(self) -> Self {
        self / 12.0
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} €", self.0)
    }
}

impl Debug for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}€", self.0)
    }
}
