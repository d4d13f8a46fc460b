use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize, derive_more::From)]
pub struct Percentage(pub f64);

impl Percentage {
    /// Convert the percentage into a proportion, so that `21%` becomes `0.21`.
    #[must_use]
    pub const fn to_proportion(self) -> f64 {
        0.01 * self.0
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
