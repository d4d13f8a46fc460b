//! Netting («saldering») of solar feed-in against consumption.

use serde::Serialize;

use crate::{
    model::usage::{MeterType, UsageProfile},
    quantity::energy::KilowattHours,
};

/// Billable consumption after netting.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Netting {
    /// Net normal-rate consumption, or the total net consumption of a single meter.
    pub normal: KilowattHours,

    /// Net off-peak consumption, always zero for single meters.
    pub off_peak: KilowattHours,

    /// Feed-in left over after all consumption has been netted.
    pub surplus: KilowattHours,
}

impl Netting {
    #[must_use]
    pub fn of(profile: &UsageProfile) -> Self {
        net(profile.normal, profile.off_peak(), profile.feed_in(), profile.meter())
    }

    /// Total net consumption, subject to the energy tax.
    #[must_use]
    pub fn total(&self) -> KilowattHours {
        self.normal + self.off_peak
    }
}

/// Net the feed-in against the consumption.
///
/// Dual meters get half of the feed-in on each register. A register that goes below zero
/// borrows from the other one before anything counts as surplus, so that
/// `total − surplus = consumption − feed-in` whenever there is feed-in.
#[must_use]
pub fn net(
    normal: KilowattHours,
    off_peak: KilowattHours,
    feed_in: KilowattHours,
    meter: MeterType,
) -> Netting {
    if !feed_in.is_positive() {
        return match meter {
            MeterType::Dual => Netting { normal, off_peak, surplus: KilowattHours::ZERO },
            MeterType::Single => Netting {
                normal: normal + off_peak,
                off_peak: KilowattHours::ZERO,
                surplus: KilowattHours::ZERO,
            },
        };
    }

    match meter {
        MeterType::Single => {
            let remainder = normal + off_peak - feed_in;
            Netting {
                normal: remainder.max(KilowattHours::ZERO),
                off_peak: KilowattHours::ZERO,
                surplus: (-remainder).max(KilowattHours::ZERO),
            }
        }
        MeterType::Dual => {
            let half = feed_in / 2.0;
            let (mut normal, mut off_peak) = (normal - half, off_peak - half);
            absorb(&mut normal, &mut off_peak);
            absorb(&mut off_peak, &mut normal);
            let surplus = -(normal.min(KilowattHours::ZERO) + off_peak.min(KilowattHours::ZERO));
            Netting {
                normal: normal.max(KilowattHours::ZERO),
                off_peak: off_peak.max(KilowattHours::ZERO),
                surplus,
            }
        }
    }
}

/// Move as much of the deficit as possible onto the other register without taking it below zero.
fn absorb(deficit: &mut KilowattHours, other: &mut KilowattHours) {
    if *deficit < KilowattHours::ZERO && *other > KilowattHours::ZERO {
        let absorbed = (-*deficit).min(*other);
        *deficit += absorbed;
        *other -= absorbed;
    }
}
