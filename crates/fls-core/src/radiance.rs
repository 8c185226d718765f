//! SEVIRI radiance → brightness temperature conversion.
//!
//! Inverse Planck function with the band-corrected (A, B, νc) coefficients of
//! the MSG infrared channels. Radiances are in mW m⁻² sr⁻¹ (cm⁻¹)⁻¹,
//! brightness temperatures in kelvin.

use crate::grid::Grid;
use crate::scene::Channel;

/// First radiation constant, 2hc² in mW m⁻² sr⁻¹ (cm⁻¹)⁻⁴.
pub const C1: f64 = 1.19104e-5;
/// Second radiation constant, hc/k in K cm.
pub const C2: f64 = 1.43877;

/// Band correction for one channel: `TB = (C2·νc / ln(C1·νc³/R + 1) − b) / a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanckCoefficients {
    pub a: f64,
    pub b: f64,
    /// Central wavenumber in cm⁻¹.
    pub vc: f64,
}

impl Channel {
    pub fn planck_coefficients(self) -> PlanckCoefficients {
        match self {
            Channel::Ir3_9 => PlanckCoefficients { a: 0.9959, b: 3.471, vc: 2569.094 },
            Channel::Ir10_8 => PlanckCoefficients { a: 0.9983, b: 0.627, vc: 930.659 },
            Channel::Ir12_0 => PlanckCoefficients { a: 0.9914, b: 0.408, vc: 839.662 },
        }
    }
}

/// Brightness temperature for a single radiance. Returns `None` for
/// non-positive or non-finite radiances, which have no physical temperature.
pub fn brightness_temperature(channel: Channel, radiance: f32) -> Option<f32> {
    if !radiance.is_finite() || radiance <= 0.0 {
        return None;
    }
    let PlanckCoefficients { a, b, vc } = channel.planck_coefficients();
    let r = radiance as f64;
    let tb = (C2 * vc / ((C1 * vc.powi(3) / r) + 1.0).ln() - b) / a;
    Some(tb as f32)
}

/// Convert a whole radiance grid. No-data cells (the sentinel, NaN, or any
/// radiance without a physical temperature) come out as `no_data_value`.
pub fn to_brightness_temperature(channel: Channel, radiances: &Grid<f32>, no_data_value: f32) -> Grid<f32> {
    radiances.map(|&r| {
        if r == no_data_value {
            return no_data_value;
        }
        brightness_temperature(channel, r).unwrap_or(no_data_value)
    })
}
