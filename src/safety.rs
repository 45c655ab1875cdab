//! Power limits of the emitter and the current clamp applied before emission.

/// Electrical rating of the emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRating {
    /// Tube power limit in watts.
    pub max_watts: f64,
    /// Rated maximum voltage, in kilovolts.
    pub max_kv: f64,
}

impl DeviceRating {
    /// Rating of the Pantak HF75.
    pub const HF75: Self = Self {
        max_watts: 450.0,
        max_kv: 75.0,
    };

    /// Highest current allowed at `kv` without exceeding the power limit.
    pub fn max_current_ma(&self, kv: f64) -> f64 {
        max_current_ma(kv, self.max_watts)
    }
}

impl Default for DeviceRating {
    fn default() -> Self {
        Self::HF75
    }
}

/// Current limit at `kv` for a tube rated at `max_watts`.
///
/// With no voltage there is no power budget to spend, so the limit is 0.
pub fn max_current_ma(kv: f64, max_watts: f64) -> f64 {
    if kv == 0.0 { 0.0 } else { max_watts / kv }
}

/// Current actually sent to the emitter for the requested settings.
///
/// Returns `target_ma` unless it would push the tube past `max_watts`, in which
/// case the highest allowed current is returned instead.
pub fn clamp_current(target_kv: f64, target_ma: f64, max_watts: f64) -> f64 {
    let max_ma = max_current_ma(target_kv, max_watts);
    if max_ma < target_ma { max_ma } else { target_ma }
}
