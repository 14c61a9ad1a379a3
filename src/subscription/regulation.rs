//! Up/down regulation capacity with sign enforcement.

/// Magnitudes below this are treated as zero.
pub const EPSILON: f64 = 1e-4;

fn filter(value: f64) -> f64 {
    if value.abs() < EPSILON { 0.0 } else { value }
}

/// Flexible load available for balancing.
///
/// Up-regulation (curtailing consumption) is never negative; down-regulation
/// (absorbing extra energy) is never positive. Setters reject values of the
/// wrong sign and keep the previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegulationCapacity {
    up: f64,
    down: f64,
}

impl RegulationCapacity {
    /// Zero capacity in both directions.
    pub const ZERO: RegulationCapacity = RegulationCapacity { up: 0.0, down: 0.0 };

    /// Creates a capacity, clamping out-of-sign inputs to zero.
    pub fn new(up: f64, down: f64) -> Self {
        let up = if up < 0.0 {
            tracing::warn!(up, "negative up-regulation capacity clamped to 0");
            0.0
        } else {
            filter(up)
        };
        let down = if down > 0.0 {
            tracing::warn!(down, "positive down-regulation capacity clamped to 0");
            0.0
        } else {
            filter(down)
        };
        Self { up, down }
    }

    pub fn up(&self) -> f64 {
        self.up
    }

    pub fn down(&self) -> f64 {
        self.down
    }

    /// Sets the up-regulation capacity.
    ///
    /// # Returns
    ///
    /// `false` if `value` is negative; the capacity is then unchanged.
    pub fn set_up(&mut self, value: f64) -> bool {
        let value = filter(value);
        if value < 0.0 {
            tracing::warn!(value, "attempt to set negative up-regulation capacity");
            return false;
        }
        self.up = value;
        true
    }

    /// Sets the down-regulation capacity.
    ///
    /// # Returns
    ///
    /// `false` if `value` is positive; the capacity is then unchanged.
    pub fn set_down(&mut self, value: f64) -> bool {
        let value = filter(value);
        if value > 0.0 {
            tracing::warn!(value, "attempt to set positive down-regulation capacity");
            return false;
        }
        self.down = value;
        true
    }

    /// Adds another capacity component-wise.
    pub fn add(&mut self, other: &RegulationCapacity) {
        self.set_up(self.up + other.up);
        self.set_down(self.down + other.down);
    }

    /// Adds non-negative up-regulation; negative amounts are rejected.
    pub fn add_up_regulation(&mut self, amount: f64) {
        if amount < 0.0 {
            tracing::warn!(amount, "attempt to add negative up-regulation capacity");
            return;
        }
        self.set_up(self.up + amount);
    }

    /// Adds non-positive down-regulation; positive amounts are rejected.
    pub fn add_down_regulation(&mut self, amount: f64) {
        if amount > 0.0 {
            tracing::warn!(amount, "attempt to add positive down-regulation capacity");
            return;
        }
        self.set_down(self.down + amount);
    }

    /// Both components multiplied by a non-negative factor.
    pub fn scaled(&self, factor: f64) -> RegulationCapacity {
        RegulationCapacity::new(self.up * factor, self.down * factor)
    }
}
