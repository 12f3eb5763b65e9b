use std::fmt;

/// Byte counters reported by the engine on each pulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSample {
    pub current_bytes: u64,
    pub total_bytes: u64,
}

impl ProgressSample {
    pub fn new(current_bytes: u64, total_bytes: u64) -> Self {
        Self {
            current_bytes,
            total_bytes,
        }
    }

    pub fn percentage(&self) -> PercentageValue {
        normalize(self.current_bytes, self.total_bytes)
    }
}

/// A percentage in `[0.0, 100.0]` with one decimal place.
///
/// `100.0` is only produced when the counters are equal. That includes `0/0`
/// before the engine knows any totals, so it does not mark the end of a
/// refresh; the success sentinel does.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct PercentageValue(f64);

impl PercentageValue {
    pub const ZERO: PercentageValue = PercentageValue(0.0);
    pub const COMPLETE: PercentageValue = PercentageValue(100.0);

    // Highest value an incomplete sample may report.
    const MAX_INCOMPLETE_TENTHS: u128 = 999;

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for PercentageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Convert byte counters into a percentage.
///
/// Equal counters (including `0/0`) are complete. A zero total with a
/// non-zero current is malformed and yields `0.0`. Anything else is rounded
/// half-up to one decimal and kept below `100.0`, which also absorbs
/// `current > total`.
pub fn normalize(current: u64, total: u64) -> PercentageValue {
    if current == total {
        return PercentageValue::COMPLETE;
    }

    match tenths_of_percent(current, total) {
        Some(tenths) => {
            let tenths = tenths.min(PercentageValue::MAX_INCOMPLETE_TENTHS);
            PercentageValue(tenths as f64 / 10.0)
        }
        None => PercentageValue::ZERO,
    }
}

// round(current * 1000 / total) in integer arithmetic; None when total is zero.
fn tenths_of_percent(current: u64, total: u64) -> Option<u128> {
    let current = u128::from(current);
    let total = u128::from(total);
    (current * 2000 + total).checked_div(total * 2)
}
