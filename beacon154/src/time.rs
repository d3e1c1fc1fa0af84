//! Symbol clock.
//!
//! The radio timer counts symbols in a free running `u32` that wraps around.
//! A [`SymbolTime`] is a point on that clock. Ordering goes through the
//! signed difference of two points, so comparisons stay correct across the
//! wrap as long as both points are less than 2^31 symbols apart.

use crate::phy::constants::SYMBOL_RATE_INV_US;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SymbolTime(u32);

impl SymbolTime {
    pub const ZERO: Self = Self(0);

    /// Create a new `SymbolTime` from a raw symbol count.
    pub const fn from_symbols(symbols: u32) -> Self {
        Self(symbols)
    }

    /// Returns the raw symbol count.
    pub const fn symbols(&self) -> u32 {
        self.0
    }

    /// Returns `true` when `self` lies strictly before `other`.
    pub const fn is_before(&self, other: SymbolTime) -> bool {
        (self.0.wrapping_sub(other.0) as i32) < 0
    }

    /// Symbols elapsed from `earlier` to `self`, negative when `earlier` is
    /// actually later.
    pub const fn since(&self, earlier: SymbolTime) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// Returns the earliest of two points in time.
    pub fn min(self, other: SymbolTime) -> SymbolTime {
        if other.is_before(self) {
            other
        } else {
            self
        }
    }

    /// Returns the time in microseconds modulo the clock period.
    pub const fn as_us(&self) -> u64 {
        self.0 as u64 * SYMBOL_RATE_INV_US as u64
    }
}

impl core::ops::Add<u32> for SymbolTime {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl core::ops::AddAssign<u32> for SymbolTime {
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

impl core::ops::Sub<u32> for SymbolTime {
    type Output = Self;

    fn sub(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_sub(rhs))
    }
}

impl core::fmt::Display for SymbolTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}sym", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_time() {
        let a = SymbolTime::from_symbols(100);
        assert_eq!(a.symbols(), 100);
        assert_eq!((a + 50).symbols(), 150);
        assert_eq!((a - 50).symbols(), 50);
        assert_eq!(a.as_us(), 1600);
    }

    #[test]
    fn ordering_across_wrap() {
        let before = SymbolTime::from_symbols(u32::MAX - 10);
        let after = before + 20;
        assert_eq!(after.symbols(), 9);
        assert!(before.is_before(after));
        assert!(!after.is_before(before));
        assert!(!after.is_before(after));
        assert_eq!(after.since(before), 20);
        assert_eq!(before.since(after), -20);
        assert_eq!(after.min(before), before);
    }

    #[test]
    fn formatting() {
        let a = SymbolTime::from_symbols(960);
        assert_eq!(format!("{}", a), "960sym");
    }
}
