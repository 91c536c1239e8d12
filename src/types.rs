//! Core value types shared across the crate

use std::fmt;

/// Desk height as shown on the display, stored exactly in tenths of a
/// display unit (cm or inch depending on the desk setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Height {
    tenths: u16,
}

impl Height {
    /// Largest value the three-digit display can show
    pub const MAX_TENTHS: u16 = 9990;

    /// Build from tenths of a unit
    pub const fn from_tenths(tenths: u16) -> Self {
        Self { tenths }
    }

    /// Combine three display digits.
    ///
    /// The digits form `d1*100 + d2*10 + d3`; a lit decimal point anywhere
    /// divides the result by ten.
    pub fn from_digits(hundreds: u8, tens: u8, ones: u8, decimal: bool) -> Self {
        let raw = hundreds as u16 * 100 + tens as u16 * 10 + ones as u16;
        let tenths = if decimal { raw } else { raw * 10 };
        Self { tenths }
    }

    /// Parse a user-supplied value (rounded to the nearest tenth).
    ///
    /// Returns `None` for negative, non-finite or out-of-range values.
    pub fn from_units(value: f32) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let tenths = (value * 10.0).round();
        if tenths > Self::MAX_TENTHS as f32 {
            return None;
        }
        Some(Self {
            tenths: tenths as u16,
        })
    }

    pub fn tenths(self) -> u16 {
        self.tenths
    }

    pub fn as_f32(self) -> f32 {
        self.tenths as f32 / 10.0
    }

    /// Absolute difference in display units
    pub fn distance(self, other: Height) -> f32 {
        self.tenths.abs_diff(other.tenths) as f32 / 10.0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

/// Jog direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_digits() {
        assert_eq!(Height::from_digits(1, 2, 5, false).as_f32(), 125.0);
        assert_eq!(Height::from_digits(1, 2, 5, true).as_f32(), 12.5);
        assert_eq!(Height::from_digits(0, 7, 4, false).tenths(), 740);
    }

    #[test]
    fn test_from_units() {
        assert_eq!(Height::from_units(30.0), Some(Height::from_tenths(300)));
        assert_eq!(Height::from_units(29.96), Some(Height::from_tenths(300)));
        assert_eq!(Height::from_units(-1.0), None);
        assert_eq!(Height::from_units(f32::NAN), None);
        assert_eq!(Height::from_units(1000.0), None);
    }

    #[test]
    fn test_distance_and_display() {
        let a = Height::from_tenths(302);
        let b = Height::from_tenths(300);
        assert!((a.distance(b) - 0.2).abs() < 1e-6);
        assert_eq!(a.distance(b), b.distance(a));
        assert_eq!(a.to_string(), "30.2");
        assert_eq!(Height::from_digits(1, 2, 5, false).to_string(), "125.0");
    }
}
