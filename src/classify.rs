use serde::Serialize;
use std::fmt;

/// Severity of a field's demand per hectare, ordered from least to most thirsty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Low,
    Normal,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Low,
        Severity::Normal,
        Severity::Moderate,
        Severity::High,
        Severity::Critical,
    ];

    /// Buckets in m³/ha; lower bound inclusive, upper bound exclusive.
    pub fn classify(demand_per_ha: f64) -> Self {
        if demand_per_ha < 2_000.0 {
            Severity::Low
        } else if demand_per_ha < 5_000.0 {
            Severity::Normal
        } else if demand_per_ha < 9_000.0 {
            Severity::Moderate
        } else if demand_per_ha < 14_000.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    /// Map fill as RGBA.
    pub fn color(self) -> [u8; 4] {
        match self {
            Severity::Low => [0, 255, 255, 180],
            Severity::Normal => [0, 255, 0, 180],
            Severity::Moderate => [255, 255, 0, 180],
            Severity::High => [255, 165, 0, 180],
            Severity::Critical => [255, 0, 0, 180],
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Normal => "Normal",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_left_closed() {
        assert_eq!(Severity::classify(0.0), Severity::Low);
        assert_eq!(Severity::classify(1_999.999), Severity::Low);
        assert_eq!(Severity::classify(2_000.0), Severity::Normal);
        assert_eq!(Severity::classify(5_000.0), Severity::Moderate);
        assert_eq!(Severity::classify(8_999.5), Severity::Moderate);
        assert_eq!(Severity::classify(9_000.0), Severity::High);
        assert_eq!(Severity::classify(13_999.999), Severity::High);
        assert_eq!(Severity::classify(14_000.0), Severity::Critical);
        assert_eq!(Severity::classify(1e9), Severity::Critical);
    }

    #[test]
    fn colors_match_buckets() {
        assert_eq!(Severity::Low.color(), [0, 255, 255, 180]);
        assert_eq!(Severity::High.color(), [255, 165, 0, 180]);
        assert_eq!(Severity::Critical.color(), [255, 0, 0, 180]);
        assert!(Severity::ALL.windows(2).all(|w| w[0] < w[1]));
    }
}
