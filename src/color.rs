use serde::Serialize;

pub const HIGH_RISK_THRESHOLD: f64 = 90.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskTier::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskTier::High => "red",
            RiskTier::Medium => "orange",
            RiskTier::Low => "green",
        }
    }
}

/// Fill color for a zone with the given crime score.
pub fn zone_color(score: f64) -> &'static str {
    RiskTier::from_score(score).color()
}

/// Marker color of a house relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PinColor {
    #[serde(rename = "blue")]
    Affordable,
    #[serde(rename = "lightgray")]
    OverBudget,
}

impl PinColor {
    /// A house without a known price is never affordable.
    pub fn for_price(total_value: Option<f64>, budget: u64) -> Self {
        match total_value {
            Some(v) if v <= budget as f64 => PinColor::Affordable,
            _ => PinColor::OverBudget,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PinColor::Affordable => "blue",
            PinColor::OverBudget => "lightgray",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_belong_to_the_higher_tier() {
        assert_eq!(zone_color(90.0), "red");
        assert_eq!(zone_color(85.0), "orange");
        assert_eq!(zone_color(89.999), "orange");
        assert_eq!(zone_color(84.999), "green");
    }

    #[test]
    fn tiers_cover_the_whole_range() {
        for s in [-10.0, 0.0, 50.0, 84.0] {
            assert_eq!(RiskTier::from_score(s), RiskTier::Low, "score {}", s);
        }
        for s in [85.0, 86.5, 89.0] {
            assert_eq!(RiskTier::from_score(s), RiskTier::Medium, "score {}", s);
        }
        for s in [90.0, 92.0, 150.0] {
            assert_eq!(RiskTier::from_score(s), RiskTier::High, "score {}", s);
        }
    }

    #[test]
    fn nan_is_low_risk() {
        assert_eq!(zone_color(f64::NAN), "green");
    }

    #[test]
    fn pin_color_compares_inclusively() {
        assert_eq!(PinColor::for_price(Some(3_000_000.0), 3_000_000), PinColor::Affordable);
        assert_eq!(PinColor::for_price(Some(3_000_000.5), 3_000_000), PinColor::OverBudget);
        assert_eq!(PinColor::for_price(Some(0.0), 0), PinColor::Affordable);
        assert_eq!(PinColor::for_price(None, u64::MAX), PinColor::OverBudget);
    }

    #[test]
    fn pin_color_serializes_as_marker_color() {
        assert_eq!(serde_json::to_string(&PinColor::Affordable).unwrap(), "\"blue\"");
        assert_eq!(PinColor::OverBudget.as_str(), "lightgray");
    }
}
