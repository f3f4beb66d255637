//! Raw distance to human-readable confidence.

pub const DEFAULT_DIVISOR: f32 = 10.0;

/// Linear calibration `clamp(100 * (1 - raw / divisor), 0, 100)`.
///
/// The divisor is empirical: it assumes the backend reports L2 distances that
/// fall mostly below it for the configured embedder. Tune per model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceCalibration {
    divisor: f32,
}

impl Default for ConfidenceCalibration {
    fn default() -> Self {
        Self { divisor: DEFAULT_DIVISOR }
    }
}

impl ConfidenceCalibration {
    /// Returns `None` unless `divisor` is finite and positive.
    pub fn new(divisor: f32) -> Option<Self> {
        (divisor.is_finite() && divisor > 0.0).then_some(Self { divisor })
    }

    pub fn divisor(&self) -> f32 {
        self.divisor
    }

    pub fn to_confidence(&self, raw_score: f32) -> f32 {
        if raw_score.is_nan() {
            return 0.0;
        }
        (100.0 * (1.0 - raw_score / self.divisor)).clamp(0.0, 100.0)
    }
}

pub fn to_confidence(raw_score: f32) -> f32 {
    ConfidenceCalibration::default().to_confidence(raw_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors() {
        assert_eq!(to_confidence(0.0), 100.0);
        assert_eq!(to_confidence(10.0), 0.0);
        assert_eq!(to_confidence(20.0), 0.0);
        assert!((to_confidence(2.0) - 80.0).abs() < 1e-4);
        assert!((to_confidence(0.5) - 95.0).abs() < 1e-4);
    }

    #[test]
    fn monotone_non_increasing() {
        let mut prev = f32::MAX;
        for i in 0..=300 {
            let c = to_confidence(i as f32 * 0.05);
            assert!(c <= prev);
            assert!((0.0..=100.0).contains(&c));
            prev = c;
        }
    }

    #[test]
    fn non_finite_and_negative_inputs_stay_bounded() {
        assert_eq!(to_confidence(f32::NAN), 0.0);
        assert_eq!(to_confidence(f32::INFINITY), 0.0);
        assert_eq!(to_confidence(-1.0), 100.0);
    }

    #[test]
    fn divisor_is_configurable() {
        let cal = ConfidenceCalibration::new(2.0).expect("valid divisor");
        assert_eq!(cal.to_confidence(1.0), 50.0);
        assert_eq!(cal.to_confidence(2.0), 0.0);
        assert!(ConfidenceCalibration::new(0.0).is_none());
        assert!(ConfidenceCalibration::new(-3.0).is_none());
        assert!(ConfidenceCalibration::new(f32::NAN).is_none());
    }
}
