//! Censoring classification.
//!
//! Each point falls into exactly one of four likelihood branches depending on
//! which axes carry upper limits instead of detections.

use serde::{Deserialize, Serialize};

use crate::domain::DataPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Censoring {
    BothDetected,
    /// Y is an upper limit.
    XDetectedYCensored,
    /// X is an upper limit.
    YDetectedXCensored,
    BothCensored,
}

impl Censoring {
    pub const ALL: [Censoring; 4] = [
        Censoring::BothDetected,
        Censoring::XDetectedYCensored,
        Censoring::YDetectedXCensored,
        Censoring::BothCensored,
    ];

    pub fn classify(censored_x: bool, censored_y: bool) -> Self {
        match (censored_x, censored_y) {
            (false, false) => Censoring::BothDetected,
            (false, true) => Censoring::XDetectedYCensored,
            (true, false) => Censoring::YDetectedXCensored,
            (true, true) => Censoring::BothCensored,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Censoring::BothDetected => "detected",
            Censoring::XDetectedYCensored => "y upper limit",
            Censoring::YDetectedXCensored => "x upper limit",
            Censoring::BothCensored => "both limits",
        }
    }
}

impl DataPoint {
    pub fn censoring(&self) -> Censoring {
        Censoring::classify(self.censored_x, self.censored_y)
    }
}

/// Count points per censoring category, in `Censoring::ALL` order.
pub fn censoring_counts(points: &[DataPoint]) -> [usize; 4] {
    let mut counts = [0usize; 4];
    for p in points {
        let slot = match p.censoring() {
            Censoring::BothDetected => 0,
            Censoring::XDetectedYCensored => 1,
            Censoring::YDetectedXCensored => 2,
            Censoring::BothCensored => 3,
        };
        counts[slot] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_total_and_distinct() {
        let mut seen = Vec::new();
        for cx in [false, true] {
            for cy in [false, true] {
                let c = Censoring::classify(cx, cy);
                assert!(!seen.contains(&c), "duplicate category {c:?}");
                seen.push(c);
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn flags_map_to_expected_branch() {
        assert_eq!(Censoring::classify(false, true), Censoring::XDetectedYCensored);
        assert_eq!(Censoring::classify(true, false), Censoring::YDetectedXCensored);

        let mut p = DataPoint::detected(1.0, 0.1, 2.0, 0.1);
        assert_eq!(p.censoring(), Censoring::BothDetected);
        p.censored_x = true;
        p.censored_y = true;
        assert_eq!(p.censoring(), Censoring::BothCensored);
    }

    #[test]
    fn counts_follow_category_order() {
        let mut y_limit = DataPoint::detected(1.0, 0.1, 2.0, 0.1);
        y_limit.censored_y = true;
        let points = [DataPoint::detected(0.0, 0.1, 1.0, 0.1), y_limit, y_limit];
        assert_eq!(censoring_counts(&points), [1, 2, 0, 0]);
    }
}
