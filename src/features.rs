use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::events::{self, MatchEvent};

pub const PROGRESSIVE_METRES: f64 = 15.0;
pub const FINAL_THIRD_X: f64 = 80.0;
pub const PENALTY_AREA_X: f64 = 102.0;
pub const PENALTY_AREA_Y: (f64, f64) = (18.0, 62.0);

/// Flat record for one pass, straight from the event feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub distance: f64,
    pub angle: f64,
    pub completed: bool,
    pub minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LengthBucket {
    VeryShort,
    Short,
    Medium,
    Long,
    VeryLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MinuteBucket {
    Q1,
    Q2,
    Q3,
    Q4,
    Q5,
    Q6,
    ExtraTime,
}

impl LengthBucket {
    pub const ALL: [LengthBucket; 5] = [
        LengthBucket::VeryShort,
        LengthBucket::Short,
        LengthBucket::Medium,
        LengthBucket::Long,
        LengthBucket::VeryLong,
    ];

    /// Right-closed bins: (0,10], (10,20], (20,40], (40,60], (60,100].
    pub fn from_distance(distance: f64) -> Option<Self> {
        if !distance.is_finite() || distance <= 0.0 {
            None
        } else if distance <= 10.0 {
            Some(LengthBucket::VeryShort)
        } else if distance <= 20.0 {
            Some(LengthBucket::Short)
        } else if distance <= 40.0 {
            Some(LengthBucket::Medium)
        } else if distance <= 60.0 {
            Some(LengthBucket::Long)
        } else if distance <= 100.0 {
            Some(LengthBucket::VeryLong)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LengthBucket::VeryShort => "very_short",
            LengthBucket::Short => "short",
            LengthBucket::Medium => "medium",
            LengthBucket::Long => "long",
            LengthBucket::VeryLong => "very_long",
        }
    }
}

impl MinuteBucket {
    pub const ALL: [MinuteBucket; 7] = [
        MinuteBucket::Q1,
        MinuteBucket::Q2,
        MinuteBucket::Q3,
        MinuteBucket::Q4,
        MinuteBucket::Q5,
        MinuteBucket::Q6,
        MinuteBucket::ExtraTime,
    ];

    /// Right-closed bins over (0, 120]; minute 0 and anything past 120 fall outside.
    pub fn from_minute(minute: u32) -> Option<Self> {
        match minute {
            1..=15 => Some(MinuteBucket::Q1),
            16..=30 => Some(MinuteBucket::Q2),
            31..=45 => Some(MinuteBucket::Q3),
            46..=60 => Some(MinuteBucket::Q4),
            61..=75 => Some(MinuteBucket::Q5),
            76..=90 => Some(MinuteBucket::Q6),
            91..=120 => Some(MinuteBucket::ExtraTime),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MinuteBucket::Q1 => "0-15",
            MinuteBucket::Q2 => "16-30",
            MinuteBucket::Q3 => "31-45",
            MinuteBucket::Q4 => "46-60",
            MinuteBucket::Q5 => "61-75",
            MinuteBucket::Q6 => "76-90",
            MinuteBucket::ExtraTime => "ET",
        }
    }
}

/// A pass with the derived tactical flags the classifier trains on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineeredPass {
    pub base: PassRecord,
    pub delta_x: f64,
    pub delta_y: f64,
    pub is_forward: bool,
    pub progressive: bool,
    pub start_in_final_third: bool,
    pub end_in_penalty_area: bool,
    pub length_bucket: Option<LengthBucket>,
    pub minute_bucket: Option<MinuteBucket>,
    pub abs_angle: f64,
}

impl EngineeredPass {
    pub fn label(&self) -> u8 {
        u8::from(self.base.completed)
    }
}

pub fn calculate_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

pub fn calculate_angle(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (y2 - y1).atan2(x2 - x1)
}

pub fn extract_pass_features(event: &MatchEvent) -> Option<PassRecord> {
    let start = event.location()?;
    let end = event.pass_end()?;
    Some(PassRecord {
        start_x: start.x,
        start_y: start.y,
        end_x: end.x,
        end_y: end.y,
        distance: calculate_distance(start.x, start.y, end.x, end.y),
        angle: calculate_angle(start.x, start.y, end.x, end.y),
        completed: event.pass_completed(),
        minute: event.minute,
    })
}

pub fn add_engineered_features(record: &PassRecord) -> EngineeredPass {
    let delta_x = record.end_x - record.start_x;
    let delta_y = record.end_y - record.start_y;
    EngineeredPass {
        base: *record,
        delta_x,
        delta_y,
        is_forward: delta_x > 0.0,
        progressive: delta_x > PROGRESSIVE_METRES,
        start_in_final_third: record.start_x > FINAL_THIRD_X,
        end_in_penalty_area: record.end_x > PENALTY_AREA_X
            && record.end_y >= PENALTY_AREA_Y.0
            && record.end_y <= PENALTY_AREA_Y.1,
        length_bucket: LengthBucket::from_distance(record.distance),
        minute_bucket: MinuteBucket::from_minute(record.minute),
        abs_angle: record.angle.abs(),
    }
}

pub fn engineer_all(records: &[PassRecord]) -> Vec<EngineeredPass> {
    records.iter().map(add_engineered_features).collect()
}

pub fn extract_passes(events: &[MatchEvent]) -> Vec<PassRecord> {
    events::filter_pass_events(events)
        .into_iter()
        .filter_map(extract_pass_features)
        .collect()
}

pub fn build_pass_dataset(path: &Path) -> Result<Vec<PassRecord>> {
    let events = events::load_events(path)?;
    Ok(extract_passes(&events))
}

#[cfg(test)]
mod tests {
    use super::{LengthBucket, MinuteBucket, PassRecord, add_engineered_features, calculate_angle,
        calculate_distance};

    fn pass(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> PassRecord {
        PassRecord {
            start_x,
            start_y,
            end_x,
            end_y,
            distance: calculate_distance(start_x, start_y, end_x, end_y),
            angle: calculate_angle(start_x, start_y, end_x, end_y),
            completed: true,
            minute: 30,
        }
    }

    #[test]
    fn bucket_edges_are_right_closed() {
        assert_eq!(LengthBucket::from_distance(0.0), None);
        assert_eq!(LengthBucket::from_distance(10.0), Some(LengthBucket::VeryShort));
        assert_eq!(LengthBucket::from_distance(10.5), Some(LengthBucket::Short));
        assert_eq!(LengthBucket::from_distance(100.0), Some(LengthBucket::VeryLong));
        assert_eq!(LengthBucket::from_distance(101.0), None);

        assert_eq!(MinuteBucket::from_minute(0), None);
        assert_eq!(MinuteBucket::from_minute(15).map(|b| b.label()), Some("0-15"));
        assert_eq!(MinuteBucket::from_minute(16).map(|b| b.label()), Some("16-30"));
        assert_eq!(MinuteBucket::from_minute(93).map(|b| b.label()), Some("ET"));
        assert_eq!(MinuteBucket::from_minute(121), None);
    }

    #[test]
    fn tactical_flags_use_strict_edges() {
        let exactly_fifteen = add_engineered_features(&pass(40.0, 40.0, 55.0, 40.0));
        assert!(exactly_fifteen.is_forward);
        assert!(!exactly_fifteen.progressive);
        assert!(add_engineered_features(&pass(40.0, 40.0, 55.5, 40.0)).progressive);

        let backward = add_engineered_features(&pass(60.0, 40.0, 50.0, 40.0));
        assert!(!backward.is_forward);
        assert_eq!(backward.delta_x, -10.0);
        assert!((backward.abs_angle - std::f64::consts::PI).abs() < 1e-12);

        assert!(!add_engineered_features(&pass(80.0, 40.0, 90.0, 40.0)).start_in_final_third);
        assert!(add_engineered_features(&pass(80.5, 40.0, 90.0, 40.0)).start_in_final_third);

        assert!(add_engineered_features(&pass(90.0, 40.0, 110.0, 18.0)).end_in_penalty_area);
        assert!(add_engineered_features(&pass(90.0, 40.0, 110.0, 62.0)).end_in_penalty_area);
        assert!(!add_engineered_features(&pass(90.0, 40.0, 110.0, 17.9)).end_in_penalty_area);
        assert!(!add_engineered_features(&pass(90.0, 40.0, 110.0, 62.1)).end_in_penalty_area);
        assert!(!add_engineered_features(&pass(90.0, 40.0, 102.0, 40.0)).end_in_penalty_area);
    }
}
