use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::eval::{DatasetName, PairLabel, SampleUid, Score, SplitName, TemplateVersion, UserId, Variant};

/// Canonical sink column order. Every sink writes rows in exactly this
/// order, whatever the backing store.
pub const RESPONSE_COLUMNS: [&str; 11] = [
    "user_id",
    "row_number",
    "sample_uid",
    "instruction_version",
    "instruction",
    "user_score",
    "timestamp",
    "dataset",
    "split",
    "pair",
    "var",
];

/// One recorded score for one sample. At most one per sample uid is held
/// per session; re-scoring replaces the earlier record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub user_id: UserId,
    pub row_number: usize,
    pub sample_uid: SampleUid,
    pub instruction_version: TemplateVersion,
    pub instruction: String,
    pub user_score: Score,
    pub timestamp: DateTime<Utc>,
    pub dataset: DatasetName,
    pub split: SplitName,
    pub pair: PairLabel,
    pub var: Variant,
}

impl ResponseRecord {
    /// Flattens the record into the canonical column order.
    pub fn to_row(&self) -> [String; 11] {
        [
            self.user_id.as_str().to_owned(),
            self.row_number.to_string(),
            self.sample_uid.as_str().to_owned(),
            self.instruction_version.as_str().to_owned(),
            self.instruction.clone(),
            self.user_score.to_string(),
            self.timestamp.to_rfc3339(),
            self.dataset.as_str().to_owned(),
            self.split.as_str().to_owned(),
            self.pair.as_str().to_owned(),
            self.var.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid RFC3339 timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_to_row_matches_column_order() {
        let record = ResponseRecord {
            user_id: UserId::new("rater-1"),
            row_number: 4,
            sample_uid: SampleUid::new("4_1"),
            instruction_version: TemplateVersion::new("v2"),
            instruction: "Rate the pair.".to_owned(),
            user_score: Score::new(8).unwrap(),
            timestamp: ts("2026-03-01T12:00:00Z"),
            dataset: DatasetName::new("in100"),
            split: SplitName::new("colorjitter"),
            pair: PairLabel::new("[image1, image3]"),
            var: Variant::Invariant,
        };

        let row = record.to_row();
        assert_eq!(row.len(), RESPONSE_COLUMNS.len());
        assert_eq!(row[0], "rater-1");
        assert_eq!(row[1], "4");
        assert_eq!(row[2], "4_1");
        assert_eq!(row[3], "v2");
        assert_eq!(row[4], "Rate the pair.");
        assert_eq!(row[5], "8");
        assert_eq!(row[6], "2026-03-01T12:00:00+00:00");
        assert_eq!(row[7], "in100");
        assert_eq!(row[8], "colorjitter");
        assert_eq!(row[9], "[image1, image3]");
        assert_eq!(row[10], "invariant");
    }
}
