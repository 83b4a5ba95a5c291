pub mod gauge;

use crate::models::VoteRecord;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Detractor,
    Passive,
    Promoter,
}

impl Category {
    /// Buckets a raw score. Range checks happen before a score gets here.
    pub fn of(score: u8) -> Self {
        if score <= 6 {
            Category::Detractor
        } else if score <= 8 {
            Category::Passive
        } else {
            Category::Promoter
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Detractor => "detractor",
            Category::Passive => "passive",
            Category::Promoter => "promoter",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Detractor => "Detractors",
            Category::Passive => "Passives",
            Category::Promoter => "Promoters",
        }
    }
}

/// NPS value of a snapshot. `NoData` is kept apart from a genuine score of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "Option<i32>")]
pub enum NpsScore {
    NoData,
    Score(i32),
}

impl NpsScore {
    pub fn value(self) -> Option<i32> {
        match self {
            NpsScore::NoData => None,
            NpsScore::Score(value) => Some(value),
        }
    }
}

impl From<NpsScore> for Option<i32> {
    fn from(nps: NpsScore) -> Self {
        nps.value()
    }
}

impl fmt::Display for NpsScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NpsScore::NoData => f.write_str("--"),
            NpsScore::Score(value) => write!(f, "{value:+}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NpsStats {
    pub total: usize,
    pub detractors: usize,
    pub passives: usize,
    pub promoters: usize,
    pub nps: NpsScore,
}

impl NpsStats {
    pub fn from_snapshot(records: &[VoteRecord]) -> Self {
        tally(records.iter().map(|record| record.score.value()))
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Detractor => self.detractors,
            Category::Passive => self.passives,
            Category::Promoter => self.promoters,
        }
    }

    /// Whole-percent share of a bucket, `None` without votes.
    pub fn share(&self, category: Category) -> Option<i64> {
        if self.total == 0 {
            return None;
        }
        Some(round_half_away(
            self.count(category) as i64 * 100,
            self.total as i64,
        ))
    }
}

/// Counts every bucket in one pass and derives the NPS.
///
/// The score is `(promoters - detractors) / total * 100` rounded to the
/// nearest integer, with exact halves rounded away from zero (12.5 becomes
/// 13, -12.5 becomes -13). The division is done on integers so the .5
/// boundaries are exact.
pub fn tally<I>(scores: I) -> NpsStats
where
    I: IntoIterator<Item = u8>,
{
    let mut stats = NpsStats {
        total: 0,
        detractors: 0,
        passives: 0,
        promoters: 0,
        nps: NpsScore::NoData,
    };

    for score in scores {
        stats.total += 1;
        match Category::of(score) {
            Category::Detractor => stats.detractors += 1,
            Category::Passive => stats.passives += 1,
            Category::Promoter => stats.promoters += 1,
        }
    }

    if stats.total > 0 {
        let spread = stats.promoters as i64 - stats.detractors as i64;
        let nps = round_half_away(spread * 100, stats.total as i64);
        stats.nps = NpsScore::Score(nps as i32);
    }

    stats
}

// den must be positive
fn round_half_away(num: i64, den: i64) -> i64 {
    let magnitude = (2 * num.abs() + den) / (2 * den);
    if num < 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Score, VoteRecord};
    use chrono::Utc;

    #[test]
    fn buckets_split_at_six_eight_nine() {
        assert_eq!(Category::of(0), Category::Detractor);
        assert_eq!(Category::of(6), Category::Detractor);
        assert_eq!(Category::of(7), Category::Passive);
        assert_eq!(Category::of(8), Category::Passive);
        assert_eq!(Category::of(9), Category::Promoter);
        assert_eq!(Category::of(10), Category::Promoter);
    }

    #[test]
    fn mixed_scores() {
        let stats = tally([9, 9, 10, 7, 3]);
        assert_eq!(
            stats,
            NpsStats {
                total: 5,
                detractors: 1,
                passives: 1,
                promoters: 3,
                nps: NpsScore::Score(40),
            }
        );
    }

    #[test]
    fn no_votes_means_no_data() {
        let stats = tally(std::iter::empty());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.detractors + stats.passives + stats.promoters, 0);
        assert_eq!(stats.nps, NpsScore::NoData);
        assert_ne!(stats.nps, NpsScore::Score(0));
        assert_eq!(stats.nps.to_string(), "--");
        assert_eq!(stats.share(Category::Promoter), None);
    }

    #[test]
    fn balanced_votes_are_a_real_zero() {
        let stats = tally([10, 0]);
        assert_eq!(stats.nps, NpsScore::Score(0));
        assert_eq!(stats.nps.to_string(), "+0");
    }

    #[test]
    fn all_detractors() {
        let stats = tally([6, 6, 6, 6]);
        assert_eq!(stats.detractors, 4);
        assert_eq!(stats.passives, 0);
        assert_eq!(stats.promoters, 0);
        assert_eq!(stats.nps, NpsScore::Score(-100));
    }

    #[test]
    fn all_promoters() {
        assert_eq!(tally([9, 10]).nps, NpsScore::Score(100));
    }

    #[test]
    fn halves_round_away_from_zero() {
        // 1 promoter out of 8: 12.5
        let up = tally([9, 7, 7, 7, 7, 7, 7, 7]);
        assert_eq!(up.nps, NpsScore::Score(13));
        // 1 detractor out of 8: -12.5
        let down = tally([1, 7, 7, 7, 7, 7, 7, 7]);
        assert_eq!(down.nps, NpsScore::Score(-13));
        // 1 promoter out of 3: 33.33
        assert_eq!(tally([10, 8, 8]).nps, NpsScore::Score(33));
        // 2 detractors out of 3: -66.67
        assert_eq!(tally([0, 0, 8]).nps, NpsScore::Score(-67));
    }

    #[test]
    fn counts_always_add_up_and_nps_stays_in_range() {
        // every multiset of up to three scores
        for a in 0..=10u8 {
            for b in 0..=10u8 {
                for c in 0..=10u8 {
                    for scores in [vec![a], vec![a, b], vec![a, b, c]] {
                        let stats = tally(scores.iter().copied());
                        assert_eq!(
                            stats.detractors + stats.passives + stats.promoters,
                            stats.total
                        );
                        let nps = stats.nps.value().expect("non-empty");
                        assert!((-100..=100).contains(&nps), "{scores:?} gave {nps}");
                    }
                }
            }
        }
    }

    #[test]
    fn recomputing_a_snapshot_is_idempotent() {
        let now = Utc::now();
        let records: Vec<VoteRecord> = [3u8, 9, 8, 10]
            .iter()
            .enumerate()
            .map(|(i, raw)| VoteRecord {
                key: format!("voter-{i}"),
                score: Score::try_from(*raw).unwrap(),
                email: None,
                created_at: now,
            })
            .collect();

        let first = NpsStats::from_snapshot(&records);
        let second = NpsStats::from_snapshot(&records);
        assert_eq!(first, second);
        assert_eq!(first.nps, NpsScore::Score(25));
    }

    #[test]
    fn shares_are_whole_percentages() {
        let stats = tally([9, 9, 10, 7, 3]);
        assert_eq!(stats.share(Category::Promoter), Some(60));
        assert_eq!(stats.share(Category::Passive), Some(20));
        assert_eq!(stats.share(Category::Detractor), Some(20));
    }

    #[test]
    fn stats_serialize_no_data_as_null() {
        let json = serde_json::to_value(tally(std::iter::empty())).unwrap();
        assert_eq!(json["nps"], serde_json::Value::Null);
        let json = serde_json::to_value(tally([9, 9, 10, 7, 3])).unwrap();
        assert_eq!(json["nps"], serde_json::json!(40));
        assert_eq!(json["promoters"], serde_json::json!(3));
    }
}
