//! Reputation aggregation.
//!
//! A user's reputation is a pure function of the multiset of reviews they have
//! received. The engine re-derives it from scratch after every review write.

use crate::error::CoreError;

pub const LEVEL_NEWBIE: &str = "newbie";
pub const LEVEL_TRUSTED: &str = "trusted";
pub const LEVEL_EXPERT: &str = "expert";
pub const LEVEL_MASTER: &str = "master";

pub const VALID_LEVELS: &[&str] = &[LEVEL_NEWBIE, LEVEL_TRUSTED, LEVEL_EXPERT, LEVEL_MASTER];

/// Coarse trust tier derived from received reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationLevel {
    Newbie,
    Trusted,
    Expert,
    Master,
}

impl ReputationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newbie => LEVEL_NEWBIE,
            Self::Trusted => LEVEL_TRUSTED,
            Self::Expert => LEVEL_EXPERT,
            Self::Master => LEVEL_MASTER,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            LEVEL_NEWBIE => Ok(Self::Newbie),
            LEVEL_TRUSTED => Ok(Self::Trusted),
            LEVEL_EXPERT => Ok(Self::Expert),
            LEVEL_MASTER => Ok(Self::Master),
            other => Err(CoreError::Validation(format!(
                "Unknown reputation level: '{other}'"
            ))),
        }
    }
}

/// The two review fields reputation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSample {
    pub rating: i32,
    pub is_positive: bool,
}

/// Derived reputation counters for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationSummary {
    pub total_reviews: i64,
    pub positive_reviews: i64,
    pub negative_reviews: i64,
    pub neutral_reviews: i64,
    pub total_score: i64,
    pub level: ReputationLevel,
}

impl ReputationSummary {
    /// The summary of a user with no reviews.
    pub fn empty() -> Self {
        summarize(std::iter::empty())
    }
}

/// Assign a level from review counts.
///
/// Evaluated in order: no reviews is `newbie`; at least 80% positive is
/// `master`; at least 60% positive is `expert`; otherwise `trusted`.
/// Integer arithmetic keeps the thresholds exact.
pub fn level_for(total: i64, positive: i64) -> ReputationLevel {
    if total == 0 {
        ReputationLevel::Newbie
    } else if positive * 5 >= total * 4 {
        ReputationLevel::Master
    } else if positive * 5 >= total * 3 {
        ReputationLevel::Expert
    } else {
        ReputationLevel::Trusted
    }
}

/// Aggregate a set of reviews.
///
/// `negative` counts non-positive reviews rated 2 or lower and `neutral`
/// counts non-positive reviews rated above 2. The classification uses the
/// stored `is_positive` flag, not the rating, for the positive bucket.
pub fn summarize<I>(reviews: I) -> ReputationSummary
where
    I: IntoIterator<Item = ReviewSample>,
{
    let mut total = 0i64;
    let mut positive = 0i64;
    let mut negative = 0i64;
    let mut neutral = 0i64;
    let mut score = 0i64;

    for r in reviews {
        total += 1;
        score += i64::from(r.rating);
        if r.is_positive {
            positive += 1;
        } else if r.rating <= 2 {
            negative += 1;
        } else {
            neutral += 1;
        }
    }

    ReputationSummary {
        total_reviews: total,
        positive_reviews: positive,
        negative_reviews: negative,
        neutral_reviews: neutral,
        total_score: score,
        level: level_for(total, positive),
    }
}
