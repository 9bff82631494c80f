use serde::{Deserialize, Serialize};

/// Sentiment tier derived from a 0-10 likelihood-to-recommend score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTier {
    Promoter,
    Passive,
    Detractor,
}

impl SentimentTier {
    pub const fn ordered() -> [Self; 3] {
        [Self::Promoter, Self::Passive, Self::Detractor]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Promoter => "promoter",
            Self::Passive => "passive",
            Self::Detractor => "detractor",
        }
    }

    /// Classify an optional score; missing or out-of-range scores have no tier.
    pub const fn from_score(score: Option<u8>) -> Option<Self> {
        match score {
            Some(score) => classify(score),
            None => None,
        }
    }
}

/// 9-10 promoter, 7-8 passive, 0-6 detractor. Anything above 10 is not a valid NPS answer.
pub const fn classify(score: u8) -> Option<SentimentTier> {
    match score {
        9..=10 => Some(SentimentTier::Promoter),
        7..=8 => Some(SentimentTier::Passive),
        0..=6 => Some(SentimentTier::Detractor),
        _ => None,
    }
}

/// Tier counts over a set of responses, feeding the dashboard NPS figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NpsBreakdown {
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    pub unscored: usize,
}

impl NpsBreakdown {
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = Option<u8>>,
    {
        let mut breakdown = Self::default();
        for score in scores {
            match SentimentTier::from_score(score) {
                Some(SentimentTier::Promoter) => breakdown.promoters += 1,
                Some(SentimentTier::Passive) => breakdown.passives += 1,
                Some(SentimentTier::Detractor) => breakdown.detractors += 1,
                None => breakdown.unscored += 1,
            }
        }
        breakdown
    }

    pub fn scored(&self) -> usize {
        self.promoters + self.passives + self.detractors
    }

    /// Percentage of promoters minus percentage of detractors, rounded; `None` without scores.
    pub fn net_promoter_score(&self) -> Option<i32> {
        let scored = self.scored();
        if scored == 0 {
            return None;
        }

        let promoters = self.promoters as f64 * 100.0 / scored as f64;
        let detractors = self.detractors as f64 * 100.0 / scored as f64;
        Some((promoters - detractors).round() as i32)
    }
}
