use serde::{Deserialize, Serialize};

use super::super::channels::ChannelSet;
use super::super::domain::ContactStatus;
use super::criteria::SurveyHistoryFilter;

/// Why a contact was left out of an audience or a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    NoContactInfo,
    StatusExcluded {
        status: ContactStatus,
        required: ContactStatus,
    },
    BrandMismatch,
    LocationMismatch,
    MissingTags,
    SearchMismatch,
    SurveyHistoryMismatch {
        required: SurveyHistoryFilter,
    },
    RecentlySurveyed {
        days_since: i64,
        minimum_days: u32,
    },
    Throttled {
        days_since: i64,
        throttle_days: u32,
    },
}

impl ExclusionReason {
    pub fn summary(&self) -> String {
        match self {
            ExclusionReason::NoContactInfo => "No contact info".to_string(),
            ExclusionReason::StatusExcluded { status, required } => format!(
                "contact is {} but the filter requires {}",
                status.label(),
                required.label()
            ),
            ExclusionReason::BrandMismatch => "contact is not in the selected brand".to_string(),
            ExclusionReason::LocationMismatch => {
                "contact is not in the selected location".to_string()
            }
            ExclusionReason::MissingTags => "contact has none of the selected tags".to_string(),
            ExclusionReason::SearchMismatch => "contact does not match the search".to_string(),
            ExclusionReason::SurveyHistoryMismatch { required } => match required {
                SurveyHistoryFilter::NeverSurveyed => "contact was already surveyed".to_string(),
                SurveyHistoryFilter::PreviouslySurveyed => {
                    "contact has never been surveyed".to_string()
                }
                SurveyHistoryFilter::Any => "survey history filter not satisfied".to_string(),
            },
            ExclusionReason::RecentlySurveyed {
                days_since,
                minimum_days,
            } => format!(
                "last surveyed {days_since} day(s) ago, filter requires at least {minimum_days}"
            ),
            ExclusionReason::Throttled {
                days_since,
                throttle_days,
            } => format!(
                "surveyed for this event {days_since} day(s) ago, within the {throttle_days}-day throttle window"
            ),
        }
    }
}

/// Outcome of running a contact through the eligibility predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EligibilityDecision {
    Eligible { channels: ChannelSet },
    Excluded { reason: ExclusionReason },
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible { .. })
    }

    pub fn reason(&self) -> Option<&ExclusionReason> {
        match self {
            EligibilityDecision::Eligible { .. } => None,
            EligibilityDecision::Excluded { reason } => Some(reason),
        }
    }

    pub fn channels(&self) -> Option<&ChannelSet> {
        match self {
            EligibilityDecision::Eligible { channels } => Some(channels),
            EligibilityDecision::Excluded { .. } => None,
        }
    }

    pub fn view(&self) -> EligibilityView {
        EligibilityView {
            eligible: self.is_eligible(),
            reason: self.reason().map(ExclusionReason::summary),
        }
    }
}

/// Flattened `{ eligible, reason }` shape surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityView {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
