use serde::{Deserialize, Serialize};

use super::super::domain::{BrandId, ContactStatus, LocationId, TagId};

/// Segmentation the caller selected for an audience. Empty fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ContactStatus>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// Matches contacts holding any of these tags.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub survey_history: SurveyHistoryFilter,
    /// Cross-event: compares against the contact's most recent invitation for any event.
    #[serde(default)]
    pub min_days_since_survey: Option<u32>,
}

impl FilterCriteria {
    /// Criteria used for real sends: only active contacts, no further segmentation.
    pub fn active_only() -> Self {
        Self {
            status: Some(ContactStatus::Active),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyHistoryFilter {
    #[default]
    Any,
    NeverSurveyed,
    PreviouslySurveyed,
}
