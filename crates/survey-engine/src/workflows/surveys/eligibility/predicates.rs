use chrono::{DateTime, Utc};

use super::super::channels::{self, ChannelSet, ChannelSettings};
use super::super::domain::{Contact, SurveyEvent, SurveyInvitation};
use super::criteria::{FilterCriteria, SurveyHistoryFilter};
use super::history::{days_between, last_sent_at, window_elapsed};
use super::reasons::ExclusionReason;

pub(crate) fn contact_info(
    contact: &Contact,
    settings: &ChannelSettings,
) -> Result<ChannelSet, ExclusionReason> {
    let channels = channels::resolve(contact, settings);
    if channels.is_empty() {
        Err(ExclusionReason::NoContactInfo)
    } else {
        Ok(channels)
    }
}

pub(crate) fn status(contact: &Contact, criteria: &FilterCriteria) -> Result<(), ExclusionReason> {
    match criteria.status {
        Some(required) if contact.status != required => Err(ExclusionReason::StatusExcluded {
            status: contact.status,
            required,
        }),
        _ => Ok(()),
    }
}

/// Brand, location and tags. Dimensions combine with AND; tags within a dimension with OR.
pub(crate) fn segmentation(
    contact: &Contact,
    criteria: &FilterCriteria,
) -> Result<(), ExclusionReason> {
    if let Some(brand) = &criteria.brand_id {
        if contact.brand_id.as_ref() != Some(brand) {
            return Err(ExclusionReason::BrandMismatch);
        }
    }

    if let Some(location) = &criteria.location_id {
        if contact.location_id.as_ref() != Some(location) {
            return Err(ExclusionReason::LocationMismatch);
        }
    }

    if !criteria.tag_ids.is_empty()
        && !criteria
            .tag_ids
            .iter()
            .any(|tag| contact.tag_ids.contains(tag))
    {
        return Err(ExclusionReason::MissingTags);
    }

    Ok(())
}

pub(crate) fn search(contact: &Contact, criteria: &FilterCriteria) -> Result<(), ExclusionReason> {
    let needle = match criteria.search.as_deref().map(str::trim) {
        Some(needle) if !needle.is_empty() => needle.to_lowercase(),
        _ => return Ok(()),
    };

    let haystacks = [
        Some(contact.full_name()),
        contact.email.clone(),
        contact.phone.clone(),
    ];

    let matched = haystacks
        .iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&needle));

    if matched {
        Ok(())
    } else {
        Err(ExclusionReason::SearchMismatch)
    }
}

/// Cross-event history: looks at the contact's latest invitation for any event.
pub(crate) fn survey_history(
    contact: &Contact,
    criteria: &FilterCriteria,
    invitations: &[SurveyInvitation],
    now: DateTime<Utc>,
) -> Result<(), ExclusionReason> {
    let last = last_sent_at(invitations, &contact.id, None);

    match (criteria.survey_history, last) {
        (SurveyHistoryFilter::NeverSurveyed, Some(_))
        | (SurveyHistoryFilter::PreviouslySurveyed, None) => {
            return Err(ExclusionReason::SurveyHistoryMismatch {
                required: criteria.survey_history,
            });
        }
        _ => {}
    }

    if let (Some(minimum_days), Some(last)) = (criteria.min_days_since_survey, last) {
        if !window_elapsed(Some(last), minimum_days, now) {
            return Err(ExclusionReason::RecentlySurveyed {
                days_since: days_between(last, now).max(0),
                minimum_days,
            });
        }
    }

    Ok(())
}

/// Same-event throttle gate applied at send time.
pub(crate) fn throttle(
    contact: &Contact,
    event: &SurveyEvent,
    invitations: &[SurveyInvitation],
    now: DateTime<Utc>,
) -> Result<(), ExclusionReason> {
    let last = last_sent_at(invitations, &contact.id, Some(&event.id));

    match last {
        Some(last) if !window_elapsed(Some(last), event.throttle_days, now) => {
            Err(ExclusionReason::Throttled {
                days_since: days_between(last, now).max(0),
                throttle_days: event.throttle_days,
            })
        }
        _ => Ok(()),
    }
}
