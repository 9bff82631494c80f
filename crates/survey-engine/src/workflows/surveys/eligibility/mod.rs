mod criteria;
pub mod history;
mod predicates;
mod reasons;

pub use criteria::{FilterCriteria, SurveyHistoryFilter};
pub use reasons::{EligibilityDecision, EligibilityView, ExclusionReason};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channels::{ChannelSet, ChannelSettings};
use super::domain::{Contact, SurveyEvent, SurveyInvitation};

/// Whether the same-event throttle gate participates in the decision.
///
/// Audience previews show who the segmentation selects; only real sends are throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityMode {
    Preview,
    Send,
}

/// Stateless filter composing the contact-info, segmentation, history, and throttle predicates.
///
/// Draft events are evaluated like any other so they can be previewed; refusing to distribute a
/// draft is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    criteria: FilterCriteria,
    channels: ChannelSettings,
}

impl EligibilityFilter {
    pub fn new(criteria: FilterCriteria, channels: ChannelSettings) -> Self {
        Self { criteria, channels }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn channel_settings(&self) -> &ChannelSettings {
        &self.channels
    }

    /// Run the predicates in order, stopping at the first exclusion.
    ///
    /// `invitations` may hold other contacts' invitations; only the ones for `contact` count.
    pub fn evaluate(
        &self,
        contact: &Contact,
        event: &SurveyEvent,
        invitations: &[SurveyInvitation],
        now: DateTime<Utc>,
        mode: EligibilityMode,
    ) -> EligibilityDecision {
        match self.check(contact, event, invitations, now, mode) {
            Ok(decision) => decision,
            Err(reason) => EligibilityDecision::Excluded { reason },
        }
    }

    fn check(
        &self,
        contact: &Contact,
        event: &SurveyEvent,
        invitations: &[SurveyInvitation],
        now: DateTime<Utc>,
        mode: EligibilityMode,
    ) -> Result<EligibilityDecision, ExclusionReason> {
        let channels = predicates::contact_info(contact, &self.channels)?;
        predicates::status(contact, &self.criteria)?;
        predicates::segmentation(contact, &self.criteria)?;
        predicates::search(contact, &self.criteria)?;
        predicates::survey_history(contact, &self.criteria, invitations, now)?;
        if mode == EligibilityMode::Send {
            predicates::throttle(contact, event, invitations, now)?;
        }

        Ok(EligibilityDecision::Eligible { channels })
    }

    /// Single pass over a batch of contacts. Nothing is retained between contacts.
    pub fn partition<'a>(
        &self,
        contacts: &'a [Contact],
        event: &SurveyEvent,
        invitations: &[SurveyInvitation],
        now: DateTime<Utc>,
        mode: EligibilityMode,
    ) -> AudiencePartition<'a> {
        let mut partition = AudiencePartition::default();
        for contact in contacts {
            match self.evaluate(contact, event, invitations, now, mode) {
                EligibilityDecision::Eligible { channels } => {
                    partition.admitted.push(AdmittedContact { contact, channels })
                }
                EligibilityDecision::Excluded { reason } => {
                    partition.excluded.push(ExcludedContact { contact, reason })
                }
            }
        }
        partition
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedContact<'a> {
    pub contact: &'a Contact,
    pub channels: ChannelSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedContact<'a> {
    pub contact: &'a Contact,
    pub reason: ExclusionReason,
}

/// Batch result: contacts in input order, split by decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudiencePartition<'a> {
    pub admitted: Vec<AdmittedContact<'a>>,
    pub excluded: Vec<ExcludedContact<'a>>,
}
