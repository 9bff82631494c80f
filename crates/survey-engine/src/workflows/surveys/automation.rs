use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::classification::SentimentTier;
use super::domain::{
    BrandId, Channel, Contact, ContactId, EventId, RuleId, SurveyEvent, SurveyResponse,
};
use super::eligibility::history::window_elapsed;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCondition {
    #[default]
    Either,
    WithFeedback,
    WithoutFeedback,
}

impl FeedbackCondition {
    pub const fn accepts(self, has_feedback: bool) -> bool {
        match self {
            FeedbackCondition::Either => true,
            FeedbackCondition::WithFeedback => has_feedback,
            FeedbackCondition::WithoutFeedback => !has_feedback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Inactive,
}

/// Admin-authored follow-up trigger. `event_id`/`brand_id` left empty apply to everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    pub trigger_group: SentimentTier,
    #[serde(default)]
    pub feedback_condition: FeedbackCondition,
    #[serde(default)]
    pub event_id: Option<EventId>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    pub channel: Channel,
    #[serde(default)]
    pub delay_hours: u32,
    #[serde(default)]
    pub throttle_days: u32,
    pub status: RuleStatus,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A follow-up already sent (or scheduled) to a contact under a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSend {
    pub rule_id: RuleId,
    pub contact_id: ContactId,
    pub sent_at: DateTime<Utc>,
}

/// The response being evaluated together with the records that scope it.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub response: &'a SurveyResponse,
    pub contact: &'a Contact,
    pub event: Option<&'a SurveyEvent>,
}

impl<'a> ResponseContext<'a> {
    pub fn new(
        response: &'a SurveyResponse,
        contact: &'a Contact,
        event: Option<&'a SurveyEvent>,
    ) -> Self {
        Self {
            response,
            contact,
            event,
        }
    }

    /// Brand of the response: the event's brand, else the contact's.
    pub fn brand_id(&self) -> Option<&'a BrandId> {
        self.event
            .and_then(|event| event.brand_id.as_ref())
            .or(self.contact.brand_id.as_ref())
    }
}

/// Every rule that should fire for the response, most recently authored first.
///
/// An unscored response matches nothing. Deduplicating overlapping rules is left to the
/// scheduler.
pub fn matching_rules<'r>(
    context: &ResponseContext<'_>,
    rules: &'r [AutomationRule],
    sends: &[AutomationSend],
    now: DateTime<Utc>,
) -> Vec<&'r AutomationRule> {
    let Some(tier) = SentimentTier::from_score(context.response.nps_score) else {
        return Vec::new();
    };
    let has_feedback = context.response.has_feedback();
    let brand_id = context.brand_id();

    let mut matched: Vec<&AutomationRule> = rules
        .iter()
        .filter(|rule| rule.status == RuleStatus::Active)
        .filter(|rule| rule.trigger_group == tier)
        .filter(|rule| {
            rule.event_id
                .as_ref()
                .map_or(true, |event_id| event_id == &context.response.event_id)
        })
        .filter(|rule| {
            rule.brand_id
                .as_ref()
                .map_or(true, |required| brand_id == Some(required))
        })
        .filter(|rule| rule.feedback_condition.accepts(has_feedback))
        .filter(|rule| {
            let last = last_send_at(sends, &rule.id, &context.contact.id);
            window_elapsed(last, rule.throttle_days, now)
        })
        .collect();

    matched.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    matched
}

fn last_send_at(
    sends: &[AutomationSend],
    rule_id: &RuleId,
    contact_id: &ContactId,
) -> Option<DateTime<Utc>> {
    sends
        .iter()
        .filter(|send| &send.rule_id == rule_id && &send.contact_id == contact_id)
        .map(|send| send.sent_at)
        .max()
}

/// A follow-up the scheduler should deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledFollowUp {
    pub rule_id: RuleId,
    pub contact_id: ContactId,
    pub channel: Channel,
    pub send_at: DateTime<Utc>,
}

impl ScheduledFollowUp {
    pub fn as_send(&self) -> AutomationSend {
        AutomationSend {
            rule_id: self.rule_id.clone(),
            contact_id: self.contact_id.clone(),
            sent_at: self.send_at,
        }
    }
}

/// Turn matched rules into delivery slots, skipping rules whose channel the contact cannot
/// receive. Slots are offset from the response completion time.
pub fn plan_follow_ups(
    context: &ResponseContext<'_>,
    matched: &[&AutomationRule],
) -> Vec<ScheduledFollowUp> {
    matched
        .iter()
        .filter(|rule| context.contact.can_receive(rule.channel))
        .map(|rule| ScheduledFollowUp {
            rule_id: rule.id.clone(),
            contact_id: context.contact.id.clone(),
            channel: rule.channel,
            send_at: context.response.completed_at + Duration::hours(i64::from(rule.delay_hours)),
        })
        .collect()
}
