use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::api_keys::{bearer_token, ApiKeyIssuer, ApiKeyRecord, KeyIssueError};
use super::automation::{matching_rules, plan_follow_ups, ResponseContext, ScheduledFollowUp};
use super::channels::{ChannelSet, ChannelSettings};
use super::classification::SentimentTier;
use super::domain::{
    ApiKeyId, BrandId, ContactId, EventId, EventStatus, LocationId, ResponseId, RuleId,
    SurveyInvitation, SurveyResponse,
};
use super::eligibility::{
    EligibilityDecision, EligibilityFilter, EligibilityMode, EligibilityView, ExclusionReason,
    FilterCriteria,
};
use super::repository::{ApiKeyRepository, AutomationRepository, RepositoryError, SurveyRepository};
use super::thank_you::{self, ThankYouContent};
use super::webhook::{TriggerRejection, TriggerRequest};
use crate::config::EngineConfig;

/// Facade composing the decision components with the storage ports.
pub struct SurveyService<S, A, K> {
    surveys: Arc<S>,
    automations: Arc<A>,
    keys: Arc<K>,
    issuer: ApiKeyIssuer,
}

static CONTACT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static API_KEY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_contact_id() -> ContactId {
    let id = CONTACT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ContactId(format!("contact-{id:06}"))
}

fn next_api_key_id() -> ApiKeyId {
    let id = API_KEY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApiKeyId(format!("key-{id:06}"))
}

impl<S, A, K> SurveyService<S, A, K>
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    pub fn new(surveys: Arc<S>, automations: Arc<A>, keys: Arc<K>, config: &EngineConfig) -> Self {
        Self {
            surveys,
            automations,
            keys,
            issuer: ApiKeyIssuer::new(config.api_key_tag.clone()),
        }
    }

    /// Decide whether `contact_id` may be surveyed for `event_id` right now, and on which
    /// channels. Only active contacts are admitted; the event's draft status is not checked.
    pub fn plan_send(
        &self,
        contact_id: &ContactId,
        event_id: &EventId,
        settings: ChannelSettings,
        now: DateTime<Utc>,
    ) -> Result<SendPlan, SurveyServiceError> {
        let contact = self
            .surveys
            .contact(contact_id)?
            .ok_or_else(|| SurveyServiceError::ContactNotFound(contact_id.clone()))?;
        let event = self
            .surveys
            .event(event_id)?
            .ok_or_else(|| SurveyServiceError::EventNotFound(event_id.clone()))?;
        let invitations = self.surveys.invitations_for(contact_id)?;

        let filter = EligibilityFilter::new(FilterCriteria::active_only(), settings);
        let decision = filter.evaluate(&contact, &event, &invitations, now, EligibilityMode::Send);

        match decision.reason() {
            Some(reason) => debug!(
                contact_id = %contact_id,
                event_id = %event_id,
                reason = %reason.summary(),
                "send excluded"
            ),
            None => debug!(contact_id = %contact_id, event_id = %event_id, "send admitted"),
        }

        Ok(SendPlan {
            contact_id: contact_id.clone(),
            event_id: event_id.clone(),
            decision,
        })
    }

    /// Preview which contacts a segmentation selects for an event. Throttling is not applied.
    pub fn audience(
        &self,
        event_id: &EventId,
        criteria: FilterCriteria,
        settings: ChannelSettings,
        now: DateTime<Utc>,
    ) -> Result<AudienceReport, SurveyServiceError> {
        let event = self
            .surveys
            .event(event_id)?
            .ok_or_else(|| SurveyServiceError::EventNotFound(event_id.clone()))?;

        let contacts = self.surveys.find_contacts(&criteria)?;
        let mut invitations = Vec::new();
        for contact in &contacts {
            invitations.extend(self.surveys.invitations_for(&contact.id)?);
        }

        let filter = EligibilityFilter::new(criteria, settings);
        let partition =
            filter.partition(&contacts, &event, &invitations, now, EligibilityMode::Preview);

        let report = AudienceReport {
            event_id: event_id.clone(),
            admitted: partition
                .admitted
                .into_iter()
                .map(|entry| AudienceEntry {
                    contact_id: entry.contact.id.clone(),
                    channels: entry.channels,
                })
                .collect(),
            excluded: partition
                .excluded
                .into_iter()
                .map(|entry| ExcludedEntry {
                    contact_id: entry.contact.id.clone(),
                    summary: entry.reason.summary(),
                    reason: entry.reason,
                })
                .collect(),
        };

        info!(
            event_id = %event_id,
            admitted = report.admitted.len(),
            excluded = report.excluded.len(),
            "audience evaluated"
        );

        Ok(report)
    }

    /// Classify a completed response, route its thank-you content and schedule follow-ups.
    pub fn record_response(
        &self,
        response: &SurveyResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseOutcome, SurveyServiceError> {
        let contact = self
            .surveys
            .contact(&response.contact_id)?
            .ok_or_else(|| SurveyServiceError::ContactNotFound(response.contact_id.clone()))?;
        let event = self
            .surveys
            .event(&response.event_id)?
            .ok_or_else(|| SurveyServiceError::EventNotFound(response.event_id.clone()))?;

        let location = match response
            .location_id
            .as_ref()
            .or(event.location_id.as_ref())
            .or(contact.location_id.as_ref())
        {
            Some(location_id) => self.surveys.location(location_id)?,
            None => None,
        };

        let tier = SentimentTier::from_score(response.nps_score);
        if tier.is_none() {
            warn!(
                response_id = %response.id,
                score = ?response.nps_score,
                "response has no valid score; skipping tier-based routing"
            );
        }

        let thank_you = thank_you::route(response.nps_score, &event.thank_you, location.as_ref());

        let rules = self.automations.rules()?;
        let sends = self.automations.sends_for(&contact.id)?;
        let context = ResponseContext::new(response, &contact, Some(&event));
        let matched = matching_rules(&context, &rules, &sends, now);
        let follow_ups = plan_follow_ups(&context, &matched);

        for follow_up in &follow_ups {
            self.automations.record_send(follow_up.as_send())?;
        }

        info!(
            response_id = %response.id,
            tier = tier.map(SentimentTier::label).unwrap_or("none"),
            matched_rules = matched.len(),
            follow_ups = follow_ups.len(),
            "response recorded"
        );

        Ok(ResponseOutcome {
            response_id: response.id.clone(),
            tier,
            thank_you,
            matched_rules: matched.iter().map(|rule| rule.id.clone()).collect(),
            follow_ups,
        })
    }

    /// Mint a key for a brand. The plaintext is only present in the returned value.
    pub fn issue_api_key(
        &self,
        name: &str,
        brand_id: BrandId,
        now: DateTime<Utc>,
    ) -> Result<IssuedApiKey, SurveyServiceError> {
        let material = self.issuer.issue()?;
        let record = ApiKeyRecord::new(next_api_key_id(), name, brand_id, &material, now);
        let stored = self.keys.insert(record)?;

        info!(
            key_id = %stored.id,
            key_prefix = %stored.key_prefix,
            brand_id = %stored.brand_id,
            "api key issued"
        );

        Ok(IssuedApiKey {
            record: stored,
            full_key: material.full_key,
        })
    }

    pub fn revoke_api_key(
        &self,
        brand_id: &BrandId,
        key_id: &ApiKeyId,
        now: DateTime<Utc>,
    ) -> Result<ApiKeyRecord, SurveyServiceError> {
        let mut record = self
            .keys
            .fetch(key_id)?
            .filter(|record| &record.brand_id == brand_id)
            .ok_or_else(|| SurveyServiceError::ApiKeyNotFound(key_id.clone()))?;

        if record.revoke(now) {
            self.keys.update(record.clone())?;
            info!(key_id = %key_id, key_prefix = %record.key_prefix, "api key revoked");
        }

        Ok(record)
    }

    pub fn list_api_keys(
        &self,
        brand_id: &BrandId,
    ) -> Result<Vec<ApiKeyRecord>, SurveyServiceError> {
        Ok(self.keys.list_for_brand(brand_id)?)
    }

    /// Resolve an `Authorization` header to a live key of `brand_id`, stamping `last_used_at`.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        brand_id: &BrandId,
        now: DateTime<Utc>,
    ) -> Result<ApiKeyRecord, SurveyServiceError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(SurveyServiceError::Unauthorized)?;

        let records = self.keys.list_for_brand(brand_id)?;
        let mut record = self
            .issuer
            .verify(token, &records, brand_id)
            .cloned()
            .ok_or(SurveyServiceError::Unauthorized)?;

        record.last_used_at = Some(now);
        self.keys.update(record.clone())?;
        Ok(record)
    }

    /// Handle an inbound trigger: authenticate against the location's brand, validate the
    /// payload, upsert the contact, and plan the send.
    ///
    /// This is the distribution entry point, so draft and inactive events are refused here, as
    /// are events scoped to a different brand or location than the one the key speaks for.
    pub fn trigger(
        &self,
        authorization: Option<&str>,
        request: TriggerRequest,
        now: DateTime<Utc>,
    ) -> Result<TriggerOutcome, SurveyServiceError> {
        let location = self
            .surveys
            .location(&request.location_id)?
            .ok_or_else(|| SurveyServiceError::LocationNotFound(request.location_id.clone()))?;
        let key = self.authenticate(authorization, &location.brand_id, now)?;

        request.validate()?;

        let event = self
            .surveys
            .event(&request.event_id)?
            .ok_or_else(|| SurveyServiceError::EventNotFound(request.event_id.clone()))?;
        let foreign_brand = event
            .brand_id
            .as_ref()
            .is_some_and(|brand| brand != &location.brand_id);
        let foreign_location = event
            .location_id
            .as_ref()
            .is_some_and(|location_id| location_id != &location.id);
        if foreign_brand || foreign_location {
            warn!(
                key_prefix = %key.key_prefix,
                event_id = %event.id,
                location_id = %location.id,
                "trigger refused for event outside the caller's scope"
            );
            return Err(SurveyServiceError::EventOutOfScope {
                event_id: event.id,
                location_id: location.id,
            });
        }
        if event.status != EventStatus::Active {
            return Err(SurveyServiceError::EventNotDistributable {
                event_id: event.id,
                status: event.status,
            });
        }

        let send_at = request.scheduling.send_at(now)?;
        let contact = request.contact.to_contact(
            next_contact_id(),
            location.brand_id.clone(),
            location.id.clone(),
        );
        let contact = self.surveys.upsert_contact(contact)?;
        let invitations = self.surveys.invitations_for(&contact.id)?;

        let filter =
            EligibilityFilter::new(FilterCriteria::active_only(), request.channel_settings());
        let decision = filter.evaluate(&contact, &event, &invitations, now, EligibilityMode::Send);

        if let Some(channels) = decision.channels() {
            for channel in channels.iter() {
                self.surveys.record_invitation(SurveyInvitation {
                    contact_id: contact.id.clone(),
                    event_id: event.id.clone(),
                    channel,
                    sent_at: Some(send_at),
                    completed_at: None,
                })?;
            }
        }

        info!(
            key_prefix = %key.key_prefix,
            contact_id = %contact.id,
            event_id = %event.id,
            eligible = decision.is_eligible(),
            "survey trigger handled"
        );

        Ok(TriggerOutcome {
            contact_id: contact.id,
            event_id: event.id,
            location_id: location.id,
            eligibility: decision.view(),
            channels: decision.channels().cloned(),
            send_at: decision.is_eligible().then_some(send_at),
        })
    }
}

/// Result of a single-contact send decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPlan {
    pub contact_id: ContactId,
    pub event_id: EventId,
    pub decision: EligibilityDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceEntry {
    pub contact_id: ContactId,
    pub channels: ChannelSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedEntry {
    pub contact_id: ContactId,
    pub reason: ExclusionReason,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceReport {
    pub event_id: EventId,
    pub admitted: Vec<AudienceEntry>,
    pub excluded: Vec<ExcludedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseOutcome {
    pub response_id: ResponseId,
    pub tier: Option<SentimentTier>,
    pub thank_you: ThankYouContent,
    pub matched_rules: Vec<RuleId>,
    pub follow_ups: Vec<ScheduledFollowUp>,
}

/// A newly issued key. `full_key` is redacted from `Debug` and must be shown to the caller once.
#[derive(Debug)]
pub struct IssuedApiKey {
    pub record: ApiKeyRecord,
    pub full_key: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerOutcome {
    pub contact_id: ContactId,
    pub event_id: EventId,
    pub location_id: LocationId,
    pub eligibility: EligibilityView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<DateTime<Utc>>,
}

/// Error raised by the survey service.
#[derive(Debug, thiserror::Error)]
pub enum SurveyServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    KeyIssue(#[from] KeyIssueError),
    #[error(transparent)]
    Trigger(#[from] TriggerRejection),
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),
    #[error("event {0} not found")]
    EventNotFound(EventId),
    #[error("location {0} not found")]
    LocationNotFound(LocationId),
    #[error("api key {0} not found")]
    ApiKeyNotFound(ApiKeyId),
    #[error("missing or invalid api key")]
    Unauthorized,
    #[error("event {event_id} is not available at location {location_id}")]
    EventOutOfScope {
        event_id: EventId,
        location_id: LocationId,
    },
    #[error("event {event_id} is {} and cannot be distributed", .status.label())]
    EventNotDistributable {
        event_id: EventId,
        status: EventStatus,
    },
}
