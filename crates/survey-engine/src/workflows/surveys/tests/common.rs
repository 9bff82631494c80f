use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::workflows::surveys::api_keys::{KeyHasher, SecureRandom};
use crate::workflows::surveys::{
    AnswerValue, ApiKeyId, ApiKeyRecord, ApiKeyRepository, AutomationRepository, AutomationRule,
    AutomationSend, BrandId, ButtonKind, Channel, ChannelOverride, Contact, ContactId,
    ContactStatus, CtaButton, EventId, EventStatus, FeedbackCondition, FilterCriteria,
    KeyIssueError, Location, LocationId, RepositoryError, ResponseId, RuleId, RuleStatus,
    Scheduling, SentimentTier, SurveyAnswer, SurveyEvent, SurveyInvitation, SurveyRepository,
    SurveyResponse, SurveyService, TagId, ThankYouBlock, ThankYouConfig, TriggerContact,
    TriggerRequest,
};

pub(super) const BRAND: &str = "brand-north";
pub(super) const OTHER_BRAND: &str = "brand-south";
pub(super) const LOCATION: &str = "loc-downtown";
pub(super) const EVENT: &str = "evt-checkout";
pub(super) const OTHER_EVENT: &str = "evt-delivery";
pub(super) const PLACE_ID: &str = "ChIJ-downtown";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub(super) fn contact(id: &str) -> Contact {
    Contact {
        id: ContactId::from(id),
        first_name: "Dana".to_string(),
        last_name: "Whitfield".to_string(),
        email: Some(format!("{id}@example.com")),
        phone: Some("+15155550142".to_string()),
        preferred_channel: None,
        status: ContactStatus::Active,
        language: Some("en".to_string()),
        brand_id: Some(BrandId::from(BRAND)),
        location_id: Some(LocationId::from(LOCATION)),
        tag_ids: BTreeSet::from([TagId::from("vip")]),
        external_id: None,
    }
}

pub(super) fn email_only(id: &str) -> Contact {
    Contact {
        phone: None,
        ..contact(id)
    }
}

pub(super) fn phone_only(id: &str) -> Contact {
    Contact {
        email: None,
        ..contact(id)
    }
}

pub(super) fn location() -> Location {
    Location {
        id: LocationId::from(LOCATION),
        brand_id: BrandId::from(BRAND),
        name: "Downtown".to_string(),
        google_place_id: Some(PLACE_ID.to_string()),
    }
}

pub(super) fn button(id: &str, kind: ButtonKind, url: &str) -> CtaButton {
    CtaButton {
        id: id.to_string(),
        label: format!("{id} label"),
        kind,
        url: url.to_string(),
    }
}

pub(super) fn thank_you_config() -> ThankYouConfig {
    ThankYouConfig {
        promoters: Some(ThankYouBlock {
            message: "Thanks for the love!".to_string(),
            buttons: vec![
                button("review", ButtonKind::GoogleReview, ""),
                button("offers", ButtonKind::CustomLink, "https://example.com/offers"),
            ],
        }),
        passives: Some(ThankYouBlock {
            message: "Thanks, we're working on it.".to_string(),
            buttons: Vec::new(),
        }),
        detractors: Some(ThankYouBlock {
            message: "Sorry we missed the mark.".to_string(),
            buttons: vec![button(
                "support",
                ButtonKind::CustomLink,
                "https://example.com/support",
            )],
        }),
    }
}

pub(super) fn event(id: &str) -> SurveyEvent {
    SurveyEvent {
        id: EventId::from(id),
        name: format!("{id} survey"),
        status: EventStatus::Active,
        throttle_days: 90,
        brand_id: Some(BrandId::from(BRAND)),
        location_id: Some(LocationId::from(LOCATION)),
        thank_you: thank_you_config(),
    }
}

pub(super) fn invitation(contact_id: &str, event_id: &str, days: i64) -> SurveyInvitation {
    SurveyInvitation {
        contact_id: ContactId::from(contact_id),
        event_id: EventId::from(event_id),
        channel: Channel::Email,
        sent_at: Some(days_ago(days)),
        completed_at: None,
    }
}

pub(super) fn response(contact_id: &str, score: Option<u8>) -> SurveyResponse {
    SurveyResponse {
        id: ResponseId(format!("resp-{contact_id}")),
        event_id: EventId::from(EVENT),
        contact_id: ContactId::from(contact_id),
        location_id: None,
        nps_score: score,
        completed_at: now(),
        consent_given: true,
        answers: Vec::new(),
    }
}

pub(super) fn with_comment(mut response: SurveyResponse, comment: &str) -> SurveyResponse {
    response.answers.push(SurveyAnswer {
        question_id: "comment".to_string(),
        value: AnswerValue::Text(comment.to_string()),
    });
    response
}

pub(super) fn rule(id: &str, tier: SentimentTier, created_days_ago: i64) -> AutomationRule {
    AutomationRule {
        id: RuleId::from(id),
        name: format!("{id} follow-up"),
        trigger_group: tier,
        feedback_condition: FeedbackCondition::Either,
        event_id: None,
        brand_id: None,
        channel: Channel::Email,
        delay_hours: 0,
        throttle_days: 0,
        status: RuleStatus::Active,
        message: "We appreciate you.".to_string(),
        created_at: days_ago(created_days_ago),
    }
}

pub(super) fn send(rule_id: &str, contact_id: &str, days: i64) -> AutomationSend {
    AutomationSend {
        rule_id: RuleId::from(rule_id),
        contact_id: ContactId::from(contact_id),
        sent_at: days_ago(days),
    }
}

pub(super) fn trigger_request(email: &str) -> TriggerRequest {
    TriggerRequest {
        event_id: EventId::from(EVENT),
        location_id: LocationId::from(LOCATION),
        contact: TriggerContact {
            first_name: "Morgan".to_string(),
            last_name: "Lee".to_string(),
            email: Some(email.to_string()),
            phone: None,
            preferred_channel: None,
            preferred_language: None,
            tags: Vec::new(),
            external_id: None,
            status: None,
        },
        channel: ChannelOverride::Preferred,
        scheduling: Scheduling::default(),
    }
}

pub(super) fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

pub(super) type MemoryService = SurveyService<MemorySurveys, MemoryAutomations, MemoryKeys>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<MemorySurveys>,
    Arc<MemoryAutomations>,
    Arc<MemoryKeys>,
) {
    let surveys = Arc::new(MemorySurveys::seeded());
    let automations = Arc::new(MemoryAutomations::default());
    let keys = Arc::new(MemoryKeys::default());
    let service = SurveyService::new(
        surveys.clone(),
        automations.clone(),
        keys.clone(),
        &engine_config(),
    );
    (service, surveys, automations, keys)
}

#[derive(Default)]
pub(super) struct MemorySurveys {
    contacts: Mutex<Vec<Contact>>,
    events: Mutex<HashMap<EventId, SurveyEvent>>,
    locations: Mutex<HashMap<LocationId, Location>>,
    invitations: Mutex<Vec<SurveyInvitation>>,
}

impl MemorySurveys {
    pub(super) fn seeded() -> Self {
        let repository = Self::default();
        repository.put_location(location());
        repository.put_event(event(EVENT));
        repository.put_event(event(OTHER_EVENT));
        repository
    }

    pub(super) fn put_contact(&self, contact: Contact) {
        let mut guard = self.contacts.lock().expect("contact mutex poisoned");
        guard.retain(|existing| existing.id != contact.id);
        guard.push(contact);
    }

    pub(super) fn put_event(&self, event: SurveyEvent) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .insert(event.id.clone(), event);
    }

    pub(super) fn put_location(&self, location: Location) {
        self.locations
            .lock()
            .expect("location mutex poisoned")
            .insert(location.id.clone(), location);
    }

    pub(super) fn put_invitation(&self, invitation: SurveyInvitation) {
        self.invitations
            .lock()
            .expect("invitation mutex poisoned")
            .push(invitation);
    }

    pub(super) fn all_invitations(&self) -> Vec<SurveyInvitation> {
        self.invitations
            .lock()
            .expect("invitation mutex poisoned")
            .clone()
    }

    pub(super) fn contact_count(&self) -> usize {
        self.contacts.lock().expect("contact mutex poisoned").len()
    }
}

impl SurveyRepository for MemorySurveys {
    fn find_contacts(&self, criteria: &FilterCriteria) -> Result<Vec<Contact>, RepositoryError> {
        let guard = self.contacts.lock().expect("contact mutex poisoned");
        Ok(guard
            .iter()
            .filter(|contact| {
                criteria
                    .brand_id
                    .as_ref()
                    .map_or(true, |brand| contact.brand_id.as_ref() == Some(brand))
            })
            .cloned()
            .collect())
    }

    fn contact(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let guard = self.contacts.lock().expect("contact mutex poisoned");
        Ok(guard.iter().find(|contact| &contact.id == id).cloned())
    }

    fn upsert_contact(&self, contact: Contact) -> Result<Contact, RepositoryError> {
        let mut guard = self.contacts.lock().expect("contact mutex poisoned");
        let existing = guard.iter_mut().find(|existing| {
            existing.brand_id == contact.brand_id
                && ((contact.email.is_some() && existing.email == contact.email)
                    || (contact.phone.is_some() && existing.phone == contact.phone))
        });

        match existing {
            Some(existing) => {
                let id = existing.id.clone();
                *existing = Contact { id, ..contact };
                Ok(existing.clone())
            }
            None => {
                guard.push(contact.clone());
                Ok(contact)
            }
        }
    }

    fn event(&self, id: &EventId) -> Result<Option<SurveyEvent>, RepositoryError> {
        Ok(self
            .events
            .lock()
            .expect("event mutex poisoned")
            .get(id)
            .cloned())
    }

    fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError> {
        Ok(self
            .locations
            .lock()
            .expect("location mutex poisoned")
            .get(id)
            .cloned())
    }

    fn invitations_for(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SurveyInvitation>, RepositoryError> {
        let guard = self.invitations.lock().expect("invitation mutex poisoned");
        Ok(guard
            .iter()
            .filter(|invitation| &invitation.contact_id == contact_id)
            .cloned()
            .collect())
    }

    fn record_invitation(&self, invitation: SurveyInvitation) -> Result<(), RepositoryError> {
        self.put_invitation(invitation);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryAutomations {
    rules: Mutex<Vec<AutomationRule>>,
    sends: Mutex<Vec<AutomationSend>>,
}

impl MemoryAutomations {
    pub(super) fn put_rule(&self, rule: AutomationRule) {
        self.rules.lock().expect("rule mutex poisoned").push(rule);
    }

    pub(super) fn all_sends(&self) -> Vec<AutomationSend> {
        self.sends.lock().expect("send mutex poisoned").clone()
    }
}

impl AutomationRepository for MemoryAutomations {
    fn rules(&self) -> Result<Vec<AutomationRule>, RepositoryError> {
        Ok(self.rules.lock().expect("rule mutex poisoned").clone())
    }

    fn sends_for(&self, contact_id: &ContactId) -> Result<Vec<AutomationSend>, RepositoryError> {
        let guard = self.sends.lock().expect("send mutex poisoned");
        Ok(guard
            .iter()
            .filter(|send| &send.contact_id == contact_id)
            .cloned()
            .collect())
    }

    fn record_send(&self, send: AutomationSend) -> Result<(), RepositoryError> {
        self.sends.lock().expect("send mutex poisoned").push(send);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryKeys {
    records: Mutex<HashMap<ApiKeyId, ApiKeyRecord>>,
}

impl MemoryKeys {
    pub(super) fn get(&self, id: &ApiKeyId) -> Option<ApiKeyRecord> {
        self.records
            .lock()
            .expect("key mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl ApiKeyRepository for MemoryKeys {
    fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("key mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApiKeyRecord) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("key mutex poisoned")
            .insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ApiKeyId) -> Result<Option<ApiKeyRecord>, RepositoryError> {
        Ok(self.get(id))
    }

    fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<ApiKeyRecord>, RepositoryError> {
        let guard = self.records.lock().expect("key mutex poisoned");
        let mut records: Vec<ApiKeyRecord> = guard
            .values()
            .filter(|record| &record.brand_id == brand_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(records)
    }
}

pub(super) struct UnavailableKeys;

impl ApiKeyRepository for UnavailableKeys {
    fn insert(&self, _record: ApiKeyRecord) -> Result<ApiKeyRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ApiKeyRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApiKeyId) -> Result<Option<ApiKeyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_for_brand(&self, _brand_id: &BrandId) -> Result<Vec<ApiKeyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Deterministic byte source so issued keys can be asserted on.
pub(super) struct FixedRandom(pub(super) u8);

impl SecureRandom for FixedRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyIssueError> {
        dest.fill(self.0);
        Ok(())
    }
}

pub(super) struct FailingRandom;

impl SecureRandom for FailingRandom {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), KeyIssueError> {
        Err(KeyIssueError::RandomUnavailable("entropy pool closed".to_string()))
    }
}

pub(super) struct TruncatedHasher;

impl KeyHasher for TruncatedHasher {
    fn hex_digest(&self, _input: &str) -> Result<String, KeyIssueError> {
        Ok("abc123".to_string())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
