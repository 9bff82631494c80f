use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use survey_engine::config::EngineConfig;
use survey_engine::workflows::surveys::{
    ApiKeyId, ApiKeyRecord, ApiKeyRepository, AutomationRepository, AutomationRule,
    AutomationSend, BrandId, ButtonKind, Channel, Contact, ContactId, CtaButton, EventId,
    EventStatus, FeedbackCondition, FilterCriteria, Location, LocationId, RepositoryError, RuleId,
    RuleStatus, SentimentTier, SurveyEvent, SurveyInvitation, SurveyRepository, ThankYouBlock,
    ThankYouConfig,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySurveyStore {
    contacts: Arc<Mutex<Vec<Contact>>>,
    events: Arc<Mutex<HashMap<EventId, SurveyEvent>>>,
    locations: Arc<Mutex<HashMap<LocationId, Location>>>,
    invitations: Arc<Mutex<Vec<SurveyInvitation>>>,
}

impl InMemorySurveyStore {
    pub(crate) fn insert_event(&self, event: SurveyEvent) {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.insert(event.id.clone(), event);
    }

    pub(crate) fn insert_location(&self, location: Location) {
        let mut guard = self.locations.lock().expect("location mutex poisoned");
        guard.insert(location.id.clone(), location);
    }
}

/// Contacts are matched within a brand only.
fn same_identity(existing: &Contact, incoming: &Contact) -> bool {
    if existing.brand_id != incoming.brand_id {
        return false;
    }
    if incoming.external_id.is_some() && existing.external_id == incoming.external_id {
        return true;
    }
    if incoming.email.is_some() && existing.email == incoming.email {
        return true;
    }
    incoming.phone.is_some() && existing.phone == incoming.phone
}

/// Fold a trigger's view of a contact into the stored record. Absent fields keep stored values.
fn merge_contact(existing: &mut Contact, incoming: Contact) {
    existing.first_name = incoming.first_name;
    existing.last_name = incoming.last_name;
    existing.status = incoming.status;
    existing.email = incoming.email.or(existing.email.take());
    existing.phone = incoming.phone.or(existing.phone.take());
    existing.preferred_channel = incoming.preferred_channel.or(existing.preferred_channel);
    existing.language = incoming.language.or(existing.language.take());
    existing.location_id = incoming.location_id.or(existing.location_id.take());
    existing.external_id = incoming.external_id.or(existing.external_id.take());
    existing.tag_ids.extend(incoming.tag_ids);
}

impl SurveyRepository for InMemorySurveyStore {
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
        match guard
            .iter_mut()
            .find(|existing| same_identity(existing, &contact))
        {
            Some(existing) => {
                merge_contact(existing, contact);
                Ok(existing.clone())
            }
            None => {
                guard.push(contact.clone());
                Ok(contact)
            }
        }
    }

    fn event(&self, id: &EventId) -> Result<Option<SurveyEvent>, RepositoryError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError> {
        let guard = self.locations.lock().expect("location mutex poisoned");
        Ok(guard.get(id).cloned())
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
        let mut guard = self.invitations.lock().expect("invitation mutex poisoned");
        guard.push(invitation);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAutomationStore {
    rules: Arc<Mutex<Vec<AutomationRule>>>,
    sends: Arc<Mutex<Vec<AutomationSend>>>,
}

impl InMemoryAutomationStore {
    pub(crate) fn insert_rule(&self, rule: AutomationRule) {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        guard.push(rule);
    }
}

impl AutomationRepository for InMemoryAutomationStore {
    fn rules(&self) -> Result<Vec<AutomationRule>, RepositoryError> {
        let guard = self.rules.lock().expect("rule mutex poisoned");
        Ok(guard.clone())
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
        let mut guard = self.sends.lock().expect("send mutex poisoned");
        guard.push(send);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApiKeyStore {
    records: Arc<Mutex<HashMap<ApiKeyId, ApiKeyRecord>>>,
}

impl ApiKeyRepository for InMemoryApiKeyStore {
    fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("api key mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApiKeyRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("api key mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApiKeyId) -> Result<Option<ApiKeyRecord>, RepositoryError> {
        let guard = self.records.lock().expect("api key mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<ApiKeyRecord>, RepositoryError> {
        let guard = self.records.lock().expect("api key mutex poisoned");
        let mut records: Vec<ApiKeyRecord> = guard
            .values()
            .filter(|record| &record.brand_id == brand_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(records)
    }
}

pub(crate) const SAMPLE_BRAND: &str = "brand-demo";
pub(crate) const SAMPLE_LOCATION: &str = "loc-main-street";
pub(crate) const SAMPLE_EVENT: &str = "evt-post-visit";

/// Sample brand, location, event and rules so a fresh process has something to trigger against.
pub(crate) fn seed_sample_catalog(
    surveys: &InMemorySurveyStore,
    automations: &InMemoryAutomationStore,
    engine: &EngineConfig,
    now: DateTime<Utc>,
) {
    surveys.insert_location(Location {
        id: LocationId::from(SAMPLE_LOCATION),
        brand_id: BrandId::from(SAMPLE_BRAND),
        name: "Main Street".to_string(),
        google_place_id: Some("ChIJ-main-street".to_string()),
    });

    surveys.insert_event(SurveyEvent {
        id: EventId::from(SAMPLE_EVENT),
        name: "Post-visit feedback".to_string(),
        status: EventStatus::Active,
        throttle_days: engine.default_throttle_days,
        brand_id: Some(BrandId::from(SAMPLE_BRAND)),
        location_id: Some(LocationId::from(SAMPLE_LOCATION)),
        thank_you: ThankYouConfig {
            promoters: Some(ThankYouBlock {
                message: "Thanks for visiting! Would you share your experience?".to_string(),
                buttons: vec![CtaButton {
                    id: "google".to_string(),
                    label: "Review us on Google".to_string(),
                    kind: ButtonKind::GoogleReview,
                    url: String::new(),
                }],
            }),
            passives: Some(ThankYouBlock {
                message: "Thanks for the feedback.".to_string(),
                buttons: Vec::new(),
            }),
            detractors: Some(ThankYouBlock {
                message: "We're sorry. A manager will be in touch.".to_string(),
                buttons: vec![CtaButton {
                    id: "contact".to_string(),
                    label: "Contact us".to_string(),
                    kind: ButtonKind::CustomLink,
                    url: "https://example.com/contact".to_string(),
                }],
            }),
        },
    });

    automations.insert_rule(AutomationRule {
        id: RuleId::from("rule-detractor-recovery"),
        name: "Detractor recovery".to_string(),
        trigger_group: SentimentTier::Detractor,
        feedback_condition: FeedbackCondition::WithFeedback,
        event_id: None,
        brand_id: Some(BrandId::from(SAMPLE_BRAND)),
        channel: Channel::Email,
        delay_hours: 2,
        throttle_days: 30,
        status: RuleStatus::Active,
        message: "We'd like to make this right.".to_string(),
        created_at: now,
    });
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
