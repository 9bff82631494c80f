use super::api_keys::ApiKeyRecord;
use super::automation::{AutomationRule, AutomationSend};
use super::domain::{
    ApiKeyId, BrandId, Contact, ContactId, EventId, Location, LocationId, SurveyEvent,
    SurveyInvitation,
};
use super::eligibility::FilterCriteria;

/// Storage abstraction over contacts, events, locations and invitations.
///
/// `find_contacts` may pre-filter on the backing store, but callers still run every returned
/// contact through the eligibility predicates.
pub trait SurveyRepository: Send + Sync {
    fn find_contacts(&self, criteria: &FilterCriteria) -> Result<Vec<Contact>, RepositoryError>;
    fn contact(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;
    /// Insert the contact, or merge it into an existing one matched by external id, email or
    /// phone. Returns the stored record.
    fn upsert_contact(&self, contact: Contact) -> Result<Contact, RepositoryError>;
    fn event(&self, id: &EventId) -> Result<Option<SurveyEvent>, RepositoryError>;
    fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError>;
    fn invitations_for(&self, contact_id: &ContactId)
        -> Result<Vec<SurveyInvitation>, RepositoryError>;
    fn record_invitation(&self, invitation: SurveyInvitation) -> Result<(), RepositoryError>;
}

/// Automation rules plus the follow-ups already dispatched under them.
pub trait AutomationRepository: Send + Sync {
    fn rules(&self) -> Result<Vec<AutomationRule>, RepositoryError>;
    fn sends_for(&self, contact_id: &ContactId) -> Result<Vec<AutomationSend>, RepositoryError>;
    fn record_send(&self, send: AutomationSend) -> Result<(), RepositoryError>;
}

/// Key rows are never deleted; revocation is an update.
pub trait ApiKeyRepository: Send + Sync {
    fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, RepositoryError>;
    fn update(&self, record: ApiKeyRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApiKeyId) -> Result<Option<ApiKeyRecord>, RepositoryError>;
    fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<ApiKeyRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
