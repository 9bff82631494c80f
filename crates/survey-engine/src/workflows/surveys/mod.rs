//! Survey lifecycle decisions: who may be surveyed, on which channel, how a completed response
//! is classified, what the respondent sees next, and which follow-ups fire.
//!
//! Every decision component is a pure function over snapshots the caller passes in. Storage is
//! reached only through the repository traits, and only by `SurveyService`.

pub mod api_keys;
pub mod automation;
pub mod channels;
pub mod classification;
pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod service;
pub mod thank_you;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use api_keys::{
    bearer_token, ApiKeyIssuer, ApiKeyRecord, KeyHasher, KeyIssueError, KeyMaterial,
    OsSecureRandom, SecureRandom, Sha256Hasher,
};
pub use automation::{
    matching_rules, plan_follow_ups, AutomationRule, AutomationSend, FeedbackCondition,
    ResponseContext, RuleStatus, ScheduledFollowUp,
};
pub use channels::{resolve, ChannelSet, ChannelSettings};
pub use classification::{classify, NpsBreakdown, SentimentTier};
pub use domain::{
    AnswerValue, ApiKeyId, BrandId, Channel, Contact, ContactId, ContactStatus, EventId,
    EventStatus, Location, LocationId, PreferredChannel, ResponseId, RuleId, SurveyAnswer,
    SurveyEvent, SurveyInvitation, SurveyResponse, TagId,
};
pub use eligibility::{
    AudiencePartition, EligibilityDecision, EligibilityFilter, EligibilityMode, EligibilityView,
    ExclusionReason, FilterCriteria, SurveyHistoryFilter,
};
pub use repository::{ApiKeyRepository, AutomationRepository, RepositoryError, SurveyRepository};
pub use router::survey_router;
pub use service::{
    AudienceReport, IssuedApiKey, ResponseOutcome, SendPlan, SurveyService, SurveyServiceError,
    TriggerOutcome,
};
pub use thank_you::{
    ButtonKind, CtaButton, ResolvedButton, ThankYouBlock, ThankYouConfig, ThankYouConfigError,
    ThankYouContent,
};
pub use webhook::{
    ChannelOverride, DelayUnit, ScheduleKind, Scheduling, TriggerContact, TriggerRejection,
    TriggerRequest,
};
