use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::thank_you::ThankYouConfig;
use crate::config::DEFAULT_THROTTLE_DAYS;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for contacts.
    ContactId
);
string_id!(
    /// Identifier wrapper for survey events.
    EventId
);
string_id!(BrandId);
string_id!(LocationId);
string_id!(TagId);
string_id!(
    /// Identifier wrapper for completed survey responses.
    ResponseId
);
string_id!(RuleId);
string_id!(ApiKeyId);

/// Delivery medium for a survey invitation or follow-up message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub const fn label(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

/// Channel preference stored on a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredChannel {
    Email,
    Sms,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Active,
    Unsubscribed,
}

impl ContactStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContactStatus::Active => "active",
            ContactStatus::Unsubscribed => "unsubscribed",
        }
    }
}

/// Survey recipient snapshot as owned by the contact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_channel: Option<PreferredChannel>,
    pub status: ContactStatus,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub tag_ids: BTreeSet<TagId>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn has_email(&self) -> bool {
        is_present(self.email.as_deref())
    }

    pub fn has_phone(&self) -> bool {
        is_present(self.phone.as_deref())
    }

    pub fn can_receive(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.has_email(),
            Channel::Sms => self.has_phone(),
        }
    }
}

pub(crate) fn is_present(value: Option<&str>) -> bool {
    value.map(|raw| !raw.trim().is_empty()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Active,
    Inactive,
}

impl EventStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Active => "active",
            EventStatus::Inactive => "inactive",
        }
    }
}

fn default_throttle_days() -> u32 {
    DEFAULT_THROTTLE_DAYS
}

/// Survey configuration a send is made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyEvent {
    pub id: EventId,
    pub name: String,
    pub status: EventStatus,
    #[serde(default = "default_throttle_days")]
    pub throttle_days: u32,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub thank_you: ThankYouConfig,
}

/// Physical location a response is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub brand_id: BrandId,
    pub name: String,
    #[serde(default)]
    pub google_place_id: Option<String>,
}

/// One send attempt. `sent_at` stays empty until the message leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyInvitation {
    pub contact_id: ContactId,
    pub event_id: EventId,
    pub channel: Channel,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Answer captured alongside the NPS question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub question_id: String,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Choice(String),
    Rating(u8),
}

/// Completed survey; immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: ResponseId,
    pub event_id: EventId,
    pub contact_id: ContactId,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub nps_score: Option<u8>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub consent_given: bool,
    #[serde(default)]
    pub answers: Vec<SurveyAnswer>,
}

impl SurveyResponse {
    /// True when at least one free-text answer carries non-whitespace content.
    pub fn has_feedback(&self) -> bool {
        self.answers.iter().any(|answer| match &answer.value {
            AnswerValue::Text(text) => !text.trim().is_empty(),
            AnswerValue::Choice(_) | AnswerValue::Rating(_) => false,
        })
    }
}
