//! Inbound trigger payload accepted from external systems.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::channels::ChannelSettings;
use super::domain::{
    is_present, BrandId, Contact, ContactId, ContactStatus, EventId, LocationId, PreferredChannel,
    TagId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub event_id: EventId,
    pub location_id: LocationId,
    pub contact: TriggerContact,
    #[serde(default)]
    pub channel: ChannelOverride,
    #[serde(default)]
    pub scheduling: Scheduling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContact {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_channel: Option<PreferredChannel>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub status: Option<ContactStatus>,
}

/// Channel selection carried by the trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOverride {
    #[default]
    Preferred,
    Email,
    Sms,
}

impl ChannelOverride {
    pub const fn settings(self) -> ChannelSettings {
        match self {
            ChannelOverride::Preferred => ChannelSettings::respect_preferred(),
            ChannelOverride::Email => ChannelSettings::overrides(true, false),
            ChannelOverride::Sms => ChannelSettings::overrides(false, true),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    #[default]
    Immediate,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
}

impl DelayUnit {
    const fn seconds(self) -> i64 {
        match self {
            DelayUnit::Minutes => 60,
            DelayUnit::Hours => 3_600,
            DelayUnit::Days => 86_400,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduling {
    #[serde(rename = "type", default)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub delay_value: Option<u32>,
    #[serde(default)]
    pub delay_unit: Option<DelayUnit>,
}

impl Scheduling {
    fn delay(&self) -> Result<Option<Duration>, TriggerRejection> {
        match self.kind {
            ScheduleKind::Immediate => Ok(None),
            ScheduleKind::Delayed => {
                let value = self
                    .delay_value
                    .filter(|value| *value > 0)
                    .ok_or(TriggerRejection::InvalidDelay)?;
                let unit = self.delay_unit.ok_or(TriggerRejection::InvalidDelay)?;
                Ok(Some(Duration::seconds(i64::from(value) * unit.seconds())))
            }
        }
    }

    pub fn validate(&self) -> Result<(), TriggerRejection> {
        self.delay().map(|_| ())
    }

    pub fn send_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TriggerRejection> {
        match self.delay()? {
            None => Ok(now),
            Some(delay) => now
                .checked_add_signed(delay)
                .ok_or(TriggerRejection::InvalidDelay),
        }
    }
}

/// Payload problems caught before eligibility runs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TriggerRejection {
    #[error("contact requires an email or a phone number")]
    MissingContactInfo,
    #[error("contact first_name is required")]
    MissingName,
    #[error("delayed scheduling requires a positive delay_value and a delay_unit")]
    InvalidDelay,
}

impl TriggerRequest {
    pub fn validate(&self) -> Result<(), TriggerRejection> {
        if self.contact.first_name.trim().is_empty() {
            return Err(TriggerRejection::MissingName);
        }

        if !is_present(self.contact.email.as_deref()) && !is_present(self.contact.phone.as_deref())
        {
            return Err(TriggerRejection::MissingContactInfo);
        }

        self.scheduling.validate()
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        self.channel.settings()
    }
}

impl TriggerContact {
    /// Build the contact record a trigger describes. Blank email/phone are treated as absent.
    pub fn to_contact(&self, id: ContactId, brand_id: BrandId, location_id: LocationId) -> Contact {
        Contact {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalized(self.email.as_deref()),
            phone: normalized(self.phone.as_deref()),
            preferred_channel: self.preferred_channel,
            status: self.status.unwrap_or(ContactStatus::Active),
            language: normalized(self.preferred_language.as_deref()),
            brand_id: Some(brand_id),
            location_id: Some(location_id),
            tag_ids: self.tags.iter().cloned().collect::<BTreeSet<_>>(),
            external_id: normalized(self.external_id.as_deref()),
        }
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
