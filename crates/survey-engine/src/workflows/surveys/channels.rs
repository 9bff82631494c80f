use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{Channel, Contact, PreferredChannel};

/// Caller-selected delivery settings for a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub respect_preferred: bool,
    #[serde(default)]
    pub override_email: bool,
    #[serde(default)]
    pub override_sms: bool,
}

impl ChannelSettings {
    pub const fn respect_preferred() -> Self {
        Self {
            respect_preferred: true,
            override_email: false,
            override_sms: false,
        }
    }

    pub const fn overrides(email: bool, sms: bool) -> Self {
        Self {
            respect_preferred: false,
            override_email: email,
            override_sms: sms,
        }
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::respect_preferred()
    }
}

/// Concrete channels a message will go out on, iterated email first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSet(BTreeSet<Channel>);

impl ChannelSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.0.contains(&channel)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        self.0.iter().copied()
    }

    fn insert_if(&mut self, channel: Channel, condition: bool) {
        if condition {
            self.0.insert(channel);
        }
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve the channels a contact can be reached on under the given settings.
///
/// Every branch is intersected with the contact info on file, so a preference or override for a
/// channel the contact has no address for contributes nothing. An empty result means the
/// contact is unreachable.
pub fn resolve(contact: &Contact, settings: &ChannelSettings) -> ChannelSet {
    let has_email = contact.has_email();
    let has_phone = contact.has_phone();
    let mut channels = ChannelSet::empty();

    if settings.respect_preferred {
        match contact.preferred_channel {
            Some(PreferredChannel::Email) => channels.insert_if(Channel::Email, has_email),
            Some(PreferredChannel::Sms) => channels.insert_if(Channel::Sms, has_phone),
            Some(PreferredChannel::Both) => {
                channels.insert_if(Channel::Email, has_email);
                channels.insert_if(Channel::Sms, has_phone);
            }
            None if has_email => channels.insert_if(Channel::Email, true),
            None => channels.insert_if(Channel::Sms, has_phone),
        }
    } else {
        channels.insert_if(Channel::Email, settings.override_email && has_email);
        channels.insert_if(Channel::Sms, settings.override_sms && has_phone);
    }

    channels
}
