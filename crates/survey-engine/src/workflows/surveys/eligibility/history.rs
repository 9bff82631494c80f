use chrono::{DateTime, Utc};

use super::super::domain::{ContactId, EventId, SurveyInvitation};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days elapsed between two instants, floored. Negative when `earlier` is in the future.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Most recent `sent_at` across a contact's invitations, optionally scoped to one event.
pub fn last_sent_at<'a, I>(
    invitations: I,
    contact_id: &ContactId,
    event_id: Option<&EventId>,
) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a SurveyInvitation>,
{
    invitations
        .into_iter()
        .filter(|invitation| &invitation.contact_id == contact_id)
        .filter(|invitation| event_id.map_or(true, |event| &invitation.event_id == event))
        .filter_map(|invitation| invitation.sent_at)
        .max()
}

/// A window of `window_days` has elapsed since `last`. A zero window never blocks.
pub fn window_elapsed(last: Option<DateTime<Utc>>, window_days: u32, now: DateTime<Utc>) -> bool {
    if window_days == 0 {
        return true;
    }

    match last {
        Some(last) => days_between(last, now) >= i64::from(window_days),
        None => true,
    }
}
