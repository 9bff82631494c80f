use chrono::Duration;

use super::common::*;
use crate::workflows::surveys::{
    matching_rules, plan_follow_ups, BrandId, Channel, EventId, FeedbackCondition,
    ResponseContext, RuleId, RuleStatus, SentimentTier,
};

fn ids(rules: &[&crate::workflows::surveys::AutomationRule]) -> Vec<String> {
    rules.iter().map(|rule| rule.id.to_string()).collect()
}

#[test]
fn matches_rules_for_the_response_tier_only() {
    let contact = contact("c-1");
    let event = event(EVENT);
    let response = response("c-1", Some(3));
    let rules = vec![
        rule("detractor-call", SentimentTier::Detractor, 1),
        rule("promoter-thanks", SentimentTier::Promoter, 1),
    ];

    let context = ResponseContext::new(&response, &contact, Some(&event));
    let matched = matching_rules(&context, &rules, &[], now());

    assert_eq!(ids(&matched), vec!["detractor-call"]);
}

#[test]
fn inactive_rules_never_match() {
    let contact = contact("c-1");
    let response = response("c-1", Some(10));
    let mut paused = rule("paused", SentimentTier::Promoter, 1);
    paused.status = RuleStatus::Inactive;

    let rules = [paused];

    let context = ResponseContext::new(&response, &contact, None);
    let matched = matching_rules(&context, &rules, &[], now());

    assert!(matched.is_empty());
}

#[test]
fn with_feedback_requires_non_blank_text() {
    let contact = contact("c-1");
    let mut needs_feedback = rule("needs-feedback", SentimentTier::Detractor, 1);
    needs_feedback.feedback_condition = FeedbackCondition::WithFeedback;
    let rules = vec![needs_feedback];

    let silent = response("c-1", Some(2));
    let context = ResponseContext::new(&silent, &contact, None);
    assert!(matching_rules(&context, &rules, &[], now()).is_empty());

    let blank = with_comment(response("c-1", Some(2)), "   ");
    let context = ResponseContext::new(&blank, &contact, None);
    assert!(matching_rules(&context, &rules, &[], now()).is_empty());

    let commented = with_comment(response("c-1", Some(2)), "Checkout line was slow");
    let context = ResponseContext::new(&commented, &contact, None);
    assert_eq!(
        ids(&matching_rules(&context, &rules, &[], now())),
        vec!["needs-feedback"]
    );
}

#[test]
fn without_feedback_matches_silent_responses() {
    let contact = contact("c-1");
    let mut silent_only = rule("silent-only", SentimentTier::Passive, 1);
    silent_only.feedback_condition = FeedbackCondition::WithoutFeedback;
    let rules = vec![silent_only];

    let silent = response("c-1", Some(8));
    let context = ResponseContext::new(&silent, &contact, None);
    assert_eq!(matching_rules(&context, &rules, &[], now()).len(), 1);

    let commented = with_comment(response("c-1", Some(8)), "Fine");
    let context = ResponseContext::new(&commented, &contact, None);
    assert!(matching_rules(&context, &rules, &[], now()).is_empty());
}

#[test]
fn scoped_rules_require_matching_event_and_brand() {
    let contact = contact("c-1");
    let event = event(EVENT);
    let response = response("c-1", Some(10));

    let mut same_event = rule("same-event", SentimentTier::Promoter, 1);
    same_event.event_id = Some(EventId::from(EVENT));
    let mut other_event = rule("other-event", SentimentTier::Promoter, 1);
    other_event.event_id = Some(EventId::from(OTHER_EVENT));
    let mut same_brand = rule("same-brand", SentimentTier::Promoter, 1);
    same_brand.brand_id = Some(BrandId::from(BRAND));
    let mut other_brand = rule("other-brand", SentimentTier::Promoter, 1);
    other_brand.brand_id = Some(BrandId::from(OTHER_BRAND));
    let rules = vec![same_event, other_event, same_brand, other_brand];

    let context = ResponseContext::new(&response, &contact, Some(&event));
    let mut matched = ids(&matching_rules(&context, &rules, &[], now()));
    matched.sort();

    assert_eq!(matched, vec!["same-brand", "same-event"]);
}

#[test]
fn brand_falls_back_to_the_contact_when_event_has_none() {
    let mut contact = contact("c-1");
    contact.brand_id = Some(BrandId::from(OTHER_BRAND));
    let mut event = event(EVENT);
    event.brand_id = None;
    let response = response("c-1", Some(10));

    let context = ResponseContext::new(&response, &contact, Some(&event));

    assert_eq!(context.brand_id(), Some(&BrandId::from(OTHER_BRAND)));
}

#[test]
fn rule_throttle_suppresses_recent_repeats() {
    let contact = contact("c-1");
    let response = response("c-1", Some(1));
    let mut throttled = rule("weekly", SentimentTier::Detractor, 60);
    throttled.throttle_days = 30;
    let rules = vec![throttled];
    let context = ResponseContext::new(&response, &contact, None);

    let recent = vec![send("weekly", "c-1", 10)];
    assert!(matching_rules(&context, &rules, &recent, now()).is_empty());

    let stale = vec![send("weekly", "c-1", 30)];
    assert_eq!(matching_rules(&context, &rules, &stale, now()).len(), 1);

    let someone_else = vec![send("weekly", "c-2", 1)];
    assert_eq!(
        matching_rules(&context, &rules, &someone_else, now()).len(),
        1
    );
}

#[test]
fn matches_are_ordered_newest_rule_first() {
    let contact = contact("c-1");
    let response = response("c-1", Some(9));
    let rules = vec![
        rule("oldest", SentimentTier::Promoter, 30),
        rule("newest", SentimentTier::Promoter, 1),
        rule("middle", SentimentTier::Promoter, 10),
    ];

    let context = ResponseContext::new(&response, &contact, None);
    let matched = matching_rules(&context, &rules, &[], now());

    assert_eq!(ids(&matched), vec!["newest", "middle", "oldest"]);
}

#[test]
fn unscored_response_matches_nothing() {
    let contact = contact("c-1");
    let response = response("c-1", None);
    let rules = SentimentTier::ordered().map(|tier| rule(tier.label(), tier, 1));

    let context = ResponseContext::new(&response, &contact, None);

    assert!(matching_rules(&context, &rules, &[], now()).is_empty());
}

#[test]
fn follow_ups_are_delayed_and_skip_unreachable_channels() {
    let contact = email_only("c-1");
    let response = response("c-1", Some(4));
    let mut email = rule("email-later", SentimentTier::Detractor, 1);
    email.delay_hours = 24;
    let mut sms = rule("sms-now", SentimentTier::Detractor, 2);
    sms.channel = Channel::Sms;
    let rules = vec![email, sms];

    let context = ResponseContext::new(&response, &contact, None);
    let matched = matching_rules(&context, &rules, &[], now());
    assert_eq!(matched.len(), 2);

    let follow_ups = plan_follow_ups(&context, &matched);

    assert_eq!(follow_ups.len(), 1);
    assert_eq!(follow_ups[0].rule_id, RuleId::from("email-later"));
    assert_eq!(follow_ups[0].channel, Channel::Email);
    assert_eq!(follow_ups[0].send_at, now() + Duration::hours(24));
    assert_eq!(follow_ups[0].as_send().sent_at, follow_ups[0].send_at);
}
