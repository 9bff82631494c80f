use crate::infra::{
    seed_sample_catalog, InMemoryApiKeyStore, InMemoryAutomationStore, InMemorySurveyStore,
    SAMPLE_BRAND, SAMPLE_EVENT, SAMPLE_LOCATION,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use survey_engine::config::EngineConfig;
use survey_engine::error::AppError;
use survey_engine::workflows::surveys::{
    AnswerValue, BrandId, ChannelOverride, ChannelSettings, ContactId, EventId, FilterCriteria,
    LocationId, NpsBreakdown, ResponseId, Scheduling, SurveyAnswer, SurveyResponse,
    SurveyService, TriggerContact, TriggerRequest,
};

type DemoService = SurveyService<InMemorySurveyStore, InMemoryAutomationStore, InMemoryApiKeyStore>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference time for the walkthrough (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Days between the first and the repeated trigger for the same guest.
    #[arg(long, default_value_t = 10)]
    pub(crate) repeat_after_days: u32,
    /// Skip the response routing portion of the demo.
    #[arg(long)]
    pub(crate) skip_responses: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        now,
        repeat_after_days,
        skip_responses,
    } = args;
    let now = now.unwrap_or_else(Utc::now);
    let engine = EngineConfig::default();

    let surveys = Arc::new(InMemorySurveyStore::default());
    let automations = Arc::new(InMemoryAutomationStore::default());
    seed_sample_catalog(&surveys, &automations, &engine, now);
    let service: DemoService = SurveyService::new(
        surveys,
        automations,
        Arc::new(InMemoryApiKeyStore::default()),
        &engine,
    );
    let brand = BrandId::from(SAMPLE_BRAND);

    println!("Survey lifecycle demo");
    let issued = service.issue_api_key("Demo POS", brand.clone(), now)?;
    println!(
        "- Issued API key {} for {} (prefix {}, digest stored, plaintext shown once)",
        issued.record.id, brand, issued.record.key_prefix
    );
    let authorization = format!("Bearer {}", issued.full_key.expose_secret());

    println!("\nInbound triggers");
    let first = service.trigger(Some(&authorization), demo_trigger(), now)?;
    print_json("  First trigger", &first);

    let later = now + Duration::days(i64::from(repeat_after_days));
    let repeat = service.trigger(Some(&authorization), demo_trigger(), later)?;
    print_json(
        &format!("  Same guest {repeat_after_days} day(s) later"),
        &repeat,
    );

    let audience = service.audience(
        &EventId::from(SAMPLE_EVENT),
        FilterCriteria {
            brand_id: Some(brand.clone()),
            ..FilterCriteria::default()
        },
        ChannelSettings::respect_preferred(),
        later,
    )?;
    println!(
        "- Audience preview for {}: {} admitted, {} excluded (throttle not applied to previews)",
        audience.event_id,
        audience.admitted.len(),
        audience.excluded.len()
    );

    if !skip_responses {
        println!("\nResponse routing");
        let scores = [Some(10), Some(3), None];
        for (index, score) in scores.into_iter().enumerate() {
            let response = demo_response(&first.contact_id, index, score, later);
            let outcome = service.record_response(&response, later)?;
            print_json(&format!("  Score {score:?}"), &outcome);
        }

        let breakdown = NpsBreakdown::from_scores(scores);
        match breakdown.net_promoter_score() {
            Some(nps) => println!(
                "- NPS across {} scored response(s): {nps}",
                breakdown.scored()
            ),
            None => println!("- NPS unavailable: no scored responses"),
        }
    }

    println!("\nKey revocation");
    service.revoke_api_key(&brand, &issued.record.id, later)?;
    match service.trigger(Some(&authorization), demo_trigger(), later) {
        Ok(_) => println!("- Unexpected: revoked key still accepted"),
        Err(err) => println!("- Trigger with revoked key rejected: {err}"),
    }

    Ok(())
}

fn demo_trigger() -> TriggerRequest {
    TriggerRequest {
        event_id: EventId::from(SAMPLE_EVENT),
        location_id: LocationId::from(SAMPLE_LOCATION),
        contact: TriggerContact {
            first_name: "Jordan".to_string(),
            last_name: "Alvarez".to_string(),
            email: Some("jordan.alvarez@example.com".to_string()),
            phone: Some("+15155550123".to_string()),
            preferred_channel: None,
            preferred_language: Some("en".to_string()),
            tags: Vec::new(),
            external_id: Some("pos-1042".to_string()),
            status: None,
        },
        channel: ChannelOverride::Preferred,
        scheduling: Scheduling::default(),
    }
}

fn demo_response(
    contact_id: &ContactId,
    index: usize,
    score: Option<u8>,
    completed_at: DateTime<Utc>,
) -> SurveyResponse {
    let answers = match score {
        Some(score) if score <= 6 => vec![SurveyAnswer {
            question_id: "improve".to_string(),
            value: AnswerValue::Text("Wait time at checkout was long".to_string()),
        }],
        _ => Vec::new(),
    };

    SurveyResponse {
        id: ResponseId(format!("demo-response-{}", index + 1)),
        event_id: EventId::from(SAMPLE_EVENT),
        contact_id: contact_id.clone(),
        location_id: Some(LocationId::from(SAMPLE_LOCATION)),
        nps_score: score,
        completed_at,
        consent_given: true,
        answers,
    }
}

fn print_json<T: Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}:\n{json}"),
        Err(err) => println!("{label}: unavailable ({err})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end() {
        let args = DemoArgs {
            now: Some(crate::infra::parse_timestamp("2025-06-01T12:00:00Z").expect("valid")),
            repeat_after_days: 10,
            skip_responses: false,
        };

        run_demo(args).expect("demo completes");
    }

    #[test]
    fn detractor_demo_response_carries_feedback() {
        let response = demo_response(&ContactId::from("contact-1"), 1, Some(3), Utc::now());
        assert!(response.has_feedback());

        let response = demo_response(&ContactId::from("contact-1"), 0, Some(10), Utc::now());
        assert!(!response.has_feedback());
    }
}
