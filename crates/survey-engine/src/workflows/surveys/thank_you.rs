use serde::{Deserialize, Serialize};

use super::classification::SentimentTier;
use super::domain::Location;

const GOOGLE_REVIEW_BASE_URL: &str = "https://search.google.com/local/writereview?placeid=";

/// Call-to-action button kinds an admin can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    GoogleReview,
    CustomLink,
    Facebook,
    Yelp,
}

impl ButtonKind {
    pub const fn label(self) -> &'static str {
        match self {
            ButtonKind::GoogleReview => "google_review",
            ButtonKind::CustomLink => "custom_link",
            ButtonKind::Facebook => "facebook",
            ButtonKind::Yelp => "yelp",
        }
    }

    /// Kinds with a URL resolution path today.
    pub const fn is_supported(self) -> bool {
        matches!(self, ButtonKind::GoogleReview | ButtonKind::CustomLink)
    }
}

/// Persisted button shape: `{ id, label, type, url }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaButton {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ButtonKind,
    /// Ignored for Google review buttons; the location's place id drives their URL.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThankYouBlock {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub buttons: Vec<CtaButton>,
}

/// Per-tier thank-you content: `{ promoters, passives, detractors }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThankYouConfig {
    #[serde(default)]
    pub promoters: Option<ThankYouBlock>,
    #[serde(default)]
    pub passives: Option<ThankYouBlock>,
    #[serde(default)]
    pub detractors: Option<ThankYouBlock>,
}

impl ThankYouConfig {
    pub fn block(&self, tier: SentimentTier) -> Option<&ThankYouBlock> {
        match tier {
            SentimentTier::Promoter => self.promoters.as_ref(),
            SentimentTier::Passive => self.passives.as_ref(),
            SentimentTier::Detractor => self.detractors.as_ref(),
        }
    }

    /// Reject buttons that can never be rendered: unsupported kinds and links without a URL.
    pub fn validate(&self) -> Result<(), ThankYouConfigError> {
        for tier in SentimentTier::ordered() {
            let Some(block) = self.block(tier) else {
                continue;
            };

            for button in &block.buttons {
                if !button.kind.is_supported() {
                    return Err(ThankYouConfigError::UnsupportedButton {
                        tier,
                        button_id: button.id.clone(),
                        kind: button.kind,
                    });
                }

                if button.kind == ButtonKind::CustomLink && button.url.trim().is_empty() {
                    return Err(ThankYouConfigError::MissingLinkUrl {
                        tier,
                        button_id: button.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Configuration-time rejection of a thank-you block.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThankYouConfigError {
    #[error("{} button '{button_id}' on the {} block has no resolution path", .kind.label(), .tier.label())]
    UnsupportedButton {
        tier: SentimentTier,
        button_id: String,
        kind: ButtonKind,
    },
    #[error("custom link button '{button_id}' on the {} block needs a url", .tier.label())]
    MissingLinkUrl {
        tier: SentimentTier,
        button_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedButton {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ButtonKind,
    pub url: String,
}

/// What the respondent sees after submitting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThankYouContent {
    pub tier: Option<SentimentTier>,
    pub message: String,
    pub buttons: Vec<ResolvedButton>,
}

/// Pick the thank-you block for a score and resolve its buttons.
///
/// Never fails: an unscored response or a tier without a block yields an empty message and no
/// buttons. Buttons that cannot be resolved (unsupported kind, Google review without a place id,
/// link without a URL) are dropped.
pub fn route(
    score: Option<u8>,
    config: &ThankYouConfig,
    location: Option<&Location>,
) -> ThankYouContent {
    let tier = SentimentTier::from_score(score);
    let Some(block) = tier.and_then(|tier| config.block(tier)) else {
        return ThankYouContent {
            tier,
            ..ThankYouContent::default()
        };
    };

    let buttons = block
        .buttons
        .iter()
        .filter_map(|button| resolve_button(button, location))
        .collect();

    ThankYouContent {
        tier,
        message: block.message.clone(),
        buttons,
    }
}

fn resolve_button(button: &CtaButton, location: Option<&Location>) -> Option<ResolvedButton> {
    let url = match button.kind {
        ButtonKind::GoogleReview => {
            let place_id = location
                .and_then(|location| location.google_place_id.as_deref())
                .map(str::trim)
                .filter(|place_id| !place_id.is_empty())?;
            google_review_url(place_id)
        }
        ButtonKind::CustomLink => {
            let url = button.url.trim();
            if url.is_empty() {
                return None;
            }
            url.to_string()
        }
        ButtonKind::Facebook | ButtonKind::Yelp => return None,
    };

    Some(ResolvedButton {
        label: button.label.clone(),
        kind: button.kind,
        url,
    })
}

pub fn google_review_url(place_id: &str) -> String {
    format!("{GOOGLE_REVIEW_BASE_URL}{place_id}")
}
