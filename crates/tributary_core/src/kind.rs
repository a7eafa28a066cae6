//! Request kinds and model identifiers.

use serde::{Deserialize, Serialize};

/// Kind of funnel content a completion request produces.
///
/// Each kind selects a prompt template. The wire names are the `promptType`
/// values sent by the browser.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use tributary_core::RequestKind;
///
/// let kind = RequestKind::from_str("mainVSL").unwrap();
/// assert_eq!(kind, RequestKind::MainVsl);
/// assert_eq!(kind.to_string(), "mainVSL");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum RequestKind {
    /// Main video sales letter script
    #[serde(rename = "mainVSL")]
    #[strum(serialize = "mainVSL")]
    MainVsl,
    /// Upsell offer video script
    #[serde(rename = "upsellVSL")]
    #[strum(serialize = "upsellVSL")]
    UpsellVsl,
    /// Downsell offer video script
    #[serde(rename = "downsellVSL")]
    #[strum(serialize = "downsellVSL")]
    DownsellVsl,
    /// Long-form sales page copy
    #[serde(rename = "salesPage")]
    #[strum(serialize = "salesPage")]
    SalesPage,
    /// Headline variations
    #[serde(rename = "headline")]
    #[strum(serialize = "headline")]
    Headline,
    /// Follow-up email sequence
    #[serde(rename = "emailSequence")]
    #[strum(serialize = "emailSequence")]
    EmailSequence,
    /// Paid advertising copy
    #[serde(rename = "adCopy")]
    #[strum(serialize = "adCopy")]
    AdCopy,
    /// Checkout order bump offer
    #[serde(rename = "orderBump")]
    #[strum(serialize = "orderBump")]
    OrderBump,
    /// Post-purchase thank-you page
    #[serde(rename = "thankYouPage")]
    #[strum(serialize = "thankYouPage")]
    ThankYouPage,
}

/// Supported upstream chat models.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use tributary_core::ModelId;
///
/// assert_eq!(ModelId::default(), ModelId::Gpt4oMini);
/// assert_eq!(ModelId::from_str("gpt-4o").unwrap(), ModelId::Gpt4o);
/// assert!(ModelId::from_str("gpt-5-ultra").is_err());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum ModelId {
    /// GPT-4o mini
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    #[strum(serialize = "gpt-4o-mini")]
    Gpt4oMini,
    /// GPT-4o
    #[serde(rename = "gpt-4o")]
    #[strum(serialize = "gpt-4o")]
    Gpt4o,
    /// GPT-4 Turbo
    #[serde(rename = "gpt-4-turbo")]
    #[strum(serialize = "gpt-4-turbo")]
    Gpt4Turbo,
    /// GPT-3.5 Turbo
    #[serde(rename = "gpt-3.5-turbo")]
    #[strum(serialize = "gpt-3.5-turbo")]
    Gpt35Turbo,
}
