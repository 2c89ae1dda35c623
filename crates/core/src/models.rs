use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tenant reply text keyed by [`ResponseKey::as_str`].
pub type ResponseTable = HashMap<String, String>;

/// Used when a tenant has not configured a fallback reply either.
pub const GENERIC_APOLOGY: &str =
    "Beklager, jeg kan ikke svare på det lige nu. Prøv igen senere, eller kontakt os direkte.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseKey {
    Greeting,
    OpeningHours,
    Prices,
    Booking,
    Contact,
    Location,
    Shipping,
    Returns,
    OrderStatus,
    Payments,
    HumanSupport,
    Fallback,
}

impl ResponseKey {
    pub const ALL: [ResponseKey; 12] = [
        Self::Greeting,
        Self::OpeningHours,
        Self::Prices,
        Self::Booking,
        Self::Contact,
        Self::Location,
        Self::Shipping,
        Self::Returns,
        Self::OrderStatus,
        Self::Payments,
        Self::HumanSupport,
        Self::Fallback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::OpeningHours => "openingHours",
            Self::Prices => "prices",
            Self::Booking => "booking",
            Self::Contact => "contact",
            Self::Location => "location",
            Self::Shipping => "shipping",
            Self::Returns => "returns",
            Self::OrderStatus => "orderStatus",
            Self::Payments => "payments",
            Self::HumanSupport => "humanSupport",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value.trim())
    }
}

/// Raw intent definition as authored, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    pub keywords: Vec<String>,
    pub response_key: ResponseKey,
}

impl Intent {
    pub fn new(name: &str, keywords: &[&str], response_key: ResponseKey) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            response_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledKeyword {
    pub text: String,
    pub is_phrase: bool,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledIntent {
    pub name: String,
    pub response_key: ResponseKey,
    pub keywords: Vec<CompiledKeyword>,
}

impl CompiledIntent {
    /// An intent with no usable keywords can never be selected.
    pub fn is_dead(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub intent: &'a CompiledIntent,
    pub keyword: &'a str,
    pub score: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Matched and the tenant has a reply for it.
    Answered,
    /// Matched, but the tenant has no reply configured for the intent.
    Unconfigured,
    Unmatched,
    Blank,
}

impl ReplyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Unconfigured => "unconfigured",
            Self::Unmatched => "unmatched",
            Self::Blank => "blank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub intent: Option<String>,
    pub is_fallback: bool,
    pub outcome: ReplyOutcome,
}
