use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use thiserror::Error;

use crate::models::{CompiledIntent, CompiledKeyword, Intent, ResponseKey};
use crate::normalize::normalize_text;

static BUILTIN: Lazy<IntentCatalog> = Lazy::new(|| {
    IntentCatalog::compile(&builtin_intents()).expect("built-in intent catalog is valid")
});

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate intent name: {0}")]
    DuplicateIntent(String),
    #[error("intent name must not be blank")]
    BlankName,
    #[error("invalid intent catalog json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, read-only set of compiled intents. Order is significant: on equal
/// scores the intent declared first wins.
#[derive(Debug, Clone, Serialize)]
pub struct IntentCatalog {
    intents: Vec<CompiledIntent>,
}

impl IntentCatalog {
    pub fn compile(intents: &[Intent]) -> std::result::Result<Self, CatalogError> {
        let mut seen_names = HashSet::new();
        let mut compiled = Vec::with_capacity(intents.len());

        for intent in intents {
            let name = intent.name.trim();
            if name.is_empty() {
                return Err(CatalogError::BlankName);
            }
            if !seen_names.insert(name.to_string()) {
                return Err(CatalogError::DuplicateIntent(name.to_string()));
            }

            compiled.push(CompiledIntent {
                name: name.to_string(),
                response_key: intent.response_key,
                keywords: compile_keywords(&intent.keywords),
            });
        }

        Ok(Self { intents: compiled })
    }

    pub fn from_json_str(raw: &str) -> std::result::Result<Self, CatalogError> {
        let intents: Vec<Intent> = serde_json::from_str(raw)?;
        Self::compile(&intents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading intent catalog: {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed compiling intent catalog: {}", path.display()))
    }

    pub fn builtin() -> &'static IntentCatalog {
        &BUILTIN
    }

    pub fn intents(&self) -> &[CompiledIntent] {
        &self.intents
    }

    pub fn get(&self, name: &str) -> Option<&CompiledIntent> {
        self.intents.iter().find(|intent| intent.name == name)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn dead_intents(&self) -> impl Iterator<Item = &CompiledIntent> {
        self.intents.iter().filter(|intent| intent.is_dead())
    }
}

fn compile_keywords(raw: &[String]) -> Vec<CompiledKeyword> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for keyword in raw {
        let text = normalize_text(keyword);
        if text.is_empty() || !seen.insert(text.clone()) {
            continue;
        }

        keywords.push(CompiledKeyword {
            is_phrase: text.contains(' '),
            length: text.chars().count(),
            text,
        });
    }

    keywords
}

pub fn builtin_intents() -> Vec<Intent> {
    vec![
        Intent::new(
            "greeting",
            &["hej", "hejsa", "goddag", "godmorgen", "god morgen", "hallo", "hello", "hi"],
            ResponseKey::Greeting,
        ),
        Intent::new(
            "opening_hours",
            &[
                "åbningstid",
                "åbningstider",
                "åbent",
                "åben",
                "åbner",
                "lukket",
                "lukker",
                "har i åbent",
                "hvornår åbner",
                "hvornår lukker",
            ],
            ResponseKey::OpeningHours,
        ),
        Intent::new(
            "prices",
            &["pris", "priser", "prisen", "koster", "hvad koster", "honorar", "tilbud"],
            ResponseKey::Prices,
        ),
        Intent::new(
            "booking",
            &[
                "book",
                "booke",
                "booking",
                "bestil",
                "bestille",
                "aftale",
                "tid",
                "reservation",
                "reservere",
                "bestille tid",
                "booke tid",
                "book en tid",
            ],
            ResponseKey::Booking,
        ),
        Intent::new(
            "contact",
            &[
                "kontakt",
                "kontakte",
                "telefon",
                "telefonnummer",
                "email",
                "e-mail",
                "mail",
                "nummer",
                "ringe",
            ],
            ResponseKey::Contact,
        ),
        Intent::new(
            "location",
            &[
                "adresse",
                "hvor",
                "lokation",
                "beliggenhed",
                "finde jer",
                "hvor ligger i",
                "hvor holder i til",
            ],
            ResponseKey::Location,
        ),
        Intent::new(
            "shipping",
            &[
                "levering",
                "leveringstid",
                "levere",
                "leverer",
                "fragt",
                "forsendelse",
                "afsendt",
                "hvornår kommer min pakke",
            ],
            ResponseKey::Shipping,
        ),
        Intent::new(
            "returns",
            &[
                "retur",
                "returnere",
                "returnering",
                "returret",
                "bytte",
                "ombytning",
                "fortryde",
                "fortrydelsesret",
                "refundering",
                "pengene tilbage",
            ],
            ResponseKey::Returns,
        ),
        Intent::new(
            "order_status",
            &[
                "ordre",
                "ordren",
                "ordrenummer",
                "ordrestatus",
                "tracking",
                "status",
                "min ordre",
                "min pakke",
                "hvor er min pakke",
            ],
            ResponseKey::OrderStatus,
        ),
        Intent::new(
            "payments",
            &[
                "betaling",
                "betale",
                "betalingsmetode",
                "mobilepay",
                "kortbetaling",
                "dankort",
                "faktura",
                "hvordan betaler jeg",
            ],
            ResponseKey::Payments,
        ),
        Intent::new(
            "human_support",
            &[
                "menneske",
                "medarbejder",
                "kundeservice",
                "support",
                "tale med en",
                "snakke med en",
                "rigtig person",
            ],
            ResponseKey::HumanSupport,
        ),
    ]
}
