use std::collections::HashSet;

use crate::catalog::IntentCatalog;
use crate::models::{ChatReply, MatchResult, ReplyOutcome, ResponseKey, ResponseTable, GENERIC_APOLOGY};
use crate::normalize::{normalize_text, words_of};

pub const PHRASE_SCORE_BASE: usize = 2000;
pub const WORD_SCORE_BASE: usize = 1000;

/// Scores every keyword of every intent against the message and returns the
/// highest-scoring one.
///
/// Phrases match by substring containment of the canonical message, single
/// words only by whole-word equality. A later keyword with an equal score
/// never replaces the current best, so declaration order breaks ties.
pub fn find_best_match<'a>(
    catalog: &'a IntentCatalog,
    canonical: &str,
    words: &HashSet<String>,
) -> Option<MatchResult<'a>> {
    let mut best: Option<MatchResult<'a>> = None;

    for intent in catalog.intents() {
        for keyword in &intent.keywords {
            let score = if keyword.is_phrase {
                if !canonical.contains(keyword.text.as_str()) {
                    continue;
                }
                PHRASE_SCORE_BASE + keyword.length
            } else {
                if !words.contains(&keyword.text) {
                    continue;
                }
                WORD_SCORE_BASE + keyword.length
            };

            if best.map_or(true, |current| score > current.score) {
                best = Some(MatchResult {
                    intent,
                    keyword: keyword.text.as_str(),
                    score,
                });
            }
        }
    }

    best
}

/// Classifies a raw message and resolves the tenant reply for it.
pub fn respond_with(catalog: &IntentCatalog, message: &str, responses: &ResponseTable) -> ChatReply {
    let canonical = normalize_text(message);
    if canonical.is_empty() {
        return fallback_reply(responses, None, ReplyOutcome::Blank);
    }

    let words = words_of(&canonical);
    let Some(best) = find_best_match(catalog, &canonical, &words) else {
        return fallback_reply(responses, None, ReplyOutcome::Unmatched);
    };

    match configured(responses, best.intent.response_key.as_str()) {
        Some(reply) => ChatReply {
            reply: reply.to_string(),
            intent: Some(best.intent.name.clone()),
            is_fallback: false,
            outcome: ReplyOutcome::Answered,
        },
        None => fallback_reply(
            responses,
            Some(best.intent.name.clone()),
            ReplyOutcome::Unconfigured,
        ),
    }
}

pub fn respond(message: &str, responses: &ResponseTable) -> ChatReply {
    respond_with(IntentCatalog::builtin(), message, responses)
}

pub fn fallback_text(responses: &ResponseTable) -> &str {
    configured(responses, ResponseKey::Fallback.as_str()).unwrap_or(GENERIC_APOLOGY)
}

fn fallback_reply(
    responses: &ResponseTable,
    intent: Option<String>,
    outcome: ReplyOutcome,
) -> ChatReply {
    ChatReply {
        reply: fallback_text(responses).to_string(),
        intent,
        is_fallback: true,
        outcome,
    }
}

fn configured<'a>(responses: &'a ResponseTable, key: &str) -> Option<&'a str> {
    responses
        .get(key)
        .map(String::as_str)
        .filter(|reply| !reply.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intent;

    fn table() -> ResponseTable {
        ResponseKey::ALL
            .into_iter()
            .map(|key| (key.as_str().to_string(), format!("svar:{}", key.as_str())))
            .collect()
    }

    fn best<'a>(catalog: &'a IntentCatalog, message: &str) -> Option<MatchResult<'a>> {
        let canonical = normalize_text(message);
        find_best_match(catalog, &canonical, &words_of(&canonical))
    }

    #[test]
    fn opening_hours_question_is_answered() {
        let reply = respond("Hvornår har I åbent?", &table());
        assert_eq!(reply.reply, "svar:openingHours");
        assert_eq!(reply.intent.as_deref(), Some("opening_hours"));
        assert!(!reply.is_fallback);
        assert_eq!(reply.outcome, ReplyOutcome::Answered);
    }

    #[test]
    fn empty_message_falls_back_without_intent() {
        let reply = respond("", &table());
        assert_eq!(reply.reply, "svar:fallback");
        assert_eq!(reply.intent, None);
        assert!(reply.is_fallback);
        assert_eq!(reply.outcome, ReplyOutcome::Blank);
    }

    #[test]
    fn whitespace_and_punctuation_only_are_blank() {
        for message in ["   ", "\n\t", "?!?", "... --- ..."] {
            let reply = respond(message, &table());
            assert!(reply.is_fallback, "{message:?}");
            assert_eq!(reply.intent, None);
            assert_eq!(reply.outcome, ReplyOutcome::Blank);
        }
    }

    #[test]
    fn whole_words_do_not_match_inside_longer_words() {
        let reply = respond("åbningstider", &table());
        assert_eq!(reply.intent.as_deref(), Some("opening_hours"));

        let catalog = IntentCatalog::builtin();
        let found = best(catalog, "åbningstider").unwrap();
        assert_ne!(found.keyword, "tid");
    }

    #[test]
    fn phrase_outranks_any_single_word() {
        let found = best(IntentCatalog::builtin(), "jeg vil gerne bestille tid i morgen").unwrap();
        assert_eq!(found.intent.name, "booking");
        assert_eq!(found.keyword, "bestille tid");
        assert_eq!(found.score, PHRASE_SCORE_BASE + 12);
    }

    #[test]
    fn phrase_from_other_intent_beats_greeting_word() {
        let reply = respond("Hej, hvad koster det?", &table());
        assert_eq!(reply.intent.as_deref(), Some("prices"));
    }

    #[test]
    fn longer_word_wins_within_band() {
        let catalog = IntentCatalog::compile(&[
            Intent::new("short", &["tid"], ResponseKey::Booking),
            Intent::new("long", &["tidspunkt"], ResponseKey::OpeningHours),
        ])
        .unwrap();
        let found = best(&catalog, "tid tidspunkt").unwrap();
        assert_eq!(found.intent.name, "long");
        assert_eq!(found.score, WORD_SCORE_BASE + 9);
    }

    #[test]
    fn phrases_match_across_word_boundaries() {
        let catalog = IntentCatalog::compile(&[Intent::new(
            "location",
            &["finde jer"],
            ResponseKey::Location,
        )])
        .unwrap();
        assert!(best(&catalog, "hvor kan man finde jeres butik").is_some());
    }

    #[test]
    fn equal_scores_keep_first_declared_intent() {
        let catalog = IntentCatalog::compile(&[
            Intent::new("first", &["ordre"], ResponseKey::OrderStatus),
            Intent::new("second", &["pakke"], ResponseKey::Shipping),
        ])
        .unwrap();
        let found = best(&catalog, "pakke ordre").unwrap();
        assert_eq!(found.intent.name, "first");

        let swapped = IntentCatalog::compile(&[
            Intent::new("second", &["pakke"], ResponseKey::Shipping),
            Intent::new("first", &["ordre"], ResponseKey::OrderStatus),
        ])
        .unwrap();
        assert_eq!(best(&swapped, "pakke ordre").unwrap().intent.name, "second");
    }

    #[test]
    fn equal_scores_within_intent_keep_first_keyword() {
        let catalog = IntentCatalog::compile(&[Intent::new(
            "contact",
            &["mail", "ring"],
            ResponseKey::Contact,
        )])
        .unwrap();
        assert_eq!(best(&catalog, "ring eller mail").unwrap().keyword, "mail");
    }

    #[test]
    fn case_is_ignored() {
        for message in ["HEJ", "hej", "Hej!"] {
            let reply = respond(message, &table());
            assert_eq!(reply.intent.as_deref(), Some("greeting"), "{message}");
            assert!(!reply.is_fallback);
        }
    }

    #[test]
    fn unknown_text_is_unmatched() {
        let reply = respond("xyzzy plugh", &table());
        assert_eq!(reply.intent, None);
        assert!(reply.is_fallback);
        assert_eq!(reply.outcome, ReplyOutcome::Unmatched);
    }

    #[test]
    fn unconfigured_reply_keeps_intent_name() {
        let mut responses = table();
        responses.remove("shipping");
        let reply = respond("Hvad koster fragt og levering?", &responses);
        assert_eq!(reply.intent.as_deref(), Some("prices"));

        let reply = respond("levering", &responses);
        assert_eq!(reply.reply, "svar:fallback");
        assert_eq!(reply.intent.as_deref(), Some("shipping"));
        assert!(reply.is_fallback);
        assert_eq!(reply.outcome, ReplyOutcome::Unconfigured);
    }

    #[test]
    fn empty_configured_reply_counts_as_missing() {
        let mut responses = table();
        responses.insert("greeting".to_string(), "  ".to_string());
        let reply = respond("hej", &responses);
        assert_eq!(reply.outcome, ReplyOutcome::Unconfigured);
        assert_eq!(reply.reply, "svar:fallback");
    }

    #[test]
    fn missing_tenant_fallback_uses_generic_apology() {
        let reply = respond("", &ResponseTable::new());
        assert_eq!(reply.reply, GENERIC_APOLOGY);

        let reply = respond("hej", &ResponseTable::new());
        assert_eq!(reply.reply, GENERIC_APOLOGY);
        assert_eq!(reply.intent.as_deref(), Some("greeting"));
    }

    #[test]
    fn dead_intent_never_wins() {
        let catalog = IntentCatalog::compile(&[
            Intent::new("ghost", &["  ", "!!"], ResponseKey::Greeting),
            Intent::new("greeting", &["hej"], ResponseKey::Greeting),
        ])
        .unwrap();
        let reply = respond_with(&catalog, "hej !!", &table());
        assert_eq!(reply.intent.as_deref(), Some("greeting"));
    }

    #[test]
    fn replies_are_never_empty_and_repeatable() {
        let empty = ResponseTable::new();
        let full = table();
        for message in ["", "hej", "xyz", "ÅBNINGSTID??", "\u{0}", "🙂🙂", "bestille tid"] {
            for responses in [&empty, &full] {
                let first = respond(message, responses);
                assert!(!first.reply.is_empty());
                assert_eq!(first, respond(message, responses));
            }
        }
    }
}
