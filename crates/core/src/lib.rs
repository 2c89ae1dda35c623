pub mod catalog;
pub mod intent;
pub mod models;
pub mod normalize;

pub use catalog::{builtin_intents, CatalogError, IntentCatalog};
pub use intent::{fallback_text, find_best_match, respond, respond_with};
pub use models::*;
pub use normalize::{normalize_optional, normalize_text, word_set, words_of};
