//! Recipe extraction from aggregated video text.
//!
//! The prompt builder fuses whichever sources are available into one prompt;
//! the extractor sends it to a [`TextGenerator`] and tolerantly decodes the
//! reply. Every failure past the builder degrades to "title as dish name, no
//! ingredients" instead of failing the item.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{models::SourceKind, services::inference::TextGenerator};

/// Character budgets applied to each source before concatenation
pub const CAPTIONS_BUDGET: usize = 2000;
pub const DESCRIPTION_BUDGET: usize = 1000;
pub const COMMENTS_BUDGET: usize = 800;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json|JSON)?\s*").expect("valid regex"));
static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").expect("valid regex"));

/// The independently optional text inputs for one video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSlots {
    pub captions: Option<String>,
    pub description: Option<String>,
    pub comments: Option<String>,
}

impl SourceSlots {
    /// Populated slot text; an empty string counts as absent
    fn slot(&self, kind: SourceKind) -> Option<&str> {
        let value = match kind {
            SourceKind::Captions => &self.captions,
            SourceKind::Description => &self.description,
            SourceKind::Comments => &self.comments,
        };
        value.as_deref().filter(|s| !s.is_empty())
    }

    /// Kinds with data, in prompt order
    pub fn available(&self) -> Vec<SourceKind> {
        [SourceKind::Captions, SourceKind::Description, SourceKind::Comments]
            .into_iter()
            .filter(|kind| self.slot(*kind).is_some())
            .collect()
    }

    /// Labeled, truncated sources joined by blank lines; `None` when nothing is available
    pub fn combined_text(&self) -> Option<String> {
        let sections: Vec<String> = self
            .available()
            .into_iter()
            .filter_map(|kind| {
                let (label, budget) = match kind {
                    SourceKind::Captions => ("Captions", CAPTIONS_BUDGET),
                    SourceKind::Description => ("Description", DESCRIPTION_BUDGET),
                    SourceKind::Comments => ("Comments", COMMENTS_BUDGET),
                };
                self.slot(kind)
                    .map(|text| format!("{}: {}", label, truncate_chars(text, budget)))
            })
            .collect();

        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n\n"))
        }
    }
}

/// First `max` characters of `text`, never splitting a code point
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the extraction instruction around the combined source text
pub fn build_prompt(title: &str, combined_text: &str) -> String {
    format!(
        r#"The following is data from a cooking video titled "{title}".
Analyze all of it together and extract the dish name and its ingredients.

{combined_text}

Rules:
1. Keep the dish name short and clear
2. Separate ingredients with commas only, no spaces
3. Include basic seasonings and condiments
4. Also consider ingredients mentioned in the comments
5. Respond in JSON

Response format:
{{"dish_name": "dish name", "ingredients": "ingredient1,ingredient2,ingredient3"}}
"#
    )
}

/// Removes a Markdown code fence wrapped around the model's reply
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(&without_leading, "").into_owned()
}

/// Canonical ingredient list: no whitespace, no empty tokens, no edge commas
pub fn normalize_ingredients(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Why a model reply could not be turned into a record
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ResponseError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("response is an empty list")]
    EmptyList,

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("ingredients must be a string or a list of strings")]
    InvalidIngredients,
}

/// Shape of the model's reply after fence stripping
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceResponse {
    Object(Map<String, Value>),
    ArrayOfObject(Vec<Value>),
    Malformed(String),
}

impl InferenceResponse {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(&strip_code_fence(raw)) {
            Ok(Value::Object(map)) => InferenceResponse::Object(map),
            Ok(Value::Array(items)) => InferenceResponse::ArrayOfObject(items),
            Ok(other) => InferenceResponse::Malformed(format!("unexpected JSON value: {}", other)),
            Err(e) => InferenceResponse::Malformed(e.to_string()),
        }
    }

    /// Resolves every accepted shape to the single record it carries
    pub fn into_record(self) -> Result<Map<String, Value>, ResponseError> {
        match self {
            InferenceResponse::Object(map) => Ok(map),
            InferenceResponse::ArrayOfObject(items) => match items.into_iter().next() {
                Some(Value::Object(map)) => Ok(map),
                Some(_) => Err(ResponseError::NotAnObject),
                None => Err(ResponseError::EmptyList),
            },
            InferenceResponse::Malformed(reason) => Err(ResponseError::Malformed(reason)),
        }
    }
}

fn read_dish_name(record: &Map<String, Value>, title: &str) -> String {
    match record.get("dish_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => title.to_string(),
    }
}

/// Raw ingredient text; only a string or a list of strings is accepted
fn read_ingredients(record: &Map<String, Value>) -> Result<String, ResponseError> {
    match record.get("ingredients") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.as_str()),
                _ => Err(ResponseError::InvalidIngredients),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(",")),
        Some(_) => Err(ResponseError::InvalidIngredients),
    }
}

/// Dish name, canonical ingredients and the sources that fed the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub dish_name: String,
    pub ingredients: String,
    pub sources: Vec<SourceKind>,
}

impl Extraction {
    /// Degraded result: the title stands in for the dish name
    pub fn fallback(title: &str) -> Self {
        Self {
            dish_name: title.to_string(),
            ingredients: String::new(),
            sources: Vec::new(),
        }
    }

    /// Decodes a raw model reply into a normalized extraction
    pub fn from_response(raw: &str, title: &str, sources: Vec<SourceKind>) -> Result<Self, ResponseError> {
        let record = InferenceResponse::parse(raw).into_record()?;

        Ok(Self {
            dish_name: read_dish_name(&record, title),
            ingredients: normalize_ingredients(&read_ingredients(&record)?),
            sources,
        })
    }
}

/// Runs the prompt through a text generator and decodes the reply
#[derive(Clone)]
pub struct RecipeExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl RecipeExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Never fails: any inference or decoding problem yields [`Extraction::fallback`]
    pub async fn extract(&self, title: &str, slots: &SourceSlots) -> Extraction {
        let Some(combined_text) = slots.combined_text() else {
            tracing::info!(title = %title, "No source text available, skipping inference");
            return Extraction::fallback(title);
        };

        let prompt = build_prompt(title, &combined_text);

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = self.generator.name(),
                    title = %title,
                    "Inference request failed"
                );
                return Extraction::fallback(title);
            }
        };

        match Extraction::from_response(&raw, title, slots.available()) {
            Ok(extraction) => {
                tracing::info!(
                    dish_name = %extraction.dish_name,
                    sources = ?extraction.sources,
                    "Recipe extracted"
                );
                extraction
            }
            Err(e) => {
                tracing::error!(error = %e, title = %title, "Failed to decode inference response");
                Extraction::fallback(title)
            }
        }
    }
}
