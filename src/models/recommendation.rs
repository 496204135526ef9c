use serde::{Deserialize, Serialize};

/// One ranked recipe in a recommendation response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeMatch {
    pub title: String,
    pub url: String,
    pub dish_name: String,
    /// Match rate formatted with one decimal place, e.g. "66.7"
    pub match_rate: String,
    pub matched: String,
    pub missing: String,
    pub all_ingredients: String,
    pub sources: String,
}

/// Result of a recommendation query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    /// The query contained no usable ingredient tokens
    EmptyQuery { message: String },
    /// No stored recipe mentions any requested ingredient
    NoMatches { message: String },
    Matches { recipes: Vec<RecipeMatch> },
    /// The recipe store could not be queried
    Unavailable { message: String },
}

impl RecommendationOutcome {
    pub fn empty_query() -> Self {
        RecommendationOutcome::EmptyQuery {
            message: "Please enter ingredients.".to_string(),
        }
    }

    pub fn no_matches() -> Self {
        RecommendationOutcome::NoMatches {
            message: "No recipes can be made with these ingredients.".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        RecommendationOutcome::Unavailable {
            message: "Recipes cannot be searched right now. Please try again later.".to_string(),
        }
    }
}
