use std::cmp::Ordering;
use std::collections::HashSet;

use crate::{
    db::RecipeStore,
    models::{Recipe, RecipeMatch, RecommendationOutcome, NO_SOURCES},
};

/// Comma-separated tokens, trimmed, empties dropped, first occurrence kept
///
/// Tokens are compared exactly: no case folding and no stemming.
pub fn ingredient_set(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

/// Percentage of the recipe's ingredients the user already has
fn match_rate(matched: usize, recipe_size: usize) -> f64 {
    if recipe_size == 0 {
        0.0
    } else {
        matched as f64 / recipe_size as f64 * 100.0
    }
}

/// Rate as displayed, one decimal place
fn format_rate(rate: f64) -> String {
    format!("{:.1}", rate)
}

/// Scores each candidate against the user's ingredients and sorts best first
///
/// Candidates with equal displayed rates keep their input order.
pub fn rank_candidates(user: &[String], candidates: Vec<Recipe>) -> Vec<RecipeMatch> {
    let user: HashSet<&str> = user.iter().map(String::as_str).collect();

    let mut scored: Vec<(f64, RecipeMatch)> = candidates
        .into_iter()
        .map(|recipe| {
            let recipe_set = ingredient_set(recipe.ingredients.as_deref().unwrap_or_default());
            let (matched, missing): (Vec<&String>, Vec<&String>) = recipe_set
                .iter()
                .partition(|ingredient| user.contains(ingredient.as_str()));

            let rate = format_rate(match_rate(matched.len(), recipe_set.len()));
            let sort_key = rate.parse::<f64>().unwrap_or_default();

            let entry = RecipeMatch {
                title: recipe.title,
                url: recipe.url,
                dish_name: recipe.dish_name.unwrap_or_default(),
                match_rate: rate,
                matched: join_display(&matched),
                missing: join_display(&missing),
                all_ingredients: recipe_set.join(", "),
                sources: recipe
                    .data_sources
                    .unwrap_or_else(|| NO_SOURCES.to_string()),
            };
            (sort_key, entry)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, entry)| entry).collect()
}

fn join_display(items: &[&String]) -> String {
    items
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Recipes that can be made (fully or partly) from the given ingredients
///
/// The store filter is a permissive substring OR across tokens; exact token
/// matching happens during ranking. Store failures are logged and answered
/// with a message outcome.
pub async fn recommend(store: &dyn RecipeStore, input: &str) -> RecommendationOutcome {
    let user = ingredient_set(input);
    if user.is_empty() {
        return RecommendationOutcome::empty_query();
    }

    let candidates = match store.find_by_any_ingredient(&user).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!(error = %e, tokens = user.len(), "Recommendation query failed");
            return RecommendationOutcome::unavailable();
        }
    };
    tracing::info!(
        tokens = user.len(),
        candidates = candidates.len(),
        "Recommendation candidates loaded"
    );

    if candidates.is_empty() {
        return RecommendationOutcome::no_matches();
    }

    RecommendationOutcome::Matches {
        recipes: rank_candidates(&user, candidates),
    }
}
