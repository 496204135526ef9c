use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{NewRecipe, Recipe},
};

/// Durable recipe table keyed by the external item id
///
/// Rows are insert-only. The unique constraint on `item_id` is the
/// authoritative guard against duplicate inserts from overlapping runs;
/// `exists` is only a fast path.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeStore: Send + Sync {
    /// Whether a recipe for this item id has already been stored
    async fn exists(&self, item_id: &str) -> AppResult<bool>;

    /// Inserts a new row; a unique-constraint hit is reported as `AppError::Duplicate`
    async fn insert(&self, recipe: &NewRecipe) -> AppResult<()>;

    /// Returns every recipe whose raw ingredient string contains any of the
    /// tokens as a substring, in insertion order
    async fn find_by_any_ingredient(&self, tokens: &[String]) -> AppResult<Vec<Recipe>>;

    /// Number of stored recipes
    async fn count(&self) -> AppResult<i64>;
}

/// PostgreSQL-backed recipe store
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds a `LIKE` pattern that matches the token literally anywhere in the column
fn contains_pattern(token: &str) -> String {
    let escaped = token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait::async_trait]
impl RecipeStore for PgRecipeStore {
    async fn exists(&self, item_id: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE item_id = $1)")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert(&self, recipe: &NewRecipe) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipes (item_id, title, description, ingredients, dish_name, url, data_sources)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&recipe.item_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.ingredients)
        .bind(&recipe.dish_name)
        .bind(&recipe.url)
        .bind(&recipe.data_sources)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Duplicate(recipe.item_id.clone());
                }
            }
            AppError::Database(e)
        })?;

        tracing::debug!(item_id = %recipe.item_id, "Recipe row inserted");

        Ok(())
    }

    async fn find_by_any_ingredient(&self, tokens: &[String]) -> AppResult<Vec<Recipe>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let patterns: Vec<String> = tokens.iter().map(|t| contains_pattern(t)).collect();

        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, item_id, title, description, ingredients, dish_name, url, data_sources, created_at
            FROM recipes
            WHERE ingredients LIKE ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&patterns)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_plain() {
        assert_eq!(contains_pattern("egg"), "%egg%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_salt"), "%50\\%\\_salt%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
