pub mod postgres;
pub mod recipes;
pub mod redis;

pub use postgres::{create_pool, run_migrations};
pub use recipes::{PgRecipeStore, RecipeStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

#[cfg(test)]
pub use recipes::MockRecipeStore;
