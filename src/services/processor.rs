use std::sync::Arc;

use crate::{
    db::RecipeStore,
    error::{AppError, AppResult, FetchResult},
    models::{ItemOutcome, NewRecipe, SourceKind},
    services::{
        extraction::{RecipeExtractor, SourceSlots},
        progress::StatusBoard,
        sources::VideoSource,
    },
};

/// Status labels shown to pollers while an item moves through its stages
pub mod phase {
    pub const PREPARING: &str = "Preparing...";
    pub const ALREADY_PROCESSED: &str = "Already processed";
    pub const FETCHING_INFO: &str = "Fetching video info...";
    pub const CHECKING_CAPTIONS: &str = "Checking captions...";
    pub const COLLECTING_COMMENTS: &str = "Collecting comments...";
    pub const ANALYZING: &str = "Analyzing with AI...";
    pub const DONE: &str = "Done!";
}

/// Longest error excerpt placed in a status label
const STATUS_ERROR_CHARS: usize = 30;

/// Status label for a failed item, truncated for display
pub fn error_label(message: &str) -> String {
    let excerpt: String = message.chars().take(STATUS_ERROR_CHARS).collect();
    format!("Error: {}", excerpt)
}

/// Position of an item within its run, used for progress reporting
#[derive(Debug, Clone, Copy)]
pub struct ItemPosition<'a> {
    pub run_id: &'a str,
    pub index: usize,
    pub total: usize,
}

/// Turns one playlist item into a stored recipe
///
/// Stages: idempotency gate → metadata → captions/description/comments →
/// inference → insert. Only a missing video or a store failure ends the item
/// in `error`; every source fetch is optional.
#[derive(Clone)]
pub struct ItemProcessor {
    source: Arc<dyn VideoSource>,
    extractor: RecipeExtractor,
    store: Arc<dyn RecipeStore>,
    status: StatusBoard,
    comment_limit: u32,
}

impl ItemProcessor {
    pub fn new(
        source: Arc<dyn VideoSource>,
        extractor: RecipeExtractor,
        store: Arc<dyn RecipeStore>,
        status: StatusBoard,
        comment_limit: u32,
    ) -> Self {
        Self {
            source,
            extractor,
            store,
            status,
            comment_limit,
        }
    }

    async fn report(&self, pos: ItemPosition<'_>, status: &str, video_title: &str) {
        self.status
            .update(pos.run_id, pos.index, pos.total, status, video_title)
            .await;
    }

    /// Processes a single item; never fails, errors become an `error` outcome
    pub async fn process(&self, item_id: &str, pos: ItemPosition<'_>) -> ItemOutcome {
        match self.run_stages(item_id, pos).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    run_id = %pos.run_id,
                    item_id = %item_id,
                    error = %e,
                    "Item processing failed"
                );
                self.report(pos, &error_label(&e.to_string()), "").await;
                ItemOutcome::error(item_id, e.to_string())
            }
        }
    }

    async fn run_stages(&self, item_id: &str, pos: ItemPosition<'_>) -> AppResult<ItemOutcome> {
        if self.store.exists(item_id).await? {
            tracing::info!(item_id = %item_id, "Item already processed, skipping");
            self.report(pos, phase::ALREADY_PROCESSED, "").await;
            return Ok(ItemOutcome::skipped(item_id));
        }

        self.report(pos, phase::FETCHING_INFO, "").await;
        let metadata = self.source.fetch_metadata(item_id).await.map_err(AppError::from)?;
        let title = metadata.title.clone();

        tracing::info!(item_id = %item_id, title = %title, "Processing item");

        self.report(pos, phase::CHECKING_CAPTIONS, &title).await;
        let captions = Self::optional(
            SourceKind::Captions,
            item_id,
            self.source.fetch_captions(item_id).await,
        );

        self.report(pos, phase::COLLECTING_COMMENTS, &title).await;
        let comments = Self::optional(
            SourceKind::Comments,
            item_id,
            self.source
                .fetch_top_comments(item_id, self.comment_limit)
                .await,
        );

        let slots = SourceSlots {
            captions,
            description: Some(metadata.description.clone()),
            comments,
        };

        self.report(pos, phase::ANALYZING, &title).await;
        let extraction = self.extractor.extract(&title, &slots).await;

        if extraction.ingredients.is_empty() {
            tracing::warn!(item_id = %item_id, title = %title, "No ingredients extracted");
        }

        let recipe = NewRecipe::from_extraction(
            &metadata,
            extraction.dish_name.clone(),
            extraction.ingredients.clone(),
            &extraction.sources,
        );
        self.store.insert(&recipe).await?;

        self.report(pos, phase::DONE, &title).await;

        let preview: String = recipe.ingredients.chars().take(50).collect();
        tracing::info!(
            item_id = %item_id,
            title = %title,
            sources = %recipe.data_sources,
            ingredients = %preview,
            "Recipe saved"
        );

        Ok(ItemOutcome::success(
            item_id,
            title,
            extraction.dish_name,
            extraction.sources,
        ))
    }

    /// Collapses an optional source fetch into a slot value
    fn optional(kind: SourceKind, item_id: &str, result: FetchResult<String>) -> Option<String> {
        match result {
            Ok(text) => Some(text),
            Err(e) if e.is_absent() => {
                tracing::info!(item_id = %item_id, source = %kind, reason = %e, "Source not available");
                None
            }
            Err(e) => {
                tracing::warn!(item_id = %item_id, source = %kind, error = %e, "Source fetch failed");
                None
            }
        }
    }
}
