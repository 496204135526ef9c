use std::sync::Arc;

use crate::{
    db::RecipeStore,
    services::{BatchRunner, PlaylistResolver, StatusBoard},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub playlists: Arc<dyn PlaylistResolver>,
    pub runner: BatchRunner,
    pub status: StatusBoard,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        playlists: Arc<dyn PlaylistResolver>,
        runner: BatchRunner,
        status: StatusBoard,
    ) -> Self {
        Self {
            store,
            playlists,
            runner,
            status,
        }
    }
}
