use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceKind;

/// Terminal state of one processed item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Skipped,
    Success,
    Error,
}

/// Structured result returned by the item processor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOutcome {
    pub status: ItemStatus,
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemOutcome {
    pub fn skipped(item_id: &str) -> Self {
        Self {
            status: ItemStatus::Skipped,
            item_id: item_id.to_string(),
            title: None,
            dish_name: None,
            sources: None,
            message: None,
        }
    }

    pub fn success(item_id: &str, title: String, dish_name: String, sources: Vec<SourceKind>) -> Self {
        Self {
            status: ItemStatus::Success,
            item_id: item_id.to_string(),
            title: Some(title),
            dish_name: Some(dish_name),
            sources: Some(sources),
            message: None,
        }
    }

    pub fn error(item_id: &str, message: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Error,
            item_id: item_id.to_string(),
            title: None,
            dish_name: None,
            sources: None,
            message: Some(message.into()),
        }
    }
}

/// Progress snapshot for one run, as exposed to pollers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStatus {
    pub current: usize,
    pub total: usize,
    pub percentage: u32,
    pub status: String,
    pub video_title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

impl RunStatus {
    pub fn progress(current: usize, total: usize, status: &str, video_title: &str) -> Self {
        Self {
            current,
            total,
            percentage: percentage(current, total),
            status: status.to_string(),
            video_title: video_title.to_string(),
            completed: false,
            success_count: None,
            skipped_count: None,
            error_count: None,
            timestamp: Utc::now(),
        }
    }

    /// Placeholder returned for run ids that have not reported yet
    pub fn pending() -> Self {
        Self::progress(0, 0, "Preparing...", "")
    }
}

/// Integer completion percentage, truncated; zero for an empty run
pub fn percentage(current: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (current * 100 / total) as u32
}

/// Final tally of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub total: usize,
    pub success_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(run_id: &str, outcomes: Vec<ItemOutcome>) -> Self {
        let count = |status: ItemStatus| outcomes.iter().filter(|o| o.status == status).count();

        Self {
            run_id: run_id.to_string(),
            total: outcomes.len(),
            success_count: count(ItemStatus::Success),
            skipped_count: count(ItemStatus::Skipped),
            error_count: count(ItemStatus::Error),
            outcomes,
        }
    }
}
