use std::fmt;

use serde::Serialize;

use crate::models::occupancy::{OccupancyRecord, Recommendation};
use crate::models::upload::ImageUpload;

/// Progress of the dependent recommendation → occupancy pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStage {
    AwaitingRecommendation,
    RecommendationFailed,
    AwaitingOccupancies,
    OccupanciesFailed,
    Ready,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub file: Option<ImageUpload>,
    pub uploading: bool,
    pub result_percent: Option<f64>,
    /// Uploads submitted during this session.
    pub submitted: u64,
    /// Uploads that finished, successfully or not.
    pub completed: u64,
}

/// View-level state for one session. Mutated only by `SessionService`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub stage: SessionStage,
    pub recommendation: Option<Recommendation>,
    pub occupancies: Vec<OccupancyRecord>,
    pub loading_occupancies: bool,
    pub upload: UploadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancies_fetched_at: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            stage: SessionStage::AwaitingRecommendation,
            recommendation: None,
            occupancies: Vec::new(),
            // the list reads as loading from mount, before its fetch is issued
            loading_occupancies: true,
            upload: UploadState::default(),
            occupancies_fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    RecommendationLoadFailed,
    OccupancyLoadFailed,
    UploadFailed,
}

impl NoticeKind {
    pub fn message(self) -> &'static str {
        match self {
            NoticeKind::RecommendationLoadFailed => "Failed to load best suggestion",
            NoticeKind::OccupancyLoadFailed => "Failed to load occupancy data",
            NoticeKind::UploadFailed => "Failed to upload image",
        }
    }
}

/// User-visible failure notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl From<NoticeKind> for Notice {
    fn from(kind: NoticeKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
