use serde::Serialize;

use crate::models::occupancy::{OccupancyRecord, OccupancyTier, Recommendation};
use crate::models::session::{SessionStage, SessionState};
use crate::services::tier::classify_occupancy;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub building: String,
    pub occupancy: f64,
    pub label: String,
}

impl From<&Recommendation> for RecommendationView {
    fn from(recommendation: &Recommendation) -> Self {
        Self {
            building: recommendation.best_building.clone(),
            occupancy: recommendation.occupancy,
            label: format!(
                "{} - {}",
                recommendation.best_building,
                occupied_label(recommendation.occupancy)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyRowView {
    pub building: String,
    pub display_percent: f64,
    pub label: String,
    /// Meter fill, kept within 0–100 so the bar never overflows.
    pub meter_width: f64,
    pub tier: OccupancyTier,
}

impl From<&OccupancyRecord> for OccupancyRowView {
    fn from(record: &OccupancyRecord) -> Self {
        let display_percent = record.display_percent();
        Self {
            building: record.building.clone(),
            display_percent,
            label: occupied_label(display_percent),
            meter_width: display_percent.clamp(0.0, 100.0),
            tier: classify_occupancy(record.percent_occupied),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_data_url: Option<String>,
    pub uploading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_label: Option<String>,
}

/// Everything the page renders, derived from session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub stage: SessionStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationView>,
    pub loading_occupancies: bool,
    pub occupancy_section_visible: bool,
    pub rows: Vec<OccupancyRowView>,
    pub upload: UploadView,
    pub booking_url: String,
}

impl ViewModel {
    pub fn from_state(state: &SessionState, booking_url: &str) -> Self {
        let upload = &state.upload;
        Self {
            stage: state.stage,
            recommendation: state.recommendation.as_ref().map(RecommendationView::from),
            loading_occupancies: state.loading_occupancies,
            occupancy_section_visible: !state.loading_occupancies
                && !state.occupancies.is_empty(),
            rows: state.occupancies.iter().map(OccupancyRowView::from).collect(),
            upload: UploadView {
                preview_file_name: upload.file.as_ref().map(|file| file.file_name.clone()),
                preview_data_url: upload.file.as_ref().map(|file| file.preview_data_url()),
                uploading: upload.uploading,
                result_label: upload.result_percent.map(occupied_label),
            },
            booking_url: booking_url.to_string(),
        }
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();

        if let Some(recommendation) = &self.recommendation {
            lines.push("Recommended study location:".to_string());
            lines.push(format!("  {}", recommendation.label));
        }

        if self.occupancy_section_visible {
            lines.push("Current occupancy:".to_string());
            for row in &self.rows {
                lines.push(format!(
                    "  {:<24} {:>16}  [{}]",
                    row.building, row.label, row.tier
                ));
            }
        } else if self.loading_occupancies && self.stage != SessionStage::RecommendationFailed {
            // the list fetch never runs without a recommendation
            lines.push("Loading current occupancy...".to_string());
        }

        if let Some(name) = &self.upload.preview_file_name {
            lines.push(format!("Uploaded image: {name}"));
        }
        if self.upload.uploading {
            lines.push("Uploading...".to_string());
        }
        if let Some(result) = &self.upload.result_label {
            lines.push(format!("Your room: {result}"));
        }

        lines.push(format!("Book a study space: {}", self.booking_url));
        lines.join("\n")
    }
}

fn occupied_label(percent: f64) -> String {
    format!("{percent:.2}% Occupied")
}
