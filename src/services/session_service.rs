use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::occupancy::{OccupancyRecord, Recommendation};
use crate::models::session::{Notice, NoticeKind, SessionStage, SessionState};
use crate::models::upload::ImageUpload;
use crate::models::view::ViewModel;
use crate::services::notifier::Notifier;
use crate::services::occupancy_api::OccupancyApi;

/// Orchestrates one view session: the recommendation fetch, the dependent
/// occupancy list fetch, and user-triggered image uploads.
#[derive(Clone)]
pub struct SessionService {
    api: Arc<dyn OccupancyApi>,
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionService {
    pub fn new(api: Arc<dyn OccupancyApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    /// Runs the mount pipeline: recommendation first, then the occupancy list
    /// when the recommendation is new or changed.
    ///
    /// Failures are reported through the notifier and reflected in the
    /// returned stage; they never abort the session.
    pub async fn initialize(&self) -> SessionStage {
        match self.fetch_recommendation().await {
            Ok((_, true)) => {
                let _ = self.load_occupancies().await;
            }
            Ok((recommendation, false)) => {
                debug!(
                    target: "app::session",
                    building = %recommendation.best_building,
                    "recommendation unchanged, keeping occupancy list"
                );
            }
            Err(_) => {
                info!(
                    target: "app::session",
                    "recommendation unavailable, occupancy list will not be requested"
                );
            }
        }

        self.stage()
    }

    pub async fn load_recommendation(&self) -> AppResult<Recommendation> {
        self.fetch_recommendation()
            .await
            .map(|(recommendation, _)| recommendation)
    }

    async fn fetch_recommendation(&self) -> AppResult<(Recommendation, bool)> {
        match self.api.best_location().await {
            Ok(recommendation) => {
                let changed = {
                    let mut state = self.write_state();
                    let changed = state.recommendation.as_ref() != Some(&recommendation);
                    state.recommendation = Some(recommendation.clone());
                    if changed || state.stage == SessionStage::AwaitingRecommendation {
                        state.stage = SessionStage::AwaitingOccupancies;
                    }
                    changed
                };

                info!(
                    target: "app::session",
                    building = %recommendation.best_building,
                    occupancy = recommendation.occupancy,
                    changed,
                    "recommendation loaded"
                );
                Ok((recommendation, changed))
            }
            Err(error) => {
                warn!(target: "app::session", error = %error, "failed to load recommendation");
                {
                    let mut state = self.write_state();
                    if state.recommendation.is_none() {
                        state.stage = SessionStage::RecommendationFailed;
                    }
                }
                self.raise(NoticeKind::RecommendationLoadFailed);
                Err(error)
            }
        }
    }

    /// Fetches every building's occupancy and publishes the list without the
    /// recommended building. Refuses to run before a recommendation exists.
    pub async fn load_occupancies(&self) -> AppResult<Vec<OccupancyRecord>> {
        {
            let mut state = self.write_state();
            if state.recommendation.is_none() {
                return Err(AppError::validation(
                    "occupancy list requires a loaded recommendation",
                ));
            }
            state.loading_occupancies = true;
            state.stage = SessionStage::AwaitingOccupancies;
        }

        let state = Arc::clone(&self.state);
        let _loading = OnComplete::new(move || {
            write_lock(&state).loading_occupancies = false;
        });

        match self.api.current_occupancies().await {
            Ok(records) => {
                warn_on_duplicate_buildings(&records);
                let published = {
                    let mut state = self.write_state();
                    let best = state
                        .recommendation
                        .as_ref()
                        .map(|recommendation| recommendation.best_building.clone())
                        .unwrap_or_default();
                    let filtered = filter_recommended(records, &best);
                    state.occupancies = filtered.clone();
                    state.occupancies_fetched_at = Some(Utc::now().to_rfc3339());
                    state.stage = SessionStage::Ready;
                    filtered
                };

                debug!(
                    target: "app::session",
                    count = published.len(),
                    "occupancy list published"
                );
                Ok(published)
            }
            Err(error) => {
                warn!(target: "app::session", error = %error, "failed to load occupancy list");
                self.write_state().stage = SessionStage::OccupanciesFailed;
                self.raise(NoticeKind::OccupancyLoadFailed);
                Err(error)
            }
        }
    }

    /// Submits a user-selected image. `None` (selection cleared) is a no-op.
    ///
    /// Returns the estimated percentage on success. A failed upload keeps the
    /// previous result.
    pub async fn upload_image(&self, file: Option<ImageUpload>) -> AppResult<Option<f64>> {
        let Some(image) = file else {
            return Ok(None);
        };

        {
            let mut state = self.write_state();
            state.upload.file = Some(image.clone());
            state.upload.uploading = true;
            state.upload.submitted += 1;
        }

        let state = Arc::clone(&self.state);
        let _uploading = OnComplete::new(move || {
            let mut state = write_lock(&state);
            state.upload.uploading = false;
            state.upload.completed += 1;
        });

        match self.api.upload_image(&image).await {
            Ok(result) => {
                self.write_state().upload.result_percent = Some(result.percent_occupied);
                info!(
                    target: "app::session",
                    file_name = %image.file_name,
                    percent_occupied = result.percent_occupied,
                    "image occupancy estimated"
                );
                Ok(Some(result.percent_occupied))
            }
            Err(error) => {
                warn!(
                    target: "app::session",
                    file_name = %image.file_name,
                    error = %error,
                    "failed to upload image"
                );
                self.raise(NoticeKind::UploadFailed);
                Err(error)
            }
        }
    }

    /// Reports a selected file that never became an upload, such as an
    /// unreadable path. Upload state is left untouched.
    pub fn reject_selection(&self, error: &AppError) {
        warn!(
            target: "app::session",
            error = %error,
            "selected image could not be read"
        );
        self.raise(NoticeKind::UploadFailed);
    }

    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    pub fn stage(&self) -> SessionStage {
        self.read_state().stage
    }

    pub fn view(&self, booking_url: &str) -> ViewModel {
        ViewModel::from_state(&self.read_state(), booking_url)
    }

    fn raise(&self, kind: NoticeKind) {
        self.notifier.notify(&Notice::from(kind));
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        write_lock(&self.state)
    }
}

fn write_lock(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

/// Drops the recommended building from a fetched batch, keeping the order of
/// the remaining records.
pub fn filter_recommended(records: Vec<OccupancyRecord>, best_building: &str) -> Vec<OccupancyRecord> {
    records
        .into_iter()
        .filter(|record| record.building != best_building)
        .collect()
}

fn warn_on_duplicate_buildings(records: &[OccupancyRecord]) {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.building.as_str()) {
            warn!(
                target: "app::session",
                building = %record.building,
                "duplicate building in occupancy batch"
            );
        }
    }
}

/// Runs its closure when dropped, whether the owning future completed,
/// returned early, or was dropped mid-flight.
struct OnComplete<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> OnComplete<F> {
    fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }
}

impl<F: FnOnce()> Drop for OnComplete<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}
