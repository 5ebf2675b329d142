use std::path::PathBuf;

use tracing::debug;

use crate::commands::{AppState, CommandResult};
use crate::models::session::{SessionStage, SessionState};
use crate::models::upload::ImageUpload;
use crate::models::view::ViewModel;

pub async fn session_initialize(state: &AppState) -> CommandResult<SessionStage> {
    debug!(target: "app::command", "session_initialize invoked");
    Ok(state.session().initialize().await)
}

pub fn session_snapshot(state: &AppState) -> CommandResult<SessionState> {
    Ok(state.session().snapshot())
}

pub fn session_view(state: &AppState) -> CommandResult<ViewModel> {
    Ok(state.session().view(&state.config().booking_url))
}

/// Uploads the image at `path`; `None` mirrors a cleared file picker.
pub async fn image_upload(state: &AppState, path: Option<PathBuf>) -> CommandResult<Option<f64>> {
    let file = match path {
        Some(path) => match ImageUpload::from_path(&path).await {
            Ok(file) => Some(file),
            Err(error) => {
                state.session().reject_selection(&error);
                return Err(error.into());
            }
        },
        None => None,
    };
    debug!(target: "app::command", has_file = file.is_some(), "image_upload invoked");

    state
        .session()
        .upload_image(file)
        .await
        .map_err(Into::into)
}
