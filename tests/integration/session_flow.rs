// End-to-end session flows against a mocked occupancy service

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use httpmock::prelude::*;
use jett_app_lib::models::occupancy::{OccupancyRecord, OccupancyTier};
use jett_app_lib::models::session::{Notice, NoticeKind, SessionStage};
use jett_app_lib::models::upload::ImageUpload;
use jett_app_lib::services::notifier::Notifier;
use jett_app_lib::services::occupancy_api::{ApiConfig, HttpOccupancyApi};
use jett_app_lib::services::session_service::SessionService;
use serde_json::json;

const BOOKING: &str = "https://calendar.lib.usf.edu/spaces";

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn kinds(&self) -> Vec<NoticeKind> {
        self.notices
            .lock()
            .expect("notices lock")
            .iter()
            .map(|notice| notice.kind)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().expect("notices lock").push(notice.clone());
    }
}

fn setup(server: &MockServer) -> (SessionService, Arc<RecordingNotifier>) {
    let config = ApiConfig::default().with_base_url(server.base_url());
    let api = Arc::new(HttpOccupancyApi::try_new(&config).expect("client"));
    let notifier = Arc::new(RecordingNotifier::default());
    let service = SessionService::new(api, notifier.clone());
    (service, notifier)
}

#[tokio::test]
async fn happy_path_filters_recommended_building() {
    let server = MockServer::start_async().await;
    let best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(200)
                .json_body(json!({ "best_building": "Library", "occupancy": 55.5 }));
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(200).json_body(json!([
                { "building": "Library", "percent_occupied": 55.5 },
                { "building": "Marshall", "percent_occupied": 12 }
            ]));
        })
        .await;

    let (service, notifier) = setup(&server);
    let stage = service.initialize().await;

    best.assert_async().await;
    list.assert_async().await;
    assert_eq!(stage, SessionStage::Ready);
    assert!(notifier.kinds().is_empty());

    let state = service.snapshot();
    assert!(!state.loading_occupancies);
    assert!(state.occupancies_fetched_at.is_some());
    assert_eq!(
        state.occupancies,
        vec![OccupancyRecord {
            building: "Marshall".into(),
            percent_occupied: Some(12.0),
        }]
    );

    let view = service.view(BOOKING);
    assert!(view.occupancy_section_visible);
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].tier, OccupancyTier::Low);
    assert_eq!(
        view.recommendation.map(|r| r.label),
        Some("Library - 55.50% Occupied".to_string())
    );
}

#[tokio::test]
async fn recommendation_failure_never_requests_occupancies() {
    let server = MockServer::start_async().await;
    let _best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(500);
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(200).json_body(json!([]));
        })
        .await;

    let (service, notifier) = setup(&server);
    let stage = service.initialize().await;

    list.assert_hits_async(0).await;
    assert_eq!(stage, SessionStage::RecommendationFailed);
    assert_eq!(notifier.kinds(), vec![NoticeKind::RecommendationLoadFailed]);

    let state = service.snapshot();
    assert!(state.recommendation.is_none());
    assert!(state.occupancies.is_empty());
    // the list fetch never ran, so it never resolved
    assert!(state.loading_occupancies);
    assert!(!service.view(BOOKING).occupancy_section_visible);
}

#[tokio::test]
async fn occupancy_failure_clears_loading_and_notifies() {
    let server = MockServer::start_async().await;
    let _best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(200)
                .json_body(json!({ "best_building": "Library", "occupancy": 20.0 }));
        })
        .await;
    let _list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(200).json_body(json!({ "unexpected": true }));
        })
        .await;

    let (service, notifier) = setup(&server);
    let stage = service.initialize().await;

    assert_eq!(stage, SessionStage::OccupanciesFailed);
    assert_eq!(notifier.kinds(), vec![NoticeKind::OccupancyLoadFailed]);

    let state = service.snapshot();
    assert!(!state.loading_occupancies);
    assert!(state.occupancies.is_empty());
    assert!(state.recommendation.is_some());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_list() {
    let server = MockServer::start_async().await;
    let _best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(200)
                .json_body(json!({ "best_building": "Library", "occupancy": 20.0 }));
        })
        .await;
    let mut list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(200).json_body(json!([
                { "building": "Marshall", "percent_occupied": 40 },
                { "building": "Muma", "percent_occupied": 75 }
            ]));
        })
        .await;

    let (service, notifier) = setup(&server);
    service.initialize().await;
    let first = service.snapshot().occupancies;
    assert_eq!(first.len(), 2);

    list.delete_async().await;
    let _failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(503);
        })
        .await;

    let error = service
        .load_occupancies()
        .await
        .expect_err("second fetch fails");
    assert_eq!(error.api_status(), Some(503));

    let state = service.snapshot();
    assert_eq!(state.occupancies, first);
    assert!(!state.loading_occupancies);
    assert_eq!(notifier.kinds(), vec![NoticeKind::OccupancyLoadFailed]);
}

#[tokio::test]
async fn loading_flag_is_set_while_list_is_in_flight() {
    let server = MockServer::start_async().await;
    let _best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(200)
                .json_body(json!({ "best_building": "Library", "occupancy": 20.0 }));
        })
        .await;
    let _list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/current-occupancies");
            then.status(200)
                .delay(StdDuration::from_millis(400))
                .json_body(json!([{ "building": "Marshall", "percent_occupied": 5 }]));
        })
        .await;

    let (service, _notifier) = setup(&server);
    service.load_recommendation().await.expect("recommendation");

    let background = service.clone();
    let handle = tokio::spawn(async move { background.load_occupancies().await });

    tokio::time::sleep(StdDuration::from_millis(100)).await;
    let in_flight = service.snapshot();
    assert!(in_flight.loading_occupancies);
    assert_eq!(in_flight.stage, SessionStage::AwaitingOccupancies);

    let published = handle.await.expect("join").expect("occupancies");
    assert_eq!(published.len(), 1);
    assert!(!service.snapshot().loading_occupancies);
}

#[tokio::test]
async fn upload_failure_keeps_previous_result() {
    let server = MockServer::start_async().await;
    let _ok = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload-image")
                .body_contains("good-image");
            then.status(200).json_body(json!({ "percent_occupied": 64.0 }));
        })
        .await;
    let _rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload-image")
                .body_contains("bad-image");
            then.status(400);
        })
        .await;

    let (service, notifier) = setup(&server);

    let first = service
        .upload_image(Some(ImageUpload::new(
            "a.png",
            "image/png",
            b"good-image".to_vec(),
        )))
        .await
        .expect("first upload");
    assert_eq!(first, Some(64.0));

    let error = service
        .upload_image(Some(ImageUpload::new(
            "b.png",
            "image/png",
            b"bad-image".to_vec(),
        )))
        .await
        .expect_err("second upload rejected");
    assert_eq!(error.api_status(), Some(400));

    let upload = service.snapshot().upload;
    assert!(!upload.uploading);
    assert_eq!(upload.result_percent, Some(64.0));
    assert_eq!(upload.submitted, 2);
    assert_eq!(upload.completed, 2);
    assert_eq!(
        upload.file.map(|file| file.file_name),
        Some("b.png".to_string())
    );
    assert_eq!(notifier.kinds(), vec![NoticeKind::UploadFailed]);
}

#[tokio::test]
async fn concurrent_uploads_are_last_writer_wins() {
    let server = MockServer::start_async().await;
    let _slow = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload-image")
                .body_contains("first-image");
            then.status(200)
                .delay(StdDuration::from_millis(300))
                .json_body(json!({ "percent_occupied": 10.0 }));
        })
        .await;
    let _fast = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload-image")
                .body_contains("second-image");
            then.status(200).json_body(json!({ "percent_occupied": 90.0 }));
        })
        .await;

    let (service, _notifier) = setup(&server);
    let (first, second) = futures::join!(
        service.upload_image(Some(ImageUpload::new(
            "first.png",
            "image/png",
            b"first-image".to_vec(),
        ))),
        service.upload_image(Some(ImageUpload::new(
            "second.png",
            "image/png",
            b"second-image".to_vec(),
        ))),
    );

    assert_eq!(first.expect("first"), Some(10.0));
    assert_eq!(second.expect("second"), Some(90.0));

    let upload = service.snapshot().upload;
    // the slower response landed last
    assert_eq!(upload.result_percent, Some(10.0));
    assert!(!upload.uploading);
    assert_eq!(upload.completed, 2);
}

#[tokio::test]
async fn upload_works_after_both_list_fetches_fail() {
    let server = MockServer::start_async().await;
    let _best = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/best-location");
            then.status(502);
        })
        .await;
    let _upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/upload-image");
            then.status(200).json_body(json!({ "percent_occupied": 22.5 }));
        })
        .await;

    let (service, _notifier) = setup(&server);
    service.initialize().await;

    let result = service
        .upload_image(Some(ImageUpload::new("room.png", "image/png", vec![1, 2, 3])))
        .await
        .expect("upload still allowed");
    assert_eq!(result, Some(22.5));
    assert_eq!(
        service.view(BOOKING).upload.result_label.as_deref(),
        Some("22.50% Occupied")
    );
}
