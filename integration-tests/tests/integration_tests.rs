// End-to-end tests: scan -> select -> publish -> ledger -> folder relocation,
// against a mocked Graph API and a real sqlite ledger file

use common::config::{DatabaseConfig, FolderConfig, MediaConfig, MetaConfig, PlatformConfig};
use common::content::ContentScanner;
use common::ledger::{LedgerPool, PostRecordRepository};
use common::media::StaticMediaHost;
use common::meta::MetaClient;
use common::models::{Platform, Surface, Target};
use common::probe::FixedDurationProbe;
use common::publisher::Publisher;
use common::scheduler::{Scheduler, SchedulerConfig, SchedulerEngine};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IG_ID: &str = "ig_account_1";
const PAGE_ID: &str = "page_1";

struct Harness {
    _dir: TempDir,
    input_dir: std::path::PathBuf,
    processed_dir: std::path::PathBuf,
    db_config: DatabaseConfig,
    ledger_pool: LedgerPool,
    ledger: Arc<PostRecordRepository>,
    engine: SchedulerEngine,
}

fn write_content_folder(input_dir: &Path, name: &str, title: &str, description: &str) {
    let folder = input_dir.join(name);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("final_video.mp4"), b"video-bytes").unwrap();
    let body = serde_json::json!({
        "instagram_facebook": {
            "title": title,
            "description": description,
            "hashtags": ["x", "y"],
        }
    });
    fs::write(
        folder.join("social_media_content.json"),
        serde_json::to_string(&body).unwrap(),
    )
    .unwrap();
}

async fn mock_happy_graph(server: &MockServer) {
    // Page token exchange
    Mock::given(method("GET"))
        .and(path_regex(format!(r"^/v21\.0/{}$", PAGE_ID)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "page-token"})),
        )
        .mount(server)
        .await;
    // IG containers and publish
    Mock::given(method("POST"))
        .and(path_regex(format!(r"^/v21\.0/{}/media$", IG_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "C1"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v21\.0/C1$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status_code": "FINISHED"})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(format!(r"^/v21\.0/{}/media_publish$", IG_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "M1"})))
        .mount(server)
        .await;
    // FB reel three-phase and feed
    Mock::given(method("POST"))
        .and(path_regex(format!(r"^/v21\.0/{}/video_reels$", PAGE_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"video_id": "V1"})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/video-upload/v21\.0/V1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(format!(r"^/v21\.0/{}/videos$", PAGE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "FV1"})))
        .mount(server)
        .await;
}

async fn build_harness(server: &MockServer, allow_empty_description: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("input");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&input_dir).unwrap();

    let db_config = DatabaseConfig {
        path: dir.path().join("ledger.db"),
        max_connections: 2,
        connect_timeout_seconds: 5,
    };
    let ledger_pool = LedgerPool::new(&db_config).await.unwrap();
    let ledger = Arc::new(PostRecordRepository::new(ledger_pool.clone()));

    let meta_config = MetaConfig {
        access_token: "t".repeat(64),
        ig_account_id: IG_ID.to_string(),
        fb_page_id: PAGE_ID.to_string(),
        api_version: "v21.0".to_string(),
        graph_base_url: server.uri(),
        upload_base_url: server.uri(),
        container_poll_seconds: 0,
        container_poll_attempts: 3,
        request_timeout_seconds: 10,
    };
    let meta = Arc::new(MetaClient::connect(&meta_config).await.unwrap());
    let media = Arc::new(StaticMediaHost::new(&MediaConfig {
        public_base_url: "https://media.test/reels".to_string(),
    }));

    let folders = FolderConfig {
        input_dir: input_dir.clone(),
        processed_dir: processed_dir.clone(),
    };
    let platforms = PlatformConfig {
        ig_enabled: true,
        ig_post_reel: true,
        ig_post_story: true,
        fb_enabled: true,
        fb_post_reel: true,
        fb_post_feed: true,
    };
    let publisher = Publisher::new(meta, media, ledger.clone(), platforms, &folders);

    let scanner = ContentScanner::new(
        input_dir.clone(),
        Arc::new(FixedDurationProbe {
            duration_seconds: 45.0,
        }),
    );

    let scheduler_config = SchedulerConfig::new(
        &[chrono_time(18, 0), chrono_time(20, 0)],
        chrono_tz::Asia::Kolkata,
        1,
        120,
        3600,
    )
    .unwrap();

    let engine = SchedulerEngine::new(
        scheduler_config,
        scanner,
        publisher,
        ledger.clone(),
        allow_empty_description,
    );

    Harness {
        _dir: dir,
        input_dir,
        processed_dir,
        db_config,
        ledger_pool,
        ledger,
        engine,
    }
}

fn chrono_time(h: u32, m: u32) -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn test_dispatch_publishes_oldest_folder_and_relocates_it() {
    let server = MockServer::start().await;
    mock_happy_graph(&server).await;
    let harness = build_harness(&server, false).await;

    write_content_folder(&harness.input_dir, "001_first", "First", "Desc one");
    write_content_folder(&harness.input_dir, "002_second", "Second", "Desc two");

    let report = harness.engine.dispatch_once().await.unwrap().unwrap();
    assert_eq!(report.folder_id, "001_first");
    assert!(report.all_settled());

    for target in Target::ALL {
        assert!(harness
            .ledger
            .has_posted("001_first", target.platform, target.surface)
            .await
            .unwrap());
    }

    // Folder moved out of input into processed
    assert!(!harness.input_dir.join("001_first").exists());
    assert!(harness
        .processed_dir
        .join("001_first")
        .join("final_video.mp4")
        .exists());
    assert!(harness.input_dir.join("002_second").exists());
}

#[tokio::test]
async fn test_consecutive_dispatches_drain_the_input_folder() {
    let server = MockServer::start().await;
    mock_happy_graph(&server).await;
    let harness = build_harness(&server, false).await;

    write_content_folder(&harness.input_dir, "001_first", "First", "Desc one");
    write_content_folder(&harness.input_dir, "002_second", "Second", "Desc two");

    let first = harness.engine.dispatch_once().await.unwrap().unwrap();
    assert_eq!(first.folder_id, "001_first");

    let second = harness.engine.dispatch_once().await.unwrap().unwrap();
    assert_eq!(second.folder_id, "002_second");

    // Nothing left to post
    let third = harness.engine.dispatch_once().await.unwrap();
    assert!(third.is_none());
}

#[tokio::test]
async fn test_posted_status_survives_restart() {
    let server = MockServer::start().await;
    mock_happy_graph(&server).await;
    let harness = build_harness(&server, false).await;

    write_content_folder(&harness.input_dir, "001_first", "First", "Desc one");
    harness.engine.dispatch_once().await.unwrap().unwrap();
    harness.ledger_pool.close().await;

    // Reopen the same ledger file, as a restarted process would
    let reopened = LedgerPool::new(&harness.db_config).await.unwrap();
    let repo = PostRecordRepository::new(reopened);
    assert!(repo
        .has_posted("001_first", Platform::Instagram, Surface::Reel)
        .await
        .unwrap());
    assert_eq!(repo.posted_folder_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_dry_run_produces_no_records() {
    let server = MockServer::start().await;
    mock_happy_graph(&server).await;
    let harness = build_harness(&server, false).await;

    write_content_folder(&harness.input_dir, "001_first", "First", "Desc one");

    harness.engine.dry_run().await.unwrap();

    assert!(harness
        .ledger
        .records_for("001_first")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(harness.ledger.posted_folder_count().await.unwrap(), 0);
    // No publish traffic either, only the startup token exchange
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.to_string() == "GET"));
    // And the folder stays where it was
    assert!(harness.input_dir.join("001_first").exists());
}

#[tokio::test]
async fn test_empty_description_held_back_unless_policy_allows() {
    let server = MockServer::start().await;
    mock_happy_graph(&server).await;

    // Policy disallows: the item is not ready, nothing dispatches
    let strict = build_harness(&server, false).await;
    write_content_folder(&strict.input_dir, "001_empty", "Title", "");
    assert!(strict.engine.dispatch_once().await.unwrap().is_none());
    assert!(strict
        .ledger
        .records_for("001_empty")
        .await
        .unwrap()
        .is_empty());

    // Policy allows: the same item posts with an empty description
    let lenient = build_harness(&server, true).await;
    write_content_folder(&lenient.input_dir, "001_empty", "Title", "");
    let report = lenient.engine.dispatch_once().await.unwrap().unwrap();
    assert_eq!(report.folder_id, "001_empty");
    assert!(report.all_settled());
}
