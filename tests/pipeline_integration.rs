//! Integration tests for the acquisition pipeline against a mock site.

mod support;

use std::collections::HashSet;
use std::time::Duration;

use serde_json::json;
use support::socket_guard::start_mock_server_or_skip;
use support::{item_page, status_block, success_block, video_item};
use tempfile::TempDir;
use tiktok_downloader_core::{
    ArchiveEngine, OutcomeBucket, ProgressEvent, ProgressReporter, RunConfig,
};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(root: &std::path::Path, workers: usize) -> RunConfig {
    RunConfig {
        worker_count: workers,
        download_root: root.to_path_buf(),
        max_retries: 2,
        retry_delay: Duration::from_millis(10),
        ..RunConfig::default()
    }
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/media/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media-bytes".to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_favorite_video_is_archived_and_reported() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    let id = "7300000000000000001";
    mount_page(
        &server,
        &format!("/@alice/video/{id}"),
        item_page(&success_block(video_item(id, "alice", "Hello", &base))),
    )
    .await;
    mount_media(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), 4);
    let engine = ArchiveEngine::from_config(&config).unwrap();
    let url = format!("{base}/@alice/video/{id}");

    let results = engine
        .run(vec![url.clone()], &config.favorites_dir(), ProgressReporter::disabled())
        .await;
    results.persist(&config.favorites_report()).await.unwrap();

    assert_eq!(results.urls(OutcomeBucket::DownloadedVideo), [url.clone()]);

    let item_dir = temp_dir
        .path()
        .join("favoriteVideos")
        .join("alice")
        .join(format!("Hello - {id}"));
    assert_eq!(std::fs::read(item_dir.join("video.mp4")).unwrap(), b"media-bytes");
    assert!(item_dir.join("music.mp4").exists());
    assert!(item_dir.join("music cover.jpeg").exists());

    let metadata = std::fs::read_to_string(item_dir.join("metadata.txt")).unwrap();
    assert!(metadata.starts_with(&format!("Url:        {url}\n")), "Got: {metadata}");
    assert!(metadata.contains(&format!("Content ID: {id}\n")));
    assert!(metadata.contains("Nickname:  Alice & Co\n"), "Expected unescaped nickname in: {metadata}");
    assert!(metadata.contains("Artist:    Alice\n"));
    assert!(metadata.contains("Album:     N/A\n"));
    assert!(metadata.contains("Keywords [1] {\n\tcats\n}"), "Expected keywords in: {metadata}");
    assert!(metadata.contains("Comments [1] {\n\tfirst!\n}"));

    let report = std::fs::read_to_string(temp_dir.path().join("favoriteVideos.log")).unwrap();
    assert!(report.contains("DownloadedVideo: 1"), "Expected count in: {report}");
    assert!(report.contains(&format!("DownloadedVideo Urls [1]:\n\t{url}\n")));
}

#[tokio::test]
async fn test_status_codes_map_to_terminal_buckets() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    let cases = [
        ("/removed-a", status_block(10204), OutcomeBucket::NotAvailable),
        ("/removed-b", status_block(100_004), OutcomeBucket::NotAvailable),
        ("/removed-c", status_block(10231), OutcomeBucket::NotAvailable),
        ("/private", status_block(10222), OutcomeBucket::Private),
        ("/unknown", status_block(1), OutcomeBucket::ParseError),
        (
            "/restricted",
            success_block(json!({"isContentClassified": true})),
            OutcomeBucket::Restricted,
        ),
    ];
    for (route, block, _) in &cases {
        mount_page(&server, route, item_page(block)).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let engine = ArchiveEngine::from_config(&config(temp_dir.path(), 3)).unwrap();
    let urls = cases.iter().map(|(route, _, _)| format!("{base}{route}")).collect();
    let results = engine.run(urls, temp_dir.path(), ProgressReporter::disabled()).await;

    for (route, _, bucket) in &cases {
        let url = format!("{base}{route}");
        assert!(
            results.urls(*bucket).contains(&url),
            "Expected {url} in {bucket}, got: {}",
            results.render_report()
        );
    }
    // Terminal items never create directories.
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_data_block_is_fetched_max_retries_plus_one_times() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Please wait...</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let engine = ArchiveEngine::from_config(&config(temp_dir.path(), 1)).unwrap();
    let results = engine
        .run(
            vec![format!("{}/challenge", server.uri())],
            temp_dir.path(),
            ProgressReporter::disabled(),
        )
        .await;

    assert_eq!(results.count(OutcomeBucket::ParseError), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_every_url_lands_in_exactly_one_bucket() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_media(&server).await;

    let mut urls = Vec::new();
    for i in 0..40 {
        let route = format!("/item/{i}");
        let body = match i % 5 {
            0 => item_page(&success_block(video_item(&i.to_string(), "bob", "clip", &base))),
            1 => item_page(&status_block(10222)),
            2 => item_page(&status_block(10204)),
            3 => "<html>challenge</html>".to_string(),
            _ => item_page(&json!({"__DEFAULT_SCOPE__": {}})),
        };
        mount_page(&server, &route, body).await;
        urls.push(format!("{base}{route}"));
    }

    let temp_dir = TempDir::new().unwrap();
    let engine = ArchiveEngine::from_config(&config(temp_dir.path(), 8)).unwrap();
    let (progress, mut events) = ProgressReporter::channel();
    let results = engine.run(urls.clone(), temp_dir.path(), progress).await;

    let recorded: Vec<&str> = results.iter().map(|(_, url)| url).collect();
    assert_eq!(recorded.len(), urls.len());
    let unique: HashSet<&str> = recorded.into_iter().collect();
    assert_eq!(unique.len(), urls.len());

    let summary = results.summary();
    assert_eq!(summary.total(), 40);
    assert_eq!(summary.count(OutcomeBucket::DownloadedVideo), 8);
    assert_eq!(summary.count(OutcomeBucket::Private), 8);
    assert_eq!(summary.count(OutcomeBucket::NotAvailable), 8);
    assert_eq!(summary.count(OutcomeBucket::ParseError), 16);

    let mut finished = 0;
    while let Some(event) = events.recv().await {
        if matches!(event, ProgressEvent::ItemFinished { .. }) {
            finished += 1;
        }
    }
    assert_eq!(finished, 40);
}

#[tokio::test]
async fn test_gallery_with_video_is_downloaded_both() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_media(&server).await;
    let mut item = video_item("55", "dana", "Trip", &base);
    item["imagePost"] = json!({
        "images": [
            {"imageURL": {"urlList": [format!("{base}/media/55/img0"), format!("{base}/media/55/img0b")]}},
            {"imageURL": {"urlList": [format!("{base}/media/55/img1")]}}
        ]
    });
    mount_page(&server, "/photo", item_page(&success_block(item))).await;

    let temp_dir = TempDir::new().unwrap();
    let engine = ArchiveEngine::from_config(&config(temp_dir.path(), 2)).unwrap();
    let results = engine
        .run(vec![format!("{base}/photo")], temp_dir.path(), ProgressReporter::disabled())
        .await;

    assert_eq!(results.count(OutcomeBucket::DownloadedBoth), 1);
    let item_dir = temp_dir.path().join("dana").join("Trip - 55");
    assert!(item_dir.join("0.jpeg").exists());
    assert!(item_dir.join("1.jpeg").exists());
    assert!(item_dir.join("video.mp4").exists());
}
