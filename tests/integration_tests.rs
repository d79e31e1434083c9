//! End-to-end mirroring runs against a wiremock server.

use page_mirror::normalizer::{page_filename, site_dirname};
use page_mirror::{FileManager, LedgerStore, MirrorConfig, MirrorError, PageMirror};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dir: &Path) -> MirrorConfig {
    MirrorConfig {
        user_agent: "PageMirrorTest/1.0".to_string(),
        show_progress: false,
        ..MirrorConfig::with_output_dir(dir)
    }
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_bytes(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mirror_page_with_image_and_stylesheet() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();

    mount_html(
        &server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/b.css"></head><body><img src="/a.png"></body></html>"#,
    )
    .await;
    mount_bytes(&server, "/a.png", b"PNGDATA").await;
    mount_bytes(&server, "/b.css", b"body { color: red }").await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let report = mirror.mirror_url(&format!("{}/", server.uri())).await.unwrap();

    let url = server.uri();
    let site = site_dirname(&url);
    assert_eq!(report.target.url, url);
    assert_eq!(report.target.page_path, temp_dir.path().join(page_filename(&url)));

    let page = fs::read_to_string(&report.target.page_path).unwrap();
    assert!(page.contains(&format!(r#"<img src="{}/a.png">"#, site)));
    assert!(page.contains(&format!(r#"href="{}/b.css""#, site)));

    let site_dir = temp_dir.path().join(&site);
    assert_eq!(fs::read(site_dir.join("a.png")).unwrap(), b"PNGDATA");
    assert_eq!(fs::read_to_string(site_dir.join("b.css")).unwrap(), "body { color: red }");

    assert_eq!(report.resources.saved.len(), 2);
    assert!(report.resources.failed.is_empty());

    let entry = mirror.lookup(&url).unwrap().unwrap();
    assert_eq!(entry.url, url);
    assert_eq!(entry.link_count, 0);
    assert_eq!(entry.image_count, 1);
    assert_eq!(entry.fetch_count, 1);
}

#[tokio::test]
async fn test_resource_failure_is_isolated() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();

    mount_html(
        &server,
        "/gallery",
        r#"<a href="/">home</a><img src="/img/1.png"><img src="/img/2.png"><img src="/img/3.png">"#,
    )
    .await;
    mount_bytes(&server, "/img/1.png", b"one").await;
    Mock::given(method("GET"))
        .and(path("/img/2.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_bytes(&server, "/img/3.png", b"three").await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let url = format!("{}/gallery", server.uri());
    let report = mirror.mirror_url(&url).await.unwrap();

    let img_dir = report.target.site_dir.join("img");
    assert_eq!(fs::read(img_dir.join("1.png")).unwrap(), b"one");
    assert_eq!(fs::read(img_dir.join("3.png")).unwrap(), b"three");
    assert!(!img_dir.join("2.png").exists());

    assert_eq!(report.resources.saved.len(), 2);
    assert_eq!(report.resources.failed.len(), 1);
    assert_eq!(report.resources.failed[0].url.path(), "/img/2.png");
    assert!(matches!(
        report.resources.failed[0].error,
        MirrorError::Resource { .. }
    ));

    let entry = mirror.lookup(&url).unwrap().unwrap();
    assert_eq!(entry.fetch_count, 1);
    assert_eq!(entry.link_count, 1);
    assert_eq!(entry.image_count, 3);
}

#[tokio::test]
async fn test_resource_timeout_is_isolated() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();

    mount_html(&server, "/", r#"<script src="/slow.js"></script><img src="/ok.png">"#).await;
    mount_bytes(&server, "/ok.png", b"ok").await;
    Mock::given(method("GET"))
        .and(path("/slow.js"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = MirrorConfig {
        timeout: Duration::from_secs(1),
        ..test_config(temp_dir.path())
    };
    let mut mirror = PageMirror::new(config).await.unwrap();
    let report = mirror.mirror_url(&server.uri()).await.unwrap();

    assert_eq!(report.resources.attempted(), 2);
    assert_eq!(report.resources.failed.len(), 1);
    assert_eq!(report.resources.failed[0].url.path(), "/slow.js");
    assert!(report.target.site_dir.join("ok.png").is_file());
    assert!(!report.target.site_dir.join("slow.js").exists());
    assert_eq!(report.metadata.fetch_count, 1);
}

#[tokio::test]
async fn test_refetch_increments_count_and_replaces_stats() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/1">1</a><a href="/2">2</a><img src="/a.png">"#),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_html(&server, "/news", r#"<a href="/1">1</a>"#).await;
    mount_bytes(&server, "/a.png", b"a").await;

    let url = format!("{}/news", server.uri());
    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();

    let first = mirror.mirror_url(&url).await.unwrap().metadata;
    assert_eq!(first.fetch_count, 1);
    assert_eq!(first.link_count, 2);
    assert_eq!(first.image_count, 1);

    let second = mirror.mirror_url(&url).await.unwrap().metadata;
    assert_eq!(second.fetch_count, 2);
    assert_eq!(second.link_count, 1);
    assert_eq!(second.image_count, 0);
    assert!(second.last_fetch >= first.last_fetch);
    assert_eq!(mirror.ledger().len(), 1);
}

#[tokio::test]
async fn test_fetch_count_survives_restart() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    mount_html(&server, "/", "<p>hello</p>").await;

    for expected in 1..=3 {
        let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
        let report = mirror.mirror_url(&server.uri()).await.unwrap();
        assert_eq!(report.metadata.fetch_count, expected);
    }

    let store = LedgerStore::new(FileManager::new(temp_dir.path()).unwrap());
    let ledger = store.load().await;
    assert_eq!(ledger.lookup(&server.uri()).unwrap().fetch_count, 3);

    let raw = fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json[0]["url"], server.uri());
    assert_eq!(json[0]["num_fetches"], 3);
    assert!(json[0]["last_fetch"].is_string());
}

#[tokio::test]
async fn test_failed_page_fetch_leaves_ledger_untouched() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let url = format!("{}/missing", server.uri());
    let result = mirror.mirror_url(&url).await;

    assert!(matches!(result, Err(MirrorError::Fetch { .. })));
    assert!(mirror.lookup(&url).unwrap().is_none());
    assert!(!temp_dir.path().join(page_filename(&url)).exists());
    assert!(!temp_dir.path().join(site_dirname(&url)).exists());
}

#[tokio::test]
async fn test_mirror_all_continues_after_failures() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    mount_html(&server, "/ok", "<img src='/x.png'>").await;
    mount_bytes(&server, "/x.png", b"x").await;

    let urls = vec![
        "not a url".to_string(),
        format!("{}/gone", server.uri()),
        format!("{}/ok", server.uri()),
    ];
    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let outcomes = mirror.mirror_all(&urls).await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0].result, Err(MirrorError::InvalidUrl { .. })));
    assert!(matches!(outcomes[1].result, Err(MirrorError::Fetch { .. })));
    let report = outcomes[2].result.as_ref().unwrap();
    assert!(report.target.site_dir.join("x.png").is_file());
    assert_eq!(mirror.ledger().len(), 1);
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "PageMirrorTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();

    assert!(mirror.mirror_url(&server.uri()).await.is_ok());
}

#[tokio::test]
async fn test_absolute_references_stay_remote() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    let html = format!(
        r#"<img src="{0}/remote.png"><script src="local.js"></script>"#,
        server.uri()
    );
    mount_html(&server, "/", &html).await;
    mount_bytes(&server, "/local.js", b"let x;").await;
    Mock::given(method("GET"))
        .and(path("/remote.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let report = mirror.mirror_url(&server.uri()).await.unwrap();

    let page = fs::read_to_string(&report.target.page_path).unwrap();
    assert!(page.contains(&format!(r#"<img src="{}/remote.png">"#, server.uri())));
    assert!(page.contains(&format!(r#"<script src="{}/local.js">"#, report.target.site_dir_name)));
    assert!(report.target.site_dir.join("local.js").is_file());
}

#[tokio::test]
async fn test_page_write_failure_leaves_ledger_untouched() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    mount_html(&server, "/", r#"<img src="/a.png">"#).await;
    mount_bytes(&server, "/a.png", b"a").await;

    let url = server.uri();
    // A directory where the page file should go makes the write fail.
    fs::create_dir_all(temp_dir.path().join(page_filename(&url))).unwrap();

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let result = mirror.mirror_url(&url).await;

    assert!(matches!(result, Err(MirrorError::PageWrite { .. })));
    assert!(mirror.lookup(&url).unwrap().is_none());
    assert!(!temp_dir.path().join(site_dirname(&url)).exists());

    let store = LedgerStore::new(FileManager::new(temp_dir.path()).unwrap());
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn test_ledger_write_failure_keeps_in_memory_increment() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    mount_html(&server, "/", "<p>hello</p>").await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let ledger_path = temp_dir.path().join("metadata.json");
    fs::remove_file(&ledger_path).unwrap();
    fs::create_dir(&ledger_path).unwrap();

    let url = server.uri();
    let report = mirror.mirror_url(&url).await.unwrap();

    assert_eq!(report.metadata.fetch_count, 1);
    assert_eq!(mirror.ledger().lookup(&url).unwrap().fetch_count, 1);
    assert!(ledger_path.is_dir());

    let second = mirror.mirror_url(&url).await.unwrap();
    assert_eq!(second.metadata.fetch_count, 2);
}

#[tokio::test]
async fn test_tricky_markup_rewrites_what_was_downloaded() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    mount_html(
        &server,
        "/",
        concat!(
            r#"<!-- <img src="/old.png"> -->"#,
            r#"<img alt="a > b" src="/a.png">"#,
            r#"<textarea><img src="/typed.png"></textarea>"#,
        ),
    )
    .await;
    mount_bytes(&server, "/a.png", b"a").await;

    let mut mirror = PageMirror::new(test_config(temp_dir.path())).await.unwrap();
    let report = mirror.mirror_url(&server.uri()).await.unwrap();

    let site = &report.target.site_dir_name;
    let page = fs::read_to_string(&report.target.page_path).unwrap();
    assert!(page.contains(&format!(r#"src="{}/a.png""#, site)));
    assert!(page.contains(r#"<!-- <img src="/old.png"> -->"#));
    assert!(page.contains(r#"<textarea><img src="/typed.png"></textarea>"#));

    assert_eq!(report.resources.attempted(), 1);
    assert!(report.target.site_dir.join("a.png").is_file());
    assert_eq!(report.metadata.image_count, 1);
}
