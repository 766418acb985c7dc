mod common;

use adsieve::engine::SettingsUpdate;
use adsieve::logger::DecisionAction;
use adsieve::pipeline::{Decision, DecisionBranch, RequestDetails};
use adsieve::service::AdblockService;
use adsieve::session::MemorySession;
use common::{config_for, FilterServer};
use std::time::Duration;
use tempfile::TempDir;

/// Service bound to one session, with its filter server and cache directory.
struct Harness {
    service: AdblockService,
    session: MemorySession,
    _server: FilterServer,
    _dir: TempDir,
}

async fn bound_service(aggressive: bool) -> Harness {
    let server = FilterServer::start().await;
    server.publish("easylist", "||ads.example.com^\n");
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server, dir.path(), &["easylist"]);
    config.video.aggressive_adblock = aggressive;

    let service = AdblockService::start(config).unwrap();
    let session = MemorySession::new("tab-1");
    assert!(service.bind_session(&session));
    Harness {
        service,
        session,
        _server: server,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_generic_rule_cancels_third_party_script() {
    let h = bound_service(true).await;
    let details = RequestDetails::new("https://ads.example.com/banner.js", "script")
        .with_referrer("https://site.test/");
    assert_eq!(h.session.dispatch(details).await, Decision::Cancel);
}

#[tokio::test]
async fn test_unmatched_document_is_allowed() {
    let h = bound_service(true).await;
    let details = RequestDetails::new("https://site.test/index.html", "mainFrame");
    assert_eq!(h.session.dispatch(details).await, Decision::Allow);
}

#[tokio::test]
async fn test_video_frame_exemption_beats_ad_endpoint() {
    let h = bound_service(true).await;
    let details = RequestDetails::new("https://www.youtube.com/pagead/viewthroughconversion", "mainFrame");
    assert_eq!(h.session.dispatch(details).await, Decision::Allow);
}

#[tokio::test]
async fn test_video_ad_endpoint_xhr_is_cancelled() {
    let h = bound_service(true).await;
    let details = RequestDetails::new("https://www.youtube.com/api/stats/ads?x=1", "xhr");
    assert_eq!(h.session.dispatch(details).await, Decision::Cancel);
}

#[tokio::test]
async fn test_video_cdn_ad_stream_depends_on_aggressive_mode() {
    let url = "https://r1---sn-abc.googlevideo.com/videoplayback?ctier=L&id=1";

    let h = bound_service(true).await;
    assert_eq!(
        h.session.dispatch(RequestDetails::new(url, "media")).await,
        Decision::Cancel
    );

    let h = bound_service(false).await;
    assert_eq!(
        h.session.dispatch(RequestDetails::new(url, "media")).await,
        Decision::Allow
    );
}

#[tokio::test]
async fn test_settings_message_toggles_filtering() {
    let h = bound_service(true).await;
    let ad = || RequestDetails::new("https://ads.example.com/banner.js", "script");
    assert_eq!(h.session.dispatch(ad()).await, Decision::Cancel);

    let settings = h.service.settings_sender();
    settings
        .send(SettingsUpdate::from_json(r#"{"enableAdblock": false}"#).unwrap())
        .await
        .unwrap();
    // The listener task applies the update asynchronously.
    for _ in 0..50 {
        if !h.service.pipeline().settings().is_adblock_enabled() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.session.dispatch(ad()).await, Decision::Allow);

    h.service.set_adblock_enabled(true);
    assert_eq!(h.session.dispatch(ad()).await, Decision::Cancel);
}

#[tokio::test]
async fn test_decisions_are_counted_and_logged() {
    let h = bound_service(true).await;
    h.session
        .dispatch(RequestDetails::new("https://ads.example.com/banner.js", "script"))
        .await;
    h.session
        .dispatch(RequestDetails::new("https://www.youtube.com/s/player/base.js", "script"))
        .await;

    let stats = h.service.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.generic, 1);
    assert_eq!(stats.video_host, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let recent = h.service.recent_decisions();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action, DecisionAction::Cancelled);
    assert_eq!(recent[0].hostname, "ads.example.com");
    assert_eq!(recent[1].branch, DecisionBranch::VideoHost);
}

#[tokio::test]
async fn test_dom_cleaner_offered_for_video_pages() {
    let h = bound_service(true).await;
    assert!(h
        .service
        .dom_cleaner_for("https://www.youtube.com/watch?v=abc")
        .is_some());
    assert!(h.service.dom_cleaner_for("https://site.test/").is_none());
}
