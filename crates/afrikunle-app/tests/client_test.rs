//! End-to-end tests: the production platform against a stub backend.

mod common;

use afrikunle_app::AfrikunleClient;
use afrikunle_cache::preferences::Theme;
use afrikunle_content::application::code_runner::CodeRun;
use afrikunle_content::application::lesson_loader::LessonState;
use afrikunle_content::application::lesson_service::Origin;
use afrikunle_content::domain::lesson::{LessonId, Level};
use afrikunle_core::error::ClientError;
use afrikunle_health::HealthStatus;

#[tokio::test]
async fn test_fetch_lesson_probes_past_missing_singular_route() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();

    // Act
    let fetch = client.fetch_lesson(&LessonId::Number(1), "fr").await.unwrap();

    // Assert
    assert_eq!(fetch.lesson.title, "Les variables");
    assert_eq!(fetch.lesson.level, Some(Level::Beginner));
    assert_eq!(
        fetch.origin,
        Origin::Network {
            endpoint: format!("{}/api/lessons/1?lang=fr", backend.url())
        }
    );
    client.shutdown().await;
}

#[tokio::test]
async fn test_missing_locale_falls_back_to_english() {
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();

    let fetch = client.fetch_lesson(&LessonId::Number(2), "fr").await.unwrap();

    assert_eq!(fetch.lesson.title, "Recursion");
    client.shutdown().await;
}

#[tokio::test]
async fn test_cached_lesson_is_served_after_restart_offline() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let online = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();
    let live = online.fetch_lesson(&LessonId::Number(1), "en").await.unwrap();
    online.shutdown().await;
    drop(backend);

    // Act
    let offline = AfrikunleClient::start(common::config(&common::dead_url().await, dir.path()))
        .await
        .unwrap();
    let fetch = offline.fetch_lesson(&LessonId::Number(1), "en").await.unwrap();

    // Assert
    assert_eq!(fetch.origin, Origin::Cache);
    assert_eq!(fetch.lesson, live.lesson);
    offline.shutdown().await;
}

#[tokio::test]
async fn test_offline_without_cache_surfaces_one_consolidated_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&common::dead_url().await, dir.path()))
        .await
        .unwrap();

    let error = client
        .fetch_lesson(&LessonId::Number(1), "en")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ClientError::Network(_) | ClientError::EmptyOrMalformed
    ));
    assert!(!error.user_message().contains("127.0.0.1"));
    client.shutdown().await;
}

#[tokio::test]
async fn test_list_lessons_keeps_level_and_untagged() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();

    // Act
    let fetch = client
        .list_lessons("en", Some(&Level::Beginner))
        .await
        .unwrap();

    // Assert
    let titles: Vec<&str> = fetch.lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Variables", "Hello, world"]);
    client.shutdown().await;
}

#[tokio::test]
async fn test_lesson_loader_publishes_latest_request() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();
    let loader = client.lesson_loader();

    // Act
    let first = loader.load(LessonId::Number(1), "en");
    let second = loader.load(LessonId::Number(2), "en");
    let _ = tokio::join!(first, second);

    // Assert
    match loader.current() {
        LessonState::Ready { id, fetch, .. } => {
            assert_eq!(id, LessonId::Number(2));
            assert_eq!(fetch.lesson.title, "Recursion");
        }
        other => panic!("expected the second lesson, got {other:?}"),
    }
    client.shutdown().await;
}

#[tokio::test]
async fn test_run_code_reports_output_and_blocked_code() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();

    // Act
    let ok = client.run_code("print(1)").await.unwrap();
    let blocked = client.run_code("import os").await.unwrap();
    let silent = client.run_code("   ").await.unwrap();

    // Assert
    assert_eq!(ok, CodeRun::Output("ran 8 chars".to_owned()));
    assert_eq!(
        blocked,
        CodeRun::Error("Blocked: import os is not allowed".to_owned())
    );
    assert_eq!(silent, CodeRun::Output("Code ran successfully".to_owned()));
    assert_eq!(client.preferences().last_code.as_deref(), Some("   "));
    client.shutdown().await;
}

#[tokio::test]
async fn test_health_reports_online_for_live_backend() {
    // Arrange
    let backend = common::spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&backend.url(), dir.path()))
        .await
        .unwrap();

    // Act
    let handle = client.watch_health();
    let mut rx = handle.subscribe();
    rx.changed().await.unwrap();

    // Assert
    assert_eq!(rx.borrow_and_update().status, HealthStatus::Online);
    handle.stop().await;
    client.shutdown().await;
}

#[tokio::test]
async fn test_health_reports_offline_for_dead_backend() {
    let dir = tempfile::tempdir().unwrap();
    let client = AfrikunleClient::start(common::config(&common::dead_url().await, dir.path()))
        .await
        .unwrap();

    let handle = client.watch_health();
    let mut rx = handle.subscribe();
    rx.changed().await.unwrap();

    assert_eq!(rx.borrow().status, HealthStatus::Offline);
    handle.stop().await;
    client.shutdown().await;
}

#[tokio::test]
async fn test_preferences_survive_restart() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let url = common::dead_url().await;
    let client = AfrikunleClient::start(common::config(&url, dir.path()))
        .await
        .unwrap();
    client.set_lang("fr");
    client.set_theme(Theme::Dark);
    client.set_speech_rate(0.8).unwrap();
    client.set_user_name("Amara");
    client.shutdown().await;

    // Act
    let restarted = AfrikunleClient::start(common::config(&url, dir.path()))
        .await
        .unwrap();
    let prefs = restarted.preferences();

    // Assert
    assert_eq!(prefs.lang, "fr");
    assert_eq!(prefs.theme, Theme::Dark);
    assert!((prefs.speech_rate - 0.8).abs() < f32::EPSILON);
    assert_eq!(prefs.user_name, "Amara");
    restarted.shutdown().await;
}
