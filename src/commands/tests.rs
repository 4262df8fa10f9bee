use async_trait::async_trait;
use mockito::{Matcher, ServerGuard};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use super::*;
use crate::error::JenkinsError;
use crate::jenkins::settings_for;
use crate::logs::LineLimit;
use crate::output::Capture;
use crate::queue::tests::mock_queue_item;

/// Records what would have been launched.
#[derive(Clone, Default)]
struct FakeLauncher {
    runs: Arc<Mutex<Vec<Vec<String>>>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl FakeLauncher {
    fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run_self(&self, args: &[String]) -> Result<()> {
        self.runs.lock().unwrap().push(args.to_vec());
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

fn context(server: &ServerGuard) -> (Context, Capture, FakeLauncher) {
    console::set_colors_enabled(false);
    let out = Capture::default();
    let launcher = FakeLauncher::default();
    let mut ctx = Context::new(
        &settings_for(&server.url()),
        Box::new(out.clone()),
        Box::new(launcher.clone()),
        0,
    )
    .unwrap();
    ctx.poll_interval = Duration::from_millis(10);
    ctx.monitor_interval = Duration::from_millis(10);
    (ctx, out, launcher)
}

fn args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

const NODE: &str = "/job/master/77/execution/node";

/// Build 77: `Build` (FAILED) with a single failed `sh` step that has a log.
async fn mock_failed_build(server: &mut ServerGuard) {
    server
        .mock("GET", "/job/master/77/wfapi/describe")
        .with_status(200)
        .with_body(format!(
            r##"{{"id": "77", "name": "#77", "status": "FAILED", "stages": [
                {{"_links": {{"self": {{"href": "{NODE}/6/wfapi/describe"}}}},
                 "id": "6", "name": "Build", "status": "FAILED"}}]}}"##
        ))
        .create_async()
        .await;
    server
        .mock("GET", format!("{NODE}/6/wfapi/describe").as_str())
        .with_status(200)
        .with_body(format!(
            r#"{{"id": "6", "name": "Build", "status": "FAILED", "stageFlowNodes": [
                {{"_links": {{"self": {{"href": "{NODE}/7/wfapi/describe"}}}},
                 "id": "7", "name": "sh", "status": "FAILED"}}]}}"#
        ))
        .create_async()
        .await;
    server
        .mock("GET", format!("{NODE}/7/wfapi/describe").as_str())
        .with_status(200)
        .with_body(format!(
            r#"{{"_links": {{"self": {{"href": "{NODE}/7/wfapi/describe"}},
                             "log": {{"href": "{NODE}/7/wfapi/log"}}}},
                "id": "7", "name": "sh", "status": "FAILED", "execNode": "agent-3",
                "durationMillis": 1500}}"#
        ))
        .create_async()
        .await;
    server
        .mock("GET", format!("{NODE}/7/wfapi/log").as_str())
        .with_status(200)
        .with_body(
            r#"{"nodeId": "7", "nodeStatus": "FAILED", "length": 24, "hasMore": false,
                "text": "make: building\nmake: *** Error 2"}"#,
        )
        .create_async()
        .await;
}

#[tokio::test]
async fn test_build_triggers_polls_queue_and_spawns_monitor() {
    let mut server = mockito::Server::new_async().await;
    let trigger = server
        .mock("POST", "/job/master/buildWithParameters")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("PRODUCT".into(), "ingredi".into()),
            Matcher::UrlEncoded("TRYMAX_BRANCH".into(), "origin/master".into()),
        ]))
        .with_status(201)
        .with_header("location", "/queue/item/42/")
        .create_async()
        .await;
    let (_queue, hits) = mock_queue_item(&mut server, 2, 555).await;
    let (ctx, out, launcher) = context(&server);

    assert_ok!(build::run(&ctx, "rs", "master").await);

    trigger.assert_async().await;
    assert_eq!(hits.load(Ordering::SeqCst), 3, "queue polled until it had an executable");
    let text = out.text();
    assert!(text.contains("Queue:   /queue/item/42/"), "output was:\n{text}");
    assert!(text.contains("Build started: #555"), "output was:\n{text}");
    assert_eq!(
        launcher.runs(),
        vec![args(&["monitor", "--bg", "--pipeline", "master", "-b", "555"])]
    );
}

#[tokio::test]
async fn test_build_rejects_unknown_product_before_any_request() {
    let server = mockito::Server::new_async().await;
    let (ctx, _, launcher) = context(&server);

    let err = build::run(&ctx, "foo", "master").await.unwrap_err();
    assert!(matches!(err, JenkinsError::Validation { ref field, .. } if field == "product"));
    assert!(launcher.runs().is_empty());
}

#[tokio::test]
async fn test_build_without_queue_location_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/job/master/buildWithParameters")
        .with_status(201)
        .create_async()
        .await;
    let (ctx, _, launcher) = context(&server);

    let err = build::run(&ctx, "pra", "feature").await.unwrap_err();
    assert!(matches!(err, JenkinsError::MissingQueueLocation));
    assert!(launcher.runs().is_empty());
}

#[tokio::test]
async fn test_push_latest_product_build_monitors_deploy_job() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/api/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"builds": [
                {"id": "900", "actions": [{"parameters": [
                    {"name": "PRODUCT", "value": "bpam"},
                    {"name": "TRYMAX_BRANCH", "value": "origin/master"}]}]}]}"#,
        )
        .create_async()
        .await;
    let deploy = server
        .mock("POST", "/job/build-site/buildWithParameters")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("PROJECT_NAME".into(), "master".into()),
            Matcher::UrlEncoded("BUILD_NUMBER".into(), "900".into()),
            Matcher::UrlEncoded("SUBDOMAIN".into(), "qa1".into()),
        ]))
        .with_status(201)
        .with_header("location", "/queue/item/42/")
        .create_async()
        .await;
    let _queue = mock_queue_item(&mut server, 0, 31).await;
    let (ctx, out, launcher) = context(&server);

    push::run(&ctx, "PRA", "qa1").await.unwrap();

    deploy.assert_async().await;
    assert!(out.text().contains("qa1.dev.example.com"));
    assert_eq!(
        launcher.runs(),
        vec![args(&["monitor", "--bg", "--pipeline", "build-site", "-b", "31"])]
    );
}

#[tokio::test]
async fn test_push_without_matching_build_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/api/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"builds": []}"#)
        .create_async()
        .await;
    let (ctx, _, _) = context(&server);

    let err = push::run(&ctx, "rs", "qa1").await.unwrap_err();
    assert!(matches!(err, JenkinsError::NoMatchingBuild { ref product, .. } if product == "RS"));
}

#[tokio::test]
async fn test_latest_without_match_is_informative_success() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/api/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"builds": []}"#)
        .create_async()
        .await;
    let (ctx, out, _) = context(&server);

    latest::run(&ctx, "rs", "release").await.unwrap();
    assert!(out.text().contains("No builds found for RS on branch [origin/release]"));
}

#[tokio::test]
async fn test_monitor_without_bg_hands_off_to_child() {
    let server = mockito::Server::new_async().await;
    let (mut ctx, _, launcher) = context(&server);
    ctx.verbosity = 1;

    monitor::run(&ctx, &args(&["10", "11"]), false).await.unwrap();

    assert_eq!(
        launcher.runs(),
        vec![args(&[
            "monitor", "--bg", "--pipeline", "master", "-b", "10", "-b", "11", "-v"
        ])]
    );
}

#[tokio::test]
async fn test_monitor_child_reads_the_same_config_file() {
    let server = mockito::Server::new_async().await;
    let (mut ctx, _, launcher) = context(&server);
    ctx.config_path = Some(std::path::PathBuf::from("/etc/jenkins/ci.yaml"));

    monitor::run(&ctx, &args(&["12"]), false).await.unwrap();

    assert_eq!(
        launcher.runs(),
        vec![args(&[
            "monitor",
            "--bg",
            "--pipeline",
            "master",
            "--config",
            "/etc/jenkins/ci.yaml",
            "-b",
            "12"
        ])]
    );
}

#[tokio::test]
async fn test_monitor_in_background_reports_finished_builds() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/10/api/json")
        .with_status(200)
        .with_body(r##"{"id": "10", "displayName": "#10", "building": false, "result": "SUCCESS"}"##)
        .expect(1)
        .create_async()
        .await;
    let (ctx, out, launcher) = context(&server);

    assert_ok!(monitor::run(&ctx, &args(&["10"]), true).await);

    assert_eq!(
        out.lines(),
        vec!["10: The monitor for [#10] on branch [master] is [SUCCESS]"]
    );
    assert!(launcher.runs().is_empty());
}

#[tokio::test]
async fn test_status_sorts_by_build_id() {
    let mut server = mockito::Server::new_async().await;
    for (id, result) in [("12", "FAILURE"), ("11", "SUCCESS")] {
        server
            .mock("GET", format!("/job/master/{id}/api/json").as_str())
            .with_status(200)
            .with_body(format!(r##"{{"id": "{id}", "displayName": "#{id}", "result": "{result}"}}"##))
            .create_async()
            .await;
    }
    let (ctx, out, _) = context(&server);

    assert_ok!(status::run(&ctx, &args(&["12", "11"])).await);

    assert_eq!(
        out.lines(),
        vec![
            "11: The status for [#11] on branch [master] is [SUCCESS]",
            "12: The status for [#12] on branch [master] is [FAILURE]",
        ]
    );
}

#[tokio::test]
async fn test_failed_lists_deepest_failed_stage() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    let (ctx, out, _) = context(&server);

    failed::run(&ctx, "77").await.unwrap();

    let text = out.text();
    assert!(text.contains("✗ Build > sh"), "output was:\n{text}");
    assert!(text.contains("ID:       7"));
    assert!(text.contains("Node:     agent-3"));
    assert!(text.contains("Total failed stages: 1"));
}

#[tokio::test]
async fn test_diagnose_prints_logs_and_summary() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    server
        .mock("GET", "/job/master/77/api/json")
        .with_status(200)
        .with_body(r#"{"id": "77", "result": "FAILURE", "duration": 61000, "url": "http://ci/77/"}"#)
        .create_async()
        .await;
    let (ctx, out, _) = context(&server);

    diagnose::run(&ctx, "77", false, 50).await.unwrap();

    let text = out.text();
    assert!(text.contains("BUILD DIAGNOSIS: master #77"));
    assert!(text.contains("Duration: 01:01.000"));
    assert!(text.contains("1. Build > sh (Duration: 00:01.500)"));
    assert!(text.contains("make: *** Error 2"));
    assert!(text.contains("Build 77 had 1 failed stage(s)"));
}

#[tokio::test]
async fn test_stage_log_tail_and_missing_stage() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    let (ctx, out, _) = context(&server);

    stage_log::run(&ctx, "77", "7", LineLimit::Tail(1), false)
        .await
        .unwrap();
    let lines = out.lines();
    assert_eq!(lines.first().map(String::as_str), Some("Stage: sh"));
    assert_eq!(lines.last().map(String::as_str), Some("make: *** Error 2"));
    assert!(lines.contains(&"(showing last 1 lines)".to_string()));

    let err = stage_log::run(&ctx, "77", "99", LineLimit::All, false)
        .await
        .unwrap_err();
    assert!(matches!(err, JenkinsError::StageNotFound { ref stage_id, .. } if stage_id == "99"));
}

#[tokio::test]
async fn test_stage_log_full_reads_console_page() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    server
        .mock("GET", "/job/master/77/execution/node/7/log/?consoleFull")
        .with_status(200)
        .with_body(r#"<html><pre class="console-output">first<br>second &amp; last</pre></html>"#)
        .create_async()
        .await;
    let (ctx, out, _) = context(&server);

    stage_log::run(&ctx, "77", "7", LineLimit::All, true)
        .await
        .unwrap();

    let lines = out.lines();
    assert_eq!(&lines[lines.len() - 2..], &["first", "second & last"]);
}

#[tokio::test]
async fn test_timing_without_successful_jobs_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/wfapi/runs")
        .with_status(200)
        .with_body(r#"[{"id": "1", "status": "FAILED", "stages": [{"name": "Build", "durationMillis": 5}]}]"#)
        .create_async()
        .await;
    let (ctx, _, _) = context(&server);

    let err = assert_err!(timing::run(&ctx, &[]).await);
    assert!(matches!(err, JenkinsError::NoTimingData));
}

#[tokio::test]
async fn test_timing_renders_table_and_footer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/job/master/wfapi/runs")
        .with_status(200)
        .with_body(
            r#"[{"id": "2", "status": "SUCCESS", "stages": [{"name": "Build", "durationMillis": 2000}]},
                {"id": "1", "status": "SUCCESS", "stages": [{"name": "Build", "durationMillis": 4000}]}]"#,
        )
        .create_async()
        .await;
    let (ctx, out, _) = context(&server);

    timing::run(&ctx, &[]).await.unwrap();

    let text = out.text();
    assert!(text.contains("00:03.000"), "output was:\n{text}");
    assert!(text.contains("Times for 1 stages across 2 successful jobs"));
}

#[tokio::test]
async fn test_open_prints_and_opens_flow_graph() {
    let server = mockito::Server::new_async().await;
    let (ctx, out, launcher) = context(&server);

    assert_ok!(open::run(&ctx, "77").await);

    let url = format!("{}/job/master/77/flowGraphTable", server.url());
    assert_eq!(out.lines(), vec![url.clone()]);
    assert_eq!(*launcher.opened.lock().unwrap(), vec![url]);
}

#[tokio::test]
async fn test_stages_of_leaf_stage_prints_log() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    let (ctx, out, _) = context(&server);

    stages::run(&ctx, Some("77"), Some("7"), &stages::View::default())
        .await
        .unwrap();

    let lines = out.lines();
    assert_eq!(lines[0], "#77 > sh [FAILED]");
    assert_eq!(lines.last().map(String::as_str), Some("make: *** Error 2"));
}

#[tokio::test]
async fn test_stages_of_build_renders_table() {
    let mut server = mockito::Server::new_async().await;
    mock_failed_build(&mut server).await;
    let (ctx, out, _) = context(&server);

    stages::run(&ctx, Some("77"), None, &stages::View::default())
        .await
        .unwrap();

    let text = out.text();
    assert!(text.contains("master #77 [FAILED]"));
    assert!(text.contains("Build"));
    assert!(text.contains("1 rows"));
}
