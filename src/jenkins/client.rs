use log::{debug, trace};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::Settings;
use crate::error::{JenkinsError, Result};

use super::types::{Job, Stage, StageLog, WorkflowJob, WorkflowRun};

const CONNECT_TIMEOUT_SECONDS: u64 = 10;
const BUILD_LIST_TREE: &str = "builds[id,fullDisplayName,actions[parameters[name,value]]]";
const ERROR_BODY_LIMIT: usize = 200;

/// Authenticated client for the Jenkins REST API.
///
/// `request` hands back the raw response for any HTTP status; the derived operations
/// decode JSON and turn undecodable non-2xx responses into [`JenkinsError::Api`].
#[derive(Clone)]
pub struct JenkinsClient {
    client: Client,
    host: String,
    user: String,
    key: String,
    pipeline: String,
}

impl JenkinsClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jenkins-cli/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| JenkinsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Url::parse(&settings.host)
            .map_err(|e| JenkinsError::Config(format!("Invalid host URL: {e}")))?;

        Ok(Self {
            client,
            host: settings.host.trim_end_matches('/').to_string(),
            user: settings.user.clone(),
            key: settings.key.clone(),
            pipeline: settings.pipeline.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Resolve `path` against the host. Absolute URLs pass through untouched.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(Url::parse(&format!(
            "{}/{}",
            self.host,
            path.trim_start_matches('/')
        ))?)
    }

    /// Issue an authenticated request.
    ///
    /// GET params become the query string; for any other method they are sent as an
    /// `application/x-www-form-urlencoded` body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<Response> {
        debug!("Using host [{}]", self.host);
        debug!("Using user [{}] and key [***]", self.user);

        let url = self.endpoint(path)?;
        debug!("Calling jenkins API [{method}][{url}]");

        let mut request = self
            .client
            .request(method.clone(), url)
            .basic_auth(&self.user, Some(&self.key));

        if let Some(params) = params {
            if method == Method::GET {
                request = request.query(params);
            } else {
                trace!("setting post data [{params:?}]");
                request = request.form(params);
            }
        }

        Ok(request.send().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<T> {
        let response = self.request(Method::GET, path, params).await?;
        decode(response).await
    }

    /// Most recent build whose parameters carry `product` and `branch`.
    ///
    /// The server lists builds newest first, so the first match wins.
    pub async fn latest_build(&self, product: &str, branch: &str) -> Result<Option<WorkflowRun>> {
        let path = format!("job/{}/api/json", self.pipeline);
        debug!("latest_build([{path}], product [{product}], branch [{branch}])");

        let job: WorkflowJob = self
            .get_json(&path, Some(&[("tree", BUILD_LIST_TREE)]))
            .await?;

        Ok(job.builds.into_iter().find(|run| {
            trace!("Build {} parameters {:?}", run.id, run.parameters().collect::<Vec<_>>());
            run.matches_product_branch(product, branch)
        }))
    }

    pub async fn build_info(&self, build_id: &str) -> Result<WorkflowRun> {
        let path = format!("job/{}/{}/api/json", self.pipeline, build_id);
        debug!("build_info([{path}])");
        self.get_json(&path, None)
            .await
            .map_err(|e| self.not_found_as_missing_build(e, build_id))
    }

    /// Recent runs of the pipeline with their top-level stages.
    pub async fn jobs(&self) -> Result<Vec<Job>> {
        let path = format!("job/{}/wfapi/runs", self.pipeline);
        self.get_json(&path, None).await
    }

    pub async fn job_details(&self, build_id: &str) -> Result<Job> {
        let path = format!("job/{}/{}/wfapi/describe", self.pipeline, build_id);
        self.get_json(&path, None)
            .await
            .map_err(|e| self.not_found_as_missing_build(e, build_id))
    }

    /// Full stage detail, including children, from a stage's self link.
    pub async fn stage(&self, self_href: &str) -> Result<Stage> {
        self.get_json(self_href, None).await
    }

    pub async fn stage_log(&self, log_href: &str) -> Result<StageLog> {
        self.get_json(log_href, None).await
    }

    /// The untruncated console page of a stage node, as HTML.
    pub async fn console_html(&self, build_id: &str, stage_id: &str) -> Result<String> {
        let path = format!(
            "job/{}/{}/execution/node/{}/log/?consoleFull",
            self.pipeline, build_id, stage_id
        );
        let response = self.request(Method::GET, &path, None).await?;
        let url = response.url().to_string();
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(JenkinsError::Api {
                url,
                status: status.as_u16(),
                message: summarize(&body),
            });
        }
        Ok(body)
    }

    /// POST to `job/{job}/buildWithParameters`.
    ///
    /// The raw response is returned so the caller can read the `Location` header.
    pub async fn trigger_build(&self, job: &str, params: &[(&str, &str)]) -> Result<Response> {
        let path = format!("job/{job}/buildWithParameters");
        debug!("trigger_build([{path}])");
        trace!("trigger_build params [{params:?}]");
        self.request(Method::POST, &path, Some(params)).await
    }

    /// Browser URL of a build's flow graph.
    pub fn flow_graph_url(&self, build_id: &str) -> String {
        format!("{}/job/{}/{}/flowGraphTable", self.host, self.pipeline, build_id)
    }

    fn not_found_as_missing_build(&self, error: JenkinsError, build_id: &str) -> JenkinsError {
        match error {
            JenkinsError::Api { status: 404, .. } => JenkinsError::BuildNotFound {
                build_id: build_id.to_string(),
                pipeline: self.pipeline.clone(),
            },
            other => other,
        }
    }
}

/// Decode a JSON body, keeping the URL in the error.
pub async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let status = response.status();
    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|source| {
        debug!("JSON decode error for [{url}]: {source}");
        if status.is_success() {
            JenkinsError::Decode { url, source }
        } else {
            JenkinsError::Api {
                url,
                status: status.as_u16(),
                message: summarize(&body),
            }
        }
    })
}

/// A response body cut down for an error message.
pub fn summarize(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
    format!("{head}...")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Matcher;

    // base64("test:test")
    const BASIC_AUTH: &str = "Basic dGVzdDp0ZXN0";

    pub(crate) fn settings_for(host: &str) -> Settings {
        Settings {
            host: host.to_string(),
            user: "test".to_string(),
            key: "test".to_string(),
            pipeline: "master".to_string(),
            timeout: Duration::from_secs(5),
            products: crate::config::ProductsConfig::default(),
            deployment_domain: "dev.example.com".to_string(),
        }
    }

    pub(crate) fn client_for(server: &mockito::ServerGuard) -> JenkinsClient {
        JenkinsClient::new(&settings_for(&server.url())).unwrap()
    }

    #[test]
    fn test_endpoint_normalises_slashes() {
        let client = JenkinsClient::new(&settings_for("https://ci.example.com/jenkins/")).unwrap();

        assert_eq!(
            client.endpoint("/job/master/1/").unwrap().as_str(),
            "https://ci.example.com/jenkins/job/master/1/"
        );
        assert_eq!(
            client.endpoint("job/master/api/json").unwrap().as_str(),
            "https://ci.example.com/jenkins/job/master/api/json"
        );
        assert_eq!(
            client.endpoint("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let result = JenkinsClient::new(&settings_for("not a url"));
        assert!(matches!(result, Err(JenkinsError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_request_sends_basic_auth_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/test/path")
            .match_header("authorization", BASIC_AUTH)
            .match_query(Matcher::UrlEncoded("tree".into(), "builds[id]".into()))
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .request(Method::GET, "test/path", Some(&[("tree", "builds[id]")]))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_request_sends_form_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/job/build-site/buildWithParameters")
            .match_header("authorization", BASIC_AUTH)
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("PROJECT_NAME".into(), "master".into()),
                Matcher::UrlEncoded("BUILD_NUMBER".into(), "1234".into()),
            ]))
            .with_status(201)
            .with_header("location", "https://jenkins.example.com/queue/item/123/")
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .trigger_build(
                "build-site",
                &[("PROJECT_NAME", "master"), ("BUILD_NUMBER", "1234")],
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "https://jenkins.example.com/queue/item/123/"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_returns_error_statuses_unchanged() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client.request(Method::GET, "broken", None).await.unwrap();
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = JenkinsClient::new(&settings_for("http://127.0.0.1:1")).unwrap();
        let result = client.request(Method::GET, "anything", None).await;
        assert!(matches!(result, Err(JenkinsError::Transport(_))));
    }

    #[tokio::test]
    async fn test_build_info_decodes_run() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/1234/api/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r##"{"id": "1234", "displayName": "#1234", "result": "SUCCESS",
                    "building": false, "duration": 120000, "timestamp": 1704067200000,
                    "url": "https://ci/job/master/1234/"}"##,
            )
            .create_async()
            .await;

        let run = client_for(&server).build_info("1234").await.unwrap();
        assert_eq!(run.id, "1234");
        assert_eq!(run.result.as_deref(), Some("SUCCESS"));
        assert!(!run.building);
        assert_eq!(run.duration, 120_000);
    }

    #[tokio::test]
    async fn test_build_info_404_is_build_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/999/api/json")
            .with_status(404)
            .with_body("<html>Not Found</html>")
            .create_async()
            .await;

        let err = client_for(&server).build_info("999").await.unwrap_err();
        assert!(matches!(
            err,
            JenkinsError::BuildNotFound { ref build_id, ref pipeline }
                if build_id == "999" && pipeline == "master"
        ));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error_with_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/wfapi/runs")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client_for(&server).jobs().await.unwrap_err();
        match err {
            JenkinsError::Decode { url, .. } => assert!(url.ends_with("/job/master/wfapi/runs")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_latest_build_returns_first_match_in_list_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/api/json")
            .match_query(Matcher::UrlEncoded("tree".into(), BUILD_LIST_TREE.into()))
            .with_status(200)
            .with_body(
                r#"{
                "_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob",
                "builds": [
                    {"id": "1236", "actions": [{"parameters": [
                        {"name": "PRODUCT", "value": "bpam"},
                        {"name": "TRYMAX_BRANCH", "value": "origin/master"}]}]},
                    {"id": "1235", "actions": [{"parameters": [
                        {"name": "PRODUCT", "value": "ingredi"},
                        {"name": "TRYMAX_BRANCH", "value": "origin/master"}]}]},
                    {"id": "1234", "actions": [{"parameters": [
                        {"name": "PRODUCT", "value": "ingredi"},
                        {"name": "TRYMAX_BRANCH", "value": "origin/master"}]}]}
                ]}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        let build = client
            .latest_build("ingredi", "origin/master")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(build.id, "1235");

        let none = client.latest_build("ingredi", "origin/other").await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_job_details_and_stage_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/1234/wfapi/describe")
            .with_status(200)
            .with_body(
                r##"{"id": "1234", "name": "#1234", "status": "FAILED", "stages": [
                    {"_links": {"self": {"href": "/job/master/1234/execution/node/6/wfapi/describe"}},
                     "id": "6", "name": "Build", "status": "FAILED"}]}"##,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/job/master/1234/execution/node/6/wfapi/describe")
            .with_status(200)
            .with_body(
                r#"{"id": "6", "name": "Build", "status": "FAILED",
                    "stageFlowNodes": [{"id": "7", "name": "sh", "status": "FAILED"}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let job = client.job_details("1234").await.unwrap();
        let href = job.stages[0].links.self_href().unwrap().to_string();

        let stage = client.stage(&href).await.unwrap();
        assert_eq!(stage.children.len(), 1);
        assert_eq!(stage.children[0].id, "7");
    }

    #[tokio::test]
    async fn test_console_html_keeps_literal_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/master/1234/execution/node/9/log/?consoleFull")
            .with_status(200)
            .with_body("<pre class=\"console-output\">hi</pre>")
            .create_async()
            .await;

        let html = client_for(&server).console_html("1234", "9").await.unwrap();
        assert!(html.contains("console-output"));
    }

    #[test]
    fn test_summarize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let summary = summarize(&body);
        assert_eq!(summary.len(), ERROR_BODY_LIMIT + 3);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize("  short \n"), "short");
    }
}
