//! End-to-end publish flow over the HTTP adapters
//!
//! Drives the orchestrator with the real adapter factory against a
//! mock platform API, persisting job records to SQLite.

use std::sync::Arc;

use crosspost_adapters::HttpAdapterFactory;
use crosspost_adapters::credentials::InMemoryCredentialsStore;
use crosspost_adapters::jobs::SqliteJobStore;
use crosspost_domain::PublishOrchestrator;
use crosspost_domain::model::{
    ContentRecord, JobStatus, Platform, PlatformCredentials, PublishRequest, TenantContext,
};
use crosspost_domain::ports::{CredentialsStore, JobStore, SystemClock};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Orchestrator =
    PublishOrchestrator<HttpAdapterFactory, InMemoryCredentialsStore, SqliteJobStore, SystemClock>;

struct Harness {
    orchestrator: Orchestrator,
    jobs: Arc<SqliteJobStore>,
    credentials: Arc<InMemoryCredentialsStore>,
}

async fn harness_for(server: &MockServer) -> Harness {
    let factory = HttpAdapterFactory::new()
        .with_graph_base_url(server.uri())
        .with_linkedin_base_url(server.uri())
        .with_tiktok_base_url(server.uri());
    let credentials = Arc::new(InMemoryCredentialsStore::new());
    let jobs = Arc::new(SqliteJobStore::in_memory().await.unwrap());

    let orchestrator = PublishOrchestrator::new(
        Arc::new(factory),
        Arc::clone(&credentials),
        Arc::clone(&jobs),
        Arc::new(SystemClock),
    );
    Harness {
        orchestrator,
        jobs,
        credentials,
    }
}

fn image_content() -> ContentRecord {
    ContentRecord {
        id: "c1".to_string(),
        text: "launch day #go".to_string(),
        media_urls: vec!["https://cdn.example.com/a.jpg".to_string()],
        adaptations: Default::default(),
    }
}

/// Adapt the record for the given platforms and attach the payloads
fn with_adaptations(
    harness: &Harness,
    mut content: ContentRecord,
    platforms: &[Platform],
) -> ContentRecord {
    for (platform, adapted) in harness
        .orchestrator
        .adapt_content_for_platforms(&content, platforms)
    {
        content.adaptations.insert(platform, adapted.unwrap());
    }
    content
}

async fn mount_instagram_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": "page_1"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page_1"))
        .and(query_param("fields", "instagram_business_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "page_1",
            "instagram_business_account": {"id": "ig_1"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ig_1/media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "container_1"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ig_1/media_publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ig_post_1"
        })))
        .mount(server)
        .await;
}

async fn mount_facebook_photo(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/me/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "photo_1",
            "post_id": "fb_post_1"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn publishes_to_instagram_and_facebook() {
    let server = MockServer::start().await;
    mount_instagram_happy_path(&server).await;
    mount_facebook_photo(&server).await;

    let harness = harness_for(&server).await;
    let tenant = TenantContext::new("t1");
    for platform in [Platform::Instagram, Platform::Facebook] {
        harness
            .credentials
            .put(
                "t1",
                platform,
                PlatformCredentials::new(format!("token-{}", platform)),
            )
            .await
            .unwrap();
    }

    let platforms = [Platform::Instagram, Platform::Facebook];
    let content = with_adaptations(&harness, image_content(), &platforms);

    let request = PublishRequest::new(content, platforms.to_vec());
    let results = harness.orchestrator.publish_content(&request, &tenant).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].platform, Platform::Instagram);
    assert_eq!(results[0].status, JobStatus::Success);
    assert_eq!(
        results[0].result.as_ref().unwrap().post_id.as_deref(),
        Some("ig_post_1")
    );
    assert_eq!(results[1].platform, Platform::Facebook);
    assert_eq!(results[1].status, JobStatus::Success);
    assert_eq!(
        results[1].result.as_ref().unwrap().post_id.as_deref(),
        Some("fb_post_1")
    );

    // terminal states landed in the audit store
    let persisted = harness.jobs.list_for_content("c1").await.unwrap();
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().all(|j| j.status == JobStatus::Success));
}

#[tokio::test]
async fn missing_credentials_do_not_disturb_sibling_platforms() {
    let server = MockServer::start().await;
    mount_instagram_happy_path(&server).await;

    let harness = harness_for(&server).await;
    let tenant = TenantContext::new("t1");
    harness
        .credentials
        .put("t1", Platform::Instagram, PlatformCredentials::new("tok-ig"))
        .await
        .unwrap();

    let platforms = [Platform::Instagram, Platform::Facebook];
    let content = with_adaptations(&harness, image_content(), &platforms);

    let request = PublishRequest::new(content, platforms.to_vec());
    let results = harness.orchestrator.publish_content(&request, &tenant).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, JobStatus::Success);
    assert_eq!(results[1].status, JobStatus::Failed);
    assert!(results[1]
        .result
        .as_ref()
        .unwrap()
        .error
        .as_deref()
        .unwrap()
        .contains("no credentials"));
}

#[tokio::test]
async fn transient_platform_errors_are_retried() {
    let server = MockServer::start().await;

    // first two photo posts hit a gateway error, the third lands
    Mock::given(method("POST"))
        .and(path("/me/photos"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_facebook_photo(&server).await;

    let harness = harness_for(&server).await;
    let tenant = TenantContext::new("t1");
    harness
        .credentials
        .put("t1", Platform::Facebook, PlatformCredentials::new("tok-fb"))
        .await
        .unwrap();

    let platforms = [Platform::Facebook];
    let content = with_adaptations(&harness, image_content(), &platforms);

    let mut request = PublishRequest::new(content, platforms.to_vec());
    request.retry_policy = Some(crosspost_domain::model::RetryPolicy {
        max_retries: 3,
        base_delay: std::time::Duration::from_millis(10),
        ..Default::default()
    });

    let results = harness.orchestrator.publish_content(&request, &tenant).await;

    assert_eq!(results[0].status, JobStatus::Success);
    assert_eq!(results[0].retry_count, 2);
}
