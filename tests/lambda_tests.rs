/* tests/lambda_tests.rs */

#![cfg(feature = "lambda")]

use std::sync::Arc;

use live_aws::client::{AppConfigDataClient, ClientError, LambdaExtensionClient, SessionParams};
use live_aws::source::AppConfigSource;
use live_aws::{Provider, ProviderError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROFILE_PATH: &str = "/applications/app/environments/prod/configurations/main";

fn client(server: &MockServer) -> LambdaExtensionClient {
	LambdaExtensionClient::with_base_url(reqwest::Client::new(), &server.uri()).unwrap()
}

fn json(body: &str) -> ResponseTemplate {
	ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

#[tokio::test]
async fn test_every_poll_returns_the_document() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path(PROFILE_PATH))
		.respond_with(json(r#"{"Level":"Info"}"#))
		.expect(2)
		.mount(&server)
		.await;

	let client = client(&server);
	let token = client
		.start_session(&SessionParams::new("app", "prod", "main"))
		.await
		.unwrap();
	let first = client.get_latest(&token).await.unwrap();
	let second = client.get_latest(&first.next_token).await.unwrap();

	assert_eq!(first.content, r#"{"Level":"Info"}"#);
	assert_eq!(first.content, second.content);
	assert_eq!(first.next_token, token);
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(404))
		.mount(&server)
		.await;

	let client = client(&server);
	let token = client
		.start_session(&SessionParams::new("app", "prod", "main"))
		.await
		.unwrap();
	assert!(client.get_latest(&token).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_non_json_content_is_rejected() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path(PROFILE_PATH))
		.respond_with(
			ResponseTemplate::new(200).set_body_raw("Level=Info", "text/plain"),
		)
		.mount(&server)
		.await;

	let client = client(&server);
	let token = client
		.start_session(&SessionParams::new("app", "prod", "main"))
		.await
		.unwrap();
	assert!(matches!(
		client.get_latest(&token).await,
		Err(ClientError::UnsupportedContent(ct)) if ct == "text/plain"
	));
}

#[tokio::test]
async fn test_provider_over_extension() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path(PROFILE_PATH))
		.respond_with(json(r#"{"Db":{"Port":5432}}"#))
		.mount(&server)
		.await;

	let source = AppConfigSource::builder(
		Arc::new(client(&server)),
		SessionParams::new("app", "prod", "main"),
	)
	.build()
	.unwrap();
	let provider = Provider::builder(source).build().unwrap();

	provider.load().await.unwrap();
	assert_eq!(provider.get("Db:Port"), Some("5432".to_string()));
	assert!(!provider.reload().await.unwrap());
}

#[tokio::test]
async fn test_throttling_surfaces_as_client_error() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(429))
		.mount(&server)
		.await;

	let source = AppConfigSource::builder(
		Arc::new(client(&server)),
		SessionParams::new("app", "prod", "main"),
	)
	.build()
	.unwrap();
	let provider = Provider::builder(source).build().unwrap();
	assert!(matches!(
		provider.load().await,
		Err(ProviderError::Client(ClientError::Throttled(_)))
	));
}
