use std::sync::Arc;
use std::time::{Duration, SystemTime};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokengate::{
    AuthEvent, AuthMethod, AuthorizationEndpoint, AuthorizedClient, BaseUrl, BasicCredential,
    ClientCredential, Credential, CredentialStore, MemoryCredentialStore, RequestDescriptor,
    Scheme, ServiceConfig, UrlPath,
};

mod common;

fn loopback(server: &MockServer) -> BaseUrl {
    BaseUrl::with_scheme(Scheme::Http, server.address().to_string()).expect("loopback host")
}

fn resource(server: &MockServer) -> RequestDescriptor {
    RequestDescriptor::new(
        loopback(server),
        UrlPath::try_new("/v1/resource").expect("valid path"),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn opted_out_request_carries_no_header_and_triggers_no_refresh() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/resource"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Expired on purpose: opting out must also skip the refresh path.
    let store = Arc::new(MemoryCredentialStore::new(Credential::new(
        "stale",
        "rt1",
        SystemTime::now() - Duration::from_secs(1),
    )));
    let config = ServiceConfig::new(AuthMethod::Bearer {
        endpoint: AuthorizationEndpoint::from_parts(
            loopback(&server),
            UrlPath::try_new("/oauth/token").expect("valid path"),
        ),
        credential: ClientCredential::new("client-id", None),
        store: store as Arc<dyn CredentialStore>,
    });
    let client = AuthorizedClient::new(config);

    let response = client
        .authorize_and_send(&resource(&server).without_authorization())
        .await
        .expect("request succeeds");
    assert_eq!(response.status, 200);

    let recorded = server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].headers.get("Authorization").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn basic_method_sends_encoded_credentials() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/resource"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ServiceConfig::new(AuthMethod::Basic(BasicCredential::new("user", "pass")));
    let client = AuthorizedClient::new(config);

    let response = client
        .authorize_and_send(&resource(&server))
        .await
        .expect("request succeeds");
    assert_eq!(response.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_response_surfaces_error_and_event() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/resource"))
        .respond_with(ResponseTemplate::new(401).set_body_string("who are you"))
        .expect(1)
        .mount(&server)
        .await;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let config = ServiceConfig::new(AuthMethod::Basic(BasicCredential::new("user", "pass")))
        .events(events_tx);
    let client = AuthorizedClient::new(config);

    let err = client
        .authorize_and_send(&resource(&server))
        .await
        .expect_err("401 must fail");
    assert!(err.is_authorization_failure());
    assert!(!err.is_access_token_refresh_failure());

    let mut unauthorized_events = 0;
    while let Ok(event) = events_rx.try_recv() {
        match event {
            AuthEvent::AuthorizationFailed(response) => {
                assert_eq!(response.status, 401);
                unauthorized_events += 1;
            }
            AuthEvent::RefreshFailed(err) => panic!("no refresh ran, got event: {err:?}"),
        }
    }
    assert_eq!(unauthorized_events, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_decodes_successful_json_body() {
    #[derive(serde::Deserialize)]
    struct Greeting {
        message: String,
    }

    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/resource"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "hello"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AuthorizedClient::new(ServiceConfig::default());
    let greeting: Greeting = client
        .authorize_and_fetch(&resource(&server))
        .await
        .expect("decodes");
    assert_eq!(greeting.message, "hello");
}
