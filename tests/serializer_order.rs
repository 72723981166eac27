use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokengate::{
    AuthMethod, AuthorizationEndpoint, AuthorizedClient, BaseUrl, ClientCredential, Credential,
    CredentialStore, MemoryCredentialStore, RequestDescriptor, Scheme, ServiceConfig, UrlPath,
};

mod common;

fn loopback(server: &MockServer) -> BaseUrl {
    BaseUrl::with_scheme(Scheme::Http, server.address().to_string()).expect("loopback host")
}

fn bearer_config(server: &MockServer, credential: Credential) -> ServiceConfig {
    let store = Arc::new(MemoryCredentialStore::new(credential));
    let endpoint = AuthorizationEndpoint::from_parts(
        loopback(server),
        UrlPath::try_new("/oauth/token").expect("valid path"),
    );
    ServiceConfig::new(AuthMethod::Bearer {
        endpoint,
        credential: ClientCredential::new("client-id", None),
        store: store as Arc<dyn CredentialStore>,
    })
}

/// Requests held back behind a refresh replay in the order they arrived,
/// even though they all become dispatchable at the same instant.
#[tokio::test(flavor = "multi_thread")]
async fn held_back_requests_replay_in_arrival_order() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "renewed",
                    "refresh_token": "rt2",
                    "expires_in": 600,
                }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let expired = Credential::new("stale", "rt1", SystemTime::now() - Duration::from_secs(1));
    let client = AuthorizedClient::new(bearer_config(&server, expired));
    let base = loopback(&server);
    let descriptor = |segment: &str| {
        RequestDescriptor::new(
            base.clone(),
            UrlPath::try_new(format!("/v1/{segment}")).expect("valid path"),
        )
    };

    // join! polls its futures in argument order; each future enqueues
    // synchronously on first poll, so the submission order is first,
    // second, third.
    let first = descriptor("first");
    let second = descriptor("second");
    let third = descriptor("third");
    let (a, b, c) = tokio::join!(
        client.authorize_and_send(&first),
        client.authorize_and_send(&second),
        client.authorize_and_send(&third),
    );
    for result in [a, b, c] {
        assert_eq!(result.expect("request succeeds").status, 200);
    }

    let replayed: Vec<String> = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|request| request.method.as_str() == "GET")
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(replayed, ["/v1/first", "/v1/second", "/v1/third"]);
}
