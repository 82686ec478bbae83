//! Integration tests for the hyper-backed engine against a real server.

use assert2::{check, let_assert};
use sluice::{Client, Error, HyperEngine, Method, Request};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn get_reads_status_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/greeting"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Greeting", "hello")
                .set_body_string("Hello, World!"),
        )
        .mount(&server)
        .await;

    let client = Client::builder(HyperEngine::new()).build();

    let call = client
        .get(&format!("{}/greeting", server.uri()))
        .await
        .expect("call");

    check!(call.status() == 200);
    check!(call.header("x-greeting") == Some("hello"));
    check!(call.body_text().await.expect("body") == "Hello, World!");
}

#[tokio::test]
async fn request_headers_reach_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/authed"))
        .and(header("Authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = Client::builder(HyperEngine::new()).build();

    let url = format!("{}/authed", server.uri()).parse().expect("url");
    let request = Request::builder(Method::GET, url)
        .header("Authorization", "Bearer token")
        .build();

    let call = client.execute(request).await.expect("call");
    check!(call.status() == 204);
}

#[tokio::test]
async fn post_json_sends_the_serialized_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("Content-Type", "application/json"))
        .and(body_string(r#"{"name":"widget"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
        .mount(&server)
        .await;

    #[derive(serde::Serialize)]
    struct NewItem {
        name: &'static str,
    }

    #[derive(Debug, serde::Deserialize)]
    struct Created {
        id: u64,
    }

    let client = Client::builder(HyperEngine::new()).build();

    let call = client
        .post_json(&format!("{}/items", server.uri()), &NewItem { name: "widget" })
        .await
        .expect("call");

    check!(call.status() == 201);
    let created: Created = call.body_json().await.expect("body");
    check!(created.id == 7);
}

#[tokio::test]
async fn server_error_is_rejected_with_captured_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = Client::builder(HyperEngine::new())
        .expect_success(true)
        .build();

    let result = client.get(&format!("{}/broken", server.uri())).await;

    let_assert!(Err(Error::UnexpectedStatus { status, body }) = result);
    check!(status == 503);
    check!(body.as_ref() == b"upstream down");
}

#[tokio::test]
async fn connection_failure_surfaces_as_transport_error() {
    // Nothing listens on this port.
    let client = Client::builder(HyperEngine::new()).build();

    let result = client.get("http://127.0.0.1:9/unreachable").await;

    let_assert!(Err(cause) = result);
    check!(cause.is_connection() || cause.is_timeout());
}
