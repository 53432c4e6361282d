//! Request rewriting and response streaming through the proxy.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Router,
};
use tokio::sync::Notify;

mod common;

#[tokio::test]
async fn backend_without_path_keeps_inbound_path_and_query() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let body = common::client()
        .get(proxy.url("/foo?x=1"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "GET /foo?x=1");
}

#[tokio::test]
async fn backend_path_replaces_inbound_path() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![format!("http://{}/v1", backend)]).await;

    let client = common::client();
    let plain = client.get(proxy.url("/foo")).send().await.unwrap().text().await.unwrap();
    let nested = client.get(proxy.url("/foo/bar?x=1")).send().await.unwrap().text().await.unwrap();

    assert_eq!(plain, "GET /v1");
    assert_eq!(nested, "GET /v1?x=1");
}

#[tokio::test]
async fn backend_root_path_replaces_inbound_path() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![format!("http://{}/", backend)]).await;

    let client = common::client();
    let plain = client.get(proxy.url("/foo")).send().await.unwrap().text().await.unwrap();
    let query = client.get(proxy.url("/foo/bar?x=1")).send().await.unwrap().text().await.unwrap();

    assert_eq!(plain, "GET /");
    assert_eq!(query, "GET /?x=1");
}

#[tokio::test]
async fn method_headers_and_body_pass_through() {
    let backend = common::start_backend(Router::new().fallback(
        |method: Method, headers: HeaderMap, body: Bytes| async move {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string()
            };
            format!(
                "{}|{}|{}|{}",
                method,
                header("x-custom"),
                header("host"),
                String::from_utf8_lossy(&body)
            )
        },
    ))
    .await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let body = common::client()
        .patch(proxy.url("/items/3"))
        .header("x-custom", "kept")
        .body("payload")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, format!("PATCH|kept|{}|payload", proxy.addr));
}

#[tokio::test]
async fn status_and_response_headers_are_relayed() {
    let backend = common::start_backend(Router::new().fallback(|| async {
        (StatusCode::CREATED, [("x-backend", "yes")], "made").into_response()
    }))
    .await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let res = common::client().post(proxy.url("/things")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers().get("x-backend").unwrap(), "yes");
    assert_eq!(res.text().await.unwrap(), "made");
}

const CHUNK: usize = 64 * 1024;
const CHUNKS: usize = 192; // 12 MiB

fn pattern_chunk(i: usize) -> Bytes {
    Bytes::from(vec![(i % 251) as u8; CHUNK])
}

#[tokio::test]
async fn large_response_streams_byte_for_byte() {
    let backend = common::start_backend(Router::new().fallback(|| async {
        let chunks = (0..CHUNKS).map(|i| Ok::<_, Infallible>(pattern_chunk(i)));
        Body::from_stream(futures_util::stream::iter(chunks))
    }))
    .await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let received = common::client()
        .get(proxy.url("/big"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let expected: Vec<u8> = (0..CHUNKS).flat_map(|i| pattern_chunk(i).to_vec()).collect();
    assert_eq!(received.len(), CHUNK * CHUNKS);
    assert!(received[..] == expected[..], "response body differs from backend body");
}

#[tokio::test]
async fn large_request_body_reaches_backend_intact() {
    let backend = common::start_backend(Router::new().fallback(|req: Request| async move {
        let body = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
        let sum: u64 = body.iter().map(|b| *b as u64).sum();
        format!("{}:{}", body.len(), sum)
    }))
    .await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let upload: Vec<u8> = (0..CHUNKS).flat_map(|i| pattern_chunk(i).to_vec()).collect();
    let expected = format!("{}:{}", upload.len(), upload.iter().map(|b| *b as u64).sum::<u64>());

    let body = common::client()
        .post(proxy.url("/upload"))
        .body(upload)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, expected);
}

#[tokio::test]
async fn response_chunks_arrive_before_backend_finishes() {
    let gate = Arc::new(Notify::new());
    let backend_gate = gate.clone();
    let backend = common::start_backend(Router::new().fallback(move || {
        let gate = backend_gate.clone();
        async move {
            let stream = futures_util::stream::unfold(0u8, move |step| {
                let gate = gate.clone();
                async move {
                    match step {
                        0 => Some((Ok::<_, Infallible>(Bytes::from_static(b"first")), 1)),
                        1 => {
                            gate.notified().await;
                            Some((Ok(Bytes::from_static(b"second")), 2))
                        }
                        _ => None,
                    }
                }
            });
            Body::from_stream(stream)
        }
    }))
    .await;
    let proxy = common::start_proxy(vec![format!("http://{}", backend)]).await;

    let mut res = common::client().get(proxy.url("/stream")).send().await.unwrap();

    // The backend is parked until the gate opens, so "first" must have been relayed on its own.
    let mut head = Vec::new();
    while head.len() < b"first".len() {
        let chunk = res.chunk().await.unwrap().expect("stream ended early");
        head.extend_from_slice(&chunk);
    }
    assert_eq!(head, b"first");

    gate.notify_one();

    let mut rest = Vec::new();
    while let Some(chunk) = res.chunk().await.unwrap() {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"second");
}
