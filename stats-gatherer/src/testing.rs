//! Local HTTP servers standing in for Logstash nodes.

use axum::{
    http::{
        header::AUTHORIZATION,
        HeaderMap,
        StatusCode,
        Uri,
    },
    response::{
        IntoResponse,
        Response,
    },
    Router,
};
use std::{
    future::Future,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

/// `test:test`
pub(crate) const BASIC_AUTH_TEST: &str = "Basic dGVzdDp0ZXN0";

#[derive(Debug, Clone, Default)]
pub(crate) struct Requests(Arc<Mutex<Vec<(String, Option<String>)>>>);

impl Requests {
    pub(crate) fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(path, _)| path.clone()).collect()
    }

    pub(crate) fn authorizations(&self) -> Vec<Option<String>> {
        self.0.lock().unwrap().iter().map(|(_, auth)| auth.clone()).collect()
    }

    /// Records the request and returns its authorization header.
    fn record(&self, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.0
            .lock()
            .unwrap()
            .push((uri.path().to_string(), authorization.clone()));
        authorization
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) url: String,
    pub(crate) requests: Requests,
}

/// Binds a local listener and serves `respond` for every path, recording each request.
async fn spawn<F, Fut>(respond: F) -> Node
where
    F: Fn(Option<String>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let requests = Requests::default();
    let router = Router::new().fallback({
        let requests = requests.clone();
        move |uri: Uri, headers: HeaderMap| {
            let authorization = requests.record(&uri, &headers);
            respond(authorization)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Node {
        url: format!("http://{addr}"),
        requests,
    }
}

/// Serves `body` with `status` on every path after an optional delay.
pub(crate) async fn serve(status: StatusCode, body: &'static str, delay: Option<Duration>) -> Node {
    spawn(move |_| async move {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (status, [("content-type", "application/json")], body).into_response()
    })
    .await
}

pub(crate) async fn serve_ok(body: &'static str) -> Node {
    serve(StatusCode::OK, body, None).await
}

/// Serves `body` only to requests authenticated as `test:test`.
pub(crate) async fn serve_with_basic_auth(body: &'static str) -> Node {
    spawn(move |authorization| async move {
        if authorization.as_deref() == Some(BASIC_AUTH_TEST) {
            (StatusCode::OK, body).into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "Not authorized").into_response()
        }
    })
    .await
}

/// An address nothing listens on.
pub(crate) async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
