//! Transport adapter
//!
//! Bridges the synchronous request pipeline onto an axum server. Requests
//! are buffered fully, handed to the pipeline on a blocking worker, and
//! the buffered response is translated back. The pipeline itself never
//! touches the async runtime.

use std::net::SocketAddr;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;

use crate::pipeline::Handler;
use crate::pipeline::RequestContext;

/// Upper bound on a buffered request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the axum router that feeds every request to the pipeline
pub fn router(handler: Handler) -> Router {
    Router::new().fallback(dispatch).with_state(handler)
}

async fn dispatch(
    State(handler): State<Handler>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let method = parts.method;
    let path = parts.uri.path().to_string();
    let protocol = format!("{:?}", parts.version);
    let headers = parts.headers;
    let remote = addr.to_string();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut ctx = RequestContext::new(method, path, protocol, remote, headers, body);
        handler(&mut ctx)
    })
    .await;

    match outcome {
        Ok(response) => {
            let (status, headers, body) = response.into_parts();
            (status, headers, body).into_response()
        }
        // The pipeline contains panics itself; a join failure here means
        // the worker was cancelled.
        Err(err) => {
            tracing::error!(error = %err, "pipeline worker did not complete");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Response;
    use axum::http::Method;
    use std::sync::Arc;

    fn echo_handler() -> Handler {
        Arc::new(|ctx: &mut RequestContext| {
            Response::text(
                StatusCode::OK,
                format!("{} {} from {}", ctx.method(), ctx.path(), ctx.remote_addr()),
            )
        })
    }

    fn connect_info() -> ConnectInfo<SocketAddr> {
        ConnectInfo("10.0.0.1:5000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_dispatch_translates_request_and_response() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/snippet/view/1")
            .body(Body::empty())
            .unwrap();

        let response = dispatch(State(echo_handler()), connect_info(), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), MAX_BODY_BYTES).await.unwrap();
        assert_eq!(&body[..], b"GET /snippet/view/1 from 10.0.0.1:5000");
    }

    #[tokio::test]
    async fn test_dispatch_rejects_oversized_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/snippet/create")
            .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
            .unwrap();

        let response = dispatch(State(echo_handler()), connect_info(), request).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
