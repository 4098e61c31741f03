//! HTTP endpoint for Prometheus scraping and liveness probes

use bridge_core::ControllerMetrics;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Serve `/metrics` and `/healthz` until the process exits
pub async fn serve(addr: SocketAddr, metrics: ControllerMetrics) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let io = TokioIo::new(stream);
                let metrics = metrics.clone();

                tokio::task::spawn(async move {
                    let service = service_fn(move |req| {
                        let response = respond(&req, &metrics);
                        async move { Ok::<_, Infallible>(response) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving metrics connection from {}: {}", peer_addr, e);
                    }
                });
            }
            Err(e) => {
                warn!("Error accepting metrics connection: {}", e);
            }
        }
    }
}

fn respond<B>(req: &Request<B>, metrics: &ControllerMetrics) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => match metrics.gather() {
            Ok(text) => {
                let mut response = text_response(StatusCode::OK, text);
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to gather metrics\n".to_string(),
                )
            }
        },
        (_, "/healthz") => text_response(StatusCode::OK, "OK\n".to_string()),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found\n".to_string()),
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, path: &str) -> Request<()> {
        let mut req = Request::new(());
        *req.method_mut() = method;
        *req.uri_mut() = path.parse().expect("invalid uri");
        req
    }

    #[test]
    fn test_metrics_endpoint() {
        let metrics = ControllerMetrics::new().expect("Failed to create metrics");
        metrics.record_pass(true);

        let response = respond(&request(Method::GET, "/metrics"), &metrics);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/plain; version=0.0.4"[..])
        );
    }

    #[test]
    fn test_healthz_endpoint() {
        let metrics = ControllerMetrics::new().expect("Failed to create metrics");
        let response = respond(&request(Method::GET, "/healthz"), &metrics);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_path() {
        let metrics = ControllerMetrics::new().expect("Failed to create metrics");
        let response = respond(&request(Method::POST, "/metrics"), &metrics);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
