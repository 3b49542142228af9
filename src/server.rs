//! HTTP front end.
//!
//! A single static route for now; request handling does not touch the
//! database.

use axum::{Router, response::Html, routing::get};
use std::future::Future;
use std::io;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Body served at `/`.
pub const INDEX_BODY: &str = "<h1>Awesome</h1>";

/// Build the application router.
pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_BODY)
}

/// HTTP server bound to a host and port.
#[derive(Debug, Clone)]
pub struct HttpServer {
    host: String,
    port: u16,
}

impl HttpServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind and serve until SIGINT or SIGTERM.
    pub async fn run(&self) -> io::Result<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            error!(error = %e, "Failed to bind to {}", bind_addr);
            e
        })?;
        info!("Server started at http://{}", bind_addr);
        serve(listener, wait_for_signal()).await
    }
}

/// Serve the router on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    #[test]
    fn test_bind_addr() {
        let server = HttpServer::new("127.0.0.1", 9000);
        assert_eq!(server.bind_addr(), "127.0.0.1:9000");
    }

    async fn request(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let req = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(req.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_index_and_unknown_route() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, async move {
            let _ = rx.await;
        }));

        let response = request(addr, "/").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.to_lowercase().contains("content-type: text/html"));
        assert!(response.ends_with(INDEX_BODY));

        let response = request(addr, "/missing").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
