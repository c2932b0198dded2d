//! HTTP model server.
//!
//! ```text
//! GET  /healthcheck                        liveness check
//! POST /serve?servable_identifier=<path>   run a JSON payload through a servable
//! ```
//!
//! Every response is `{"code", "message", "description"?, "result"?, "detail"?}`.
//! One task per connection; inference runs on the blocking pool through the
//! [`ServableManager`].

mod http;


pub use http::{parse_query, status_message, url_decode, RequestHead, Response};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServingError, TensorIoError};
use crate::servable::{ScriptServable, Servable, ServableManager};
use crate::tensor_io::{json_to_values, value_to_json};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Model Server ─────────────────────────────────────────────────

pub struct ModelServer<S: Servable = ScriptServable> {
    manager: Arc<ServableManager<S>>,
    config: Arc<ServerConfig>,
}

impl<S: Servable> Clone for ModelServer<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: Servable> ModelServer<S> {
    pub fn new(config: ServerConfig) -> Self {
        let manager = ServableManager::new(config.model_capacity, config.buffer_size);
        info!(
            target: "model_server",
            "Servable cache capacity {} with buffer {}",
            config.model_capacity,
            config.buffer_size
        );
        Self {
            manager: Arc::new(manager),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<ServableManager<S>> {
        &self.manager
    }

    /// Bind the configured address and serve forever.
    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Accept connections from `listener` forever.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        info!(target: "model_server", "Listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(target: "model_server", "Accept error: {}", e);
                    continue;
                }
            };
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    debug!(target: "model_server", "Connection error from {}: {}", peer, e);
                }
            });
        }
    }

    /// Read one request from `stream`, answer it, and close.
    pub async fn handle_connection<T>(&self, stream: T) -> io::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let (head, response) = tokio::time::timeout(READ_TIMEOUT, self.read_and_route(&mut reader))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out reading request"))??;

        match &head {
            Some(head) => log_request(head, &response),
            None => warn!(
                target: "model_server",
                "Malformed request => Response: [{} {}]",
                response.code,
                response.message
            ),
        }
        http::write_response(reader.get_mut(), &response).await
    }

    async fn read_and_route<R>(&self, reader: &mut R) -> io::Result<(Option<RequestHead>, Response)>
    where
        R: AsyncBufRead + Unpin,
    {
        let head = match http::read_head(reader).await? {
            Ok(head) => head,
            Err(rejected) => return Ok((None, rejected)),
        };
        let response = match http::read_body(reader, &head, self.config.max_body_size).await? {
            Ok(body) => self.route(&head, &body).await,
            Err(rejected) => rejected,
        };
        Ok((Some(head), response))
    }

    async fn route(&self, head: &RequestHead, body: &[u8]) -> Response {
        match (head.method.as_str(), head.path.as_str()) {
            ("GET", "/healthcheck") => Response::new(200, "OK"),
            ("POST", "/serve") => self.handle_serve(head, body).await,
            _ => Response::new(404, "Not found"),
        }
    }

    async fn handle_serve(&self, head: &RequestHead, body: &[u8]) -> Response {
        let identifier = match head.query_values("servable_identifier").as_slice() {
            [] => return Response::new(400, "Missing required parameter `servable_identifier`"),
            [id] => *id,
            _ => {
                return Response::new(
                    400,
                    "Required parameter `servable_identifier` must only be passed in once",
                )
            }
        };
        if identifier.contains("..") {
            return Response::new(400, "Invalid servable identifier");
        }

        if body.is_empty() {
            return Response::new(400, "Empty body");
        }
        let payload: serde_json::Value = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => return Response::new(400, "Invalid JSON").with_detail(e.to_string()),
        };
        let inputs = match json_to_values(&payload) {
            Ok(inputs) => inputs,
            Err(e) => return tensor_io_response(e),
        };

        let resolved = self.config.resolve_identifier(identifier);
        let handle = self.manager.async_inference_request(
            resolved.clone(),
            inputs,
            self.config.invalidation_prob,
        );
        match handle.await {
            Ok(Ok(result)) => Response::new(200, "Success").with_result(value_to_json(&result)),
            Ok(Err(e)) => serving_error_response(e),
            Err(e) => {
                self.manager.evict(&resolved);
                serving_error_response(ServingError::TaskFailed(e.to_string()))
            }
        }
    }
}

fn tensor_io_response(err: TensorIoError) -> Response {
    let description = match &err {
        TensorIoError::Format(_) => "Invalid Input JSON",
        TensorIoError::Shape(_) => "Incompatible tensor shapes",
        TensorIoError::DataType(_) => "Incompatible tensor data type",
    };
    Response::new(400, description).with_detail(err.to_string())
}

fn serving_error_response(err: ServingError) -> Response {
    match err {
        ServingError::InvalidServable { .. } => Response::new(400, "Invalid servable identifier"),
        ServingError::Inference(e) if e.is_client_error() => {
            Response::new(400, "Incompatible model inputs").with_detail(e.to_string())
        }
        other => {
            error!(target: "model_server", "{}", other);
            Response::new(500, "Unexpected server error").with_detail(other.to_string())
        }
    }
}

fn log_request(head: &RequestHead, response: &Response) {
    let msg = format!(
        "Request: [{} {} {}] => Response: [{} {}]",
        head.method,
        head.version,
        head.path,
        response.code,
        response.message
    );
    match response.code / 100 {
        3 | 4 => warn!(target: "model_server", "{}", msg),
        5 => error!(target: "model_server", "{}", msg),
        _ => info!(target: "model_server", "{}", msg),
    }
}
