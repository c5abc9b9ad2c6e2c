// Proxy module - Pingora ProxyHttp implementation
// Answers every request from request_filter; nothing is proxied to a peer

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};
use std::time::Instant;

use crate::config::Config;
use crate::error::GatewayError;

pub mod handler;
pub mod special_endpoints;

pub use handler::{GatewayRequest, RequestHandler};
pub use special_endpoints::GatewayResponse;

/// Per-request state kept by Pingora between phases
#[derive(Debug)]
pub struct RequestContext {
    started: Instant,
    status: Option<u16>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            status: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// GatewayProxy implements the Pingora ProxyHttp trait
/// Hands each request to the RequestHandler and writes its response
pub struct GatewayProxy {
    handler: RequestHandler,
}

impl GatewayProxy {
    pub fn new(config: &Config) -> std::result::Result<Self, GatewayError> {
        Ok(Self {
            handler: RequestHandler::new(config)?,
        })
    }

    pub fn with_handler(handler: RequestHandler) -> Self {
        Self { handler }
    }
}

/// Convert the Pingora request header into the handler's request type
pub fn gateway_request(header: &RequestHeader) -> GatewayRequest {
    let text_header = |name: &str| {
        header
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    GatewayRequest {
        method: header.method.as_str().to_string(),
        path: header.uri.path().to_string(),
        query: header.uri.query().map(str::to_string),
        user_agent: text_header("user-agent"),
        host: text_header("host").or_else(|| header.uri.host().map(str::to_string)),
    }
}

/// Build the Pingora response header for a handler response
pub fn response_header(response: &GatewayResponse) -> Result<ResponseHeader> {
    let mut header = ResponseHeader::build(response.status, None)?;
    if let Some(content_type) = &response.content_type {
        header.insert_header("Content-Type", content_type.as_str())?;
    }
    for (name, value) in &response.headers {
        header.insert_header(name.clone(), value.as_str())?;
    }
    if response.status != 204 {
        header.insert_header("Content-Length", response.body.len().to_string())?;
    }
    Ok(header)
}

#[async_trait]
impl ProxyHttp for GatewayProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Never reached: request_filter always answers
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "Gateway does not proxy to upstream peers",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let request = gateway_request(session.req_header());
        let response = self.handler.handle(&request).await;
        ctx.status = Some(response.status);

        let header = response_header(&response)?;
        session
            .write_response_header(Box::new(header), false)
            .await?;
        session
            .write_response_body(Some(response.body), true)
            .await?;

        Ok(true) // Short-circuit (response already sent)
    }

    async fn logging(
        &self,
        _session: &mut Session,
        e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        // Access lines come from the handler; only transport failures land here
        if let Some(error) = e {
            tracing::warn!(
                status = ?ctx.status(),
                elapsed_ms = ctx.started.elapsed().as_secs_f64() * 1000.0,
                error = %error,
                "Failed to write response"
            );
        }
    }
}
