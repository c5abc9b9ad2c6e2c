//! Request orchestration.
//!
//! `RequestHandler` turns a [`GatewayRequest`] into a [`GatewayResponse`]:
//! route, parse directives, fetch the source, transcode, and map any failure
//! to a status and JSON body. It never touches Pingora types.

use std::sync::Arc;

use crate::config::Config;
use crate::error::GatewayError;
use crate::fetcher::SourceFetcher;
use crate::logging::{AccessRecord, RequestLogger};
use crate::transcoder::{TransformOptions, Transcoder};

use super::special_endpoints::{error_response, handle_health, handle_preflight, GatewayResponse};

pub const HEALTH_PATH: &str = "/health";

/// Transport-neutral view of an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: String,
    /// Raw (still percent-encoded) path
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
}

impl GatewayRequest {
    pub fn get(path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path.to_string(), None),
        };
        Self {
            method: "GET".to_string(),
            path,
            query,
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Path plus query, as logged
    pub fn url(&self) -> String {
        match &self.query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

/// Runs the fetch-and-transcode pipeline for each request.
#[derive(Clone)]
pub struct RequestHandler {
    fetcher: SourceFetcher,
    transcoder: Arc<Transcoder>,
    logger: RequestLogger,
    cors_allow_origin: String,
}

impl RequestHandler {
    /// Build the handler and its components from configuration.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let fetcher = SourceFetcher::new(config.fetch_policy())?;
        let transcoder = Transcoder::new(config.output_policy());
        let logger = RequestLogger::new(&config.logging);
        Ok(Self::with_parts(
            fetcher,
            transcoder,
            logger,
            config.server.cors_allow_origin.clone(),
        ))
    }

    pub fn with_parts(
        fetcher: SourceFetcher,
        transcoder: Transcoder,
        logger: RequestLogger,
        cors_allow_origin: String,
    ) -> Self {
        Self {
            fetcher,
            transcoder: Arc::new(transcoder),
            logger,
            cors_allow_origin,
        }
    }

    pub async fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        self.handle_logged(request).await.0
    }

    /// Handle a request and also return what the access log recorded.
    pub async fn handle_logged(
        &self,
        request: &GatewayRequest,
    ) -> (GatewayResponse, Option<AccessRecord>) {
        let log = self
            .logger
            .begin(&request.method, &request.url(), request.host.as_deref());

        let (response, detail) = match self.route(request).await {
            Ok(response) => (response, None),
            Err(error) => {
                if let Some(cause) = error.hidden_cause() {
                    tracing::error!(
                        request_id = %log.request_id(),
                        status = error.to_http_status(),
                        error = %cause,
                        "Request failed"
                    );
                }
                (error_response(&error), Some(error.detail()))
            }
        };

        let response =
            response.with_header("Access-Control-Allow-Origin", &self.cors_allow_origin);
        let record = log.finish(response.status, response.body.len(), detail.as_deref());
        (response, record)
    }

    async fn route(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        match request.method.as_str() {
            "OPTIONS" => return Ok(handle_preflight()),
            "GET" => {}
            _ => return Err(GatewayError::MethodNotAllowed),
        }

        if request.path == HEALTH_PATH {
            return Ok(handle_health());
        }

        let rest = request.path.strip_prefix('/').unwrap_or(&request.path);
        if rest.is_empty() {
            return Err(GatewayError::NotFound);
        }

        let (directives, target) = rest
            .split_once('/')
            .ok_or(GatewayError::MalformedRequest)?;

        self.transform(
            directives,
            target,
            request.query.as_deref(),
            request.user_agent.as_deref(),
        )
        .await
    }

    /// `/{directives}/{target}`: parse, fetch, transcode.
    pub async fn transform(
        &self,
        directives: &str,
        raw_target: &str,
        raw_query: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let decoded = urlencoding::decode_binary(directives.as_bytes());
        let options = TransformOptions::parse(&String::from_utf8_lossy(&decoded))?;

        let source = self.fetcher.resolve(raw_target, raw_query, user_agent)?;
        let fetched = self.fetcher.fetch(&source).await?;

        let transcoder = Arc::clone(&self.transcoder);
        let data = fetched.data;
        let result = tokio::task::spawn_blocking(move || transcoder.transcode(&data, &options))
            .await
            .map_err(|e| GatewayError::internal(format!("transcode task failed: {}", e)))??;

        tracing::debug!(
            url = %source.url,
            source_format = ?result.source_format,
            output_format = %result.format,
            original_size = ?result.original_size,
            output_size = ?result.output_size,
            bytes = result.data.len(),
            "Transcoded image"
        );

        Ok(GatewayResponse::image(result.content_type, result.data))
    }
}
