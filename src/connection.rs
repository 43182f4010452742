//! Building and sending the request that opens a session

use std::{
    sync::Arc,
    time::{Instant, SystemTime},
};

use http_body_util::BodyDataStream;
use reqwest::{
    Body, Method, Request, Response, Url,
    cookie::Jar,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::{OpenParams, TransportConfig},
    constants::EVENT_STREAM_MIME,
    errors::{Error, Result},
    event_stream::EventStream,
    metrics::RequestTiming,
};

const HTTP1_ALPN: &[u8] = b"http/1.1";

/// Copy of `tls` that only offers `http/1.1` during ALPN
pub fn pin_http1(tls: &rustls::ClientConfig) -> rustls::ClientConfig {
    let mut tls = tls.clone();
    tls.alpn_protocols = vec![HTTP1_ALPN.to_vec()];
    tls
}

/// HTTP/1.1-only client for the given transport settings and cookie jar
pub fn build_client(transport: &TransportConfig, jar: Arc<Jar>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .http1_only()
        .cookie_provider(jar);

    if let Some(timeout) = transport.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(tls) = &transport.tls {
        builder = builder.use_preconfigured_tls(pin_http1(tls));
    }
    if transport.no_connection_reuse {
        builder = builder.pool_max_idle_per_host(0);
    }

    builder.build().map_err(Error::Transport)
}

/// `Accept` and `User-Agent` defaults, then the caller's headers on top
pub fn build_headers(user_agent: &str, headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len() + 2);
    map.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));
    map.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| Error::invalid_request(format!("user agent: {e}")))?,
    );

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_request(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_request(format!("header {name}: {e}")))?;
        map.insert(name, value);
    }

    Ok(map)
}

/// Trimmed method, `GET` when empty
pub fn parse_method(method: &str) -> Result<Method> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes())
        .map_err(|e| Error::invalid_request(format!("method {method:?}: {e}")))
}

pub fn build_request(
    client: &reqwest::Client,
    user_agent: &str,
    url: &str,
    params: &OpenParams,
) -> Result<Request> {
    let url = Url::parse(url).map_err(|e| Error::invalid_request(format!("url {url:?}: {e}")))?;
    let method = parse_method(&params.method)?;
    let headers = build_headers(user_agent, &params.headers)?;

    let mut builder = client.request(method, url).headers(headers);
    let body = params.body.trim();
    if !body.is_empty() {
        builder = builder.body(body.to_string());
    }

    builder
        .build()
        .map_err(|e| Error::invalid_request(e.to_string()))
}

/// Outcome of sending the request, with its timing whether it succeeded or not
#[derive(Debug)]
pub struct ConnectAttempt {
    pub timing: RequestTiming,
    pub result: Result<Response>,
}

/// Sends `request` and waits for the response headers. Cancelling `cancel` abandons the attempt
/// with [Error::Cancelled].
pub async fn connect(
    client: &reqwest::Client,
    request: Request,
    cancel: &CancellationToken,
) -> ConnectAttempt {
    debug!(method = %request.method(), url = %request.url(), "connecting");

    let started_at = SystemTime::now();
    let start = Instant::now();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = client.execute(request) => res.map_err(Error::Connect),
    };

    ConnectAttempt {
        timing: RequestTiming {
            started_at,
            start,
            connect: start.elapsed(),
        },
        result,
    }
}

/// Body of `response` as an [EventStream]
pub fn response_to_stream(response: Response) -> EventStream<BodyDataStream<Body>> {
    EventStream::new(BodyDataStream::new(Body::from(response)))
}
