//! Opening sessions and running their control loop

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    client::{Client, HandlerResult, SessionHandle},
    config::{EngineConfig, OpenParams, TransportConfig},
    connection::{build_client, build_request, connect, response_to_stream},
    errors::{BoxError, Error, Result},
    metrics::{MetricsSink, Reporter, TAG_IP, TAG_STATUS, TAG_URL},
    reader::{ReadOutcome, read_events},
    response::ResponseSummary,
};

/// Opens SSE sessions and drives each one to completion inside [Engine::open].
///
/// Handlers only ever run on the task awaiting `open`. The body is read on a separate task that
/// feeds the control loop through a bounded channel.
pub struct Engine {
    config: EngineConfig,
    transport: TransportConfig,
    sink: Arc<dyn MetricsSink>,
    client: reqwest::Client,
    context: CancellationToken,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("context_cancelled", &self.context.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        transport: TransportConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        config.validate().map_err(Error::config)?;
        transport.validate().map_err(Error::config)?;

        let jar = transport.cookie_jar.clone().unwrap_or_default();
        let client = build_client(&transport, jar)?;

        Ok(Self {
            config,
            transport,
            sink,
            client,
            context: CancellationToken::new(),
        })
    }

    /// Ties every session to `context`. Once it is cancelled running sessions are released
    /// without calling any more handlers and no more samples are emitted.
    #[must_use]
    pub fn with_context(mut self, context: CancellationToken) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &CancellationToken {
        &self.context
    }

    /// Connects to `url`, lets `setup` register handlers, then dispatches until the session is
    /// released by end of stream, [SessionHandle::close] or the engine context.
    ///
    /// A failed connection attempt is returned as `Err` when [EngineConfig::throw] is set and
    /// as a [ResponseSummary] with `error` filled otherwise. Setup and handler failures release
    /// the session and are always returned as `Err`.
    pub async fn open<F>(&self, url: &str, params: OpenParams, setup: F) -> Result<ResponseSummary>
    where
        F: FnOnce(&mut Client) -> core::result::Result<(), BoxError>,
    {
        params.validate().map_err(Error::config)?;

        let mut tags = self.config.tags.clone();
        tags.extend(params.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags.insert(TAG_URL.to_string(), url.to_string());
        let mut reporter = Reporter::new(self.sink.clone(), self.context.clone(), tags);

        debug!(url, state = "opening", "opening session");

        let client = match &params.jar {
            Some(jar) => match build_client(&self.transport, jar.clone()) {
                Ok(client) => client,
                Err(err) => return self.connect_failed(url, err),
            },
            None => self.client.clone(),
        };
        let request = match build_request(&client, &self.transport.user_agent, url, &params) {
            Ok(request) => request,
            Err(err) => return self.connect_failed(url, err),
        };

        let request_token = self.context.child_token();
        let attempt = connect(&client, request, &request_token).await;
        let response = match attempt.result {
            Ok(response) => response,
            Err(err) => {
                reporter.connection_sample(&attempt.timing);
                drop(reporter.finish_on_drop(attempt.timing));
                return self.connect_failed(url, err);
            }
        };

        reporter.tag(TAG_STATUS, response.status().as_u16().to_string());
        if let Some(addr) = response.remote_addr() {
            reporter.tag(TAG_IP, addr.ip().to_string());
        }
        reporter.connection_sample(&attempt.timing);
        let samples = reporter.finish_on_drop(attempt.timing);

        let summary = ResponseSummary::from_response(url, &response);
        info!(url, status = summary.status, "connected");

        let handle = SessionHandle::new(url, request_token.clone());
        let mut client = Client::new(handle.clone());
        if let Err(err) = setup(&mut client) {
            handle.close();
            warn!(url, "setup callback failed: {err}");
            return Err(Error::Setup(err));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let result = match client.dispatch_open() {
            Ok(()) => {
                let reader = tokio::spawn(read_events(
                    response_to_stream(response),
                    tx,
                    request_token,
                ));
                debug!(url, state = "running", "session running");

                let result = self.run(&mut client, samples.reporter(), rx).await;
                handle.close();
                if let Err(err) = reader.await {
                    warn!(url, "reader task failed: {err}");
                }
                result
            }
            Err(err) => {
                handle.close();
                Err(err)
            }
        };

        drop(samples);
        debug!(url, state = "closed", "session closed");

        match result {
            Ok(()) => Ok(summary),
            Err(err) => {
                warn!(url, "handler failed: {err}");
                Err(Error::Handler(err))
            }
        }
    }

    fn connect_failed(&self, url: &str, err: Error) -> Result<ResponseSummary> {
        warn!(url, "connect failed: {err}");
        if self.config.throw {
            Err(err)
        } else {
            Ok(ResponseSummary::failed(url, &err))
        }
    }

    /// Returns once the session is released, or with the first handler error
    async fn run(
        &self,
        client: &mut Client,
        reporter: &Reporter,
        mut rx: mpsc::Receiver<ReadOutcome<reqwest::Error>>,
    ) -> HandlerResult {
        let handle = client.handle().clone();
        let guard = handle.guard();
        let mut reader_done = false;

        loop {
            tokio::select! {
                biased;
                () = guard.done().cancelled() => return Ok(()),
                () = self.context.cancelled() => {
                    debug!(url = handle.url(), "context cancelled, releasing session");
                    handle.close();
                }
                outcome = rx.recv(), if !reader_done => match outcome {
                    Some(ReadOutcome::Event(event)) => {
                        reporter.event_received();
                        client.dispatch_event(&event)?;
                    }
                    Some(ReadOutcome::Error(err)) => {
                        client.dispatch_error(&Error::Stream(err))?;
                    }
                    Some(ReadOutcome::Closed) => {
                        debug!(url = handle.url(), "stream closed");
                        handle.close();
                    }
                    None => reader_done = true,
                },
            }
        }
    }
}
