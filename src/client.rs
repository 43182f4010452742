//! Handler registry and the handle used to end a session

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    errors::{BoxError, Error},
    event::Event,
};

pub type HandlerResult = Result<(), BoxError>;

pub type OpenHandler = Box<dyn FnMut(&SessionHandle) -> HandlerResult + Send>;
pub type EventHandler = Box<dyn FnMut(&SessionHandle, &Event) -> HandlerResult + Send>;
pub type ErrorHandler = Box<dyn FnMut(&SessionHandle, &Error) -> HandlerResult + Send>;

/// The occurrences a handler can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Open,
    Event,
    Error,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Event => "event",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler together with the occurrence it listens to
pub enum Handler {
    Open(OpenHandler),
    Event(EventHandler),
    Error(ErrorHandler),
}

impl Handler {
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::Open(_) => EventKind::Open,
            Handler::Event(_) => EventKind::Event,
            Handler::Error(_) => EventKind::Error,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}

/// Releases the connection exactly once.
///
/// Releasing cancels the request token first, which stops the reader task and drops the body,
/// then fires `done`, which ends the control loop.
#[derive(Debug)]
pub(crate) struct ReleaseGuard {
    released: AtomicBool,
    request: CancellationToken,
    done: CancellationToken,
}

impl ReleaseGuard {
    pub(crate) fn new(request: CancellationToken) -> Self {
        Self {
            released: AtomicBool::new(false),
            request,
            done: CancellationToken::new(),
        }
    }

    /// Returns `true` only for the call that performed the release
    pub(crate) fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.request.cancel();
        self.done.cancel();
        true
    }

    pub(crate) fn is_released(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Handlers may still run. False once released or once the parent context is cancelled.
    pub(crate) fn is_live(&self) -> bool {
        !self.request.is_cancelled()
    }

    pub(crate) fn done(&self) -> &CancellationToken {
        &self.done
    }
}

#[derive(Debug)]
struct Shared {
    url: String,
    guard: ReleaseGuard,
}

/// Cheap handle to a running session, given to every handler.
///
/// Can be cloned and moved to other tasks, `close` is safe to call from anywhere and any number
/// of times.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub(crate) fn new(url: impl Into<String>, request: CancellationToken) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                guard: ReleaseGuard::new(request),
            }),
        }
    }

    /// Ends the session. Events already read but not yet dispatched are dropped.
    ///
    /// Returns whether this call released the connection.
    pub fn close(&self) -> bool {
        let released = self.shared.guard.release();
        if released {
            debug!(url = %self.shared.url, "session released");
        }
        released
    }

    pub fn is_closed(&self) -> bool {
        self.shared.guard.is_released()
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub(crate) fn guard(&self) -> &ReleaseGuard {
        &self.shared.guard
    }
}

/// Registry handed to the setup callback of [Engine::open][crate::Engine::open].
///
/// Handlers run in registration order. Once every handler has been registered and setup has
/// returned, the registry is frozen.
pub struct Client {
    handle: SessionHandle,
    open: Vec<OpenHandler>,
    event: Vec<EventHandler>,
    error: Vec<ErrorHandler>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.handle.url())
            .field("open", &self.open.len())
            .field("event", &self.event.len())
            .field("error", &self.error.len())
            .finish()
    }
}

impl Client {
    pub(crate) fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            open: Vec::new(),
            event: Vec::new(),
            error: Vec::new(),
        }
    }

    pub fn on(&mut self, handler: Handler) -> &mut Self {
        match handler {
            Handler::Open(h) => self.open.push(h),
            Handler::Event(h) => self.event.push(h),
            Handler::Error(h) => self.error.push(h),
        }
        self
    }

    pub fn on_open<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&SessionHandle) -> HandlerResult + Send + 'static,
    {
        self.on(Handler::Open(Box::new(handler)))
    }

    pub fn on_event<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&SessionHandle, &Event) -> HandlerResult + Send + 'static,
    {
        self.on(Handler::Event(Box::new(handler)))
    }

    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&SessionHandle, &Error) -> HandlerResult + Send + 'static,
    {
        self.on(Handler::Error(Box::new(handler)))
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn close(&self) -> bool {
        self.handle.close()
    }

    pub fn url(&self) -> &str {
        self.handle.url()
    }

    pub(crate) fn dispatch_open(&mut self) -> HandlerResult {
        let handle = &self.handle;
        for handler in &mut self.open {
            if !handle.guard().is_live() {
                break;
            }
            handler(handle)?;
        }
        Ok(())
    }

    pub(crate) fn dispatch_event(&mut self, event: &Event) -> HandlerResult {
        let handle = &self.handle;
        for handler in &mut self.event {
            if !handle.guard().is_live() {
                break;
            }
            handler(handle, event)?;
        }
        Ok(())
    }

    pub(crate) fn dispatch_error(&mut self, error: &Error) -> HandlerResult {
        let handle = &self.handle;
        for handler in &mut self.error {
            if !handle.guard().is_live() {
                break;
            }
            handler(handle, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn client() -> Client {
        Client::new(SessionHandle::new(
            "http://localhost/sse",
            CancellationToken::new(),
        ))
    }

    #[test]
    fn release_happens_once() {
        let request = CancellationToken::new();
        let guard = ReleaseGuard::new(request.clone());
        assert!(guard.is_live());

        assert!(guard.release());
        assert!(!guard.release());
        assert!(request.is_cancelled());
        assert!(guard.done().is_cancelled());
        assert!(guard.is_released());
    }

    #[test]
    fn concurrent_close_releases_once() {
        let handle = SessionHandle::new("http://localhost/sse", CancellationToken::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || handle.close())
            })
            .collect();
        let released = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|released| *released)
            .count();
        assert_eq!(released, 1);
        assert!(handle.is_closed());
    }

    #[test]
    fn parent_cancel_is_not_a_release() {
        let parent = CancellationToken::new();
        let handle = SessionHandle::new("http://localhost/sse", parent.child_token());
        parent.cancel();
        assert!(!handle.guard().is_live());
        assert!(!handle.is_closed());
        assert!(handle.close());
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut client = client();
        for n in 0..3 {
            let calls = calls.clone();
            client.on_event(move |_, event| {
                calls.lock().unwrap().push(format!("{n}:{}", event.data));
                Ok(())
            });
        }
        assert_eq!(client.event.len(), 3);
        assert!(client.open.is_empty());

        let event = Event {
            data: bytes_utils::Str::from_static("ping"),
            ..Event::empty()
        };
        client.dispatch_event(&event).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["0:ping", "1:ping", "2:ping"]);
    }

    #[test]
    fn close_skips_remaining_handlers() {
        let calls = Arc::new(Mutex::new(0));
        let mut client = client();
        client.on_open(|session| {
            session.close();
            Ok(())
        });
        {
            let calls = calls.clone();
            client.on_open(move |_| {
                *calls.lock().unwrap() += 1;
                Ok(())
            });
        }

        client.dispatch_open().unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(client.handle().is_closed());
    }

    #[test]
    fn handler_error_stops_dispatch() {
        let calls = Arc::new(Mutex::new(0));
        let mut client = client();
        client.on_error(|_, _| Err("handler gave up".into()));
        {
            let calls = calls.clone();
            client.on_error(move |_, _| {
                *calls.lock().unwrap() += 1;
                Ok(())
            });
        }

        let err = client
            .dispatch_error(&Error::Cancelled)
            .unwrap_err()
            .to_string();
        assert_eq!(err, "handler gave up");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn handler_kinds() {
        let handler = Handler::Error(Box::new(|_, _| Ok(())));
        assert_eq!(handler.kind(), EventKind::Error);
        assert_eq!(handler.kind().to_string(), "error");
        assert_eq!(format!("{handler:?}"), "Handler(Error)");
    }
}
