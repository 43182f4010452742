//! Reader task: drains the event stream into the control loop's channel

use core::pin::pin;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{errors::EventStreamError, event::Event};

/// What the reader hands to the control loop
#[derive(Debug)]
pub(crate) enum ReadOutcome<E> {
    Event(Event),
    Error(EventStreamError<E>),
    /// The body ended
    Closed,
}

/// Reads `stream` until it ends, hits a transport error, `cancel` fires or the control loop goes
/// away. The stream, and with it the response body, is dropped on return.
pub(crate) async fn read_events<S, E>(
    stream: S,
    tx: mpsc::Sender<ReadOutcome<E>>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Event, EventStreamError<E>>>,
    E: core::fmt::Display,
{
    let mut stream = pin!(stream);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = stream.next() => next,
        };

        let (outcome, last) = match next {
            Some(Ok(event)) => (ReadOutcome::Event(event), false),
            Some(Err(err)) => {
                let terminal = err.is_terminal();
                if terminal {
                    warn!("event stream read failed: {err}");
                } else {
                    warn!("{err}");
                }
                (ReadOutcome::Error(err), terminal)
            }
            None => (ReadOutcome::Closed, true),
        };

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(outcome) => sent,
        };
        if sent.is_err() || last {
            break;
        }
    }

    debug!("reader stopped");
}
