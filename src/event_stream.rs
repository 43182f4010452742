//! [`Stream`] that turns a stream of byte chunks into decoded [`Event`]s

use core::{
    pin::Pin,
    task::{Context, Poll, ready},
};

use bytes::{Buf, BytesMut};
use bytes_utils::{Str, StrMut};
use futures_core::Stream;

use crate::{
    constants::{BOM, CR, EMPTY_STR, LF},
    errors::EventStreamError,
    event::Event,
    parser::{FieldName, RawEventLineOwned, ValidatedEventLine, parse_line_from_buffer},
};

#[derive(Debug, Clone)]
struct EventBuilder {
    id: Str,
    comment: Str,
    name: Str,
    data_buffer: StrMut,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self {
            id: EMPTY_STR,
            comment: EMPTY_STR,
            name: EMPTY_STR,
            data_buffer: StrMut::new(),
        }
    }
}

impl EventBuilder {
    fn add(&mut self, field_name: FieldName, field_value: Str) {
        match field_name {
            FieldName::Id => self.id = field_value,
            FieldName::Comment => self.comment = field_value,
            FieldName::Event => self.name = field_value,
            FieldName::Data => {
                self.data_buffer.push_str(&field_value);
                self.data_buffer.push('\n');
            }
            // reconnection is not supported, the directive is only recognised
            FieldName::Retry => (),
        }
    }

    /// Finishes the pending frame and resets the builder for the next one
    fn dispatch(&mut self) -> Event {
        let EventBuilder {
            id,
            comment,
            name,
            data_buffer,
        } = core::mem::take(self);

        let mut buf = data_buffer.into_inner();
        let keep = buf
            .iter()
            .rposition(|&b| b != CR && b != LF)
            .map_or(0, |last| last + 1);
        buf.truncate(keep);
        // Safety: only trailing CR and LF bytes were removed, neither can be part of a multi-byte codepoint
        let data = unsafe { StrMut::from_inner_unchecked(buf) };

        Event {
            id,
            comment,
            name,
            data: data.freeze(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum EventStreamState {
    NotStarted,
    Started,
    Terminated,
}

impl EventStreamState {
    fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

/// [None] while the buffer is too short to tell
fn starts_with_bom(buffer: &[u8]) -> Option<bool> {
    if buffer.len() >= BOM.len() {
        Some(buffer.starts_with(BOM))
    } else if BOM.starts_with(buffer) {
        None
    } else {
        Some(false)
    }
}

pin_project_lite::pin_project! {
    /// Decodes a byte stream into [`Event`]s.
    ///
    /// Yields `Ok(event)` at every blank line, `Err` for lines it cannot make sense of (decoding
    /// keeps going after those) and ends with [`None`] once the inner stream is exhausted or after
    /// it yielded a transport error. A partial line or frame left at the end of input is dropped.
    #[project = EventStreamProjection]
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        buffer: BytesMut,
        builder: EventBuilder,
        state: EventStreamState,
    }
}

impl<S> EventStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            builder: EventBuilder::default(),
            state: EventStreamState::NotStarted,
        }
    }
}

fn parse_event<E>(
    buffer: &mut BytesMut,
    builder: &mut EventBuilder,
) -> Result<Option<Event>, EventStreamError<E>> {
    if buffer.is_empty() {
        return Ok(None);
    }
    loop {
        let event_line = match parse_line_from_buffer(buffer).map(RawEventLineOwned::validate) {
            Some(Ok(event_line)) => event_line,
            Some(Err(e)) => return Err(EventStreamError::Utf8Error(e)),
            None => return Ok(None),
        };

        match event_line {
            ValidatedEventLine::Empty => return Ok(Some(builder.dispatch())),
            ValidatedEventLine::Field {
                field_name,
                field_value,
            } => builder.add(field_name, field_value),
            ValidatedEventLine::Unknown(line) => {
                return Err(EventStreamError::UnknownLine(
                    String::from_utf8_lossy(&line).into_owned(),
                ));
            }
        }
    }
}

macro_rules! try_parse_event_buffer {
    ($this:ident) => {
        match parse_event($this.buffer, $this.builder) {
            Ok(Some(event)) => return Poll::Ready(Some(Ok(event))),
            Err(e) => return Poll::Ready(Some(Err(e))),
            Ok(None) => {}
        }
    };
}

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, EventStreamError<E>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<<Self as Stream>::Item>> {
        let mut this = self.project();

        if this.state.is_terminated() {
            return Poll::Ready(None);
        };

        try_parse_event_buffer!(this);

        loop {
            let new_bytes = match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(o)) => o,
                Some(Err(e)) => {
                    *this.state = EventStreamState::Terminated;
                    return Poll::Ready(Some(Err(EventStreamError::Transport(e))));
                }
                None => {
                    *this.state = EventStreamState::Terminated;
                    return Poll::Ready(None);
                }
            };

            let new_bytes = new_bytes.as_ref();

            if new_bytes.is_empty() {
                continue;
            }

            this.buffer.extend_from_slice(new_bytes);

            if this.state.is_not_started() {
                match starts_with_bom(this.buffer) {
                    Some(true) => {
                        *this.state = EventStreamState::Started;
                        this.buffer.advance(BOM.len());
                    }
                    Some(false) => *this.state = EventStreamState::Started,
                    None => continue,
                }
            };

            try_parse_event_buffer!(this);
        }
    }
}
