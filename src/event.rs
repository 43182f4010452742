//! Representation of a decoded SSE frame

use bytes_utils::Str;

use crate::constants::EMPTY_STR;

/// One decoded frame from an [EventStream][crate::event_stream::EventStream].
///
/// Every field only reflects what appeared in its own frame, an `id:` line is not carried over to
/// later frames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub id: Str,
    pub comment: Str,
    pub name: Str,
    /// `data:` lines of the frame joined with `\n`, trailing CR/LF removed
    pub data: Str,
}

impl Event {
    /// An [Event] with all fields empty, what a lone blank line decodes to
    pub const fn empty() -> Self {
        Self {
            id: EMPTY_STR,
            comment: EMPTY_STR,
            name: EMPTY_STR,
            data: EMPTY_STR,
        }
    }

    /// Deserialise [Event::data] as JSON
    #[cfg(feature = "json")]
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.data)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_fields() {
        let event = Event::default();
        assert!(event.id.is_empty());
        assert!(event.comment.is_empty());
        assert!(event.name.is_empty());
        assert!(event.data.is_empty());
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_data() {
        #[derive(serde::Deserialize)]
        struct Ping {
            ping: String,
        }

        let event = Event {
            data: Str::from_static(r#"{"ping": "pong"}"#),
            ..Event::empty()
        };
        let ping: Ping = event.json().unwrap();
        assert_eq!(ping.ping, "pong");
    }
}
