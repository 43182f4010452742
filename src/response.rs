use std::collections::BTreeMap;

use crate::errors::Error;

/// What [Engine::open][crate::Engine::open] returns once a session is over.
///
/// `error` is only set when the connection attempt itself failed, in which case `status` is 0
/// and `headers` is empty. Errors read from the stream go to the error handlers instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseSummary {
    pub url: String,
    pub status: u16,
    /// Lower-case header names, repeated headers joined with `", "`
    pub headers: BTreeMap<String, String>,
    pub error: String,
}

impl ResponseSummary {
    pub fn from_response(url: &str, response: &reqwest::Response) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            headers
                .entry(name.as_str().to_string())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        Self {
            url: url.to_string(),
            status: response.status().as_u16(),
            headers,
            error: String::new(),
        }
    }

    pub fn failed(url: &str, error: &Error) -> Self {
        Self {
            url: url.to_string(),
            error: error.to_string(),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_joined() {
        let response = http::Response::builder()
            .status(202)
            .header("Content-Type", "text/event-stream")
            .header("Set-Cookie", "a=1")
            .header("Set-Cookie", "b=2")
            .body("")
            .unwrap();
        let response = reqwest::Response::from(response);

        let summary = ResponseSummary::from_response("http://localhost/sse", &response);
        assert_eq!(summary.status, 202);
        assert!(!summary.is_error());
        assert_eq!(summary.headers["content-type"], "text/event-stream");
        assert_eq!(summary.headers["set-cookie"], "a=1, b=2");
    }

    #[test]
    fn failed_keeps_url() {
        let summary = ResponseSummary::failed("nope://", &Error::invalid_request("bad url"));
        assert!(summary.is_error());
        assert_eq!(summary.url, "nope://");
        assert_eq!(summary.status, 0);
        assert!(summary.headers.is_empty());
        assert_eq!(summary.error, "invalid request: bad url");
    }
}
