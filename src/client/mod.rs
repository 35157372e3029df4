//! HTTP client for a running gateway, plus the terminal chat built on it.

mod repl;
mod transcript;

use futures::StreamExt;

pub use repl::run_repl;
pub use transcript::{ChatTranscript, ERROR_TURN_TEXT, Role, Turn};

use crate::error::ChannelError;

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";

/// Talks to `POST /api/chat` on a gateway.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self, ChannelError> {
        let base = url::Url::parse(base_url).map_err(|e| ChannelError::Request {
            url: base_url.to_string(),
            reason: format!("invalid gateway URL: {e}"),
        })?;
        let endpoint = base.join("/api/chat").map_err(|e| ChannelError::Request {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one message and hand every decoded chunk to `on_chunk` as it
    /// arrives. Returns the full answer.
    pub async fn stream_message(
        &self,
        message: &str,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<String, ChannelError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .map_err(|e| self.request_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.request_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let mut decoder = Utf8Chunker::default();
        let mut answer = String::new();
        let mut bytes = Box::pin(response.bytes_stream());
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| self.request_error(e.to_string()))?;
            let text = decoder.push(&chunk);
            if !text.is_empty() {
                on_chunk(&text);
                answer.push_str(&text);
            }
        }
        let rest = decoder.finish();
        if !rest.is_empty() {
            on_chunk(&rest);
            answer.push_str(&rest);
        }
        Ok(answer)
    }

    fn request_error(&self, reason: String) -> ChannelError {
        ChannelError::Request {
            url: self.endpoint.clone(),
            reason,
        }
    }
}

/// Decodes a UTF-8 byte stream whose chunk boundaries may split characters.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        // An incomplete trailing sequence waits for the next chunk.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_holds_split_characters() {
        let bytes = "¿Qué?".as_bytes();
        let mut chunker = Utf8Chunker::default();
        assert_eq!(chunker.push(&bytes[..1]), "");
        assert_eq!(chunker.push(&bytes[1..5]), "¿Qu");
        assert_eq!(chunker.push(&bytes[5..]), "é?");
        assert_eq!(chunker.finish(), "");
    }

    #[test]
    fn chunker_replaces_invalid_bytes() {
        let mut chunker = Utf8Chunker::default();
        assert_eq!(chunker.push(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn chunker_keeps_split_character_after_invalid_byte() {
        let e_acute = "é".as_bytes();
        let mut chunker = Utf8Chunker::default();
        assert_eq!(chunker.push(&[b'a', 0xFF, e_acute[0]]), "a\u{FFFD}");
        assert_eq!(chunker.push(&e_acute[1..]), "é");
        assert_eq!(chunker.finish(), "");
    }

    #[test]
    fn client_builds_chat_endpoint() {
        let client = ChatClient::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:3000/api/chat");
    }

    #[test]
    fn client_rejects_bad_url() {
        assert!(ChatClient::new("not a url").is_err());
    }
}
