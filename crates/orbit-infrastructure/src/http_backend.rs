//! Backend reached over HTTP.
//!
//! `ask_orbit` answers with one JSON object; `process_query_stream` answers
//! with newline-delimited JSON records that are republished on the event
//! channels as they arrive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use orbit_core::backend::{AskRequest, Backend, StreamRequest, ASK_COMMAND, STREAM_COMMAND};
use orbit_core::error::{OrbitError, Result};
use orbit_core::event::{StreamEvent, SubmissionId};
use reqwest::Client;
use serde::Deserialize;

use crate::event_bus::LocalEventBus;

#[derive(Debug, Deserialize)]
struct AskResponse {
    response: String,
}

/// One line of a streamed answer.
#[derive(Debug, Deserialize, PartialEq, Eq)]
struct StreamRecord {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl StreamRecord {
    /// Events this record produces, in order.
    fn into_events(self) -> Vec<StreamEvent> {
        if let Some(error) = self.error {
            return vec![StreamEvent::Error(error)];
        }
        let mut events = Vec::with_capacity(2);
        if !self.response.is_empty() {
            events.push(StreamEvent::Chunk(self.response));
        }
        if self.done {
            events.push(StreamEvent::Done);
        }
        events
    }
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    bus: Arc<LocalEventBus>,
}

impl HttpBackend {
    pub fn new(base_url: &str, bus: Arc<LocalEventBus>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bus,
        }
    }

    /// Builds a client whose connect phase is bounded by `timeout`.
    pub fn with_connect_timeout(
        base_url: &str,
        bus: Arc<LocalEventBus>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| OrbitError::backend(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bus,
        })
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/{}", self.base_url, command)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        command: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(command);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| OrbitError::backend(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(OrbitError::backend(format!(
                "{} failed with status: {}",
                command,
                response.status()
            )));
        }
        Ok(response)
    }

    /// Parses one NDJSON line and emits its events. Returns `true` once a
    /// terminal event was emitted.
    fn dispatch_line(&self, submission: SubmissionId, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let record: StreamRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[HttpBackend] Skipping malformed stream record: {}", e);
                return false;
            }
        };

        let mut terminal = false;
        for event in record.into_events() {
            terminal |= event.is_terminal();
            self.bus.emit_event(submission, &event);
        }
        terminal
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ask(&self, message: &str) -> Result<String> {
        let request = AskRequest {
            message: message.to_string(),
        };
        let response: AskResponse = self
            .post(ASK_COMMAND, &request)
            .await?
            .json()
            .await
            .map_err(|e| OrbitError::backend(format!("Invalid {} response: {}", ASK_COMMAND, e)))?;
        Ok(response.response)
    }

    async fn stream(&self, request: StreamRequest) -> Result<()> {
        let submission = request.submission;
        let response = self.post(STREAM_COMMAND, &request).await?;
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    let message = format!("Stream interrupted: {}", e);
                    tracing::warn!("[HttpBackend] {}", message);
                    self.bus.emit_event(submission, &StreamEvent::Error(message));
                    return Ok(());
                }
            };
            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if self.dispatch_line(submission, &String::from_utf8_lossy(&line)) {
                    return Ok(());
                }
            }
        }

        // Trailing record without a newline.
        if self.dispatch_line(submission, &String::from_utf8_lossy(&buffer)) {
            return Ok(());
        }

        tracing::debug!("[HttpBackend] Stream closed without a done record");
        self.bus.emit_event(submission, &StreamEvent::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::event::{EventChannels, EventPayload, STREAM_CHUNK, STREAM_DONE, STREAM_ERROR};
    use std::sync::Mutex;

    #[test]
    fn records_map_to_events() {
        let record: StreamRecord = serde_json::from_str(r#"{"response":"Hel","done":false}"#).unwrap();
        assert_eq!(record.into_events(), vec![StreamEvent::Chunk("Hel".into())]);

        let record: StreamRecord = serde_json::from_str(r#"{"response":"lo","done":true}"#).unwrap();
        assert_eq!(
            record.into_events(),
            vec![StreamEvent::Chunk("lo".into()), StreamEvent::Done]
        );

        let record: StreamRecord =
            serde_json::from_str(r#"{"response":"","done":true,"error":"quota"}"#).unwrap();
        assert_eq!(record.into_events(), vec![StreamEvent::Error("quota".into())]);
    }

    #[test]
    fn dispatch_line_emits_and_reports_terminal() {
        let bus = Arc::new(LocalEventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for channel in [STREAM_CHUNK, STREAM_DONE, STREAM_ERROR] {
            let sink = seen.clone();
            bus.listen(
                channel,
                Arc::new(move |submission: SubmissionId, payload: EventPayload| {
                    sink.lock().unwrap().push(format!(
                        "{}:{}:{}",
                        submission.0,
                        channel,
                        payload.as_text()
                    ))
                }),
            )
            .unwrap();
        }

        let backend = HttpBackend::new("http://127.0.0.1:7878/", bus);
        assert_eq!(backend.endpoint(STREAM_COMMAND), "http://127.0.0.1:7878/process_query_stream");

        let id = SubmissionId(3);
        assert!(!backend.dispatch_line(id, r#"{"response":"Hi","done":false}"#));
        assert!(!backend.dispatch_line(id, "not json"));
        assert!(!backend.dispatch_line(id, "   "));
        assert!(backend.dispatch_line(id, r#"{"response":"","done":true}"#));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["3:stream_chunk:Hi".to_string(), "3:stream_done:".to_string()]
        );
    }
}
