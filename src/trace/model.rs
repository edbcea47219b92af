use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanType {
    Agent,
    Llm,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Running,
    Success,
    Error,
}

/// A timed unit of work inside a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub span_id: String,
    pub name: String,
    pub start_time_ms: i64,
    #[serde(default)]
    pub end_time_ms: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Value>,
    pub span_type: SpanType,
    pub status: Status,
}

impl Span {
    pub fn new(name: &str, inputs: Option<Value>, parent_id: Option<String>, span_type: SpanType) -> Self {
        Self {
            span_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            start_time_ms: now_ms(),
            end_time_ms: None,
            duration_ms: None,
            parent_id,
            attributes: HashMap::new(),
            inputs,
            outputs: None,
            span_type,
            status: Status::Running,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end_time_ms.is_some()
    }

    /// Stamps the end time once. Later calls leave the first completion intact.
    pub fn complete(&mut self, outputs: Option<Value>, status: Status) -> bool {
        if self.is_complete() {
            return false;
        }
        let end = now_ms().max(self.start_time_ms);
        self.end_time_ms = Some(end);
        self.duration_ms = Some(end - self.start_time_ms);
        if outputs.is_some() {
            self.outputs = outputs;
        }
        self.status = status;
        true
    }
}

/// The record of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub request_id: String,
    pub trace_id: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub execution_time_ms: Option<i64>,
    pub status: Status,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub request_metadata: Value,
}

impl Trace {
    pub fn new(request_metadata: Value) -> Self {
        let trace_id = uuid::Uuid::new_v4().to_string();
        Self {
            request_id: trace_id.clone(),
            trace_id,
            timestamp_ms: now_ms(),
            execution_time_ms: None,
            status: Status::Running,
            spans: Vec::new(),
            request_metadata,
        }
    }

    pub fn span_mut(&mut self, span_id: &str) -> Option<&mut Span> {
        self.spans.iter_mut().find(|s| s.span_id == span_id)
    }

    pub fn complete(&mut self, status: Status) {
        self.status = status;
        self.execution_time_ms = execution_time(&self.spans);
    }
}

/// Latest end minus earliest start over the completed spans.
pub fn execution_time(spans: &[Span]) -> Option<i64> {
    let start = spans
        .iter()
        .filter(|s| s.is_complete())
        .map(|s| s.start_time_ms)
        .min()?;
    let end = spans.iter().filter_map(|s| s.end_time_ms).max()?;
    Some(end - start)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(start: i64, end: Option<i64>) -> Span {
        let mut span = Span::new("s", None, None, SpanType::Tool);
        span.start_time_ms = start;
        span.end_time_ms = end;
        span
    }

    #[test]
    fn execution_time_spans_completed_work_only() {
        let spans = vec![span_at(100, Some(150)), span_at(120, Some(400)), span_at(50, None)];
        assert_eq!(execution_time(&spans), Some(300));
        assert_eq!(execution_time(&[span_at(10, None)]), None);
        assert_eq!(execution_time(&[]), None);
    }

    #[test]
    fn span_completion_is_sticky() {
        let mut span = Span::new("t", None, None, SpanType::Tool);
        assert!(span.complete(Some(serde_json::json!({"result": "first"})), Status::Success));
        let end = span.end_time_ms;
        let duration = span.duration_ms;
        assert!(!span.complete(Some(serde_json::json!({"result": "second"})), Status::Error));
        assert_eq!(span.end_time_ms, end);
        assert_eq!(span.duration_ms, duration);
        assert_eq!(span.status, Status::Success);
        assert_eq!(span.outputs, Some(serde_json::json!({"result": "first"})));
        assert!(span.end_time_ms.unwrap() >= span.start_time_ms);
    }

    #[test]
    fn wire_tags_are_uppercase() {
        let span = Span::new("llm:x", None, None, SpanType::Llm);
        let v = serde_json::to_value(&span).unwrap();
        assert_eq!(v["span_type"], "LLM");
        assert_eq!(v["status"], "RUNNING");
    }
}
