use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::trace::model::{Span, SpanType, Status, Trace};

pub const DEFAULT_MAX_TRACES: usize = 100;

/// Stored span outputs are cut to this many characters.
pub const OUTPUT_SNAPSHOT_CHARS: usize = 500;

/// Bounded, in-memory record of recent traces.
///
/// The index lock only guards map and ordering bookkeeping. Each trace has
/// its own lock, so span writes for one invocation never wait on another.
/// Neither lock is held across an await point.
pub struct TraceStore {
    max_traces: usize,
    index: Mutex<TraceIndex>,
}

#[derive(Default)]
struct TraceIndex {
    traces: HashMap<String, Arc<Mutex<Trace>>>,
    order: VecDeque<String>,
    active: HashSet<String>,
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACES)
    }
}

impl TraceStore {
    pub fn new(max_traces: usize) -> Self {
        Self {
            max_traces: max_traces.max(1),
            index: Mutex::new(TraceIndex::default()),
        }
    }

    pub fn max_traces(&self) -> usize {
        self.max_traces
    }

    pub fn create_trace(&self, request_metadata: Value) -> String {
        let trace = Trace::new(request_metadata);
        let trace_id = trace.trace_id.clone();

        let mut index = lock(&self.index);
        index
            .traces
            .insert(trace_id.clone(), Arc::new(Mutex::new(trace)));
        index.active.insert(trace_id.clone());
        index.order.push_back(trace_id.clone());

        // Oldest first, regardless of status.
        while index.order.len() > self.max_traces {
            if let Some(evicted) = index.order.pop_front() {
                index.traces.remove(&evicted);
                index.active.remove(&evicted);
                debug!(trace_id = %evicted, "evicted trace");
            }
        }

        trace_id
    }

    pub fn add_span(
        &self,
        trace_id: &str,
        name: &str,
        inputs: Option<Value>,
        parent_id: Option<&str>,
        span_type: SpanType,
    ) -> Result<String, AppError> {
        let trace = self
            .handle(trace_id)
            .ok_or_else(|| AppError::TraceNotFound(trace_id.to_string()))?;

        let span = Span::new(name, inputs, parent_id.map(str::to_string), span_type);
        let span_id = span.span_id.clone();
        lock(&trace).spans.push(span);
        Ok(span_id)
    }

    /// Finishes a span. Unknown traces or spans are ignored, since a tool
    /// can outlive the eviction of its trace.
    pub fn complete_span(&self, trace_id: &str, span_id: &str, outputs: Option<Value>, status: Status) {
        let Some(trace) = self.handle(trace_id) else {
            debug!(trace_id, span_id, "complete_span on unknown trace");
            return;
        };
        let mut trace = lock(&trace);
        if let Some(span) = trace.span_mut(span_id) {
            span.complete(outputs.map(snapshot), status);
        }
    }

    pub fn complete_trace(&self, trace_id: &str, status: Status) -> Result<(), AppError> {
        let trace = {
            let mut index = lock(&self.index);
            let trace = index
                .traces
                .get(trace_id)
                .cloned()
                .ok_or_else(|| AppError::TraceNotFound(trace_id.to_string()))?;
            index.active.remove(trace_id);
            trace
        };
        lock(&trace).complete(status);
        Ok(())
    }

    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        self.handle(trace_id).map(|t| lock(&t).clone())
    }

    /// Newest first.
    pub fn list_traces(&self, limit: usize, offset: usize) -> Vec<Trace> {
        let handles: Vec<Arc<Mutex<Trace>>> = {
            let index = lock(&self.index);
            index
                .order
                .iter()
                .rev()
                .skip(offset)
                .take(limit)
                .filter_map(|id| index.traces.get(id).cloned())
                .collect()
        };
        handles.iter().map(|t| lock(t).clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.index).traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        lock(&self.index).active.len()
    }

    pub fn is_active(&self, trace_id: &str) -> bool {
        lock(&self.index).active.contains(trace_id)
    }

    /// Runs `work` inside a span. The span closes as `SUCCESS` with the
    /// serialized value, or as `ERROR` with the error text. When the trace
    /// is gone the work still runs, just without a span id.
    pub async fn span_scope<T, F, Fut>(
        &self,
        trace_id: &str,
        name: &str,
        inputs: Option<Value>,
        parent_id: Option<&str>,
        span_type: SpanType,
        work: F,
    ) -> Result<T, AppError>
    where
        T: Serialize,
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let span_id = match self.add_span(trace_id, name, inputs, parent_id, span_type) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(trace_id, span = name, error = %e, "span not recorded");
                None
            }
        };

        let result = work(span_id.clone()).await;

        if let Some(span_id) = span_id {
            match &result {
                Ok(value) => {
                    let outputs = serde_json::to_value(value).ok();
                    self.complete_span(trace_id, &span_id, outputs, Status::Success);
                }
                Err(e) => {
                    let outputs = serde_json::json!({ "error": e.to_string() });
                    self.complete_span(trace_id, &span_id, Some(outputs), Status::Error);
                }
            }
        }
        result
    }

    fn handle(&self, trace_id: &str) -> Option<Arc<Mutex<Trace>>> {
        lock(&self.index).traces.get(trace_id).cloned()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounds a stored payload: long strings are cut, and any other value whose
/// JSON form is too long is replaced by a cut preview of that JSON.
pub fn snapshot(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(&s, OUTPUT_SNAPSHOT_CHARS)),
        Value::Object(map) => {
            let bounded = map
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, Value::String(truncate(&s, OUTPUT_SNAPSHOT_CHARS))),
                    other => (k, bound_json(other)),
                })
                .collect();
            Value::Object(bounded)
        }
        other => bound_json(other),
    }
}

fn bound_json(value: Value) -> Value {
    let rendered = value.to_string();
    if rendered.chars().count() <= OUTPUT_SNAPSHOT_CHARS {
        value
    } else {
        Value::String(truncate(&rendered, OUTPUT_SNAPSHOT_CHARS))
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => {
            let mut out = s[..cut].to_string();
            out.push('…');
            out
        }
    }
}
