pub mod model;
pub mod store;

pub use model::{Span, SpanType, Status, Trace};
pub use store::TraceStore;
