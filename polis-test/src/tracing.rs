//! Span capture for asserting on the `polis.*` spans of the policy stage.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Dispatch;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// Captured span information.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    /// Unique span ID
    pub id: u64,
    /// Parent span ID, if any
    pub parent_id: Option<u64>,
    /// Span name, e.g. `polis.dispatch`
    pub name: String,
    /// Field values rendered as strings, updated by `span.record()`
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    /// Value of a field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn is_captured(name: &str) -> bool {
    name.starts_with("polis.")
}

#[derive(Default)]
struct FieldVisitor {
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }
}

/// A tracing layer capturing `polis.*` spans.
struct SpanCaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        if !is_captured(metadata.name()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent_id = attrs
            .parent()
            .cloned()
            .or_else(|| {
                if attrs.is_contextual() {
                    ctx.current_span().id().cloned()
                } else {
                    None
                }
            })
            .map(|id| id.into_u64());

        lock(&self.spans).push(CapturedSpan {
            id: id.into_u64(),
            parent_id,
            name: metadata.name().to_string(),
            fields: visitor.fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if !is_captured(span.metadata().name()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let span_id = id.into_u64();
        let mut spans = lock(&self.spans);
        if let Some(captured) = spans.iter_mut().find(|span| span.id == span_id) {
            for (key, value) in visitor.fields {
                match captured.fields.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(existing) => existing.1 = value,
                    None => captured.fields.push((key, value)),
                }
            }
        }
    }

    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {}
}

fn lock(spans: &Mutex<Vec<CapturedSpan>>) -> MutexGuard<'_, Vec<CapturedSpan>> {
    spans.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collector for captured spans.
#[derive(Clone)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    dispatch: Dispatch,
}

/// Creates a span collector with its own dispatch.
///
/// Run the code under test with the returned [`SpanCollector::dispatch`],
/// e.g. through `tracing::instrument::WithSubscriber`.
pub fn create_span_collector() -> SpanCollector {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCaptureLayer {
        spans: Arc::clone(&spans),
    };
    let dispatch = Dispatch::new(Registry::default().with(layer));
    SpanCollector { spans, dispatch }
}

impl SpanCollector {
    /// The dispatch to run instrumented code with.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// All captured spans.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        lock(&self.spans).clone()
    }

    /// Captured span names in creation order.
    pub fn span_names(&self) -> Vec<String> {
        lock(&self.spans)
            .iter()
            .map(|span| span.name.clone())
            .collect()
    }

    /// The last span with the given name.
    pub fn get_span(&self, name: &str) -> Option<CapturedSpan> {
        lock(&self.spans)
            .iter()
            .rev()
            .find(|span| span.name == name)
            .cloned()
    }

    /// A field of the last span with the given name.
    pub fn get_field(&self, span_name: &str, field_name: &str) -> Option<String> {
        self.get_span(span_name)
            .and_then(|span| span.field(field_name).map(str::to_owned))
    }

    /// The `policy` field of every `polis.policy` span, in application order.
    pub fn applied_policies(&self) -> Vec<String> {
        lock(&self.spans)
            .iter()
            .filter(|span| span.name == "polis.policy")
            .filter_map(|span| span.field("policy").map(str::to_owned))
            .collect()
    }

    /// Forgets every captured span.
    pub fn clear(&self) {
        lock(&self.spans).clear();
    }
}
