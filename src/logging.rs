//! Structured logging.
//!
//! JSON format, one object per line:
//! ```json
//! {"ts":"2024-12-28T15:04:05.123Z","level":"info","type":"app","msg":"Probe completed","ctx":{"service":"gateway-health","probe_id":"..."},"data":{"status":"healthy"}}
//! ```
//!
//! Events with target `access` become `type: "access"` lines whose message
//! is `METHOD /path STATUS`. Fields of the enclosing spans (the probe id)
//! land in `ctx`.

use std::collections::BTreeMap;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::timestamp;

/// Install the global subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new("gateway_health=info"));

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(json_layer(&config.service_name))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
}

/// fmt layer writing [`JsonFormatter`] lines.
///
/// ANSI is off: span fields are pre-rendered by `DefaultFields` and colour
/// codes would end up inside `ctx` keys.
pub fn json_layer<S>(service_name: &str) -> fmt::Layer<S, DefaultFields, JsonFormatter>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .event_format(JsonFormatter::new(service_name))
}

/// JSON event formatter.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, event: &Event<'_>, spans: Vec<(String, String)>) -> serde_json::Value {
        let meta = event.metadata();
        let level = match *meta.level() {
            Level::TRACE | Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };

        let log_type = if meta.target() == "access" {
            "access"
        } else if *meta.level() == Level::ERROR {
            "error"
        } else {
            "app"
        };

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let msg = if log_type == "access" {
            let field = |name: &str| {
                visitor
                    .fields
                    .get(name)
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "?".to_string())
            };
            format!("{} {} {}", field("method"), field("path"), field("status"))
        } else {
            visitor.message.unwrap_or_default()
        };

        let mut ctx = serde_json::Map::new();
        ctx.insert("service".into(), serde_json::json!(self.service_name));
        for (key, value) in spans {
            ctx.insert(key, serde_json::Value::String(value));
        }

        serde_json::json!({
            "ts": timestamp::iso8601_now(),
            "level": level,
            "type": log_type,
            "msg": msg,
            "ctx": ctx,
            "data": visitor.fields,
        })
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        // Span fields are pre-rendered as `key=value` pairs by the field formatter
        let mut spans = Vec::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    spans.extend(parse_span_fields(fields.as_str()));
                }
            }
        }

        let entry = self.entry(event, spans);
        writeln!(writer, "{}", serde_json::to_string(&entry).unwrap_or_default())
    }
}

/// Split `a=1 b="x"` into pairs. Values with spaces are not expected here.
fn parse_span_fields(rendered: &str) -> Vec<(String, String)> {
    rendered
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.trim_matches('"').to_string()))
        .collect()
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value).trim_matches('"').to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::json!(value));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }
}
