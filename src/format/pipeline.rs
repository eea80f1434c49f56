//! Formatter selection and composition.
//!
//! A pipeline is an ordered list of stages chosen once at configuration time.
//! Stages run left to right over a shared [`Rendering`]: decorating stages
//! adjust the level label, terminal stages produce the output line. The first
//! terminal stage that produces output wins.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::record::{Fields, LogRecord};
use super::stringify::stringify_object;

/// In-progress rendering of one record.
#[derive(Debug)]
pub struct Rendering<'a> {
    pub record: &'a LogRecord,
    /// Captured when rendering starts.
    pub timestamp: DateTime<Utc>,
    pub level_label: String,
    pub output: Option<String>,
}

impl<'a> Rendering<'a> {
    pub fn new(record: &'a LogRecord) -> Self {
        Self {
            record,
            timestamp: Utc::now(),
            level_label: record.level.name.clone(),
            output: None,
        }
    }
}

/// One step of a [`FormatPipeline`].
pub trait FormatStage: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, rendering: &mut Rendering<'_>);
}

/// Wraps the level label in the level's ANSI color.
#[derive(Debug, Clone, Copy, Default)]
pub struct Colorize;

impl FormatStage for Colorize {
    fn name(&self) -> &'static str {
        "colorize"
    }

    fn apply(&self, rendering: &mut Rendering<'_>) {
        rendering.level_label = rendering.record.level.color.paint(&rendering.level_label);
    }
}

/// Encodes the record as a single-line JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredEncoding;

#[derive(Serialize)]
struct StructuredRecord<'a> {
    service: &'a str,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    level: &'a str,
    level_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    logger_name: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack_trace: Option<&'a str>,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a Value>,
}

impl FormatStage for StructuredEncoding {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn apply(&self, rendering: &mut Rendering<'_>) {
        if rendering.output.is_some() {
            return;
        }

        let record = rendering.record;
        let doc = StructuredRecord {
            service: &record.service,
            timestamp: rendering
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            level: &record.level.name,
            level_value: record.level.rank,
            logger_name: record.logger_name.as_deref(),
            message: &record.message,
            meta: record.meta.as_ref(),
            stack_trace: record.stack_trace.as_deref(),
            request_id: record.request_id.as_ref(),
        };

        match serde_json::to_string(&doc) {
            Ok(line) => rendering.output = Some(line),
            Err(e) => {
                // Leave output unset; a later stage renders plain text.
                log::warn!(
                    "STRUCTURED_ENCODE_FAILED level={} error={}",
                    record.level.name,
                    e
                );
            }
        }
    }
}

/// Renders `LEVEL: message key=value, ...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl FormatStage for PlainText {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn apply(&self, rendering: &mut Rendering<'_>) {
        if rendering.output.is_none() {
            rendering.output = Some(plain_line(&rendering.level_label, rendering.record));
        }
    }
}

fn plain_line(label: &str, record: &LogRecord) -> String {
    let fields = record.display_fields();
    if fields.is_empty() {
        format!("{}: {}", label, record.message)
    } else {
        format!("{}: {} {}", label, record.message, stringify_object(fields))
    }
}

/// Ordered list of formatting stages.
#[derive(Debug)]
pub struct FormatPipeline {
    stages: Vec<Box<dyn FormatStage>>,
}

impl FormatPipeline {
    pub fn new(stages: Vec<Box<dyn FormatStage>>) -> Self {
        Self { stages }
    }

    /// Pick the stages for an environment.
    ///
    /// Colorization only applies outside production. Production encodes JSON
    /// and keeps plain text as the fallback when encoding fails.
    pub fn select(is_production: bool, colorize: bool) -> Self {
        let mut stages: Vec<Box<dyn FormatStage>> = Vec::new();

        if colorize && !is_production {
            stages.push(Box::new(Colorize));
        }
        if is_production {
            stages.push(Box::new(StructuredEncoding));
        }
        stages.push(Box::new(PlainText));

        Self::new(stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Render a record. The result carries no trailing newline.
    pub fn render(&self, record: &LogRecord) -> String {
        let mut rendering = Rendering::new(record);
        for stage in &self.stages {
            stage.apply(&mut rendering);
        }

        match rendering.output {
            Some(output) => output,
            None => plain_line(&rendering.level_label, record),
        }
    }
}
