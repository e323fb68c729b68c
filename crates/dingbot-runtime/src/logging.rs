//! Logging setup on `tracing-subscriber`.
//!
//! [`init_from_config`] is what the runtime calls; [`LoggingBuilder`] is for
//! binaries that want to set things up by hand:
//!
//! ```rust,ignore
//! use dingbot_runtime::logging::{FmtSpan, LoggingBuilder};
//!
//! LoggingBuilder::new()
//!     .directive("dingbot_client=debug")
//!     .span_events(FmtSpan::NEW | FmtSpan::CLOSE)
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// File name used when `file_path` names only a directory.
pub const DEFAULT_LOG_FILE: &str = "dingbot.log";

impl SpanEventConfig {
    pub fn to_fmt_span(&self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already set, so tests and embedding
/// binaries can install their own first.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

#[derive(Debug)]
pub struct LoggingBuilder {
    level: LevelFilter,
    directives: Vec<String>,
    span_events: FmtSpan,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
    max_files: usize,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: LevelFilter::INFO,
            directives: Vec::new(),
            span_events: FmtSpan::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            level: LevelFilter::from_level(config.level.to_tracing_level()),
            directives: filters
                .into_iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            span_events: config.span_events.to_fmt_span(),
            format: config.format,
            output: config.output,
            with_thread_ids: config.thread_ids,
            file_location: config.file_location,
            file_path: config.file_path.clone(),
            rotation: config.rotation,
            max_files: config.max_files,
            ..Self::new()
        }
    }

    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = LevelFilter::from_level(level);
        self
    }

    /// Adds an `EnvFilter` directive such as `dingbot_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: FmtSpan) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Adds file and line to every record.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.file_location = enabled;
        self
    }

    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotated files to keep; `0` keeps all of them.
    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, fallback) = self.make_writer();
        let layer = self.fmt_layer(writer);

        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()?;

        if let Some(reason) = fallback {
            tracing::warn!(%reason, "File logging unavailable, writing to stdout");
        }
        Ok(())
    }

    /// `RUST_LOG` directives apply on top of the configured level; explicit
    /// directives are added last. Unparseable directives are skipped.
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy();
        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring log directive {directive:?}: {e}"),
            }
        }
        filter
    }

    fn make_writer(&self) -> (BoxMakeWriter, Option<String>) {
        match self.output {
            LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
            LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
            LogOutput::File => match self.file_appender() {
                Ok(appender) => (BoxMakeWriter::new(appender), None),
                Err(reason) => (BoxMakeWriter::new(std::io::stdout), Some(reason)),
            },
        }
    }

    fn file_appender(&self) -> Result<RollingFileAppender, String> {
        let path = self
            .file_path
            .as_deref()
            .ok_or_else(|| "no file_path configured".to_string())?;
        let (dir, name) = split_log_path(path);

        let mut builder = RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(name);
        if self.max_files > 0 {
            builder = builder.max_log_files(self.max_files);
        }
        builder
            .build(dir)
            .map_err(|e| format!("{}: {e}", path.display()))
    }

    fn fmt_layer<S>(&self, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.span_events.clone())
            .with_target(self.with_target)
            .with_thread_ids(self.with_thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
        }
    }
}

/// Splits a configured path into the appender directory and file prefix.
fn split_log_path(path: &Path) -> (&Path, &str) {
    if path.is_dir() {
        return (path, DEFAULT_LOG_FILE);
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_event_config() {
        let config = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(config.to_fmt_span(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(SpanEventConfig::default().to_fmt_span(), FmtSpan::NONE);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            thread_ids: true,
            file_location: true,
            rotation: LogRotation::Daily,
            ..Default::default()
        };
        config.filters.insert("hyper".into(), LogLevel::Warn);
        config.filters.insert("dingbot_client".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, LevelFilter::DEBUG);
        assert!(builder.with_thread_ids);
        assert!(builder.file_location);
        assert!(builder.with_target);
        assert_eq!(builder.rotation, LogRotation::Daily);
        assert_eq!(builder.directives, vec!["dingbot_client=trace", "hyper=warn"]);
    }

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("logs/bot.log")),
            (Path::new("logs"), "bot.log")
        );
        assert_eq!(split_log_path(Path::new("bot.log")), (Path::new("."), "bot.log"));

        let dir = std::env::temp_dir();
        assert_eq!(split_log_path(&dir), (dir.as_path(), DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        let (_, fallback) = builder.make_writer();
        assert_eq!(fallback.as_deref(), Some("no file_path configured"));
    }
}
