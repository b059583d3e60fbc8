use std::io::{IsTerminal, Write};

use eyre::Context;
use log::{LevelFilter, Log};

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &log::Record) -> String;
}

pub trait LogSink: Sync + Send {
    fn write_log(&self, record: &log::Record) -> eyre::Result<()>;
    fn flush(&self);
}

pub struct DefaultFormatter {
    use_ansi: bool,
}

impl DefaultFormatter {
    fn timestamp(&self) -> String {
        let color = if self.use_ansi { "\x1b[0;90m" } else { "" };
        let time = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        format!("{}[{}]{}", color, time, self.reset())
    }

    fn format_level(&self, level: log::Level) -> &str {
        if self.use_ansi {
            match level {
                log::Level::Error => "\x1b[0;31mERR\x1b[0m",
                log::Level::Warn => "\x1b[0;33mWRN\x1b[0m",
                log::Level::Info => "\x1b[0;32mINF\x1b[0m",
                log::Level::Debug => "\x1b[0;34mDEB\x1b[0m",
                log::Level::Trace => "\x1b[0;37mTRC\x1b[0m",
            }
        } else {
            match level {
                log::Level::Error => "ERR",
                log::Level::Warn => "WRN",
                log::Level::Info => "INF",
                log::Level::Debug => "DEB",
                log::Level::Trace => "TRC",
            }
        }
    }

    fn reset(&self) -> &str {
        if self.use_ansi {
            "\x1b[0m"
        } else {
            ""
        }
    }
}

impl LogFormatter for DefaultFormatter {
    fn format(&self, record: &log::Record) -> String {
        format!(
            "{} {}: {}",
            self.timestamp(),
            self.format_level(record.level()),
            record.args(),
        )
    }
}

pub struct StderrSink {
    handle: std::io::Stderr,
    formatter: Box<dyn LogFormatter>,
}

impl LogSink for StderrSink {
    fn write_log(&self, record: &log::Record) -> eyre::Result<()> {
        let mut writer = self.handle.lock();

        writeln!(writer, "{}", self.formatter.format(record))?;
        writer.flush().context("Can't flush stderr")
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

pub struct NullSink {}

impl LogSink for NullSink {
    fn write_log(&self, _record: &log::Record) -> eyre::Result<()> {
        Ok(())
    }

    fn flush(&self) {}
}

pub struct Logger {
    filter: LevelFilter,
    sink: Box<dyn LogSink>,
}

impl Logger {
    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.target() == "logd" && self.filter >= metadata.level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            // A diagnostics write failure is not worth taking a request down
            // for, and there is nowhere left to report it anyway.
            let _ = self.sink.write_log(record);
        }
    }

    fn flush(&self) {
        self.sink.flush()
    }
}

enum SinkKind {
    Null,
    Stderr,
}

pub struct Builder {
    filter: LevelFilter,
    sink: SinkKind,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            filter: LevelFilter::Off,
            sink: SinkKind::Null,
        }
    }

    pub fn with_level(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn with_stderr_sink(self) -> Self {
        Self {
            sink: SinkKind::Stderr,
            ..self
        }
    }

    pub fn build(self) -> Logger {
        let sink: Box<dyn LogSink> = match self.sink {
            SinkKind::Null => Box::new(NullSink {}),
            SinkKind::Stderr => Box::new(StderrSink {
                handle: std::io::stderr(),
                formatter: Box::new(DefaultFormatter {
                    use_ansi: std::io::stderr().is_terminal(),
                }),
            }),
        };

        Logger {
            filter: self.filter,
            sink,
        }
    }
}
