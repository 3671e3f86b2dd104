use core::fmt as core_fmt;

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// Our own modules log under a shorter target.
const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

struct Palette {
    reset: &'static str,
    bold: &'static str,
    dim: &'static str,
}

const ANSI: Palette = Palette {
    reset: "\x1b[0m",
    bold: "\x1b[1m",
    dim: "\x1b[2m",
};

const PLAIN: Palette = Palette {
    reset: "",
    bold: "",
    dim: "",
};

/// `[timestamp] LEVEL target: line > message`
pub struct CustomFormatter {
    use_ansi: bool,
}

impl CustomFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }

    fn palette(&self) -> &'static Palette {
        if self.use_ansi { &ANSI } else { &PLAIN }
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_PREFIX).unwrap_or(target)
}

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let Palette { reset, bold, dim } = self.palette();

        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let timestamp = now
            .format(TIMESTAMP)
            .unwrap_or_else(|_| "unknown time".to_string());
        write!(writer, "{dim}[{timestamp}]{reset} ")?;

        let metadata = event.metadata();
        let level = metadata.level();
        let color = if self.use_ansi { level_color(level) } else { "" };
        write!(writer, "{color}{bold}{:<5}{reset} ", level.as_str())?;

        match metadata.line() {
            Some(line) => write!(writer, "{dim}{}: {line}{reset} > ", short_target(metadata.target()))?,
            None => write!(writer, "{dim}{}{reset} > ", short_target(metadata.target()))?,
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer, "{reset}")
    }
}
