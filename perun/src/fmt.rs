//! Log line format for the terminal: a coloured level prefix and the message.

use owo_colors::OwoColorize as _;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

pub struct PrefixFormatter;

impl<S, N> FormatEvent<S, N> for PrefixFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        match *event.metadata().level() {
            Level::ERROR => write!(writer, "{} ", "Error:".red().bold())?,
            Level::WARN => write!(writer, "{} ", "Warning:".yellow().bold())?,
            Level::INFO => write!(writer, "{} ", "Info:".blue().bold())?,
            Level::DEBUG => write!(writer, "{} ", "Debug:".dimmed())?,
            _ => write!(writer, "{} ", "Trace:".dimmed())?,
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
