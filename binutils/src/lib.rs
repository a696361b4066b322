//! Helpers shared by the command line tools of this workspace.

pub use clap;
pub use clap_verbosity_flag as verbose;

use std::{io::Write, sync::Mutex};

/// Color scheme of the help message.
pub fn get_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Effects};

    clap::builder::Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Install the global tracing subscriber.
///
/// Events up to `level` are printed to stderr. If `file` is given, events are
/// written to it as JSON lines instead. Calling this more than once keeps the
/// first subscriber.
pub fn logging_setup<W>(level: &tracing::Level, file: Option<W>)
where
    W: Write + Send + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false);

    let r = match file {
        Some(file) => builder
            .json()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if r.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
