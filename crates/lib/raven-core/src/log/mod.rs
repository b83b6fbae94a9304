use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use fern::colors::{Color, ColoredLevelConfig};

pub use log::LevelFilter as LevelFilter;

lazy_static::lazy_static! {
    static ref GLOBAL_MUTE_MODULE_NAMES: HashSet<&'static str> = HashSet::from([
        // per-pass scheduling is too chatty for the console, it still goes to the log file
        "raven_rg::executing_graph",
    ]);
}

/// Log configuration.
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Also write every record into this file (truncated on startup).
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Debug,
            log_file: None,
        }
    }
}

/// Initialize log module.
pub fn init_log(config: LogConfig) -> anyhow::Result<()> {
    if let Some(dir) = config.log_file.as_ref().and_then(|file| file.parent()) {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log folder {}", dir.display()))?;
        }
    }

    setup_logger(&config).context("Failed to initialize log module!")?;

    trace!("log initialized!");
    Ok(())
}

fn setup_logger(config: &LogConfig) -> anyhow::Result<()> {
    // setup colors
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Magenta)
        .info(Color::Cyan)
        .warn(Color::Yellow)
        .error(Color::Red);

    // standard output dispatch, for trace, debug and info messages.
    let stdout = fern::Dispatch::new()
        .filter(|meta| {
            meta.level() >= log::Level::Info &&
            GLOBAL_MUTE_MODULE_NAMES.get(meta.target()).is_none()
        })
        .chain(std::io::stdout());

    // standard error dispatch, for warn and error messages.
    let stderr = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .filter(|meta| {
            GLOBAL_MUTE_MODULE_NAMES.get(meta.target()).is_none()
        })
        .chain(std::io::stderr());

    // console output with the colors
    let console_output = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .chain(stdout)
        .chain(stderr);

    let mut dispatch = fern::Dispatch::new()
        .level(config.level) // setup base log level from user
        .chain(console_output);

    if let Some(file) = &config.log_file {
        let file_output = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}[{}][{}] {}",
                    chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                    record.target(),
                    record.level(),
                    message
                ))
            })
            .chain(std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(file)?);

        dispatch = dispatch.chain(file_output);
    }

    // final apply to all the dispatches
    dispatch.apply()?;

    Ok(())
}
