use anyhow::bail;
use structopt::StructOpt;

/// Collect console configuration into a struct.
pub fn from_args() -> anyhow::Result<ConsoleVars> {
    ConsoleVars::from_impl(ConsoleVarsImpl::from_args())
}

/// Same as [`from_args`], but parse from an explicit argument list.
pub fn from_iter<I>(args: I) -> anyhow::Result<ConsoleVars>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    ConsoleVars::from_impl(ConsoleVarsImpl::from_iter_safe(args)?)
}

/// Parse a log level name.
pub fn parse_level(level: &str) -> anyhow::Result<log::LevelFilter> {
    Ok(match level.to_lowercase().trim() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => bail!("Unknown log level {:?}!", level),
    })
}

/// Console variables collect from console commands.
#[derive(Clone, Debug)]
pub struct ConsoleVars {
    pub level: log::LevelFilter,
    pub log_file: Option<std::path::PathBuf>,

    pub width: u32,
    pub height: u32,
    pub msaa: u32,
    pub frames: u32,

    pub culling: bool,
    pub async_compute: bool,
}

impl ConsoleVars {
    fn from_impl(console_var: ConsoleVarsImpl) -> anyhow::Result<Self> {
        if !matches!(console_var.msaa, 1 | 2 | 4 | 8) {
            bail!("MSAA sample count must be one of 1, 2, 4 or 8, got {}", console_var.msaa);
        }
        if console_var.width == 0 || console_var.height == 0 {
            bail!("Rendering resolution must not be zero, got {}x{}", console_var.width, console_var.height);
        }

        Ok(Self {
            level: parse_level(&console_var.level)?,
            log_file: console_var.log_file,
            width: console_var.width,
            height: console_var.height,
            msaa: console_var.msaa,
            frames: console_var.frames,
            culling: !console_var.no_culling,
            async_compute: !console_var.no_async_compute,
        })
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "raven engine", about = "A small game engine.")]
struct ConsoleVarsImpl {
    /// log level (please choose from trace, debug, info, warn, error, off)
    #[structopt(short, long, default_value = "debug")]
    level: String,

    /// also write the log into this file
    #[structopt(long, parse(from_os_str))]
    log_file: Option<std::path::PathBuf>,

    /// rendering width in pixels
    #[structopt(long, default_value = "1920")]
    width: u32,

    /// rendering height in pixels
    #[structopt(long, default_value = "1080")]
    height: u32,

    /// msaa sample count (1, 2, 4 or 8)
    #[structopt(long, default_value = "1")]
    msaa: u32,

    /// number of frames to run
    #[structopt(long, default_value = "3")]
    frames: u32,

    /// keep every declared pass, even those whose outputs are never used
    #[structopt(long)]
    no_culling: bool,

    /// run every pass on the graphics queue
    #[structopt(long)]
    no_async_compute: bool,
}
