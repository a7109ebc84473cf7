use clap::{Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "cdplay",
    version = VERSION,
    about = "Play an audio CD track, controlled by commands on stdin",
    arg_required_else_help = true
)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one track; reads pause/resume/stop/status/seek N/jump N from stdin
    Play(PlayArgs),

    /// Print disc metadata (TOC plus CDDB lookup) as JSON
    Info(InfoArgs),
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Track number to play
    #[arg(default_value_t = 1)]
    pub track: u32,

    /// Read correction: 0 = off, 1 = verify and skip bad sectors, 2 = verify, never skip
    #[arg(short, long, default_value_t = 0)]
    pub correction: u8,

    /// CD drive device path (libcdio default drive when omitted)
    #[arg(short = 'i', long)]
    pub drive: Option<String>,

    /// Output device by substring match
    #[arg(short = 'o', long)]
    pub device: Option<String>,

    /// Drive read speed
    #[arg(short, long, default_value_t = 2)]
    pub speed: i32,

    /// Emit status lines as JSON
    #[arg(long)]
    pub json: bool,

    /// Flow-control target: max unplayed audio in the output (ms)
    #[arg(long, default_value_t = 250)]
    pub max_buffer_ms: u64,

    /// Sleep between output backlog checks (ms)
    #[arg(long, default_value_t = 5)]
    pub poll_interval_ms: u64,

    /// Backlog checks without progress before the wait gives up
    #[arg(long, default_value_t = 200)]
    pub stall_polls: u32,

    /// Output queue capacity (ms)
    #[arg(long, default_value_t = 1000)]
    pub queue_ms: u64,

    /// Re-read attempts per sector when correction is on
    #[arg(long, default_value_t = 20)]
    pub max_retries: u32,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// CD drive device path (libcdio default drive when omitted)
    #[arg(short = 'i', long)]
    pub drive: Option<String>,

    /// CDDB HTTP endpoint
    #[arg(long, default_value = "https://gnudb.gnudb.org/~cddb/cddb.cgi")]
    pub cddb_url: String,

    /// Skip the online lookup and print TOC data only
    #[arg(long)]
    pub offline: bool,

    /// CDDB request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}
