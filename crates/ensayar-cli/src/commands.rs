//! Command-line argument definitions

use crate::config::ColorChoice;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ensayar::Resolution;
use std::path::PathBuf;

/// Top-level CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "ensayador",
    version,
    about = "In-engine UI test automation runner"
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the registered UI tests
    Run(RunArgs),

    /// List discovered test methods
    List(ListArgs),

    /// Show the discovered test tree
    Tree(TreeArgs),
}

/// Color argument for clap
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ColorArg {
    /// Detect terminal
    #[default]
    Auto,
    /// Force colors on
    Always,
    /// Force colors off
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Arguments for `ensayador run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run leaves selected in the loaded UI state snapshot
    #[arg(long)]
    pub selected: bool,

    /// Only run smoke-tagged tests
    #[arg(long)]
    pub smoke: bool,

    /// Only run tests whose full name contains this substring
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Repeat the whole selection N times
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Simulated frames per second
    #[arg(long, default_value_t = ensayar::DEFAULT_FPS)]
    pub fps: u32,

    /// Only run tests runnable at this resolution (WxH, e.g. 1920x1080)
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<Resolution>,

    /// Abort the run after this many frames
    #[arg(long, default_value_t = 3_600_000)]
    pub max_frames: u64,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Load selection/openness from this snapshot and save results back
    #[arg(long)]
    pub ui_state: Option<PathBuf>,

    /// Root node name for the discovered tree
    #[arg(long)]
    pub root: Option<String>,
}

/// Arguments for `ensayador list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list smoke-tagged tests
    #[arg(long)]
    pub smoke: bool,

    /// Root node name for the discovered tree
    #[arg(long)]
    pub root: Option<String>,
}

/// Arguments for `ensayador tree`
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Load selection/openness from this snapshot before rendering
    #[arg(long)]
    pub ui_state: Option<PathBuf>,

    /// Root node name for the discovered tree
    #[arg(long)]
    pub root: Option<String>,
}

/// Parse a `WIDTHxHEIGHT` resolution argument
fn parse_resolution(raw: &str) -> Result<Resolution, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("resolution must be non-zero, got '{raw}'"));
    }
    Ok(Resolution::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "ensayador",
            "run",
            "--smoke",
            "--repeat",
            "3",
            "--fps",
            "30",
            "--filter",
            "Menu",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.smoke);
                assert_eq!(args.repeat, 3);
                assert_eq!(args.fps, 30);
                assert_eq!(args.filter.as_deref(), Some("Menu"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_resolution_argument() {
        let cli =
            Cli::try_parse_from(["ensayador", "run", "--resolution", "1920x1080"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.resolution, Some(Resolution::new(1920, 1080)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_resolution_rejects_garbage() {
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("x1080").is_err());
        assert!(parse_resolution("0x600").is_err());
        assert!(parse_resolution("800X600").is_ok());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["ensayador", "-vv", "--color", "never", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorArg::Never));
    }
}
