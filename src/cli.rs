use crate::config::{LayoutConfig, SpacingOptions, load_config};
use crate::host::MemoryHost;
use crate::ir::DiagramInfo;
use crate::layout::optimize_with_layout;
use crate::layout_dump::write_layout_dump;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bdlayout", version, about = "Layered layout for block diagrams")]
pub struct Args {
    /// Graph snapshot (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    #[arg(long = "action", value_enum, default_value = "optimize")]
    pub action: Action,

    #[arg(long = "layer-spacing")]
    pub layer_spacing: Option<f32>,

    #[arg(long = "block-spacing")]
    pub block_spacing: Option<f32>,

    #[arg(long = "min-width")]
    pub min_width: Option<f32>,

    #[arg(long = "min-height")]
    pub min_height: Option<f32>,

    /// Maximum crossing reduction passes
    #[arg(long = "iterations")]
    pub iterations: Option<usize>,

    /// Write the updated snapshot instead of the layout dump
    #[arg(long = "write-snapshot")]
    pub write_snapshot: bool,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Lay out the diagram and report the result
    Optimize,
    /// Report block count, line count and current bounds
    Info,
}

impl Args {
    fn spacing(&self) -> SpacingOptions {
        SpacingOptions {
            layer_spacing: self.layer_spacing,
            block_spacing: self.block_spacing,
            min_width: self.min_width,
            min_height: self.min_height,
            max_crossing_iterations: self.iterations,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let mut host = MemoryHost::from_json(&input)?;

    match args.action {
        Action::Info => {
            let info = DiagramInfo::from_snapshot(host.snapshot());
            write_json(args.output.as_deref(), &info)
        }
        Action::Optimize => run_optimize(&args, &config, &mut host),
    }
}

fn run_optimize(args: &Args, config: &LayoutConfig, host: &mut MemoryHost) -> Result<()> {
    let spacing = args.spacing();
    let (layout, result) = optimize_with_layout(host, config, Some(&spacing))?;

    if args.write_snapshot {
        return write_json(args.output.as_deref(), host.snapshot());
    }

    write_layout_dump(args.output.as_deref(), &layout, Some(&result))?;
    if !result.success {
        return Err(anyhow::anyhow!(
            "{} entities could not be applied",
            result.failed_entities.len()
        ));
    }
    Ok(())
}

fn init_logging(args: &Args) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_json<T: serde::Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, json + "\n")?,
        None => println!("{json}"),
    }
    Ok(())
}
