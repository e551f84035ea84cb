use crate::utils::Result;
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="juliet",
          author="Armin Töpfer <atoepfer@pacificbiosciences.com>",
          version=&**FULL_VERSION,
          about="Minimal minor variant caller",
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) 2004-{}     Pacific Biosciences of California, Inc.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{author}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Call minor amino-acid variants")]
    Call(CallArgs),
    #[clap(about = "Call minor variants and phase them into haplotypes")]
    Phase(PhaseArgs),
    #[clap(about = "Estimate sequencing error rates")]
    Error(ErrorArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("call")))]
#[command(arg_required_else_help(true))]
pub struct CallArgs {
    #[clap(required = true)]
    #[clap(help = "Aligned BAM input files, one batch each")]
    #[clap(value_name = "BAM")]
    #[arg(value_parser = check_file_exists)]
    pub inputs: Vec<PathBuf>,

    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files; defaults to the input file stem")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: Option<String>,

    #[clap(short = 'r')]
    #[clap(long = "region")]
    #[clap(help = "Clip reads to this reference region (1-based START-END)")]
    #[clap(value_name = "REGION")]
    pub region: Option<String>,

    #[clap(short = 'c')]
    #[clap(long = "config")]
    #[clap(help = "Target config: JSON file, JSON literal, or preset tag like <HIV>")]
    #[clap(value_name = "CONFIG")]
    pub config: Option<String>,

    #[clap(short = 's')]
    #[clap(long = "sub")]
    #[clap(help = "Substitution error rate; overrides the chemistry lookup together with --del")]
    #[clap(value_name = "RATE")]
    #[arg(value_parser = ensure_unit_float)]
    pub substitution_rate: Option<f64>,

    #[clap(short = 'd')]
    #[clap(long = "del")]
    #[clap(help = "Deletion error rate; overrides the chemistry lookup together with --sub")]
    #[clap(value_name = "RATE")]
    #[arg(value_parser = ensure_unit_float)]
    pub deletion_rate: Option<f64>,

    #[clap(help_heading("Quality filtering"))]
    #[clap(long = "sub-qv")]
    #[clap(value_name = "QV")]
    #[clap(help = "Minimum substitution quality value per base")]
    #[clap(default_value = "42")]
    pub sub_qv: u8,

    #[clap(help_heading("Quality filtering"))]
    #[clap(long = "qual-qv")]
    #[clap(value_name = "QV")]
    #[clap(help = "Minimum call quality value per base")]
    pub qual_qv: Option<u8>,

    #[clap(help_heading("Quality filtering"))]
    #[clap(long = "del-qv")]
    #[clap(value_name = "QV")]
    #[clap(help = "Minimum deletion quality value per base")]
    pub del_qv: Option<u8>,

    #[clap(help_heading("Quality filtering"))]
    #[clap(long = "ins-qv")]
    #[clap(value_name = "QV")]
    #[clap(help = "Minimum insertion quality value per base")]
    pub ins_qv: Option<u8>,

    #[clap(long = "save-msa")]
    #[clap(help = "Save the per-column counts used for calling after QV filtering")]
    pub save_msa: bool,

    #[clap(long = "drm-only")]
    #[clap(help = "Only report variants on known drug-resistance positions")]
    pub drm_only: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "debug")]
    #[clap(help = "Report every tested codon regardless of significance")]
    pub debug: bool,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("phase")))]
#[command(arg_required_else_help(true))]
pub struct PhaseArgs {
    #[clap(flatten)]
    pub call: CallArgs,

    #[clap(long = "no-merge-outliers")]
    #[clap(help = "Do not collapse outlier clusters onto haplotypes")]
    pub no_merge_outliers: bool,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("error")))]
#[command(arg_required_else_help(true))]
pub struct ErrorArgs {
    #[clap(required = true)]
    #[clap(help = "Aligned BAM input files, one batch each")]
    #[clap(value_name = "BAM")]
    #[arg(value_parser = check_file_exists)]
    pub inputs: Vec<PathBuf>,

    #[clap(short = 'r')]
    #[clap(long = "region")]
    #[clap(help = "Clip reads to this reference region (1-based START-END)")]
    #[clap(value_name = "REGION")]
    pub region: Option<String>,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}
