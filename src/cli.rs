use crate::msi::{genotype::CallerParams, mutation::DecisionParams};
use crate::utils::Result;
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
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
#[command(name="msmut",
          version=&**FULL_VERSION,
          about="Microsatellite genotyping and tumor/normal mutation calling",
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) {}. This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
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
    #[clap(about = "Infer microsatellite alleles of a single sample")]
    Genotype(GenotypeArgs),
    #[clap(about = "Call somatic microsatellite mutations from tumor/normal histograms")]
    Call(CallArgs),
    #[clap(about = "Check a histogram file against an error model")]
    Validate(ValidateArgs),
}

/// Allele caller tuning shared by `genotype` and `call`.
#[derive(Args, Debug, Clone)]
pub struct CallerArgs {
    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-alleles")]
    #[clap(value_name = "COUNT")]
    #[clap(help = "Largest number of alleles considered per sample")]
    #[clap(default_value = "4")]
    #[arg(value_parser = at_least_one)]
    pub max_alleles: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "restarts")]
    #[clap(value_name = "COUNT")]
    #[clap(help = "Random EM restarts per model order")]
    #[clap(default_value = "10")]
    #[arg(value_parser = at_least_one)]
    pub num_restarts: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-reads")]
    #[clap(value_name = "READS")]
    #[clap(help = "A repeat length needs more than this many reads to anchor an allele")]
    #[clap(default_value = "5")]
    pub min_reads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "lrt-alpha")]
    #[clap(value_name = "ALPHA")]
    #[clap(help = "Significance level for accepting an additional allele")]
    #[clap(default_value = "0.05")]
    #[arg(value_parser = ensure_unit_float)]
    pub lrt_alpha: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-repeat-len")]
    #[clap(value_name = "LENGTH")]
    #[clap(help = "Repeat lengths at or above this are discarded")]
    #[clap(default_value = "40")]
    #[arg(value_parser = at_least_one)]
    pub max_repeat_len: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help = "Seed for the random EM restarts")]
    #[clap(default_value = "42")]
    pub seed: u64,
}

impl CallerArgs {
    pub fn caller_params(&self) -> CallerParams {
        CallerParams {
            max_alleles: self.max_alleles,
            num_restarts: self.num_restarts,
            min_reads: self.min_reads,
            lrt_alpha: self.lrt_alpha,
            max_repeat_len: self.max_repeat_len,
        }
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("genotype")))]
#[command(arg_required_else_help(true))]
pub struct GenotypeArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "histograms")]
    #[clap(help = "Repeat-length histograms (id, unit length, length:count list)")]
    #[clap(value_name = "HISTOGRAMS")]
    #[arg(value_parser = check_file_exists)]
    pub histograms_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "error-model")]
    #[clap(help = "Comma-separated table of P(observed length | true length)")]
    #[clap(value_name = "ERROR_MODEL")]
    #[arg(value_parser = check_file_exists)]
    pub error_model_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[command(flatten)]
    pub caller: CallerArgs,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("call")))]
#[command(arg_required_else_help(true))]
pub struct CallArgs {
    #[clap(required = true)]
    #[clap(short = 'n')]
    #[clap(long = "normal")]
    #[clap(help = "Repeat-length histograms of the normal sample")]
    #[clap(value_name = "NORMAL")]
    #[arg(value_parser = check_file_exists)]
    pub normal_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'u')]
    #[clap(long = "tumor")]
    #[clap(help = "Repeat-length histograms of the tumor sample, same loci in the same order")]
    #[clap(value_name = "TUMOR")]
    #[arg(value_parser = check_file_exists)]
    pub tumor_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "error-model")]
    #[clap(help = "Comma-separated table of P(observed length | true length)")]
    #[clap(value_name = "ERROR_MODEL")]
    #[arg(value_parser = check_file_exists)]
    pub error_model_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(long = "lor-threshold")]
    #[clap(value_name = "LOR")]
    #[clap(help = "AIC improvement each sample's own model must show over the other's")]
    #[clap(default_value = "1.0")]
    #[arg(value_parser = ensure_positive_float)]
    pub lor_threshold: f64,

    #[clap(long = "p-equal")]
    #[clap(value_name = "PVAL")]
    #[clap(help = "Significance level of the normal allele balance test")]
    #[clap(default_value = "0.05")]
    #[arg(value_parser = ensure_unit_float)]
    pub p_equal: f64,

    #[clap(long = "ks-threshold")]
    #[clap(value_name = "PVAL")]
    #[clap(help = "Significance level of the Kolmogorov-Smirnov confirmation")]
    #[clap(default_value = "0.05")]
    #[arg(value_parser = ensure_unit_float)]
    pub ks_threshold: f64,

    #[command(flatten)]
    pub caller: CallerArgs,
}

impl CallArgs {
    pub fn decision_params(&self) -> DecisionParams {
        DecisionParams {
            lor_threshold: self.lor_threshold,
            p_equal: self.p_equal,
            ks_threshold: self.ks_threshold,
        }
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("validate")))]
#[command(arg_required_else_help(true))]
pub struct ValidateArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "histograms")]
    #[clap(help = "Repeat-length histograms (id, unit length, length:count list)")]
    #[clap(value_name = "HISTOGRAMS")]
    #[arg(value_parser = check_file_exists)]
    pub histograms_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "error-model")]
    #[clap(help = "Comma-separated table of P(observed length | true length)")]
    #[clap(value_name = "ERROR_MODEL")]
    #[arg(value_parser = check_file_exists)]
    pub error_model_path: PathBuf,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-repeat-len")]
    #[clap(value_name = "LENGTH")]
    #[clap(help = "Repeat lengths at or above this are discarded")]
    #[clap(default_value = "40")]
    #[arg(value_parser = at_least_one)]
    pub max_repeat_len: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-reads")]
    #[clap(value_name = "READS")]
    #[clap(help = "A repeat length needs more than this many reads to anchor an allele")]
    #[clap(default_value = "5")]
    pub min_reads: usize,
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

fn at_least_one(s: &str) -> Result<usize> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid count", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("The value must be at least 1".into())
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

fn ensure_positive_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("The value must be a positive number, got: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("input.tsv");
        std::fs::write(&file, "").unwrap();
        let file = file.to_str().unwrap();
        let prefix = dir.path().join("out");

        let cli = Cli::try_parse_from([
            "msmut",
            "-vv",
            "call",
            "--normal",
            file,
            "--tumor",
            file,
            "--error-model",
            file,
            "--output-prefix",
            prefix.to_str().unwrap(),
            "--lor-threshold",
            "2.5",
            "--restarts",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.verbosity, 2);
        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.lor_threshold, 2.5);
                assert_eq!(args.p_equal, 0.05);
                assert_eq!(args.ks_threshold, 0.05);
                assert_eq!(args.num_threads, 1);
                assert_eq!(args.caller.num_restarts, 3);
                assert_eq!(args.caller.max_alleles, 4);
                assert_eq!(args.caller.seed, 42);
            }
            _ => panic!("Expected call subcommand"),
        }
    }

    #[test]
    fn validators_reject_out_of_range_values() {
        assert!(threads_in_range("0").is_err());
        assert!(at_least_one("0").is_err());
        assert!(ensure_unit_float("1.5").is_err());
        assert!(ensure_positive_float("-1").is_err());
        assert!(ensure_positive_float("0").is_err());
        assert_eq!(ensure_positive_float("0.5"), Ok(0.5));
        assert!(check_file_exists("/definitely/not/here").is_err());
        assert!(check_prefix_path("/definitely/not/here/prefix").is_err());
    }
}
