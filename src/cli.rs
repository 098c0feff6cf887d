mod log_level;

use clap::{Parser, Subcommand, ValueEnum};
pub use log_level::{LogLevel, init_logging};
use std::path::PathBuf;

/// Check class names against an unmarshalling filter spec
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Filter spec, e.g. "com.acme.**;!com.acme.internal.*". Overrides
    /// UNMARSHAL_FILTER_SPEC and the config file; "" disables filtering
    #[arg(short, long, global = true)]
    pub spec: Option<String>,

    /// TOML config file with `spec` and `client_support_package` keys
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide whether each class name would be admitted
    Check {
        /// Fully-qualified class names; read from stdin, one per line, when omitted
        classes: Vec<String>,
    },
    /// Show the compiled rules and mode of the effective spec
    Explain,
    /// Print the built-in spec, one element per line
    DefaultSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_with_global_flags() {
        let cli = Cli::try_parse_from([
            "unmarshal-filter",
            "check",
            "a.B",
            "c.D",
            "--spec",
            "!a.B",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.spec.as_deref(), Some("!a.B"));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Check { classes } => assert_eq!(classes, vec!["a.B", "c.D"]),
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn test_empty_spec_flag_is_kept() {
        let cli = Cli::try_parse_from(["unmarshal-filter", "explain", "--spec", ""]).unwrap();
        assert_eq!(cli.spec.as_deref(), Some(""));
    }
}
