pub mod cache;
pub mod cli;
pub mod config;
pub mod filter;
pub mod report;

use anyhow::Context;
use std::io::{self, BufRead};
use std::process::ExitCode;

pub use cache::ContextCache;
pub use cli::{ColorMode, Commands, OutputFormat, cli_parse, init_logging};
pub use config::{FilterConfig, load_config, spec_override};
pub use filter::{
    DEFAULT_SPEC, Decision, DecisionReason, FilterError, FilterSpec, FilterSpecError, Mode, Rule,
    apply, evaluate,
};

/// Target for every log record emitted by this crate
pub(crate) const LOG_TARGET: &str = "unmarshal_filter";

/// Exit code of `check` when at least one class was rejected
const REJECTED_EXIT_CODE: u8 = 1;

fn read_classes(input: impl BufRead) -> io::Result<Vec<String>> {
    let mut classes = Vec::new();
    for line in input.lines() {
        let line = line?;
        let class_name = line.trim();
        if !class_name.is_empty() && !class_name.starts_with('#') {
            classes.push(class_name.to_string());
        }
    }
    Ok(classes)
}

pub fn run() -> anyhow::Result<ExitCode> {
    let cli = cli_parse();
    init_logging(cli.log_level);

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    if let Commands::DefaultSpec = cli.command {
        for element in DEFAULT_SPEC.split(';') {
            println!("{element}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(cli.config.as_deref())
        .context("Failed to load config")?
        .with_override(spec_override(cli.spec.clone()).context("Failed to read spec override")?);
    let spec = config
        .compile()
        .with_context(|| format!("Invalid filter spec \"{}\"", config.effective_spec()))?;
    let is_default = config.is_default_spec();

    match &cli.command {
        Commands::Check { classes } => {
            let classes = if classes.is_empty() {
                read_classes(io::stdin().lock()).context("Failed to read class names from stdin")?
            } else {
                classes.clone()
            };

            filter::print_filter_warnings(&spec);

            let decisions = classes
                .iter()
                .map(|class_name| evaluate(&spec, class_name))
                .collect::<Result<Vec<_>, _>>()
                .context("Cannot classify class names")?;

            match cli.format {
                OutputFormat::Text => print!("{}", report::format_decisions_text(&decisions)),
                OutputFormat::Json => println!("{}", report::format_decisions_json(&spec, &decisions)),
            }

            if decisions.iter().any(|d| !d.admitted) {
                return Ok(ExitCode::from(REJECTED_EXIT_CODE));
            }
        }
        Commands::Explain => match cli.format {
            OutputFormat::Text => print!("{}", report::format_explain_text(&spec, is_default)),
            OutputFormat::Json => println!("{}", report::format_explain_json(&spec, is_default)),
        },
        Commands::DefaultSpec => {}
    }

    Ok(ExitCode::SUCCESS)
}
