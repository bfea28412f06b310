use clap::{Parser, Subcommand};
use retouch::batch::{self, BatchEvent, BatchOptions};
use retouch::codec::{ImageCodec, RustCodec};
use retouch::config::{self, AppConfig};
use retouch::editing::{Operation, Pipeline, ValidationError, ValidationReason, execute};
use retouch::output;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn version_string() -> &'static str {
    let on_tag = env!("RETOUCH_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("RETOUCH_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Deterministic local image editing: filters, pipelines, presets")]
#[command(long_about = "\
Deterministic local image editing: filters, pipelines, presets

Every edit is an ordered pipeline of operations. Each operation is a kind
plus JSON parameters, validated against the kind's schema before anything
runs:

  retouch apply photo.jpg -o out.png \\
      --op 'crop:{\"x\": 10, \"y\": 10, \"w\": 800, \"h\": 600}' \\
      --op 'sepia:{\"intensity\": 0.6}' \\
      --op vignette

Pipelines can also be read from a JSON file (a list of {\"kind\", \"params\"}
steps), or instantiated from a named preset with variables:

  retouch preset thumbnail photo.jpg -o thumb.png --var width=320 --var height=240
  retouch batch photos/ out/ --preset vintage --var seed=7

Run 'retouch ops' for every operation and its parameters, 'retouch presets'
for the preset library, and 'retouch gen-config' for a documented retouch.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (optional; defaults apply when missing)
    #[arg(long, default_value = "retouch.toml", global = true)]
    config: PathBuf,

    /// Preset library JSON, merged over the built-in presets
    #[arg(long, global = true)]
    presets: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply operations to one image
    Apply {
        input: PathBuf,
        /// Output file; the extension selects the format
        #[arg(short, long)]
        output: PathBuf,
        /// An operation as KIND or KIND:JSON, repeatable, applied in order
        #[arg(long = "op", value_name = "KIND[:JSON]")]
        ops: Vec<String>,
        /// JSON pipeline file, run before any --op
        #[arg(long)]
        pipeline: Option<PathBuf>,
    },
    /// Apply a named preset to one image
    Preset {
        name: String,
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Preset variable as NAME=VALUE (VALUE is JSON, or a plain string)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// Apply a preset or pipeline to every image under a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[arg(long, conflicts_with = "pipeline", required_unless_present = "pipeline")]
        preset: Option<String>,
        #[arg(long = "var", value_name = "NAME=VALUE", requires = "preset")]
        vars: Vec<String>,
        #[arg(long)]
        pipeline: Option<PathBuf>,
        /// Output format (overrides [output] format)
        #[arg(long)]
        format: Option<String>,
        /// Replace existing outputs
        #[arg(long)]
        overwrite: bool,
        /// Stop starting new images after the first failure
        #[arg(long)]
        fail_fast: bool,
    },
    /// List every operation with its parameters
    Ops,
    /// List available presets
    Presets,
    /// Print a stock retouch.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let app_config = match cli.command {
        Command::GenConfig => AppConfig::default(),
        _ => config::load_config(&cli.config)?,
    };
    init_logging(&app_config.logging.level, cli.verbose);
    let codec = RustCodec::new().with_jpeg_quality(app_config.output.quality);
    let preset_file = cli.presets.clone().or(app_config.presets.file.clone());

    match cli.command {
        Command::Apply {
            input,
            output,
            ops,
            pipeline,
        } => {
            let mut steps = match pipeline {
                Some(path) => Pipeline::from_json_str(&std::fs::read_to_string(path)?)?,
                None => Pipeline::default(),
            };
            for arg in &ops {
                steps.push(parse_op_arg(arg)?);
            }
            edit_one(&codec, &input, &output, &steps)?;
        }
        Command::Preset {
            name,
            input,
            output,
            vars,
        } => {
            let library = config::load_preset_library(preset_file.as_deref())?;
            let values = parse_vars(&vars)?;
            let steps = library.get(&name)?.instantiate(&values)?;
            edit_one(&codec, &input, &output, &steps)?;
        }
        Command::Batch {
            input_dir,
            output_dir,
            preset,
            vars,
            pipeline,
            format,
            overwrite,
            fail_fast,
        } => {
            let steps = match (preset, pipeline) {
                (Some(name), _) => {
                    let library = config::load_preset_library(preset_file.as_deref())?;
                    library.get(&name)?.instantiate(&parse_vars(&vars)?)?
                }
                (None, Some(path)) => Pipeline::from_json_str(&std::fs::read_to_string(path)?)?,
                (None, None) => return Err("batch needs --preset or --pipeline".into()),
            };
            let options = batch_options(&app_config, format, overwrite)?;
            let summary = run_batch(&codec, &input_dir, &output_dir, &steps, &options, fail_fast)?;
            output::print_summary(&summary);
            if summary.failed() > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ops => output::print_registry(),
        Command::Presets => {
            let library = config::load_preset_library(preset_file.as_deref())?;
            output::print_presets(&library);
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(ExitCode::SUCCESS)
}

/// `-v`/`-vv` beat `RUST_LOG`, which beats `[logging] level`.
fn init_logging(level: &str, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn edit_one(
    codec: &impl ImageCodec,
    input: &Path,
    output: &Path,
    pipeline: &Pipeline,
) -> CliResult<()> {
    let before = codec.decode(input)?;
    let after = execute(&before, pipeline)?;
    codec.encode(&after, output)?;
    output::print_edit(input, &before, output, &after, pipeline);
    Ok(())
}

fn batch_options(
    app_config: &AppConfig,
    format: Option<String>,
    overwrite: bool,
) -> CliResult<BatchOptions> {
    let format = format.unwrap_or_else(|| app_config.output.format.clone());
    retouch::codec::format_for_extension(&format)?;
    Ok(BatchOptions {
        format,
        suffix: app_config.output.suffix.clone(),
        overwrite: overwrite || app_config.output.overwrite,
        threads: config::effective_threads(&app_config.processing),
    })
}

fn run_batch(
    codec: &impl ImageCodec,
    input_dir: &Path,
    output_dir: &Path,
    pipeline: &Pipeline,
    options: &BatchOptions,
    fail_fast: bool,
) -> CliResult<batch::BatchSummary> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = {
        let cancel = Arc::clone(&cancel);
        std::thread::spawn(move || {
            for event in rx {
                if fail_fast && matches!(event, BatchEvent::Failed { .. }) {
                    cancel.store(true, Ordering::SeqCst);
                }
                for line in output::format_batch_event(&event) {
                    println!("{}", line);
                }
            }
        })
    };
    let summary = batch::run(
        codec,
        input_dir,
        output_dir,
        pipeline,
        options,
        Some(tx),
        &cancel,
    )?;
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    Ok(summary)
}

/// `KIND` or `KIND:JSON`, e.g. `sepia` or `crop:{"w": 10, "h": 10}`.
fn parse_op_arg(arg: &str) -> Result<Operation, ValidationError> {
    match arg.split_once(':') {
        None => Operation::parse(arg, &Value::Null),
        Some((kind, json)) => {
            let params: Value = serde_json::from_str(json).map_err(|e| {
                ValidationError::new(kind, "params", ValidationReason::Invalid(e.to_string()))
            })?;
            Operation::parse(kind, &params)
        }
    }
}

/// `NAME=VALUE` pairs. VALUE is read as JSON when it parses, so `width=320`
/// is a number and `tint=#ff0000` a string.
fn parse_vars(args: &[String]) -> Result<BTreeMap<String, Value>, String> {
    args.iter()
        .map(|arg| {
            let (name, raw) = arg
                .split_once('=')
                .ok_or_else(|| format!("--var '{arg}' must be NAME=VALUE"))?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use retouch::editing::OperationKind;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn op_arg_without_params_uses_defaults() {
        let op = parse_op_arg("vignette").unwrap();
        assert_eq!(op.kind(), OperationKind::Vignette);
    }

    #[test]
    fn op_arg_with_json_params() {
        let op = parse_op_arg(r#"crop:{"x": 1, "w": 5, "h": 6}"#).unwrap();
        assert_eq!(op.params().int("w"), Ok(5));
    }

    #[test]
    fn op_arg_bad_json_names_the_kind() {
        let err = parse_op_arg("crop:{w: 5}").unwrap_err();
        assert_eq!(err.context, "crop");
        assert_eq!(err.param, "params");
    }

    #[test]
    fn vars_parse_json_or_fall_back_to_string() {
        let vars = parse_vars(&[
            "width=320".to_string(),
            "tint=#ff0000".to_string(),
            "on=true".to_string(),
        ])
        .unwrap();
        assert_eq!(vars["width"], json!(320));
        assert_eq!(vars["tint"], json!("#ff0000"));
        assert_eq!(vars["on"], json!(true));
        assert!(parse_vars(&["nope".to_string()]).is_err());
    }

    #[test]
    fn batch_requires_a_pipeline_source() {
        let parsed = Cli::try_parse_from(["retouch", "batch", "in", "out"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "retouch", "batch", "in", "out", "--preset", "noir", "--pipeline", "p.json",
        ]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from(["retouch", "batch", "in", "out", "--preset", "noir"]);
        assert!(parsed.is_ok());
    }
}
