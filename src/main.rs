//! bash-minifier command-line interface.
//!
//! Reads a script from a file or stdin, minifies it with the configured
//! passes and writes the result to stdout.

use std::io::Read;
use std::process::ExitCode;

use bash_minifier::config::Config;
use bash_minifier::{Error, Pipeline, logging};
use clap::Parser;

#[derive(Parser)]
#[command(name = "bash-minifier")]
#[command(about = "Minify bash scripts without changing what they do")]
#[command(version)]
struct Cli {
    /// Script to minify (stdin when omitted)
    #[arg(value_name = "FILE", conflicts_with = "file")]
    path: Option<String>,

    /// Script to minify
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<String>,

    /// Read configuration overrides from this file instead of the user config
    #[arg(long = "config", value_name = "PATH")]
    config: Option<String>,

    /// Keep a leading `#!` line
    #[arg(long = "keep-shebang")]
    keep_shebang: bool,

    /// Check the output with tree-sitter-bash and fail if it no longer parses
    #[arg(long = "check")]
    check: bool,

    /// Leave comments in place
    #[arg(long = "no-strip-comments")]
    no_strip_comments: bool,

    /// Leave whitespace and blank lines alone
    #[arg(long = "no-normalize-whitespace")]
    no_normalize_whitespace: bool,

    /// Keep statements on separate lines
    #[arg(long = "no-join-lines")]
    no_join_lines: bool,

    /// Keep blanks around operators
    #[arg(long = "no-trim-operators")]
    no_trim_operators: bool,

    /// Print the merged configuration as TOML and exit
    #[arg(long = "dump-config")]
    dump_config: bool,

    /// Output JSON (minified, original_bytes, minified_bytes)
    #[arg(long = "json")]
    json: bool,

    /// Raise the log level; repeat for more detail
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Command-line switches override the loaded configuration.
    fn apply_to(&self, config: &mut Config) {
        if self.keep_shebang {
            config.settings.keep_shebang = true;
        }
        if self.check {
            config.settings.verify = true;
        }
        if self.no_strip_comments {
            config.passes.strip_comments = false;
        }
        if self.no_normalize_whitespace {
            config.passes.normalize_whitespace = false;
        }
        if self.no_join_lines {
            config.passes.join_lines = false;
        }
        if self.no_trim_operators {
            config.passes.trim_operators = false;
        }
    }
}

/// Read the script, returning a display name and its text.
fn read_source(path: Option<&str>) -> Result<(String, String), Error> {
    match path {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let text = std::fs::read_to_string(&*expanded).map_err(|source| Error::Io {
                path: path.to_string(),
                source,
            })?;
            Ok((path.to_string(), text))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| Error::Io {
                    path: "<stdin>".into(),
                    source,
                })?;
            Ok(("<stdin>".into(), text))
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    cli.apply_to(&mut config);

    let level = logging::raise(logging::parse_level(&config.logging.level), cli.verbose);
    logging::init(level, config.logging.record_runs);

    if cli.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let (name, source) = read_source(cli.path.as_deref().or(cli.file.as_deref()))?;
    let pipeline = Pipeline::from_config(&config);
    log::debug!("passes: {}", pipeline.pass_names().join(", "));

    let result = pipeline.apply_verified(&source);
    logging::log_run(&name, source.len(), &result);
    let minified = result?;

    if cli.json {
        let output = serde_json::json!({
            "minified": minified,
            "original_bytes": source.len(),
            "minified_bytes": minified.len(),
        });
        println!("{output}");
    } else {
        println!("{minified}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bash-minifier: {e}");
            ExitCode::FAILURE
        }
    }
}
