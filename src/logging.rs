use log::{LevelFilter, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::error::Error;

/// Log target carrying one record per minifier run.
pub const RUN_TARGET: &str = "bash_minifier::runs";

/// Run records are appended here when `[logging] record_runs` is set.
pub const RUN_LOG_PATH: &str = "~/.local/share/bash-minifier/runs.log";

/// Parse a configured level name, falling back to `warn`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Warn)
}

/// Raise `base` by one level per `-v`, saturating at `trace`.
pub fn raise(base: LevelFilter, verbosity: u8) -> LevelFilter {
    const ORDER: [LevelFilter; 6] = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let start = ORDER.iter().position(|l| *l == base).unwrap_or(2);
    ORDER[(start + verbosity as usize).min(ORDER.len() - 1)]
}

/// Install the stderr logger, plus the run log file when `record_runs` is set.
/// Best-effort: a second call or an unopenable run log is silently ignored.
pub fn init(level: LevelFilter, record_runs: bool) {
    let term_config = ConfigBuilder::new()
        .add_filter_ignore_str(RUN_TARGET)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        term_config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if record_runs && let Some(file) = open_run_log() {
        let file_config = ConfigBuilder::new()
            .add_filter_allow_str(RUN_TARGET)
            .set_time_format_rfc3339()
            .build();
        loggers.push(WriteLogger::new(LevelFilter::Info, file_config, file));
    }

    let _ = CombinedLogger::init(loggers);
}

fn open_run_log() -> Option<std::fs::File> {
    let path = shellexpand::tilde(RUN_LOG_PATH);
    let path = std::path::Path::new(&*path);
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}

/// Emit the record for one run: source name, input bytes, output bytes and
/// outcome, tab-separated.
pub fn log_run(source: &str, input_bytes: usize, result: &Result<String, Error>) {
    info!(target: RUN_TARGET, "{}", run_record(source, input_bytes, result));
}

fn run_record(source: &str, input_bytes: usize, result: &Result<String, Error>) -> String {
    // Compact single-line outcome for the log
    let (output_bytes, outcome) = match result {
        Ok(minified) => (minified.len(), "ok".to_string()),
        Err(e) => (0, e.to_string().replace('\n', "; ")),
    };
    format!("{source}\t{input_bytes}\t{output_bytes}\t{outcome}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Marker, SyntaxError};

    #[test]
    fn level_names() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("TRACE"), LevelFilter::Trace);
        assert_eq!(parse_level("loud"), LevelFilter::Warn);
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(raise(LevelFilter::Warn, 0), LevelFilter::Warn);
        assert_eq!(raise(LevelFilter::Warn, 1), LevelFilter::Info);
        assert_eq!(raise(LevelFilter::Warn, 2), LevelFilter::Debug);
        assert_eq!(raise(LevelFilter::Warn, 9), LevelFilter::Trace);
        assert_eq!(raise(LevelFilter::Off, 1), LevelFilter::Error);
    }

    #[test]
    fn record_for_success() {
        let result = Ok("echo a;echo b".to_string());
        assert_eq!(run_record("run.sh", 20, &result), "run.sh\t20\t13\tok");
    }

    #[test]
    fn record_for_failure() {
        let result = Err(Error::from(SyntaxError::UnterminatedContext {
            marker: Marker::SingleQuote,
            line: 1,
            delimiter: None,
        }));
        let record = run_record("<stdin>", 9, &result);
        assert!(record.starts_with("<stdin>\t9\t0\tunterminated"));
    }
}
