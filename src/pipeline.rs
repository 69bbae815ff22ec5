//! The configured sequence of passes, plus the shebang and line-ending
//! handling that wraps it.

use log::debug;

use crate::config::Config;
use crate::error::Error;
use crate::passes::{JoinLines, NormalizeWhitespace, Pass, StripComments, TrimOperators};
use crate::scan::SyntaxError;
use crate::verify;

/// Ordered list of passes built from configuration.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
    keep_shebang: bool,
    normalize_line_endings: bool,
    verify: bool,
}

impl Pipeline {
    /// All four passes, no pre- or post-processing.
    pub fn standard() -> Self {
        Self {
            passes: vec![
                Box::new(StripComments),
                Box::new(NormalizeWhitespace),
                Box::new(JoinLines),
                Box::new(TrimOperators),
            ],
            keep_shebang: false,
            normalize_line_endings: false,
            verify: false,
        }
    }

    /// Build the pipeline from configuration. Pass order is fixed; disabled
    /// passes are left out.
    pub fn from_config(config: &Config) -> Self {
        let p = &config.passes;
        let mut passes: Vec<Box<dyn Pass>> = Vec::new();
        if p.strip_comments {
            passes.push(Box::new(StripComments));
        }
        if p.normalize_whitespace {
            passes.push(Box::new(NormalizeWhitespace));
        }
        if p.join_lines {
            passes.push(Box::new(JoinLines));
        }
        if p.trim_operators {
            passes.push(Box::new(TrimOperators));
        }

        Self {
            passes,
            keep_shebang: config.settings.keep_shebang,
            normalize_line_endings: config.settings.normalize_line_endings,
            verify: config.settings.verify,
        }
    }

    /// Names of the passes that will run, in order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over `source`.
    pub fn apply(&self, source: &str) -> Result<String, SyntaxError> {
        let normalized;
        let text = if self.normalize_line_endings {
            normalized = source.replace('\r', "");
            normalized.as_str()
        } else {
            source
        };

        let (shebang, body) = if self.keep_shebang {
            split_shebang(text)
        } else {
            (None, text)
        };

        let mut current = body.to_string();
        for pass in &self.passes {
            let next = pass.run(&current)?;
            debug!(
                "{}: {} -> {} bytes",
                pass.name(),
                current.len(),
                next.len()
            );
            current = next;
        }

        Ok(match shebang {
            Some(line) if current.is_empty() => line.to_string(),
            Some(line) => format!("{line}\n{current}"),
            None => current,
        })
    }

    /// Like [`apply`](Self::apply), then check the output with tree-sitter
    /// when verification is enabled.
    pub fn apply_verified(&self, source: &str) -> Result<String, Error> {
        let minified = self.apply(source)?;
        if self.verify {
            verify::check(source, &minified)?;
        }
        Ok(minified)
    }
}

/// Split a leading `#!` line from the rest of the text.
fn split_shebang(text: &str) -> (Option<&str>, &str) {
    if !text.starts_with("#!") {
        return (None, text);
    }
    match text.split_once('\n') {
        Some((line, rest)) => (Some(line), rest),
        None => (Some(text), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_runs_all_passes_in_order() {
        assert_eq!(
            Pipeline::standard().pass_names(),
            vec![
                "strip_comments",
                "normalize_whitespace",
                "join_lines",
                "trim_operators"
            ]
        );
    }

    #[test]
    fn default_config_matches_standard() {
        let pipeline = Pipeline::from_config(&Config::default_config());
        assert_eq!(pipeline.pass_names(), Pipeline::standard().pass_names());
        assert!(!pipeline.keep_shebang);
        assert!(!pipeline.verify);
    }

    #[test]
    fn disabled_pass_is_skipped() {
        let mut config = Config::default_config();
        config.passes.join_lines = false;
        let pipeline = Pipeline::from_config(&config);
        assert!(!pipeline.pass_names().contains(&"join_lines"));
        assert_eq!(pipeline.apply("echo a\necho b\n").unwrap(), "echo a\necho b\n");
    }

    #[test]
    fn comments_kept_lines_not_merged_into_them() {
        let mut config = Config::default_config();
        config.passes.strip_comments = false;
        let pipeline = Pipeline::from_config(&config);
        assert_eq!(
            pipeline.apply("echo a # note\necho b\n").unwrap(),
            "echo a # note\necho b"
        );
    }

    #[test]
    fn shebang_dropped_by_default() {
        let out = Pipeline::standard().apply("#!/bin/bash\necho hi\n").unwrap();
        assert_eq!(out, "echo hi");
    }

    #[test]
    fn shebang_kept_when_configured() {
        let mut config = Config::default_config();
        config.settings.keep_shebang = true;
        let pipeline = Pipeline::from_config(&config);
        let out = pipeline.apply("#!/usr/bin/env bash\n# c\necho a\necho b\n").unwrap();
        assert_eq!(out, "#!/usr/bin/env bash\necho a;echo b");
        assert_eq!(pipeline.apply(&out).unwrap(), out);
    }

    #[test]
    fn shebang_only_script() {
        let mut config = Config::default_config();
        config.settings.keep_shebang = true;
        let pipeline = Pipeline::from_config(&config);
        assert_eq!(pipeline.apply("#!/bin/sh").unwrap(), "#!/bin/sh");
    }

    #[test]
    fn carriage_returns_removed_when_configured() {
        let mut config = Config::default_config();
        config.settings.normalize_line_endings = true;
        let pipeline = Pipeline::from_config(&config);
        assert_eq!(pipeline.apply("echo a\r\necho b\r\n").unwrap(), "echo a;echo b");
    }

    #[test]
    fn split_shebang_cases() {
        assert_eq!(split_shebang("#!/bin/sh\nls"), (Some("#!/bin/sh"), "ls"));
        assert_eq!(split_shebang("ls\n#!x"), (None, "ls\n#!x"));
        assert_eq!(split_shebang("#!/bin/sh"), (Some("#!/bin/sh"), ""));
    }

    #[test]
    fn syntax_error_propagates() {
        assert!(matches!(
            Pipeline::standard().apply("echo 'open"),
            Err(SyntaxError::UnterminatedContext { .. })
        ));
    }
}
