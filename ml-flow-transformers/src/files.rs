//! File housekeeping

use std::fs;

use ml_flow_core::options::resolve;
use ml_flow_core::{
    Accepts, Error, FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue, PayloadKind, Result, Token,
    Transformer,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::text_input;

/// Pattern matching every file; skips compiling a regex
const MATCH_ALL: &str = ".*";

const HELP: &[OptionHelp] = &[OptionHelp::new(
    "regexp",
    "The regular expression that the files must match (string).",
)];

/// Options of [`DeleteFile`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteFileOptions {
    /// Pattern the path must match at its start
    pub regexp: OptionValue<String>,
}

impl Default for DeleteFileOptions {
    fn default() -> Self {
        Self {
            regexp: OptionValue::Value(MATCH_ALL.to_string()),
        }
    }
}

primitive_options!(DeleteFileOptions, HELP);

/// Deletes incoming files whose path matches a pattern and forwards the path
#[derive(Debug, Clone, Default)]
pub struct DeleteFile {
    options: DeleteFileOptions,

    /// Last compiled pattern, keyed by its source
    compiled: Option<(String, Regex)>,
}

impl DeleteFile {
    /// Kind name
    pub const KIND: &'static str = "DeleteFile";

    /// Create the transformer
    pub fn new(options: DeleteFileOptions) -> Self {
        Self {
            options,
            compiled: None,
        }
    }

    fn matches(&mut self, pattern: &str, path: &str) -> Result<bool> {
        if pattern == MATCH_ALL {
            return Ok(true);
        }

        let regex = match self.compiled.take() {
            Some((source, regex)) if source == pattern => regex,
            _ => Regex::new(&format!("^(?:{})", pattern)).map_err(|e| Error::Regex(e.to_string()))?,
        };
        let matched = regex.is_match(path);
        self.compiled = Some((pattern.to_string(), regex));
        Ok(matched)
    }
}

impl Transformer for DeleteFile {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Deletes the incoming files that match the regular expression."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("regexp: {}", self.options.regexp))
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Text])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        DeleteFileOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let path = text_input(Self::KIND, input)?;
        let pattern = resolve(ctx, "regexp", &self.options.regexp)?;

        if self.matches(&pattern, path)? {
            fs::remove_file(path)?;
            info!(path, "deleted file");
        }

        output.push(input.clone());
        Ok(())
    }

    fn stop_execution(&mut self) {
        self.compiled = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::Actor;
    use std::path::Path;
    use tempfile::TempDir;

    fn delete(dir: &TempDir, name: &str, regexp: &str) -> Result<Token> {
        let path = dir.path().join(name);
        fs::write(&path, "data")?;

        let mut ctx = FlowContext::new();
        let mut actor = Actor::new(
            "delete",
            Box::new(DeleteFile::new(DeleteFileOptions {
                regexp: OptionValue::Value(regexp.to_string()),
            })),
        );
        actor.input(Token::new(path.to_string_lossy().into_owned()))?;
        actor.execute(&mut ctx)?;
        actor.output().ok_or_else(|| Error::Execution("no output".into()))
    }

    #[test]
    fn test_default_pattern_deletes() {
        let dir = TempDir::new().unwrap();
        let token = delete(&dir, "a.csv", MATCH_ALL).unwrap();
        let path = token.payload().as_text().unwrap();
        assert!(!Path::new(path).exists());
    }

    #[test]
    fn test_pattern_must_match_at_start() {
        let dir = TempDir::new().unwrap();
        let prefix = regex::escape(&dir.path().to_string_lossy());

        delete(&dir, "keep.csv", "keep").unwrap();
        assert!(dir.path().join("keep.csv").exists());

        delete(&dir, "drop.csv", &format!("{}/drop", prefix)).unwrap();
        assert!(!dir.path().join("drop.csv").exists());
    }

    #[test]
    fn test_missing_file_and_bad_pattern() {
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("delete", Box::new(DeleteFile::default()));
        actor.input(Token::new("/nonexistent/file.csv")).unwrap();
        assert!(matches!(actor.execute(&mut ctx), Err(Error::Io(_))));

        let dir = TempDir::new().unwrap();
        assert!(matches!(delete(&dir, "x.csv", "(unclosed"), Err(Error::Regex(_))));
    }

    #[test]
    fn test_pattern_cache_follows_changes() {
        let mut transformer = DeleteFile::default();
        assert!(transformer.matches("/tmp/a", "/tmp/abc").unwrap());
        assert!(!transformer.matches("/tmp/b", "/tmp/abc").unwrap());
        assert!(transformer.matches("/tmp/b", "/tmp/bcd").unwrap());
    }
}
