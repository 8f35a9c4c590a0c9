//! Harness configuration
//!
//! Settings come from a TOML file ([`HarnessConfig::load`]) overlaid with
//! [`HarnessArgs`]: command-line flags, each backed by an `ASSUME_*`
//! environment variable ([`HarnessConfig::apply_args`],
//! [`HarnessConfig::apply_env`]).

use crate::error::{HarnessError, HarnessResult};
use assume::verify::SHOW_LOCALS_ENV;
use assume_types::Outcome;
use clap::builder::BoolishValueParser;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the worker count
pub const WORKERS_ENV: &str = "ASSUME_WORKERS";

/// Environment variable overriding the short-summary report characters
pub const REPORT_CHARS_ENV: &str = "ASSUME_REPORT_CHARS";

/// Environment variable naming the TOML configuration file
pub const CONFIG_ENV: &str = "ASSUME_CONFIG";

const VALID_REPORT_CHARS: &str = "fEsxXpaA";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Render local bindings in failed assumption reports
    pub show_locals: bool,

    /// Outcomes listed in the short test summary (`-r` characters)
    pub report_chars: String,

    /// Worker threads running tests; `1` runs them in order on the caller
    pub workers: usize,

    /// Only run tests whose id contains this substring
    pub filter: Option<String>,

    /// Log every evaluation through `tracing`
    pub trace_assumptions: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            show_locals: false,
            report_chars: "fE".to_string(),
            workers: 1,
            filter: None,
            trace_assumptions: false,
        }
    }
}

/// Command-line flags of a harness binary
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "assume", about = "Run a suite with soft assumption reporting")]
pub struct HarnessArgs {
    /// TOML configuration file
    #[arg(short = 'c', long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Render local bindings in failed assumption reports
    #[arg(
        short = 'l',
        long = "showlocals",
        env = SHOW_LOCALS_ENV,
        value_parser = BoolishValueParser::new()
    )]
    pub show_locals: bool,

    /// Outcomes listed in the short test summary (fEsxXpaA)
    #[arg(short = 'r', env = REPORT_CHARS_ENV, value_parser = parse_report_chars)]
    pub report_chars: Option<String>,

    /// Worker threads running tests
    #[arg(short = 'n', long, env = WORKERS_ENV)]
    pub workers: Option<NonZeroUsize>,

    /// Log every evaluation through `tracing`
    #[arg(long)]
    pub trace_assumptions: bool,

    /// Only run tests whose id contains this substring
    pub filter: Option<String>,
}

impl HarnessArgs {
    /// Parse `args` (without the program name) and the `ASSUME_*` variables
    pub fn parse_args<I, S>(args: I) -> HarnessResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = std::iter::once(OsString::from("assume"))
            .chain(args.into_iter().map(|arg| OsString::from(arg.as_ref())));
        Ok(Self::try_parse_from(argv)?)
    }

    /// Load the configured TOML file, or defaults, and overlay these flags
    pub fn into_config(self) -> HarnessResult<HarnessConfig> {
        let base = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        Ok(self.merge_into(base))
    }

    /// Overlay the flags that were given onto `config`
    pub fn merge_into(self, mut config: HarnessConfig) -> HarnessConfig {
        config.show_locals |= self.show_locals;
        config.trace_assumptions |= self.trace_assumptions;
        if let Some(chars) = self.report_chars {
            config.report_chars = chars;
        }
        if let Some(workers) = self.workers {
            config.workers = workers.get();
        }
        if let Some(filter) = self.filter {
            config.filter = Some(filter);
        }
        config
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: HarnessConfig =
            toml::from_str(&contents).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with command-line flags and the environment
    pub fn from_args<I, S>(args: I) -> HarnessResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::default().apply_args(args)
    }

    /// Overlay command-line flags, falling back to `ASSUME_*` variables for
    /// flags that were not given. `--config` is ignored here; use
    /// [`HarnessArgs::into_config`] to load it.
    ///
    /// Recognized: `-l` / `--showlocals`, `-r<chars>` / `-r <chars>`,
    /// `-n <N>` / `--workers <N>`, `--trace-assumptions`. A bare word becomes
    /// the test filter.
    pub fn apply_args<I, S>(self, args: I) -> HarnessResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(HarnessArgs::parse_args(args)?.merge_into(self))
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> HarnessResult<Self> {
        Self::default().apply_env()
    }

    /// Overlay `ASSUME_SHOWLOCALS`, `ASSUME_WORKERS` and `ASSUME_REPORT_CHARS`
    pub fn apply_env(self) -> HarnessResult<Self> {
        self.apply_args(std::iter::empty::<&str>())
    }

    /// Check loaded values
    pub fn validate(&self) -> HarnessResult<()> {
        parse_report_chars(&self.report_chars)?;
        if self.workers == 0 {
            return Err(HarnessError::InvalidValue {
                flag: "workers".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Whether the short test summary lists reports with `outcome`
    pub fn reports(&self, outcome: Outcome) -> bool {
        report_chars_select(&self.report_chars, outcome)
    }

    /// Whether a test id passes the filter
    pub fn selects(&self, id: &str) -> bool {
        self.filter.as_deref().map_or(true, |filter| id.contains(filter))
    }
}

/// `-r` semantics: `a` selects everything except passes, `A` everything
pub(crate) fn report_chars_select(chars: &str, outcome: Outcome) -> bool {
    if chars.contains('A') {
        return true;
    }
    let code = match outcome {
        Outcome::Failed => 'f',
        Outcome::Error => 'E',
        Outcome::Skipped => 's',
        Outcome::XFailed => 'x',
        Outcome::XPassed => 'X',
        Outcome::Passed => 'p',
    };
    chars.contains(code) || (chars.contains('a') && outcome != Outcome::Passed)
}

fn parse_report_chars(chars: &str) -> HarnessResult<String> {
    match chars.chars().find(|c| !VALID_REPORT_CHARS.contains(*c)) {
        Some(_) => Err(HarnessError::InvalidValue {
            flag: "-r".to_string(),
            value: chars.to_string(),
        }),
        None => Ok(chars.to_string()),
    }
}
