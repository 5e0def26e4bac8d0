use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "daysel",
    version,
    about = "Select ranges of days on a year calendar",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rcfile")]
    pub rcfile: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` and `rc.KEY:VALUE` tokens out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// The first token names the command, abbreviations allowed; the rest
    /// are its arguments. No tokens means `default.command`, else `list`.
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let mut tokens = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string());

        let Some(first) = tokens.next() else {
            let command = cfg
                .get("default.command")
                .unwrap_or_else(|| "list".to_string());
            debug!(command = %command, "no explicit command, using default");
            return Ok(Self {
                command,
                args: vec![],
            });
        };

        let known = known_command_names();
        let command = expand_command_abbrev(&first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?
            .to_string();
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command,
            args: tokens.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os_args(&[
            "daysel",
            "rc.max.active=2",
            "add",
            "rc.overflow:reject-new",
            "today",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, os_args(&["daysel", "add", "today"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.max.active".to_string(), "2".to_string()),
                ("rc.overflow".to_string(), "reject-new".to_string()),
            ]
        );
    }

    #[test]
    fn invocation_defaults_and_abbreviations() {
        let mut cfg = Config::default();
        let inv = Invocation::parse(&cfg, vec![]).expect("default");
        assert_eq!(inv.command, "list");

        cfg.apply_overrides([("default.command".to_string(), "grid".to_string())]);
        let inv = Invocation::parse(&cfg, vec![]).expect("configured default");
        assert_eq!(inv.command, "grid");

        let inv = Invocation::parse(&cfg, os_args(&["gr", "2026"])).expect("abbrev");
        assert_eq!(
            inv,
            Invocation {
                command: "grid".to_string(),
                args: vec!["2026".to_string()],
            }
        );
    }

    #[test]
    fn ambiguous_or_unknown_command_is_an_error() {
        let cfg = Config::default();
        // "re" could be remove or release.
        assert!(Invocation::parse(&cfg, os_args(&["re"])).is_err());
        assert!(Invocation::parse(&cfg, os_args(&["frobnicate"])).is_err());
    }

    #[test]
    fn cli_parses_global_flags_before_command() {
        let cli = GlobalCli::parse_from(os_args(&[
            "daysel",
            "-vv",
            "--rc",
            "color=off",
            "--data",
            "/tmp/cal",
            "add",
            "-3d",
        ]));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/cal")));
        assert_eq!(cli.rest, os_args(&["add", "-3d"]));
    }
}
