//! Command line of the `strata` binary.

use std::path::PathBuf;

use anyhow::{Result, bail};

pub const USAGE: &str = "usage: strata <messages.jsonl> [--config <strata.toml>] [--out <tree.json>] [--fonts <family:style,...>]";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub fonts: Option<String>,
}

impl Args {
    /// Parses arguments without the program name. Flags accept both
    /// `--flag value` and `--flag=value`.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut parsed = Args::default();
        let mut input = None;
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if arg.starts_with("--") => (flag.to_string(), Some(value.to_string())),
                _ => (arg.clone(), None),
            };
            let mut value = |name: &str| -> Result<String> {
                match inline.clone().or_else(|| iter.next()) {
                    Some(v) if !v.is_empty() => Ok(v),
                    _ => bail!("{name} needs a value\n{USAGE}"),
                }
            };
            match flag.as_str() {
                "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
                "--out" => parsed.out = Some(PathBuf::from(value("--out")?)),
                "--fonts" => parsed.fonts = Some(value("--fonts")?),
                "-h" | "--help" => bail!("{USAGE}"),
                other if other.starts_with('-') => bail!("unknown flag {other}\n{USAGE}"),
                _ if input.is_none() => input = Some(PathBuf::from(arg)),
                _ => bail!("unexpected argument {arg}\n{USAGE}"),
            }
        }
        match input {
            Some(path) => parsed.input = path,
            None => bail!("missing input file\n{USAGE}"),
        }
        Ok(parsed)
    }
}
