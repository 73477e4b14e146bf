use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: fileproc [--config <path>] [--input <path>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: PathBuf,
    /// NDJSON requests are read from stdin when absent.
    pub input_path: Option<PathBuf>,
}

pub fn options_from_args() -> Result<CliOptions> {
    parse_options(env::args().skip(1))
}

fn parse_options(args: impl IntoIterator<Item = String>) -> Result<CliOptions> {
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut input_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config"))?;
                config_path = Some(PathBuf::from(value));
            }
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --input"))?;
                input_path = Some(PathBuf::from(value));
            }
            other => {
                return Err(anyhow!("unknown argument: {other}. {USAGE}"));
            }
        }
    }

    Ok(CliOptions {
        config_path: config_path.unwrap_or_else(|| PathBuf::from("./fileproc.jsonc")),
        input_path,
    })
}
