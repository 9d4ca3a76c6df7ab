use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Command-line options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub url: Option<String>,
    pub simulate_gps: bool,
    pub demo: bool,
    pub assume_yes: bool,
    pub insecure: bool,
    pub help: bool,
}

/// Parse `std::env::args`-style arguments (program name first)
pub fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().context("--config needs a file path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--url" | "-u" => {
                let url = iter.next().context("--url needs a backend URL")?;
                options.url = Some(url.clone());
            }
            "--simulate-gps" => options.simulate_gps = true,
            "--demo" => {
                options.demo = true;
                options.simulate_gps = true;
            }
            "--yes" | "-y" => options.assume_yes = true,
            "--insecure" | "-k" => options.insecure = true,
            "--help" | "-h" => options.help = true,
            other => bail!("unknown argument '{}' (try --help)", other),
        }
    }

    Ok(options)
}

pub fn print_help() {
    println!(
        "triptrack {}

Live trip dashboard client. Polls the trip backend once per second and
reports this device's position.

USAGE:
    triptrack [OPTIONS]

OPTIONS:
    -c, --config <path>   JSON config file (missing fields use defaults)
    -u, --url <url>       Backend base URL (overrides config and TRIPTRACK_URL)
        --simulate-gps    Report positions from a simulated GPS route
        --demo            Run against an in-process backend with simulated sensors
    -y, --yes             Do not ask before resetting the trip
    -k, --insecure        Accept a self-signed backend certificate
    -h, --help            Show this help

While running, type 'r' and Enter to reset the trip. Ctrl-C quits.
Set RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.",
        triptrack_core::VERSION
    );
}
