//! Bridge process entry point
//!
//! Routes one MIDI input port through PolyMux to one output port. Parameters
//! live in a JSON file so training and `--set` edits survive restarts.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use polymux::{
    load_params, save_params, Bridge, BridgeConfig, Error, ParamId, ParamStore, PolyMux, Result,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "polymux-bridge", version, about = "Fan one MIDI channel out over several")]
struct Args {
    /// List MIDI ports and exit
    #[arg(long)]
    list: bool,

    /// Input port (case-insensitive name substring)
    #[arg(short, long)]
    input: Option<String>,

    /// Output port (case-insensitive name substring)
    #[arg(short, long)]
    output: Option<String>,

    /// Parameter file
    #[arg(long, default_value = "polymux.json")]
    params: PathBuf,

    /// Set a parameter before starting, e.g. `--set polyphony=6`
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(ParamId, i32)>,

    /// Skip the onboarding training window
    #[arg(long)]
    no_training: bool,
}

fn parse_assignment(s: &str) -> std::result::Result<(ParamId, i32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let id = name.parse::<ParamId>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("{}: {}", id, e))?;
    Ok((id, value))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.list {
        let ports = Bridge::list_ports()?;
        println!("Inputs:");
        for name in &ports.inputs {
            println!("  {}", name);
        }
        println!("Outputs:");
        for name in &ports.outputs {
            println!("  {}", name);
        }
        return Ok(());
    }

    let mut params = load_params(&args.params)?;
    if !args.set.is_empty() {
        for &(id, value) in &args.set {
            params.set(id, value)?;
        }
        save_params(&args.params, &params)?;
    }

    let (input, output) = match (args.input, args.output) {
        (Some(input), Some(output)) => (input, output),
        (None, None) if !args.set.is_empty() => return Ok(()),
        _ => {
            return Err(Error::InvalidArgument(
                "both --input and --output are required".to_string(),
            ))
        }
    };

    for id in ParamId::ALL {
        tracing::info!("{} = {}", id, params.get(id));
    }

    let mut builder = PolyMux::builder().params(params);
    if args.no_training {
        builder = builder.training_ticks(0);
    }

    let bridge = Bridge::connect(&BridgeConfig::new(input, output), builder.build())?;

    println!("Running. Press Enter to stop.");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let params = bridge.close();
    save_params(&args.params, &params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("polyphony=6"),
            Ok((ParamId::Polyphony, 6))
        );
        assert_eq!(
            parse_assignment("0 = 2"),
            Ok((ParamId::InputChannel, 2))
        );
        assert!(parse_assignment("polyphony").is_err());
        assert!(parse_assignment("volume=3").is_err());
        assert!(parse_assignment("polyphony=many").is_err());
    }
}
