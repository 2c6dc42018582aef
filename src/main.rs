use log::LevelFilter;
use pokedex_pvp::model::LevelChoice;
use pokedex_pvp::{run, CliOptions, Command, Ivs, LeagueCap};
use std::env;
use std::io;
use std::path::PathBuf;

fn usage() -> ! {
    eprintln!(
        "Usage: pvp [--verbose] <command>\n\
         \x20 simulate <battle.json> [--max-turns N]\n\
         \x20 rank <species.json> [--league great|ultra|master|little|CP] [--top N] [--ivs A/D/H]\n\
         \x20 stats <species.json> --ivs A/D/H [--level L | --league ...]\n\
         \x20 matrix <roster.json> [--output matrix.csv]\n\
         \x20 matchups <type1> [type2]"
    );
    std::process::exit(1);
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str, hint: &str) -> anyhow::Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("{flag} requires {hint}"))
}

fn path_arg(args: &mut impl Iterator<Item = String>, command: &str, what: &str) -> anyhow::Result<PathBuf> {
    args.next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("{command} requires {what}"))
}

fn parse_args() -> anyhow::Result<CliOptions> {
    let mut verbose = false;
    let mut positional: Vec<String> = Vec::new();
    let mut max_turns = None;
    let mut cap = LeagueCap::GREAT;
    let mut top = 10usize;
    let mut ivs: Option<Ivs> = None;
    let mut level: Option<f64> = None;
    let mut output: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--max-turns" => {
                max_turns = Some(next_value(&mut args, "--max-turns", "a number")?.parse()?);
            }
            "--league" => {
                cap = next_value(&mut args, "--league", "a league name or CP")?.parse()?;
            }
            "--top" => {
                let val: i64 = next_value(&mut args, "--top", "a number")?.parse()?;
                top = val.max(0) as usize;
            }
            "--ivs" => {
                ivs = Some(next_value(&mut args, "--ivs", "A/D/H (e.g. --ivs 0/15/15)")?.parse()?);
            }
            "--level" => {
                level = Some(next_value(&mut args, "--level", "a level")?.parse()?);
            }
            "--output" => {
                output = Some(PathBuf::from(next_value(
                    &mut args,
                    "--output",
                    "a path (e.g. --output matrix.csv)",
                )?));
            }
            "--help" | "-h" => usage(),
            other if other.starts_with("--") => anyhow::bail!("Unknown argument {other}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(name) = positional.next() else {
        usage()
    };
    let command = match name.as_str() {
        "simulate" => Command::Simulate {
            input: path_arg(&mut positional, &name, "a battle request file")?,
            max_turns,
        },
        "rank" => Command::Rank {
            species: path_arg(&mut positional, &name, "a species file")?,
            cap,
            top,
            ivs,
        },
        "stats" => Command::Stats {
            species: path_arg(&mut positional, &name, "a species file")?,
            ivs: ivs.unwrap_or(Ivs::PERFECT),
            level: level.map_or(LevelChoice::BestUnder(cap), LevelChoice::Exact),
        },
        "matrix" => Command::Matrix {
            roster: path_arg(&mut positional, &name, "a roster file")?,
            output,
        },
        "matchups" => {
            let primary = positional
                .next()
                .ok_or_else(|| anyhow::anyhow!("matchups requires a type"))?;
            Command::Matchups {
                primary,
                secondary: positional.next(),
            }
        }
        other => anyhow::bail!("Unknown command {other}"),
    };
    Ok(CliOptions { command, verbose })
}

fn init_logger(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:<5} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opts = parse_args()?;
    init_logger(opts.verbose)?;
    run(opts)
}
