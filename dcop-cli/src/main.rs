use std::env;
use std::fs;
use std::io::{self, Read, Write};

use anyhow::Error;
use clap::{value_t, values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use dcop::config::{SolverConfig, SolverConfigUpdate};
use dcop::{AlgorithmKind, Solver};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("DCOP_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is dcop {}", env!("CARGO_PKG_VERSION"));
    info!(
        "  {} build - {}",
        env!("DCOP_PROFILE"),
        env!("DCOP_RUSTC_VERSION")
    );
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("dcop")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The JSON instance to solve (stdin if omitted)'")
        .arg(
            Arg::from_usage("[algorithm] -a --algorithm=[ALGORITHM] 'Solving algorithm to use'")
                .possible_values(&[
                    "dsa",
                    "maxsum",
                    "ccg-maxsum",
                    "ccg-maxsum-c",
                    "ccg-dsa",
                    "rand",
                ])
                .default_value("maxsum")
                .case_insensitive(true),
        )
        .arg_from_usage("[iterations] -i --iterations=[N] 'Number of rounds to perform'")
        .arg_from_usage("[seed] -s --seed=[SEED] 'Seed of the random number generator'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help("Specify a single config option, see 'dcop -C help' for a list of options.")
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage(
            "[stats-file] --stats=[FILE] 'Write per round statistics as JSON lines to a file'",
        )
        .get_matches();

    if values_t!(matches, "config-option", String)
        .unwrap_or(vec![])
        .iter()
        .any(|option| option == "help")
    {
        print!("{}", SolverConfig::help());
        return Ok(0);
    }

    init_logging();
    banner();

    let mut config_update = SolverConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or(vec![]) {
        config_update.merge(toml::from_str(&config_option)?);
    }

    if matches.is_present("iterations") {
        let iterations = value_t!(matches, "iterations", u64)?;
        config_update.merge(toml::from_str(&format!("iteration_limit = {}", iterations))?);
    }

    if matches.is_present("seed") {
        let seed = value_t!(matches, "seed", u64)?;
        config_update.merge(toml::from_str(&format!("seed = {}", seed))?);
    }

    let mut config = SolverConfig::default();
    config.update(&config_update)?;

    let kind: AlgorithmKind = matches
        .value_of("algorithm")
        .unwrap_or("maxsum")
        .parse()?;

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn io::Read
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn io::Read
        }
    };

    let instance = dcop_instance::json::parse(file)?;

    let mut solver = Solver::new(instance, kind, config)?;
    solver.run();

    if let Some(path) = matches.value_of("stats-file") {
        info!("Writing statistics to '{}'", path);
        let mut stats_file = io::BufWriter::new(fs::File::create(path)?);
        for record in solver.stats().records() {
            serde_json::to_writer(&mut stats_file, record)?;
            writeln!(stats_file)?;
        }
        stats_file.flush()?;
    }

    if solver.decode_ambiguities() > 0 {
        info!(
            "{} variables were decoded from ambiguous covers",
            solver.decode_ambiguities()
        );
    }

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    solver.stats().write_summary(&mut stdout)?;

    match solver.cost() {
        Some(cost) => writeln!(stdout, "s COST {}", cost)?,
        None => writeln!(stdout, "s UNKNOWN")?,
    }
    for variable in solver.instance().variables() {
        if let Some(value) = variable.value() {
            writeln!(stdout, "v {}={}", variable.name(), value)?;
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    #[test]
    fn build_info() {
        let rustc = env!("DCOP_RUSTC_VERSION");
        assert!(rustc.starts_with("rustc ") || rustc == "unknown rustc");
        assert!(!rustc.ends_with('\n'));
        assert!(!env!("DCOP_PROFILE").is_empty());
    }
}
