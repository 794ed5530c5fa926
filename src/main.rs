use clap::{App, Arg};
use lqcount::task::{write_buckets, Task};
use std::error::Error;
use std::io::{BufWriter, Write};

fn parse_budget(budget: Option<&str>) -> Result<Option<u64>, Box<dyn Error>> {
    match budget {
        Some(budget) => Ok(Some(budget.parse().map_err(|e| {
            format!("invalid budget {:?}: {}", budget, e)
        })?)),
        None => Ok(None),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let matches = App::new("lqcount")
        .about("Merge the counts of isomorphic labeled queries")
        .arg(
            Arg::with_name("PLAN")
                .help("The extension plan file")
                .required(true),
        )
        .arg(
            Arg::with_name("COUNTS")
                .help("The raw count file")
                .required(true),
        )
        .arg(
            Arg::with_name("budget")
                .long("budget")
                .takes_value(true)
                .value_name("STEPS")
                .help("Fail when one isomorphism test tries more than STEPS pairings"),
        )
        .arg(
            Arg::with_name("parallel")
                .long("parallel")
                .help("Aggregate digest partitions in parallel"),
        )
        .arg(
            Arg::with_name("queries-only")
                .long("queries-only")
                .help("Skip records of stages that are not query stages"),
        )
        .get_matches();
    let task = Task::new(
        matches.value_of("PLAN").unwrap(),
        matches.value_of("COUNTS").unwrap(),
        parse_budget(matches.value_of("budget"))?,
        matches.is_present("parallel"),
        matches.is_present("queries-only"),
    );
    let buckets = task.run()?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_buckets(&mut out, &buckets)?;
    out.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
