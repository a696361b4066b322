use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::{error::ErrorKind, CommandFactory, Parser};
use pe_sim::{
    assemble,
    framework::{PeSim, RunOutcome},
    AssembleOption,
};

// Processing element descriptor sequencer simulator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the input .pe file
    input: String,

    /// Assemble only and print the canonical listing
    ///
    /// This option is conflict with `trace`.
    #[arg(long)]
    check: bool,

    /// Print the state of the processing element after every cycle
    #[arg(long)]
    trace: bool,

    /// Stop after this many cycles (a suspended program never ends)
    #[arg(long, default_value_t = 1_000_000)]
    max_cycles: u64,

    /// Write logs to this file as JSON lines
    #[arg(long)]
    log_file: Option<std::path::PathBuf>,

    // / Print logs during simulation
    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file `{}`", &args.input))?;

    let log_level = match args.verbose.log_level() {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    };
    let log_file = match &args.log_file {
        Some(path) => Some(
            std::fs::File::create(path)
                .with_context(|| format!("could not create file `{}`", path.display()))?,
        ),
        None => None,
    };
    binutils::logging_setup(log_level, log_file);

    let verbose_asm = args
        .verbose
        .log_level()
        .is_some_and(|lv| lv >= verbose::Level::Trace);
    let image = assemble(&content, AssembleOption::default().set_verbose(verbose_asm))
        .with_context(|| format!("could not assemble `{}`", &args.input))?;

    if args.check {
        if args.trace {
            let mut cmd = Args::command();
            cmd.error(
                ErrorKind::ArgumentConflict,
                "Can't both specify check and trace",
            )
            .exit();
        }
        print!("{}", image);
        return Ok(());
    }

    let mut sim = PeSim::new(&image, args.trace);
    let outcome = sim.run(args.max_cycles)?;
    let seq = sim.sequencer();
    match outcome {
        RunOutcome::Exhausted { cycles } => println!("program exhausted after {cycles} cycles"),
        RunOutcome::CycleLimit { cycles } => println!(
            "stopped at cycle limit {cycles}, descriptor {} of {}",
            seq.prog_idx(),
            seq.program().len()
        ),
    }
    match seq.current_weight() {
        Ok(w) => println!("weight[{}] = {}", seq.weight_idx(), w),
        Err(e) => println!("no weight: {e}"),
    }
    Ok(())
}
