use anyhow::{Context, Result};
use clap::Parser;
use nnet_dense::config::{IoType, ProjectConfig};
use nnet_dense::project::Project;
use nnet_dense::testbench::{self, TestbenchOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nnet-dense", version, about = "C-simulation of a fixed-point dense layer project", long_about = None)]
struct Args {
    /// Project config (JSON); defaults reproduce the generated header
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the weight and bias text files
    #[arg(long)]
    weights_dir: Option<PathBuf>,

    /// Directory with tb_input_features.dat / tb_output_predictions.dat
    #[arg(long, default_value = "tb_data")]
    tb_dir: PathBuf,

    /// Transfer discipline (overrides the config)
    #[arg(long, value_enum)]
    io: Option<IoType>,

    /// Append layer outputs to <DIR>/<layer>_output.log
    #[arg(long, value_name = "DIR")]
    trace_dir: Option<PathBuf>,

    /// Worker threads for batch evaluation
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Absolute tolerance when comparing with reference predictions
    #[arg(long, default_value_t = 1e-3)]
    tolerance: f64,

    /// Show a progress bar
    #[arg(long, default_value_t = false)]
    progress: bool,

    /// Print the effective config as JSON and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = match args.config.as_deref() {
        Some(p) => ProjectConfig::from_json_file(p)?,
        None => ProjectConfig::default(),
    };
    if let Some(d) = args.weights_dir { cfg.weights_dir = d; }
    if let Some(io) = args.io { cfg.io_type = io; }
    if args.trace_dir.is_some() { cfg.trace_dir = args.trace_dir; }

    if args.print_config {
        println!("{}", cfg.to_json_pretty()?);
        return Ok(());
    }

    let project = Project::new(&cfg)
        .with_context(|| format!("initialize {} from {}", cfg.project_name, cfg.weights_dir.display()))?;

    let opts = TestbenchOptions {
        tb_dir: args.tb_dir,
        tolerance: args.tolerance,
        progress: args.progress,
        ..TestbenchOptions::default()
    };
    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.max(1)).build()?;
    let report = pool.install(|| testbench::run(&project, &opts))
        .with_context(|| format!("testbench in {}", opts.tb_dir.display()))?;

    println!("{}", serde_json::to_string(&report)?);
    if report.mismatches > 0 {
        eprintln!("{} of {} samples differ from the reference predictions", report.mismatches, report.compared);
        std::process::exit(1);
    }
    Ok(())
}
