use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use plotbook::data::loader::Delimiter;
use plotbook::data::prf;
use plotbook::data::range::parse_bindings;
use plotbook::{Host, ImportFailurePolicy, LocalHost, PlotHandle, Workflow, WorkflowConfig};

#[derive(Parser, Debug)]
#[command(name = "plotbook")]
#[command(about = "Import ASCII data into a worksheet and plot it on a graph template", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a data file and plot it
    Run(RunArgs),
    /// Convert a FullProf .prf profile into a tab-delimited table
    Prf2xy {
        /// Path to the .prf file
        prf: PathBuf,
        /// Output path (defaults to origin.dat next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a .prf profile, then import and plot the result (takes the
    /// `run` flags except --data)
    Prf2origin {
        /// Path to the .prf file
        prf: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worksheet template
    #[arg(long)]
    worksheet_template: Option<PathBuf>,

    /// Graph template
    #[arg(long)]
    graph_template: Option<PathBuf>,

    /// ASCII data file to import
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Sheet name inside the new workbook
    #[arg(long)]
    sheet_name: Option<String>,

    /// Column bindings, e.g. 0:X,1:Y,3:Y
    #[arg(short, long)]
    bindings: Option<String>,

    /// Column delimiter: whitespace, tab, comma or semicolon (sniffed if omitted)
    #[arg(long)]
    delimiter: Option<Delimiter>,

    /// Number of header lines (sniffed if omitted)
    #[arg(long)]
    header_rows: Option<usize>,

    /// Log import progress
    #[arg(long)]
    progress: bool,

    /// Extra import attempts after a file-system error
    #[arg(long)]
    retries: Option<u32>,

    /// Keep going when the import fails
    #[arg(long)]
    continue_on_import_failure: bool,

    /// Extra directory searched for templates
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Save the project as JSON when the run ends
    #[arg(long)]
    save: Option<PathBuf>,
}

impl RunArgs {
    fn to_config(&self) -> Result<WorkflowConfig> {
        let mut config = match &self.config {
            Some(path) => WorkflowConfig::load(path)?,
            None => WorkflowConfig::default(),
        };
        if let Some(p) = &self.worksheet_template {
            config.worksheet_template = p.clone();
        }
        if let Some(p) = &self.graph_template {
            config.graph_template = p.clone();
        }
        if let Some(p) = &self.data {
            config.data_file = p.clone();
        }
        if let Some(name) = &self.sheet_name {
            config.sheet_name = name.clone();
        }
        if let Some(b) = &self.bindings {
            config.bindings = parse_bindings(b).context("parsing --bindings")?;
        }
        if self.delimiter.is_some() {
            config.import.delimiter = self.delimiter;
        }
        if self.header_rows.is_some() {
            config.import.header_rows = self.header_rows;
        }
        config.import.show_progress |= self.progress;
        if let Some(r) = self.retries {
            config.import_retries = r;
        }
        if self.continue_on_import_failure {
            config.on_import_failure = ImportFailurePolicy::Continue;
        }
        if let Some(dir) = &self.template_dir {
            config.template_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run(args) => run(&args.to_config()?, args.save.as_deref()),
        Commands::Prf2xy { prf, output } => {
            let output = output.unwrap_or_else(|| prf::default_output(&prf));
            let rows = prf::convert(&prf, &output)?;
            println!("Wrote {rows} points to {}", output.display());
            Ok(())
        }
        Commands::Prf2origin { prf, run: args } => {
            if let Some(data) = &args.data {
                bail!(
                    "--data {} conflicts with prf2origin, which imports the converted {}",
                    data.display(),
                    prf::DEFAULT_OUTPUT_NAME
                );
            }
            let output = prf::default_output(&prf);
            prf::convert(&prf, &output)?;
            let mut config = args.to_config()?;
            config.data_file = output;
            run(&config, args.save.as_deref())
        }
    }
}

fn run(config: &WorkflowConfig, save: Option<&Path>) -> Result<()> {
    let mut host = LocalHost::new();
    if let Some(dir) = &config.template_dir {
        host = host.with_template_dir(dir);
    }
    let mut workflow = Workflow::new(host);

    let result = workflow.run(config);
    for line in workflow.status_lines() {
        println!("{line}");
    }

    let saved = match (save, workflow.host_mut().project_mut()) {
        (Some(path), Some(project)) => project.save_json(path),
        _ => Ok(()),
    };
    if let (Err(e), Err(_)) = (&saved, &result) {
        error!("could not save the project: {e:#}");
    }

    let handle = result?;
    saved?;
    info!("finished in state {}", workflow.state());
    print_summary(&handle);
    Ok(())
}

fn print_summary(handle: &PlotHandle) {
    match &handle.bounds {
        Some(b) => {
            print!(
                "Plotted {} #{}: x [{}, {}], y [{}, {}]",
                handle.layer, handle.index, b.x.min, b.x.max, b.y.min, b.y.max
            );
            if let Some(y2) = &b.y2 {
                print!(", y2 [{}, {}]", y2.min, y2.max);
            }
            println!();
        }
        None => println!("Plotted {} #{}", handle.layer, handle.index),
    }
}
