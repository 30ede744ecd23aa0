use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use qa_triage::analyzer::CommandAnalyzer;
use qa_triage::source::DicomSourceEditor;
use qa_triage::{run_pass, RunConfig};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "qa-triage")]
#[command(about = "Analyse incoming QA acquisitions and archive them")]
#[command(version)]
struct Cli {
    /// TOML file with run settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Incoming tree to analyse
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Archive root for analysed files
    #[arg(long)]
    processed_path: Option<PathBuf>,

    /// Directory for results workbooks and reports
    #[arg(long)]
    save_path: Option<PathBuf>,

    /// Accepted file extensions
    #[arg(long, value_delimiter = ',')]
    file_types: Option<Vec<String>>,

    /// Field strength (T) written to ACR phantom images
    #[arg(long)]
    field_strength: Option<f64>,

    /// Winston-Lutz ball-bearing diameter (mm)
    #[arg(long)]
    bb_size_mm: Option<f64>,

    #[arg(long)]
    catphan_model: Option<String>,

    /// Ask the analyzer for PDF reports
    #[arg(long)]
    pdf: bool,

    #[arg(long)]
    plot: bool,

    /// Seconds to wait before the pass so copies can finish
    #[arg(long)]
    settle_secs: Option<u64>,

    /// Analyzer program and its leading arguments
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    analyzer: Option<Vec<String>>,

    /// Append logs to a monthly file derived from this path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(path) = &self.data_path {
            config.data_path = path.clone();
        }
        if let Some(path) = &self.processed_path {
            config.processed_path = path.clone();
        }
        if let Some(path) = &self.save_path {
            config.save_path = path.clone();
        }
        if let Some(types) = &self.file_types {
            config.file_types = types.clone();
        }
        if let Some(tesla) = self.field_strength {
            config.field_strength = tesla;
        }
        if let Some(size) = self.bb_size_mm {
            config.bb_size_mm = size;
        }
        if let Some(model) = &self.catphan_model {
            config.catphan_model = model.clone();
        }
        if let Some(secs) = self.settle_secs {
            config.settle_secs = secs;
        }
        if let Some(command) = &self.analyzer {
            config.analyzer_command = command.clone();
        }
        config.pdf |= self.pdf;
        config.plot |= self.plot;
        Ok(config)
    }
}

/// `logs/qa.log` becomes `logs/qa_2026_10.log`.
fn monthly_log_path(path: &Path, year: i32, month: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "qa".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{year}_{month:02}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{year}_{month:02}"),
    };
    path.with_file_name(name)
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    builder.format_timestamp_secs();

    if let Some(path) = log_file {
        let today = Local::now();
        let path = monthly_log_path(path, today.year(), today.month());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    let _ = builder.try_init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    let config = cli.run_config()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupt received; finishing the current cohort");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    let analyzer = CommandAnalyzer::new(&config.analyzer_command)
        .context("Set `analyzer_command` in the config file or pass --analyzer")?;

    if config.settle_secs > 0 {
        log::info!("Waiting {} s before analysis", config.settle_secs);
        thread::sleep(config.settle_delay());
    }

    let summary = run_pass(&config, &analyzer, &DicomSourceEditor, &shutdown)?;
    log::debug!("{summary:?}");
    Ok(())
}
