//! reportcase command line interface
//!
//! アップロードされたスプレッドシートとREPORT_STATISTICSのCSVスナップショットから
//! XMLテストケースのZIPアーカイブを生成する。

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reportcase::{
    CollisionPolicy, Compression, CsvSource, EscapeMode, GeneratorBuilder, ReportCaseError,
    RunStatus, RunSummary, SheetSelector,
};

#[derive(Debug, Parser)]
#[command(version, about, rename_all = "kebab")]
struct Args {
    /// Uploaded spreadsheet with `report`, `fund` and optional `date` columns
    #[arg(value_name = "UPLOAD")]
    upload: PathBuf,
    /// CSV export of REPORT_STATISTICS used as the candidate source
    #[arg(long, short = 'c', value_name = "CSV")]
    candidates: PathBuf,
    /// Destination archive
    #[arg(long, short = 'o', value_name = "ZIP", default_value = "generated_xmls.zip")]
    output: PathBuf,
    /// Sheet name to read requests from
    #[arg(long, value_name = "NAME", conflicts_with = "sheet_index")]
    sheet: Option<String>,
    /// Zero-based sheet index to read requests from
    #[arg(long, value_name = "N")]
    sheet_index: Option<usize>,
    /// Escape XML special characters in rendered values
    #[arg(long)]
    escape_xml: bool,
    /// Keep colliding entries under numbered names instead of overwriting
    #[arg(long)]
    disambiguate: bool,
    /// Store entries without compression
    #[arg(long)]
    store: bool,
    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn sheet_selector(&self) -> SheetSelector {
        match (&self.sheet, self.sheet_index) {
            (Some(name), _) => SheetSelector::Name(name.clone()),
            (None, Some(index)) => SheetSelector::Index(index),
            (None, None) => SheetSelector::First,
        }
    }

    fn log_filter(&self) -> EnvFilter {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter())
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(summary) if summary.status == RunStatus::Generated => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!("No matches found");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<RunSummary, ReportCaseError> {
    let generator = GeneratorBuilder::new()
        .with_sheet_selector(args.sheet_selector())
        .with_escape_mode(if args.escape_xml {
            EscapeMode::Xml
        } else {
            EscapeMode::Raw
        })
        .with_collision_policy(if args.disambiguate {
            CollisionPolicy::Disambiguate
        } else {
            CollisionPolicy::Overwrite
        })
        .with_compression(if args.store {
            Compression::Stored
        } else {
            Compression::Deflated
        })
        .build()?;

    let upload = File::open(&args.upload)?;
    let source = CsvSource::from_path(&args.candidates);

    let requests = generator.read_requests(upload)?;
    let (summary, archive) = generator.process(&requests, &source)?;

    // 候補がない場合は出力ファイルを作らない
    if let Some(archive) = archive {
        let output = BufWriter::new(File::create(&args.output)?);
        let output = archive.write_to(output)?;
        output.into_inner().map_err(|e| e.into_error())?;
        tracing::info!(path = %args.output.display(), "wrote archive");
    }

    if args.summary_json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| ReportCaseError::Config(format!("Failed to serialize summary: {}", e)))?;
        println!("{json}");
    }

    Ok(summary)
}
