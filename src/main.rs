use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use fit_match::{Error, TelemetryRecord, extract_session, find_fit_for_video};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn telemetry_csv_header() -> &'static str {
    "timestamp,utc_timestamp,latitude_deg,longitude_deg,altitude_m,speed_mps"
}

#[derive(Parser, Debug)]
#[command(name = "fit-match")]
#[command(about = "Correlate an action-camera video with its FIT log and extract session telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the .fit file recorded alongside a video
    Match {
        /// Input video file
        #[arg(long, value_name = "VIDEO.mp4")]
        video: PathBuf,

        /// Directory containing candidate .fit files
        #[arg(long = "fit-dir", value_name = "DIR")]
        fit_dir: PathBuf,
    },
    /// Extract the telemetry covering the video's recorded interval
    Extract {
        /// Input video file
        #[arg(long, value_name = "VIDEO.mp4")]
        video: PathBuf,

        /// Directory containing candidate .fit files
        #[arg(long = "fit-dir", value_name = "DIR")]
        fit_dir: PathBuf,

        /// Output file path (use '-' for stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
}

fn should_write_to_stdout(output: &Option<PathBuf>) -> bool {
    match output {
        None => true,
        Some(p) => p.as_os_str() == "-",
    }
}

fn fmt_f64(v: f64) -> String {
    // High decimal precision for downstream analysis.
    format!("{v:.15}")
}

fn cell_i64(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_f64(v: Option<f64>) -> String {
    v.map(fmt_f64).unwrap_or_default()
}

fn write_rows(rows: &[TelemetryRecord], format: OutputFormat, out: &mut dyn Write) -> Result<(), Error> {
    match format {
        OutputFormat::Csv => {
            writeln!(out, "{}", telemetry_csv_header())?;
            for row in rows {
                // Absent values stay empty cells; no quoting is needed because
                // every cell is a numeric token.
                writeln!(
                    out,
                    "{},{},{},{},{},{}",
                    cell_i64(row.timestamp),
                    cell_i64(row.utc_timestamp),
                    cell_f64(row.latitude_deg),
                    cell_f64(row.longitude_deg),
                    cell_f64(row.altitude_m),
                    cell_f64(row.speed_mps),
                )?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(rows).map_err(io::Error::other)?;
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}

fn run_match(video: &PathBuf, fit_dir: &PathBuf) -> Result<(), Error> {
    match find_fit_for_video(video, fit_dir)? {
        Some(matched) => {
            println!(
                "Fit file corresponding to video {}: {}",
                video.display(),
                matched.path.display()
            );
        }
        None => {
            println!(
                "No .fit file in {} matches video {}",
                fit_dir.display(),
                video.display()
            );
        }
    }
    Ok(())
}

fn run_extract(
    video: &PathBuf,
    fit_dir: &PathBuf,
    output: &Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), Error> {
    let table = extract_session(video, fit_dir)?;

    if should_write_to_stdout(output) {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        write_rows(table.rows(), format, &mut out)?;
        out.flush()?;
    } else {
        let path = output.as_ref().unwrap();
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        write_rows(table.rows(), format, &mut out)?;
        out.flush()?;
        eprintln!("Telemetry written to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Match { video, fit_dir } => run_match(video, fit_dir),
        Command::Extract {
            video,
            fit_dir,
            output,
            format,
        } => run_extract(video, fit_dir, output, *format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
