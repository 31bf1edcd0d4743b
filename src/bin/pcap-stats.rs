use std::env::args;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pcap_stats::capture::{capture_files, process_file};
use pcap_stats::report::write_report;

fn run(path: &Path) -> Result<(), Box<dyn Error>> {
    let files: Vec<PathBuf> = if path.is_dir() {
        capture_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in files {
        let name = file.file_name().map_or_else(
            || file.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        writeln!(out, "File {name:?}")?;
        let metrics = process_file(&file)?;
        write_report(&metrics, &mut out)?;
        writeln!(out)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = match args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("Usage: pcap-stats <directory or capture file>");
            return ExitCode::SUCCESS;
        }
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}
