use anyhow::{Context, Result};
use modelfetch_core::{scan, Config};
use std::path::{Path, PathBuf};

pub fn execute(dir: Option<PathBuf>, config: Option<&Path>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => {
            let mut config = Config::load(config)?;
            config.apply_process_env();
            config.download.local_dir
        }
    };

    print_report(&dir)
}

/// Print a `du -sh`-style total followed by every file under `dir`.
pub fn print_report(dir: &Path) -> Result<()> {
    let report = scan(dir).with_context(|| format!("Failed to scan {}", dir.display()))?;

    println!("{}\t{}", report.human_total(), report.root.display());
    for file in &report.files {
        println!("{}", file.path.display());
    }

    let partial = report.partial_files().count();
    if partial > 0 {
        println!("\n{} partial download(s) left over from interrupted transfers", partial);
    }

    Ok(())
}
