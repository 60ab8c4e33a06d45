use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use suggest_core::dictionary::CompiledDictionaryBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Compiles plain-text word lists into a main dictionary.
///
/// Source lines:
///   w <word> <frequency> [offensive]
///   b <prev|<S>> <next> <frequency>
///   wl <typed> <replacement>
#[derive(Parser)]
struct Args {
    /// Locale tag of the dictionary, e.g. en_US
    #[arg(long)]
    locale: String,

    /// Source files
    #[arg(long, num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the dictionary is written to
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Supplement name; writes main-<locale>+<name> instead of main-<locale>
    #[arg(long)]
    supplement: Option<String>,

    /// Skip malformed lines instead of failing
    #[arg(long, default_value_t = false)]
    lenient: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();
    let args = Args::parse();

    let locale = suggest_core::Locale::new(args.locale.as_str());
    let mut builder = CompiledDictionaryBuilder::new(locale.clone());
    let mut lines = 0usize;
    let mut skipped = 0usize;
    for input in &args.inputs {
        let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            match builder.add_source_line(&line) {
                Ok(()) => lines += 1,
                Err(e) if args.lenient => {
                    warn!("{}:{}: {}", input.display(), n + 1, e);
                    skipped += 1;
                }
                Err(e) => return Err(e).with_context(|| format!("{}:{}", input.display(), n + 1)),
            }
        }
        info!(lines, "read {}", input.display());
    }

    let stem = match &args.supplement {
        Some(name) => format!("main-{}+{}", locale.file_stem(), name),
        None => format!("main-{}", locale.file_stem()),
    };
    std::fs::create_dir_all(&args.out_dir)?;
    let fst_path = args.out_dir.join(format!("{}.fst", stem));
    let bincode_path = args.out_dir.join(format!("{}.bincode", stem));
    builder.write(&fst_path, &bincode_path)?;

    println!(
        "Wrote {} and {} ({} lines, {} skipped)",
        fst_path.display(),
        bincode_path.display(),
        lines,
        skipped
    );
    Ok(())
}
