//! Command-line front end
//!
//! ```text
//! u1convert model.3mf --template u1_template.3mf --support-template u1_template_supports.3mf
//! RUST_LOG=u1convert=debug u1convert model.3mf -o out.3mf --filament 2=#00FF00:PETG ...
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use u1convert::{Converter, ConverterConfig, FilamentOverride, ProjectSummary};

/// Suffix appended to the input file stem when no output path is given
const OUTPUT_SUFFIX: &str = "_U1_Ready.3mf";

#[derive(Parser, Debug)]
#[command(name = "u1convert")]
#[command(version)]
#[command(about = "Convert Bambu Studio multi-colour projects for the Snapmaker U1")]
struct Cli {
    /// Source project (.3mf)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output path; defaults to <INPUT stem>_U1_Ready.3mf next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// U1 template project without supports
    #[arg(long, env = "U1_TEMPLATE")]
    template: PathBuf,

    /// U1 template project with supports enabled
    #[arg(long, env = "U1_SUPPORT_TEMPLATE")]
    support_template: PathBuf,

    /// Reference project listing the available U1 filament profiles
    #[arg(long, env = "U1_PROFILES")]
    profiles: Option<PathBuf>,

    /// Replace a filament colour and/or type: N=#RRGGBB[:TYPE] or N=:TYPE
    #[arg(long = "filament", value_name = "N=COLOUR[:TYPE]")]
    overrides: Vec<FilamentOverride>,

    /// Print what the project uses and exit without converting
    #[arg(long)]
    analyze: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("u1convert=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = %e.kind(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> u1convert::Result<()> {
    let mut config = ConverterConfig::new()
        .with_template(&cli.template)
        .with_support_template(&cli.support_template);
    if let Some(ref profiles) = cli.profiles {
        config = config.with_profile_package(profiles);
    }
    let converter = Converter::from_config(&config)?;

    let source = std::fs::read(&cli.input)?;

    if cli.analyze {
        print_summary(&converter.analyze(&source)?);
        return Ok(());
    }

    let output = converter.convert_with_overrides(&source, &cli.overrides)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    std::fs::write(&output_path, output)?;
    println!("{}", output_path.display());
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    input.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
}

fn print_summary(summary: &ProjectSummary) {
    println!("support: {:?}", summary.support);
    println!(
        "objects: {}, triangles: {}, painted: {}",
        summary.objects, summary.triangles, summary.painted_triangles
    );
    for slot in &summary.filaments {
        println!(
            "  {}: {} {} {} -> {}",
            slot.index + 1,
            slot.colour,
            slot.material,
            slot.brand.as_deref().unwrap_or("-"),
            slot.profile.as_deref().unwrap_or("-"),
        );
    }
}
