//! datagate CLI - validate and inspect gateway profile documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

use datagate::process::{BASIC_COMPONENT, RETRY_COMPONENT};
use datagate::{GateError, GateProfile, StaticResolver};

#[derive(Parser)]
#[command(name = "datagate")]
#[command(about = "Gateway profile validation and inspection")]
#[command(version)]
struct Cli {
    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProfileArgs {
    /// Path to the profile document
    profile: PathBuf,

    /// Profile identifier (defaults to the file stem)
    #[arg(long)]
    id: Option<String>,

    /// Process components to treat as resolvable, in addition to the
    /// built-ins (basic, retry)
    #[arg(long = "process-component")]
    process_components: Vec<String>,

    /// Resource components to treat as resolvable
    #[arg(long = "resource-component")]
    resource_components: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a profile and fail on any configuration error
    Validate(ProfileArgs),

    /// Print the resources and processes declared by a profile
    Show {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.verbosity);

    let result = match cli.command {
        Commands::Validate(args) => validate(&args).map(|profile| {
            println!(
                "OK: {} resource(s), {} process(es), fingerprint {}",
                profile.resources().count(),
                profile.processes().count(),
                profile.fingerprint()
            );
        }),
        Commands::Show { profile, json } => validate(&profile).map(|loaded| show(&loaded, json)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

fn validate(args: &ProfileArgs) -> Result<std::sync::Arc<GateProfile>, GateError> {
    let mut resolver = StaticResolver::new()
        .with_process(BASIC_COMPONENT)
        .with_process(RETRY_COMPONENT);
    for component in &args.process_components {
        resolver = resolver.with_process(component);
    }
    for component in &args.resource_components {
        resolver = resolver.with_resource(component);
    }

    let document = std::fs::read_to_string(&args.profile)?;
    GateProfile::load(profile_id(args), &document, &resolver)
}

fn profile_id(args: &ProfileArgs) -> String {
    args.id.clone().unwrap_or_else(|| {
        Path::new(&args.profile)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profile".to_string())
    })
}

fn show(profile: &GateProfile, json: bool) {
    if json {
        let summary = serde_json::json!({
            "id": profile.id(),
            "fingerprint": profile.fingerprint(),
            "resources": profile
                .resources()
                .map(|r| serde_json::json!({
                    "name": r.name,
                    "component": r.component,
                    "keys": r.config.entries().keys().collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>(),
            "processes": profile
                .processes()
                .map(|p| serde_json::json!({
                    "name": p.name,
                    "component": p.component,
                    "keys": p.config.entries().keys().collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        return;
    }

    println!("profile {} ({})", profile.id(), profile.fingerprint());
    for resource in profile.resources() {
        println!("  resource {} -> {}", resource.name, resource.component);
        for (key, value) in resource.config.entries() {
            println!("    {} = {}", key, value);
        }
    }
    for process in profile.processes() {
        println!("  process {} -> {}", process.name, process.component);
        for (key, value) in process.config.entries() {
            println!("    {} = {}", key, value);
        }
    }
}

fn init_logging(verbosity: &str) {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
