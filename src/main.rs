use anyhow::Result;
use clap::Parser;
use log::debug;
use npm_workspace::install::StubManifestMode;
use npm_workspace::package_manager::Npm;
use npm_workspace::runtime::{RealRuntime, Runtime};
use npm_workspace::{InstallOptions, Installer, clean};
use std::path::PathBuf;

/// npm-workspace - link local packages into each other's node_modules
///
/// Dependencies listed under "links" in the nearest workspace.json are
/// symlinked (or copied) from their local directory; everything else is
/// installed by npm.
///
/// Examples:
///   npm-workspace install            # Install the module or workspace in the current directory
///   npm-workspace install --copy     # Copy linked modules instead of symlinking them
///   npm-workspace clean              # Remove node_modules of the workspace members
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Change the working directory
    #[arg(long = "chdir", short = 'C', value_name = "PATH", global = true)]
    pub chdir: Option<PathBuf>,

    /// Log progress and show package manager output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install the module (or every module of the workspace) using local links
    Install(InstallArgs),

    /// Remove node_modules directories created by install
    Clean,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Copy linked modules instead of symlinking them
    #[arg(long)]
    pub copy: bool,

    /// Leave .git, .hg and .svn directories out of copies
    #[arg(long = "strip-vcs")]
    pub strip_vcs: bool,

    /// Skip devDependencies and peer dependency linking
    #[arg(long)]
    pub production: bool,

    /// Look for workspace modules in nested directories
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Create relative symlinks
    #[arg(long)]
    pub relative: bool,

    /// Manifest written into placeholder directories while npm runs
    #[arg(long = "stub-manifest", value_enum, default_value_t = StubManifestMode::Auto)]
    pub stub_manifest: StubManifestMode,

    /// Package manager executable
    #[arg(long, env = "NPM_WORKSPACE_NPM", value_name = "PATH", default_value = "npm")]
    pub npm: PathBuf,
}

impl InstallArgs {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            copy: self.copy,
            strip_vcs: self.strip_vcs,
            production: self.production,
            recursive: self.recursive,
            relative_links: self.relative,
            stub_manifest: self.stub_manifest,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(npm_workspace::error::exit_code(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let runtime = RealRuntime;
    let cwd = runtime.current_dir()?;
    let dir = match cli.chdir {
        Some(path) => runtime.canonicalize(&cwd.join(path))?,
        None => cwd,
    };
    debug!("Working directory {:?}", dir);

    match cli.command {
        Commands::Install(args) => {
            let npm = Npm::new(&args.npm, cli.verbose);
            let installer = Installer::new(&runtime, &npm, args.options());
            let session = installer.install(&dir).await?;
            println!(
                "Installed {} module(s), happy coding!",
                session.history().len()
            );
        }
        Commands::Clean => {
            let removed = clean(&runtime, &dir)?;
            println!("Removed {} node_modules director(ies)", removed.len());
        }
    }
    Ok(())
}
