use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use owners::{OsFileSystem, OwnersFinder};
use owners_finder::interactive::run_session;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    version = std::env!("CARGO_PKG_VERSION"),
    name = "owners-finder",
    about = "Find reviewers for a set of changed files from OWNERS files"
)]
struct Cli {
    #[arg(
        required = true,
        help = "Changed files to find reviewers for, relative to the repository root."
    )]
    files: Vec<String>,
    #[arg(long, help = "Path to repository root. Defaults to the enclosing git work tree.")]
    repo_root: Option<String>,
    #[arg(
        long,
        help = "Author of the change; files the author may approve need no reviewer."
    )]
    author: Option<String>,
    #[arg(long, help = "Disable ANSI colors in output.")]
    no_color: bool,
}

fn main() -> anyhow::Result<()> {
    setup_logger();
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    match run(cli) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            tracing::error!("Error: {:?}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let repo_root = match cli.repo_root {
        Some(repo_root) => PathBuf::from(repo_root),
        None => discover_repo_root()?,
    };
    tracing::debug!(repo_root = %repo_root.display(), "resolved repository root");

    let finder = OwnersFinder::new(OsFileSystem, repo_root, cli.files, cli.author.as_deref())?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_session(finder, stdin.lock(), &mut stdout)
}

fn discover_repo_root() -> anyhow::Result<PathBuf> {
    match gix::discover(".") {
        Ok(repo) => repo
            .work_dir()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("enclosing git repository has no work tree")),
        Err(_) => Ok(std::env::current_dir()?),
    }
}

fn setup_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}
