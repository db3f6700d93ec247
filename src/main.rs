//! Treeforge - install-tree build front end.
//!
//! Validates arguments, stages a temporary workspace, resolves package
//! repositories into a resolution context, and hands off to the external
//! tree-assembly engine.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use treeforge::config::Config;
use treeforge::engine::{self, BuildParams};
use treeforge::logging::{LogContext, LogFormat, LogLevel};
use treeforge::overrides;
use treeforge::repo::{register_repos, CurlFetcher, RepoOptions, ResolutionContext};
use treeforge::validate;
use treeforge::workspace::Workspace;

#[derive(Parser)]
#[command(name = "treeforge")]
#[command(about = "Build a Linux install tree from package repositories")]
#[command(
    after_help = "QUICK START:\n  treeforge -p Fedora -v 42 -r 42 -s https://mirror/fedora/42/x86_64/os/ ./result\n\nRepos can also come from .repo files (--repo) or mirrorlists (--mirrorlist)."
)]
struct Cli {
    /// Output directory for the finished tree (must not exist unless --force)
    outputdir: PathBuf,

    /// Package source URL or path (repeatable)
    #[arg(short = 's', long = "source")]
    source: Vec<String>,

    /// Mirrorlist URL (repeatable)
    #[arg(long)]
    mirrorlist: Vec<String>,

    /// .repo file, or a directory of .repo files (repeatable)
    #[arg(long = "repo")]
    repo: Vec<PathBuf>,

    /// Enable repos matching this name pattern (repeatable)
    #[arg(long)]
    enablerepo: Vec<String>,

    /// Disable repos matching this name pattern (repeatable)
    #[arg(long)]
    disablerepo: Vec<String>,

    /// Proxy URL for repository fetches
    #[arg(long)]
    proxy: Option<String>,

    /// Release version substituted into repo URLs and templates
    #[arg(long)]
    releasever: Option<String>,

    /// Metadata cache directory (default: <workdir>/dnf.cache)
    #[arg(long)]
    cachedir: Option<PathBuf>,

    /// Log file (in addition to console output)
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Root for auto-generated work directories
    #[arg(long)]
    tmp: Option<PathBuf>,

    /// Use this work directory instead of generating one (never removed)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Overwrite an existing output directory
    #[arg(short, long)]
    force: bool,

    /// Engine configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory holding the engine's templates
    #[arg(long)]
    sharedir: Option<PathBuf>,

    /// Product name
    #[arg(short = 'p', long)]
    product: String,

    /// Product version
    #[arg(short = 'v', long)]
    version: String,

    /// Product release
    #[arg(short = 'r', long)]
    release: String,

    /// Product variant
    #[arg(long)]
    variant: Option<String>,

    /// Bug reporting URL baked into the tree
    #[arg(long)]
    bugurl: Option<String>,

    /// Mark this as a final release build
    #[arg(long)]
    isfinal: bool,

    /// ISO volume id
    #[arg(long)]
    volid: Option<String>,

    /// Architecture to build for (default: host arch)
    #[arg(long)]
    buildarch: Option<String>,

    /// Extra package to install into the tree (repeatable)
    #[arg(long)]
    installpkgs: Vec<String>,

    /// Package pattern to exclude from the tree (repeatable)
    #[arg(long)]
    excludepkgs: Vec<String>,

    /// Root filesystem image size in GiB
    #[arg(long = "rootfs-size", default_value = "2")]
    rootfs_size: u64,

    /// Skip post-install file verification
    #[arg(long)]
    noverify: bool,

    /// Global template variable override, key=value (repeatable)
    #[arg(long = "add-template-var")]
    add_template_var: Vec<String>,

    /// Architecture-specific template variable override, key=value (repeatable)
    #[arg(long = "add-arch-template-var")]
    add_arch_template_var: Vec<String>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load();

    // Input errors surface before any workspace exists
    validate::check_preconditions(
        &cli.source,
        &cli.repo,
        &cli.outputdir,
        cli.force,
        cli.config.as_deref(),
        cli.sharedir.as_deref(),
    )?;
    let repo_files = validate::expand_repo_files(&cli.repo)?;
    let template_vars = overrides::parse_vars(&cli.add_template_var)?;
    let arch_template_vars = overrides::parse_vars(&cli.add_arch_template_var)?;

    let min_level = if cli.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log = LogContext::new(min_level, LogFormat::Tagged, cli.logfile.as_deref())?;
    config.log(&log);

    let tmp_root = cli.tmp.clone().unwrap_or_else(|| config.tmp_root.clone());
    let workspace = Workspace::create(cli.workdir.clone(), &tmp_root)?;
    log.info(&format!("Work directory: {}", workspace.root().display()));

    let cachedir = cli
        .cachedir
        .clone()
        .unwrap_or_else(|| workspace.default_cachedir());
    let proxy = cli.proxy.clone().or_else(|| config.proxy.clone());
    let releasever = cli
        .releasever
        .clone()
        .unwrap_or_else(|| config.releasever.clone());

    let ctx = ResolutionContext::new(
        workspace.installtree_dir(),
        cachedir.clone(),
        workspace.default_logdir(),
        releasever,
        proxy,
    );
    let opts = RepoOptions {
        sources: cli.source.clone(),
        mirrorlists: cli.mirrorlist.clone(),
        repo_files,
        enable_patterns: cli.enablerepo.clone(),
        disable_patterns: cli.disablerepo.clone(),
    };
    let fetcher = CurlFetcher::new(cachedir);

    let ctx = match register_repos(&log, ctx, &opts, &workspace.repo_staging_dir(), &fetcher) {
        Ok(ctx) => ctx,
        Err(e) => {
            log.error(&format!("Repository setup failed: {:#}", e));
            workspace.cleanup();
            std::process::exit(1);
        }
    };

    let params = BuildParams {
        product: cli.product,
        version: cli.version,
        release: cli.release,
        variant: cli.variant,
        bugurl: cli.bugurl,
        isfinal: cli.isfinal,
        volid: cli.volid,
        buildarch: cli.buildarch,
        installpkgs: cli.installpkgs,
        excludepkgs: cli.excludepkgs,
        rootfs_size: cli.rootfs_size,
        sharedir: cli.sharedir,
        config: cli.config,
        template_vars,
        arch_template_vars,
        verify: !cli.noverify,
    };

    if let Err(e) = engine::run_engine(&log, &ctx, &params, &workspace, &cli.outputdir) {
        workspace.cleanup();
        return Err(e);
    }

    log.info(&format!("Install tree written to {}", cli.outputdir.display()));
    workspace.cleanup();
    Ok(())
}
