//! Build command: resolve, fetch, bootstrap helpers, run the stage
//! pipeline, verify, and optionally package the result.

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::{ForgeError, ForgeResult};
use crate::fetch::Fetcher;
use crate::helpers::Helpers;
use crate::package::{self, BuildReport, PackageFormat};
use crate::pipeline::{stages, Executor};
use crate::resolver::{self, table, Arch, ResolveOverrides};
use crate::ui::{self, UiContext};
use crate::workspace::Workspace;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

pub async fn execute(
    args: BuildArgs,
    file_config: Config,
    workdir: PathBuf,
    verbose: u8,
) -> ForgeResult<()> {
    let started = Instant::now();
    let ui = UiContext::detect();
    ui::intro(&ui, "crossforge build");

    let overrides = ResolveOverrides {
        jobs: args.jobs.or(file_config.build.jobs),
        gnu_mirror: (file_config.mirrors.gnu != table::DEFAULT_GNU_MIRROR)
            .then(|| file_config.mirrors.gnu.clone()),
    };
    let config = resolver::resolve(args.arch, args.flavor, args.gcc, &overrides)?;

    ui::note(
        &ui,
        "Configuration",
        &format!(
            "target {}\ngcc {} ({} flavor)\njobs {}",
            config.triple, config.versions.gcc, config.flavor, config.jobs
        ),
    );

    let format = package_format(&args, &file_config)?;

    let use_tmpfs = file_config.build.tmpfs && !args.no_tmpfs;
    let mut ws = Workspace::prepare(&config, &workdir, use_tmpfs).await?;

    // Scratch mounts must be released on every exit path before the
    // workspace is torn down, so the run proper lives in its own fn and
    // the interrupt race is armed around all of it, not just the
    // pipeline: helper bootstrap, fetch, and patching also run with
    // mounts held.
    let outcome = with_abort(run(&config, &ws, format, &ui, verbose)).await;
    ws.release_scratch().await;
    let mut report = match outcome {
        Ok(report) => report,
        Err(e) => {
            ui::outro_error(&ui, "Build failed");
            return Err(e);
        }
    };
    report.duration = started.elapsed();

    ws.remove_intermediates(&config).await?;

    let minutes = report.duration.as_secs() / 60;
    let seconds = report.duration.as_secs() % 60;
    ui::step_ok(&ui, &report.compiler_version);
    match &report.artifact {
        Some((path, size)) => ui::note(
            &ui,
            "Artifact",
            &format!("{} ({})", path.display(), package::human_size(*size)),
        ),
        None => ui::note(
            &ui,
            "Installed",
            &report.install_prefix.display().to_string(),
        ),
    }
    ui::outro_success(&ui, &format!("Toolchain ready in {minutes}m {seconds}s"));
    Ok(())
}

/// Everything between workspace preparation and scratch release
async fn run(
    config: &resolver::BuildConfig,
    ws: &Workspace,
    format: Option<PackageFormat>,
    ui: &UiContext,
    verbose: u8,
) -> ForgeResult<BuildReport> {
    let mut helpers = Helpers::new(ws.prebuilts.clone(), config.jobs);
    let mut spinner = ui::TaskSpinner::new(ui);
    spinner.start("Preparing helper tools");
    match helpers.ensure_all().await {
        Ok(()) => spinner.stop("Helper tools ready"),
        Err(e) => {
            spinner.stop_error("Helper tool bootstrap failed");
            return Err(e);
        }
    }

    // Fresh compiler tools land in the install prefix as stages complete;
    // later stages (glibc) need them on PATH alongside the helpers.
    let path_env = format!(
        "{}:{}",
        ws.install_prefix.join("bin").display(),
        helpers.search_path()
    );

    acquire_sources(config, ws, &path_env, ui).await?;
    ws.link_gcc_deps(config).await?;
    ws.apply_patch(config).await?;

    let plan = stages::plan(config, ws, Arch::host());
    info!("Running {} stages", plan.len());
    let executor = Executor::new(path_env.clone(), verbose > 0);
    executor.run(&plan).await?;

    let compiler_version = package::verify(config, ws).await?;

    let artifact = match format {
        Some(format) => Some(package::package(config, ws, format, &path_env).await?),
        None => None,
    };

    Ok(BuildReport {
        duration: std::time::Duration::ZERO,
        compiler_version,
        install_prefix: ws.install_prefix.clone(),
        artifact,
    })
}

async fn acquire_sources(
    config: &resolver::BuildConfig,
    ws: &Workspace,
    path_env: &str,
    ui: &UiContext,
) -> ForgeResult<()> {
    let fetcher = Fetcher::new(ws.sources_dir.clone(), path_env.to_string());
    let bar = ui::fetch_bar(ui, config.sources.len() as u64);
    for spec in &config.sources {
        bar.set_message(format!("{} {}", spec.component.as_str(), spec.version));
        let archive = fetcher.ensure(spec).await?;
        fetcher.extract(spec, &archive, &ws.root).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(())
}

/// Race `work` against process interruption. Losing the race drops the
/// work future, which kills any external child via `kill_on_drop`, and
/// surfaces as `Aborted` so the caller's cleanup still runs.
async fn with_abort<T>(work: impl std::future::Future<Output = ForgeResult<T>>) -> ForgeResult<T> {
    tokio::select! {
        result = work => result,
        _ = shutdown_signal() => Err(ForgeError::Aborted),
    }
}

/// Resolves on SIGINT or SIGTERM. Handlers are installed on first poll,
/// which happens as soon as the surrounding `select!` is awaited.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }
}

/// CLI flag wins over the config-file default; neither means no package
fn package_format(args: &BuildArgs, file_config: &Config) -> ForgeResult<Option<PackageFormat>> {
    if let Some(format) = args.compress {
        return Ok(Some(format));
    }
    match &file_config.package.format {
        Some(name) => PackageFormat::from_str(name, true)
            .map(Some)
            .map_err(|_| ForgeError::ConfigInvalid {
                path: Path::new("package.format").to_path_buf(),
                reason: format!("unknown compression format '{name}' (gz, bz2, zst)"),
            }),
        None => Ok(None),
    }
}
