//! Resolve command: print the pinned configuration without any I/O

use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::config::Config;
use crate::error::ForgeResult;
use crate::resolver::{self, table, BuildConfig, ResolveOverrides};
use console::style;

pub async fn execute(args: ResolveArgs, file_config: Config) -> ForgeResult<()> {
    let overrides = ResolveOverrides {
        jobs: file_config.build.jobs,
        gnu_mirror: (file_config.mirrors.gnu != table::DEFAULT_GNU_MIRROR)
            .then(|| file_config.mirrors.gnu.clone()),
    };
    let config = resolver::resolve(args.arch, args.flavor, args.gcc, &overrides)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Table => print_table(&config),
    }
    Ok(())
}

fn print_table(config: &BuildConfig) {
    println!("{}", style("Resolved configuration").cyan().bold());
    println!("  target       {}", config.triple);
    println!("  kernel arch  {}", config.kernel_arch);
    println!(
        "  flavor       {} (gcc {}.x)",
        config.flavor, config.version
    );
    println!("  patch        {}", config.patch.patch_name());
    println!("  jobs         {}", config.jobs);
    println!();
    println!("{}", style("Components").cyan().bold());
    println!("  gcc          {}", config.versions.gcc);
    println!("  binutils     {}", config.versions.binutils);
    println!("  glibc        {}", config.versions.glibc);
    println!("  linux        {}", config.versions.linux);
    println!("  gmp          {}", config.versions.gmp);
    println!("  mpfr         {}", config.versions.mpfr);
    if config.isl_bundled {
        println!("  isl          {} (bundled in gcc tree)", config.versions.isl);
    } else {
        println!("  isl          {}", config.versions.isl);
    }
    println!();
    println!("{}", style("Sources").cyan().bold());
    for spec in &config.sources {
        println!("  {}", spec.url);
    }
}
