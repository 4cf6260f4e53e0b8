//! Bootstrap stage definitions
//!
//! The stage table for one build, constructed from the resolved
//! configuration and the prepared workspace. The architecture branch is
//! applied here: host-native toolchains build glibc and its support
//! library in a single pass, while genuinely cross targets must build
//! and install libgcc before the full glibc build, because glibc's own
//! configure step needs a working libgcc for the target.

use super::{CommandSpec, Stage};
use crate::resolver::{Arch, BuildConfig};
use crate::workspace::Workspace;

/// Build the stage plan for this configuration.
///
/// `host` is the architecture the build machine runs on; `None` means it
/// is not one we can target, which always takes the cross branch.
pub fn plan(config: &BuildConfig, ws: &Workspace, host: Option<Arch>) -> Vec<Stage> {
    let cross = host != Some(config.arch);
    let prefix = ws.install_prefix.display().to_string();
    let sysroot = format!("{prefix}/{}", config.triple);
    let jobs = format!("-j{}", config.jobs);

    let configure = |src_dir: &str, extra: &[String]| -> Vec<String> {
        let mut args = vec![
            format!("{}/{}/configure", ws.root.display(), src_dir),
            format!("--prefix={prefix}"),
            format!("--target={}", config.triple),
        ];
        args.extend(config.configure_flags.iter().cloned());
        args.extend(extra.iter().cloned());
        args
    };

    let sh = |args: Vec<String>, cwd: &std::path::Path| -> CommandSpec {
        CommandSpec::new(&args[0], &args[1..], cwd.to_path_buf())
    };

    let mut stages = Vec::with_capacity(7);

    let binutils_dir = format!("binutils-{}", config.versions.binutils);
    stages.push(Stage {
        name: "binutils",
        deps: &[],
        summary: "assembler/linker build failed",
        commands: vec![
            sh(configure(&binutils_dir, &[]), &ws.build_binutils),
            sh(
                vec!["make".into(), jobs.clone()],
                &ws.build_binutils,
            ),
            sh(vec!["make".into(), "install".into()], &ws.build_binutils),
        ],
    });

    let linux_dir = ws.root.join(format!("linux-{}", config.versions.linux));
    stages.push(Stage {
        name: "linux-headers",
        deps: &["binutils"],
        summary: "kernel header install failed",
        commands: vec![sh(
            vec![
                "make".into(),
                format!("ARCH={}", config.kernel_arch),
                format!("INSTALL_HDR_PATH={sysroot}"),
                "headers_install".into(),
            ],
            &linux_dir,
        )],
    });

    stages.push(Stage {
        name: "gcc-bootstrap",
        deps: &["binutils", "linux-headers"],
        summary: "first compiler pass failed",
        commands: vec![
            sh(
                configure(
                    &config.gcc_dir,
                    &["--enable-languages=c,c++".to_string()],
                ),
                &ws.build_gcc,
            ),
            sh(
                vec!["make".into(), jobs.clone(), "all-gcc".into()],
                &ws.build_gcc,
            ),
            sh(
                vec!["make".into(), "install-gcc".into()],
                &ws.build_gcc,
            ),
        ],
    });

    let glibc_dir = format!("glibc-{}", config.versions.glibc);
    let mut startfiles = vec![
        sh(
            {
                let mut args = vec![
                    format!("{}/{}/configure", ws.root.display(), glibc_dir),
                    format!("--prefix={sysroot}"),
                    format!("--host={}", config.triple),
                    format!("--target={}", config.triple),
                    format!("--with-headers={sysroot}/include"),
                    "libc_cv_forced_unwind=yes".to_string(),
                ];
                args.extend(config.configure_flags.iter().cloned());
                args
            },
            &ws.build_glibc,
        ),
        sh(
            vec![
                "make".into(),
                "install-bootstrap-headers=yes".into(),
                "install-headers".into(),
            ],
            &ws.build_glibc,
        ),
        sh(
            vec!["make".into(), jobs.clone(), "csu/subdir_lib".into()],
            &ws.build_glibc,
        ),
        sh(
            vec![
                "install".into(),
                "csu/crt1.o".into(),
                "csu/crti.o".into(),
                "csu/crtn.o".into(),
                format!("{sysroot}/lib"),
            ],
            &ws.build_glibc,
        ),
        // Dummy libc.so so libgcc's configure can link against something
        sh(
            vec![
                format!("{}-gcc", config.triple),
                "-nostdlib".into(),
                "-nostartfiles".into(),
                "-shared".into(),
                "-x".into(),
                "c".into(),
                "/dev/null".into(),
                "-o".into(),
                format!("{sysroot}/lib/libc.so"),
            ],
            &ws.build_glibc,
        ),
    ];
    startfiles.push(sh(
        vec![
            "install".into(),
            "-d".into(),
            format!("{sysroot}/include/gnu"),
        ],
        &ws.build_glibc,
    ));
    startfiles.push(sh(
        vec!["touch".into(), format!("{sysroot}/include/gnu/stubs.h")],
        &ws.build_glibc,
    ));
    stages.push(Stage {
        name: "glibc-startfiles",
        deps: &["gcc-bootstrap"],
        summary: "C runtime headers/startfiles failed",
        commands: startfiles,
    });

    if cross {
        stages.push(Stage {
            name: "libgcc",
            deps: &["glibc-startfiles"],
            summary: "compiler support library failed",
            commands: vec![
                sh(
                    vec!["make".into(), jobs.clone(), "all-target-libgcc".into()],
                    &ws.build_gcc,
                ),
                sh(
                    vec!["make".into(), "install-target-libgcc".into()],
                    &ws.build_gcc,
                ),
            ],
        });
    }

    stages.push(Stage {
        name: "glibc",
        deps: if cross {
            &["libgcc"]
        } else {
            &["glibc-startfiles"]
        },
        summary: "C runtime library build failed",
        commands: vec![
            sh(vec!["make".into(), jobs.clone()], &ws.build_glibc),
            sh(vec!["make".into(), "install".into()], &ws.build_glibc),
        ],
    });

    stages.push(Stage {
        name: "gcc-final",
        deps: &["glibc"],
        summary: "final compiler pass failed",
        commands: vec![
            sh(vec!["make".into(), jobs, "all".into()], &ws.build_gcc),
            sh(vec!["make".into(), "install".into()], &ws.build_gcc),
        ],
    });

    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::execution_order;
    use crate::resolver::{resolve, ResolveOverrides, SourceFlavor};
    use tempfile::tempdir;

    async fn plan_for(arch: Arch, host: Option<Arch>) -> Vec<Stage> {
        let config =
            resolve(arch, SourceFlavor::Official, 10, &ResolveOverrides::default()).unwrap();
        let dir = tempdir().unwrap();
        let ws = Workspace::prepare(&config, dir.path(), false).await.unwrap();
        plan(&config, &ws, host)
    }

    fn pos(stages: &[Stage], order: &[usize], name: &str) -> usize {
        order
            .iter()
            .position(|&i| stages[i].name == name)
            .unwrap_or_else(|| panic!("stage {name} missing"))
    }

    #[tokio::test]
    async fn cross_plan_orders_support_library_before_runtime() {
        let stages = plan_for(Arch::Arm64, Some(Arch::X86_64)).await;
        let order = execution_order(&stages).unwrap();

        assert!(pos(&stages, &order, "binutils") < pos(&stages, &order, "gcc-bootstrap"));
        assert!(pos(&stages, &order, "libgcc") < pos(&stages, &order, "glibc"));
        assert!(pos(&stages, &order, "glibc") < pos(&stages, &order, "gcc-final"));
    }

    #[tokio::test]
    async fn host_plan_skips_support_library_stage() {
        let stages = plan_for(Arch::X86_64, Some(Arch::X86_64)).await;
        assert!(stages.iter().all(|s| s.name != "libgcc"));

        let glibc = stages.iter().find(|s| s.name == "glibc").unwrap();
        assert_eq!(glibc.deps, &["glibc-startfiles"]);

        // Still a valid schedule
        execution_order(&stages).unwrap();
    }

    #[tokio::test]
    async fn unknown_host_takes_cross_branch() {
        let stages = plan_for(Arch::Arm64, None).await;
        assert!(stages.iter().any(|s| s.name == "libgcc"));
    }

    #[tokio::test]
    async fn stage_commands_carry_job_hint() {
        let stages = plan_for(Arch::Arm64, Some(Arch::X86_64)).await;
        let binutils = stages.iter().find(|s| s.name == "binutils").unwrap();
        assert!(binutils.commands[1]
            .args
            .iter()
            .any(|a| a.starts_with("-j")));
    }

    #[tokio::test]
    async fn kernel_headers_use_collapsed_arch() {
        let config = resolve(
            Arch::I686,
            SourceFlavor::Official,
            9,
            &ResolveOverrides::default(),
        )
        .unwrap();
        let dir = tempdir().unwrap();
        let ws = Workspace::prepare(&config, dir.path(), false).await.unwrap();
        let stages = plan(&config, &ws, Some(Arch::X86_64));
        let headers = stages.iter().find(|s| s.name == "linux-headers").unwrap();
        assert!(headers.commands[0].args.contains(&"ARCH=x86".to_string()));
    }
}
