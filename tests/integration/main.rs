//! Integration tests for crossforge

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn crossforge() -> Command {
        cargo_bin_cmd!("crossforge")
    }

    #[test]
    fn help_displays() {
        crossforge()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cross toolchain"));
    }

    #[test]
    fn version_displays() {
        crossforge()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("crossforge"));
    }

    #[test]
    fn resolve_prints_pinned_versions() {
        crossforge()
            .args(["resolve", "--arch", "arm64", "--gcc", "10"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("aarch64-linux-gnu")
                    .and(predicate::str::contains("10.5.0"))
                    .and(predicate::str::contains("binutils")),
            );
    }

    #[test]
    fn resolve_json_is_parseable() {
        let output = crossforge()
            .args(["resolve", "--arch", "arm", "--gcc", "9", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["triple"], "arm-linux-gnueabihf");
        assert_eq!(value["kernel_arch"], "arm");
    }

    #[test]
    fn resolve_rejects_unsupported_version() {
        crossforge()
            .args(["resolve", "--arch", "arm64", "--gcc", "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not a pinned release"));
    }

    #[test]
    fn resolve_rejects_x86_64_below_floor() {
        crossforge()
            .args(["resolve", "--arch", "x86_64", "--gcc", "4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot target x86_64"));
    }

    #[test]
    fn resolve_explains_discontinued_fork() {
        crossforge()
            .args(["resolve", "--arch", "arm64", "--flavor", "fork", "--gcc", "10"])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("discontinued")
                    .and(predicate::str::contains("official")),
            );
    }

    #[test]
    fn build_rejects_bad_combination_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        crossforge()
            .args(["build", "--arch", "x86_64", "--gcc", "4"])
            .args(["--workdir", tmp.path().to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot target x86_64"));
        // Resolution failed before workspace preparation
        assert!(!tmp.path().join("build-gcc").exists());
        assert!(!tmp.path().join("sources").exists());
    }

    #[test]
    fn build_refuses_unclean_workspace() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("build-gcc")).unwrap();
        crossforge()
            .args(["build", "--arch", "arm64", "--gcc", "10", "--no-tmpfs"])
            .args(["--workdir", tmp.path().to_str().unwrap()])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("not clean")
                    .and(predicate::str::contains("crossforge clean")),
            );
    }

    #[test]
    fn clean_runs_in_empty_dir() {
        let tmp = TempDir::new().unwrap();
        crossforge()
            .arg("clean")
            .args(["--workdir", tmp.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to clean"));
    }

    #[test]
    fn clean_removes_stale_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("build-binutils")).unwrap();
        std::fs::write(tmp.path().join("glibc-2.33.tar.xz"), b"x").unwrap();
        crossforge()
            .arg("clean")
            .args(["--workdir", tmp.path().to_str().unwrap()])
            .assert()
            .success();
        assert!(!tmp.path().join("build-binutils").exists());
        assert!(!tmp.path().join("glibc-2.33.tar.xz").exists());
    }

    #[test]
    fn status_runs() {
        crossforge().arg("status").assert().success();
    }
}
