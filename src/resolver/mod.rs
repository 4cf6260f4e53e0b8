//! Configuration resolution
//!
//! Turns a requested (architecture, source flavor, GCC major) triple into an
//! immutable, fully pinned [`BuildConfig`] before any I/O happens. Every
//! later component consumes the resolver's output verbatim; none re-derives
//! flavor- or version-specific logic from the raw selectors.

pub mod table;

use crate::error::{ForgeError, ForgeResult};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Lowest GCC major that produces a working x86_64 cross compiler.
/// Older releases mis-link x86_64 startup objects; refuse them outright.
const X86_64_FLOOR: u32 = 6;

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm,
    Arm64,
    I686,
    #[value(name = "x86_64")]
    X86_64,
}

impl Arch {
    pub const ALL: [Self; 4] = [Self::Arm, Self::Arm64, Self::I686, Self::X86_64];

    /// Canonical GNU target triple for this architecture
    pub fn triple(self) -> &'static str {
        match self {
            Self::Arm => "arm-linux-gnueabihf",
            Self::Arm64 => "aarch64-linux-gnu",
            Self::I686 => "i686-linux-gnu",
            Self::X86_64 => "x86_64-linux-gnu",
        }
    }

    /// Kernel-header architecture tag. The x86 family collapses to a
    /// single tag; arm and arm64 map 1:1.
    pub fn kernel_arch(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::I686 | Self::X86_64 => "x86",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::I686 => "i686",
            Self::X86_64 => "x86_64",
        }
    }

    /// The architecture the build host runs on, if it is one we can target
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "arm" => Some(Self::Arm),
            "aarch64" => Some(Self::Arm64),
            "x86" => Some(Self::I686),
            "x86_64" => Some(Self::X86_64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(Self::Arm),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "i686" => Ok(Self::I686),
            "x86_64" => Ok(Self::X86_64),
            other => Err(ForgeError::InvalidArchitecture(other.to_string())),
        }
    }
}

/// Which GCC lineage to build from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFlavor {
    /// Upstream GNU releases from ftp.gnu.org
    Official,
    /// Linaro/Arm maintained releases
    Fork,
}

impl fmt::Display for SourceFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Official => f.write_str("official"),
            Self::Fork => f.write_str("fork"),
        }
    }
}

/// Which source patch a GCC tree needs. Successive glibc releases hid
/// or removed system headers (ustat.h, sys/sysctl.h, cyclades.h) that
/// older libsanitizer sources still include; each era gets one patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchEra {
    Gcc4,
    Gcc6Through8,
    Gcc9,
    Gcc10Plus,
}

impl PatchEra {
    pub fn for_major(major: u32) -> Self {
        match major {
            0..=5 => Self::Gcc4,
            6..=8 => Self::Gcc6Through8,
            9 => Self::Gcc9,
            _ => Self::Gcc10Plus,
        }
    }

    /// File name of the embedded patch, used in error reporting
    pub fn patch_name(self) -> &'static str {
        match self {
            Self::Gcc4 => "gcc4-ucontext.patch",
            Self::Gcc6Through8 => "gcc6-8-ustat.patch",
            Self::Gcc9 => "gcc9-sysctl.patch",
            Self::Gcc10Plus => "gcc10-cyclades.patch",
        }
    }

    /// Unified-diff text of the patch, embedded at compile time
    pub fn patch_text(self) -> &'static str {
        match self {
            Self::Gcc4 => include_str!("../../patches/gcc4-ucontext.patch"),
            Self::Gcc6Through8 => include_str!("../../patches/gcc6-8-ustat.patch"),
            Self::Gcc9 => include_str!("../../patches/gcc9-sysctl.patch"),
            Self::Gcc10Plus => include_str!("../../patches/gcc10-cyclades.patch"),
        }
    }
}

/// One of the seven upstream components a toolchain is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Binutils,
    Gcc,
    Linux,
    Glibc,
    Gmp,
    Mpfr,
    Isl,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binutils => "binutils",
            Self::Gcc => "gcc",
            Self::Linux => "linux",
            Self::Glibc => "glibc",
            Self::Gmp => "gmp",
            Self::Mpfr => "mpfr",
            Self::Isl => "isl",
        }
    }
}

/// Archive compression format, keyed purely by file extension.
///
/// The set is closed: the resolver's table is the only producer, so an
/// unrecognized extension is unrepresentable rather than a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveExt {
    Gz,
    Bz2,
    Xz,
}

impl ArchiveExt {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gz => "gz",
            Self::Bz2 => "bz2",
            Self::Xz => "xz",
        }
    }

    /// Decompression filter handed to `tar -I`. pigz and pbzip2 come
    /// from the prebuilt helper cache; xz is expected on the host.
    pub fn decompressor(self) -> &'static str {
        match self {
            Self::Gz => "pigz",
            Self::Bz2 => "pbzip2",
            Self::Xz => "xz -T 0",
        }
    }
}

/// How an archive's top-level directory maps onto the canonical layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnpackMode {
    /// Strip the single leading path component while untarring
    StripTop,
    /// Unpack whole, then rename the archive's top-level directory to the
    /// canonical name. Used for fork GCC archives, whose top directory
    /// carries the vendor's own naming.
    Rename { top_level: String },
}

/// Everything the acquisition manager needs to fetch and unpack one
/// component: produced once by the resolver, never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSpec {
    pub component: Component,
    pub version: String,
    /// Archive file name under `sources/`
    pub file_name: String,
    pub url: String,
    pub ext: ArchiveExt,
    pub unpack: UnpackMode,
    /// Canonical extracted directory name at the workspace root
    pub dir_name: String,
}

/// Resolved component versions for one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentVersions {
    pub gcc: String,
    pub binutils: String,
    pub isl: String,
    pub glibc: String,
    pub gmp: String,
    pub mpfr: String,
    pub linux: String,
}

/// Explicit overrides accepted by [`resolve`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOverrides {
    /// Job-parallelism hint; defaults to CPU count + 1
    pub jobs: Option<u32>,
    /// Alternate GNU mirror base (defaults to ftp.gnu.org)
    pub gnu_mirror: Option<String>,
}

/// Immutable, fully pinned build configuration.
///
/// Every field is determined by (arch, flavor, version) plus explicit
/// overrides; no partial states are observable outside the resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildConfig {
    pub arch: Arch,
    pub flavor: SourceFlavor,
    /// Requested GCC major
    pub version: u32,
    pub triple: String,
    pub kernel_arch: &'static str,
    pub versions: ComponentVersions,
    /// Fetch/unpack plan, one entry per component that ships as an archive
    pub sources: Vec<SourceSpec>,
    /// Logical name of the compiler archive (GCC_TAR)
    pub gcc_tar: String,
    /// Canonical extracted GCC directory name
    pub gcc_dir: String,
    /// True when the fork snapshot ships ISL pre-extracted inside the
    /// compiler tree instead of as a separate archive
    pub isl_bundled: bool,
    pub patch: PatchEra,
    /// Configure flags shared by every staged component
    pub configure_flags: Vec<String>,
    /// Job-parallelism hint passed to every external build system
    pub jobs: u32,
}

/// Resolve a requested (architecture, flavor, version) triple into a
/// concrete build configuration, or fail before any I/O.
pub fn resolve(
    arch: Arch,
    flavor: SourceFlavor,
    version: u32,
    overrides: &ResolveOverrides,
) -> ForgeResult<BuildConfig> {
    if arch == Arch::X86_64 && version < X86_64_FLOOR {
        return Err(ForgeError::VersionFloor {
            arch: arch.as_str().to_string(),
            version,
            floor: X86_64_FLOOR,
        });
    }

    let row = match table::lookup(flavor, version) {
        Some(table::Support::Pinned(row)) => row,
        Some(table::Support::Discontinued(reason)) => {
            return Err(ForgeError::DiscontinuedVersion {
                flavor: flavor.to_string(),
                version,
                reason: reason.to_string(),
            });
        }
        None => {
            return Err(ForgeError::UnsupportedVersion {
                flavor: flavor.to_string(),
                version,
            });
        }
    };

    let gnu_mirror = overrides
        .gnu_mirror
        .clone()
        .unwrap_or_else(|| table::DEFAULT_GNU_MIRROR.to_string());

    let sources = table::source_specs(flavor, version, row, &gnu_mirror);
    let gcc_spec = sources
        .iter()
        .find(|s| s.component == Component::Gcc)
        .expect("table always pins a compiler archive");

    let jobs = overrides
        .jobs
        .unwrap_or_else(|| num_cpus::get() as u32 + 1);

    Ok(BuildConfig {
        arch,
        flavor,
        version,
        triple: arch.triple().to_string(),
        kernel_arch: arch.kernel_arch(),
        versions: ComponentVersions {
            gcc: row.gcc.to_string(),
            binutils: row.binutils.to_string(),
            isl: row.isl.to_string(),
            glibc: row.glibc.to_string(),
            gmp: table::GMP_VERSION.to_string(),
            mpfr: table::MPFR_VERSION.to_string(),
            linux: table::LINUX_VERSION.to_string(),
        },
        gcc_tar: gcc_spec.file_name.clone(),
        gcc_dir: gcc_spec.dir_name.clone(),
        isl_bundled: table::isl_bundled(flavor, version),
        sources,
        patch: PatchEra::for_major(version),
        configure_flags: vec![
            "--disable-multilib".to_string(),
            "--disable-nls".to_string(),
        ],
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> ResolveOverrides {
        ResolveOverrides::default()
    }

    #[test]
    fn resolve_is_deterministic() {
        for (flavor, version) in [
            (SourceFlavor::Official, 4),
            (SourceFlavor::Official, 9),
            (SourceFlavor::Official, 10),
            (SourceFlavor::Fork, 7),
            (SourceFlavor::Fork, 9),
        ] {
            let a = resolve(Arch::Arm64, flavor, version, &no_overrides()).unwrap();
            let b = resolve(Arch::Arm64, flavor, version, &no_overrides()).unwrap();
            assert_eq!(a, b, "resolve must be deterministic for {flavor} {version}");
        }
    }

    #[test]
    fn arm64_official_10_pins_expected_row() {
        let config = resolve(Arch::Arm64, SourceFlavor::Official, 10, &no_overrides()).unwrap();
        assert_eq!(config.triple, "aarch64-linux-gnu");
        assert_eq!(config.kernel_arch, "arm64");
        assert_eq!(config.versions.gcc, "10.5.0");
        assert_eq!(config.patch, PatchEra::Gcc10Plus);
        assert!(!config.isl_bundled);
    }

    #[test]
    fn x86_family_collapses_kernel_arch() {
        let a = resolve(Arch::X86_64, SourceFlavor::Official, 9, &no_overrides()).unwrap();
        let b = resolve(Arch::I686, SourceFlavor::Official, 9, &no_overrides()).unwrap();
        assert_eq!(a.kernel_arch, "x86");
        assert_eq!(b.kernel_arch, "x86");
        assert_ne!(a.triple, b.triple);
    }

    #[test]
    fn x86_64_floor_refused_for_both_flavors() {
        for flavor in [SourceFlavor::Official, SourceFlavor::Fork] {
            let err = resolve(Arch::X86_64, flavor, 4, &no_overrides()).unwrap_err();
            assert!(
                matches!(err, ForgeError::VersionFloor { floor: 6, .. }),
                "expected floor error, got: {err}"
            );
        }
    }

    #[test]
    fn unsupported_version_is_lookup_miss() {
        let err = resolve(Arch::Arm, SourceFlavor::Official, 5, &no_overrides()).unwrap_err();
        assert!(matches!(err, ForgeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn discontinued_fork_is_descriptive() {
        let err = resolve(Arch::Arm64, SourceFlavor::Fork, 10, &no_overrides()).unwrap_err();
        match err {
            ForgeError::DiscontinuedVersion { reason, .. } => {
                assert!(reason.contains("official"), "reason should steer the user");
            }
            other => panic!("expected DiscontinuedVersion, got: {other}"),
        }
    }

    #[test]
    fn patch_era_selection() {
        assert_eq!(PatchEra::for_major(4), PatchEra::Gcc4);
        assert_eq!(PatchEra::for_major(6), PatchEra::Gcc6Through8);
        assert_eq!(PatchEra::for_major(8), PatchEra::Gcc6Through8);
        assert_eq!(PatchEra::for_major(9), PatchEra::Gcc9);
        assert_eq!(PatchEra::for_major(10), PatchEra::Gcc10Plus);
        assert_eq!(PatchEra::for_major(12), PatchEra::Gcc10Plus);
    }

    #[test]
    fn patch_text_is_nonempty_for_every_era() {
        for era in [
            PatchEra::Gcc4,
            PatchEra::Gcc6Through8,
            PatchEra::Gcc9,
            PatchEra::Gcc10Plus,
        ] {
            assert!(era.patch_text().contains("--- a/"), "{:?}", era);
        }
    }

    #[test]
    fn jobs_default_and_override() {
        let defaulted = resolve(Arch::Arm, SourceFlavor::Official, 9, &no_overrides()).unwrap();
        assert_eq!(defaulted.jobs, num_cpus::get() as u32 + 1);

        let overridden = resolve(
            Arch::Arm,
            SourceFlavor::Official,
            9,
            &ResolveOverrides {
                jobs: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(overridden.jobs, 3);
    }

    #[test]
    fn arch_from_str() {
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert!(matches!(
            "mips".parse::<Arch>(),
            Err(ForgeError::InvalidArchitecture(_))
        ));
    }
}
