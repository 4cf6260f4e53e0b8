//! The (flavor, version) pin table
//!
//! One declarative table maps every supported GCC major to the exact
//! upstream component versions it is built with, including the download
//! scheme for each archive. Unsupported combinations are explicit
//! [`Support::Discontinued`] sentinels, not omissions. This module is the
//! single place where flavor- and version-specific branching lives.

use super::{ArchiveExt, Component, SourceFlavor, SourceSpec, UnpackMode};

/// Default GNU mirror base for official releases
pub const DEFAULT_GNU_MIRROR: &str = "https://ftp.gnu.org/gnu";

const KERNEL_MIRROR: &str = "https://cdn.kernel.org/pub/linux/kernel/v5.x";
const ISL_MIRROR: &str = "https://libisl.sourceforge.io";
const LINARO_MIRROR: &str = "https://releases.linaro.org/components/toolchain/gcc-linaro";
const ARM_MIRROR: &str = "https://developer.arm.com/-/media/Files/downloads/gnu-a";

/// Fork releases at/above this major moved from the Linaro release area to
/// the Arm source-snapshot scheme, and started bundling ISL in-tree.
const FORK_HANDOVER_MAJOR: u32 = 8;

/// Globally pinned versions, identical across every table row
pub const GMP_VERSION: &str = "6.2.1";
pub const MPFR_VERSION: &str = "4.1.0";
pub const LINUX_VERSION: &str = "5.10.185";

/// Per-version pins for the components the table controls
#[derive(Debug, Clone, Copy)]
pub struct VersionRow {
    pub gcc: &'static str,
    pub binutils: &'static str,
    pub isl: &'static str,
    pub glibc: &'static str,
}

/// One cell of the support table
#[derive(Debug, Clone, Copy)]
pub enum Support {
    Pinned(VersionRow),
    /// Explicitly ended combination; the message tells the user where to go
    Discontinued(&'static str),
}

const FORK_ENDED: &str = "the Linaro/Arm lineage ended with the 9 series when \
    maintenance moved back upstream; build this release from the official flavor";

const OFFICIAL: &[(u32, Support)] = &[
    (
        4,
        Support::Pinned(VersionRow {
            gcc: "4.9.4",
            binutils: "2.28",
            isl: "0.12.2",
            glibc: "2.19",
        }),
    ),
    (
        6,
        Support::Pinned(VersionRow {
            gcc: "6.5.0",
            binutils: "2.31.1",
            isl: "0.16.1",
            glibc: "2.27",
        }),
    ),
    (
        7,
        Support::Pinned(VersionRow {
            gcc: "7.5.0",
            binutils: "2.31.1",
            isl: "0.16.1",
            glibc: "2.27",
        }),
    ),
    (
        8,
        Support::Pinned(VersionRow {
            gcc: "8.5.0",
            binutils: "2.32",
            isl: "0.18",
            glibc: "2.28",
        }),
    ),
    (
        9,
        Support::Pinned(VersionRow {
            gcc: "9.5.0",
            binutils: "2.34",
            isl: "0.20",
            glibc: "2.31",
        }),
    ),
    (
        10,
        Support::Pinned(VersionRow {
            gcc: "10.5.0",
            binutils: "2.36.1",
            isl: "0.22.1",
            glibc: "2.33",
        }),
    ),
    (
        11,
        Support::Pinned(VersionRow {
            gcc: "11.4.0",
            binutils: "2.38",
            isl: "0.24",
            glibc: "2.35",
        }),
    ),
    (
        12,
        Support::Pinned(VersionRow {
            gcc: "12.3.0",
            binutils: "2.40",
            isl: "0.24",
            glibc: "2.36",
        }),
    ),
];

const FORK: &[(u32, Support)] = &[
    (
        4,
        Support::Pinned(VersionRow {
            gcc: "4.9.4-2017.01",
            binutils: "2.28",
            isl: "0.12.2",
            glibc: "2.19",
        }),
    ),
    (
        6,
        Support::Pinned(VersionRow {
            gcc: "6.5.0-2018.12",
            binutils: "2.31.1",
            isl: "0.16.1",
            glibc: "2.27",
        }),
    ),
    (
        7,
        Support::Pinned(VersionRow {
            gcc: "7.5.0-2019.12",
            binutils: "2.31.1",
            isl: "0.16.1",
            glibc: "2.27",
        }),
    ),
    (
        8,
        Support::Pinned(VersionRow {
            gcc: "8.3-2019.03",
            binutils: "2.32",
            isl: "0.18",
            glibc: "2.28",
        }),
    ),
    (
        9,
        Support::Pinned(VersionRow {
            gcc: "9.2-2019.12",
            binutils: "2.34",
            isl: "0.20",
            glibc: "2.31",
        }),
    ),
    (10, Support::Discontinued(FORK_ENDED)),
    (11, Support::Discontinued(FORK_ENDED)),
    (12, Support::Discontinued(FORK_ENDED)),
];

/// Look up the support cell for a (flavor, major) pair
pub fn lookup(flavor: SourceFlavor, version: u32) -> Option<&'static Support> {
    let rows = match flavor {
        SourceFlavor::Official => OFFICIAL,
        SourceFlavor::Fork => FORK,
    };
    rows.iter().find(|(v, _)| *v == version).map(|(_, s)| s)
}

/// Whether the fork snapshot for this major ships ISL inside the GCC tree
pub fn isl_bundled(flavor: SourceFlavor, version: u32) -> bool {
    flavor == SourceFlavor::Fork && version >= FORK_HANDOVER_MAJOR
}

/// Build the full fetch/unpack plan for one table row.
///
/// The compiler archive is the only one whose scheme branches: official
/// releases come from the GNU mirror, fork releases below the handover
/// major from the Linaro release area, and at/above it from the Arm
/// source-snapshot area (with a vendor-named top directory that must be
/// renamed rather than stripped).
pub fn source_specs(
    flavor: SourceFlavor,
    version: u32,
    row: &VersionRow,
    gnu_mirror: &str,
) -> Vec<SourceSpec> {
    let mut specs = Vec::with_capacity(7);

    specs.push(gcc_spec(flavor, version, row, gnu_mirror));

    let binutils_ext = legacy_ext(row.binutils, "2.28");
    specs.push(gnu_spec(
        Component::Binutils,
        row.binutils,
        binutils_ext,
        gnu_mirror,
    ));

    specs.push(SourceSpec {
        component: Component::Linux,
        version: LINUX_VERSION.to_string(),
        file_name: format!("linux-{LINUX_VERSION}.tar.xz"),
        url: format!("{KERNEL_MIRROR}/linux-{LINUX_VERSION}.tar.xz"),
        ext: ArchiveExt::Xz,
        unpack: UnpackMode::StripTop,
        dir_name: format!("linux-{LINUX_VERSION}"),
    });

    specs.push(gnu_spec(
        Component::Glibc,
        row.glibc,
        ArchiveExt::Xz,
        gnu_mirror,
    ));
    specs.push(gnu_spec(
        Component::Gmp,
        GMP_VERSION,
        ArchiveExt::Xz,
        gnu_mirror,
    ));
    specs.push(gnu_spec(
        Component::Mpfr,
        MPFR_VERSION,
        ArchiveExt::Xz,
        gnu_mirror,
    ));

    if !isl_bundled(flavor, version) {
        let ext = legacy_ext(row.isl, "0.12.2");
        let file_name = format!("isl-{}.tar.{}", row.isl, ext.as_str());
        specs.push(SourceSpec {
            component: Component::Isl,
            version: row.isl.to_string(),
            url: format!("{ISL_MIRROR}/{file_name}"),
            file_name,
            ext,
            unpack: UnpackMode::StripTop,
            dir_name: format!("isl-{}", row.isl),
        });
    }

    specs
}

fn gcc_spec(
    flavor: SourceFlavor,
    version: u32,
    row: &VersionRow,
    gnu_mirror: &str,
) -> SourceSpec {
    match flavor {
        SourceFlavor::Official => {
            let ext = legacy_ext(row.gcc, "4.9.4");
            let file_name = format!("gcc-{}.tar.{}", row.gcc, ext.as_str());
            SourceSpec {
                component: Component::Gcc,
                version: row.gcc.to_string(),
                url: format!("{gnu_mirror}/gcc/gcc-{}/{file_name}", row.gcc),
                file_name,
                ext,
                unpack: UnpackMode::StripTop,
                dir_name: format!("gcc-{}", row.gcc),
            }
        }
        SourceFlavor::Fork if version < FORK_HANDOVER_MAJOR => {
            let top_level = format!("gcc-linaro-{}", row.gcc);
            SourceSpec {
                component: Component::Gcc,
                version: row.gcc.to_string(),
                file_name: format!("{top_level}.tar.xz"),
                url: format!("{LINARO_MIRROR}/{v}/{top_level}.tar.xz", v = row.gcc),
                ext: ArchiveExt::Xz,
                unpack: UnpackMode::Rename { top_level },
                dir_name: format!("gcc-{}", row.gcc),
            }
        }
        SourceFlavor::Fork => {
            let top_level = format!("gcc-arm-src-snapshot-{}", row.gcc);
            SourceSpec {
                component: Component::Gcc,
                version: row.gcc.to_string(),
                file_name: format!("{top_level}.tar.xz"),
                url: format!("{ARM_MIRROR}/{v}/srcrel/{top_level}.tar.xz", v = row.gcc),
                ext: ArchiveExt::Xz,
                unpack: UnpackMode::Rename { top_level },
                dir_name: format!("gcc-{}", row.gcc),
            }
        }
    }
}

fn gnu_spec(
    component: Component,
    version: &str,
    ext: ArchiveExt,
    gnu_mirror: &str,
) -> SourceSpec {
    let name = component.as_str();
    let file_name = format!("{name}-{version}.tar.{}", ext.as_str());
    SourceSpec {
        component,
        version: version.to_string(),
        url: format!("{gnu_mirror}/{name}/{file_name}"),
        file_name,
        ext,
        unpack: UnpackMode::StripTop,
        dir_name: format!("{name}-{version}"),
    }
}

/// Releases from before the upstream switch to xz still ship as bz2
fn legacy_ext(version: &str, last_bz2: &str) -> ArchiveExt {
    if version.starts_with(last_bz2) {
        ArchiveExt::Bz2
    } else {
        ArchiveExt::Xz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned(flavor: SourceFlavor, version: u32) -> VersionRow {
        match lookup(flavor, version) {
            Some(Support::Pinned(row)) => *row,
            other => panic!("expected pinned row for {flavor:?} {version}, got {other:?}"),
        }
    }

    #[test]
    fn every_official_major_is_pinned() {
        for version in [4, 6, 7, 8, 9, 10, 11, 12] {
            pinned(SourceFlavor::Official, version);
        }
        assert!(lookup(SourceFlavor::Official, 5).is_none());
    }

    #[test]
    fn fork_past_handover_is_sentinel_not_miss() {
        for version in [10, 11, 12] {
            assert!(matches!(
                lookup(SourceFlavor::Fork, version),
                Some(Support::Discontinued(_))
            ));
        }
    }

    #[test]
    fn official_gcc_uses_gnu_mirror() {
        let row = pinned(SourceFlavor::Official, 10);
        let specs = source_specs(SourceFlavor::Official, 10, &row, DEFAULT_GNU_MIRROR);
        let gcc = specs.iter().find(|s| s.component == Component::Gcc).unwrap();
        assert_eq!(
            gcc.url,
            "https://ftp.gnu.org/gnu/gcc/gcc-10.5.0/gcc-10.5.0.tar.xz"
        );
        assert_eq!(gcc.unpack, UnpackMode::StripTop);
        assert_eq!(gcc.dir_name, "gcc-10.5.0");
    }

    #[test]
    fn official_gcc4_ships_as_bz2() {
        let row = pinned(SourceFlavor::Official, 4);
        let specs = source_specs(SourceFlavor::Official, 4, &row, DEFAULT_GNU_MIRROR);
        let gcc = specs.iter().find(|s| s.component == Component::Gcc).unwrap();
        assert_eq!(gcc.ext, ArchiveExt::Bz2);
        assert!(gcc.file_name.ends_with(".tar.bz2"));
    }

    #[test]
    fn fork_below_handover_uses_linaro_scheme() {
        let row = pinned(SourceFlavor::Fork, 7);
        let specs = source_specs(SourceFlavor::Fork, 7, &row, DEFAULT_GNU_MIRROR);
        let gcc = specs.iter().find(|s| s.component == Component::Gcc).unwrap();
        assert!(gcc.url.starts_with("https://releases.linaro.org/"));
        assert_eq!(gcc.file_name, "gcc-linaro-7.5.0-2019.12.tar.xz");
        assert_eq!(
            gcc.unpack,
            UnpackMode::Rename {
                top_level: "gcc-linaro-7.5.0-2019.12".to_string()
            }
        );
        // Normalized layout across flavors
        assert_eq!(gcc.dir_name, "gcc-7.5.0-2019.12");
    }

    #[test]
    fn fork_at_handover_uses_arm_snapshot_scheme() {
        let row = pinned(SourceFlavor::Fork, 9);
        let specs = source_specs(SourceFlavor::Fork, 9, &row, DEFAULT_GNU_MIRROR);
        let gcc = specs.iter().find(|s| s.component == Component::Gcc).unwrap();
        assert!(gcc.url.starts_with("https://developer.arm.com/"));
        assert!(gcc.file_name.starts_with("gcc-arm-src-snapshot-"));
    }

    #[test]
    fn bundled_isl_has_no_archive() {
        assert!(isl_bundled(SourceFlavor::Fork, 8));
        assert!(!isl_bundled(SourceFlavor::Fork, 7));
        assert!(!isl_bundled(SourceFlavor::Official, 12));

        let row = pinned(SourceFlavor::Fork, 9);
        let specs = source_specs(SourceFlavor::Fork, 9, &row, DEFAULT_GNU_MIRROR);
        assert!(specs.iter().all(|s| s.component != Component::Isl));
        assert_eq!(specs.len(), 6);

        let row = pinned(SourceFlavor::Official, 9);
        let specs = source_specs(SourceFlavor::Official, 9, &row, DEFAULT_GNU_MIRROR);
        assert_eq!(specs.len(), 7);
    }

    #[test]
    fn mirror_override_rewrites_gnu_urls_only() {
        let row = pinned(SourceFlavor::Official, 9);
        let specs = source_specs(SourceFlavor::Official, 9, &row, "https://mirror.example/gnu");
        let glibc = specs
            .iter()
            .find(|s| s.component == Component::Glibc)
            .unwrap();
        assert!(glibc.url.starts_with("https://mirror.example/gnu/glibc/"));
        let linux = specs
            .iter()
            .find(|s| s.component == Component::Linux)
            .unwrap();
        assert!(linux.url.starts_with("https://cdn.kernel.org/"));
    }

    #[test]
    fn decompressor_selection_is_total() {
        assert_eq!(ArchiveExt::Gz.decompressor(), "pigz");
        assert_eq!(ArchiveExt::Bz2.decompressor(), "pbzip2");
        assert!(ArchiveExt::Xz.decompressor().starts_with("xz"));
    }
}
