//! Built-in site references
//!
//! Reference values measured on the HPC2N (kebnekaise), C3SE (alvis, vera)
//! and UmU-Cloud systems. They are ordinary catalogs and pass through the
//! same validation as catalogs loaded from disk.

use crate::bound::ReferenceBound;
use crate::catalog::ReferenceCatalog;
use crate::error::ReferenceResult;
use crate::scope::ScopeKey;
use crate::table::{ReferenceTable, ReferenceTableBuilder};

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: &[&str] = &[
    "gpu_burn",
    "stream",
    "hpl",
    "ior",
    "mdtest",
    "memory_bandwidth",
    "gromacs",
];

/// Look up a built-in catalog by name.
pub fn builtin(name: &str) -> Option<ReferenceResult<ReferenceCatalog>> {
    match name {
        "gpu_burn" => Some(gpu_burn()),
        "stream" => Some(stream()),
        "hpl" => Some(hpl()),
        "ior" => Some(ior()),
        "mdtest" => Some(mdtest()),
        "memory_bandwidth" => Some(memory_bandwidth()),
        "gromacs" => Some(gromacs()),
        _ => None,
    }
}

fn key(raw: &str) -> ReferenceResult<ScopeKey> {
    raw.parse()
}

fn floor_scopes(
    mut builder: ReferenceTableBuilder,
    metric: &str,
    unit: &str,
    entries: &[(&str, f64)],
) -> ReferenceResult<ReferenceTableBuilder> {
    for (scope, target) in entries {
        builder = builder.bound(
            key(scope)?,
            metric,
            ReferenceBound::at_least(*target, 0.10, unit),
        );
    }
    Ok(builder)
}

/// GPU burn-in, `double` and `single` precision.
///
/// `gpu_perf_min` is the slowest GPU of a node; `gpu_temp_max` is reported
/// everywhere but never judged.
pub fn gpu_burn() -> ReferenceResult<ReferenceCatalog> {
    let temp = |b: ReferenceTableBuilder| {
        b.bound(
            ScopeKey::Wildcard,
            "gpu_temp_max",
            ReferenceBound::informational("degC"),
        )
    };

    let double = floor_scopes(
        ReferenceTable::builder(),
        "gpu_perf_min",
        "Gflop/s",
        &[
            ("kebnekaise:2xK80", 1000.0),
            ("kebnekaise:4xK80", 1000.0),
            ("kebnekaise:2xV100", 6300.0),
            ("kebnekaise:2xA6000", 538.0),
            ("kebnekaise:4xA40", 488.0),
            ("kebnekaise:2xA100", 18100.0),
            ("alvis:8xT4", 250.0),
            ("alvis:4xV100", 6800.0),
            ("alvis:4xA40", 488.0),
            ("alvis:4xA100_MEM256", 18100.0),
            ("alvis:4xA100_MEM512", 18100.0),
            ("alvis:4xA100fat", 18500.0),
            ("UmU-Cloud:default", 18100.0),
        ],
    )?;

    let single = floor_scopes(
        ReferenceTable::builder(),
        "gpu_perf_min",
        "Gflop/s",
        &[
            ("kebnekaise:2xK80", 2300.0),
            ("kebnekaise:2xV100", 13400.0),
            ("kebnekaise:2xA6000", 21000.0),
            ("kebnekaise:4xA40", 19500.0),
            ("kebnekaise:2xA100", 18100.0),
            ("alvis:8xT4", 4000.0),
            ("alvis:4xV100", 14300.0),
            ("alvis:4xA40", 19200.0),
            ("alvis:4xA100_MEM256", 18100.0),
            ("UmU-Cloud:default", 18100.0),
        ],
    )?;

    Ok(ReferenceCatalog::new()
        .with_variant("double", temp(double).build()?)
        .with_variant("single", temp(single).build()?)
        .with_default("double"))
}

/// STREAM bandwidth, one variant per toolchain family (`foss`, `intel`).
pub fn stream() -> ReferenceResult<ReferenceCatalog> {
    // (scope, copy, scale, add, triad, lower threshold)
    type Row = (&'static str, f64, f64, f64, f64, f64);

    fn table(rows: &[Row]) -> ReferenceResult<ReferenceTable> {
        let mut builder = ReferenceTable::builder();
        for (scope, copy, scale, add, triad, lower) in rows {
            let bound = |target: f64| ReferenceBound::new(target, Some(*lower), Some(0.05), "MB/s");
            builder = builder.scope_str(
                scope,
                [
                    ("copy", bound(*copy)),
                    ("scale", bound(*scale)),
                    ("add", bound(*add)),
                    ("triad", bound(*triad)),
                ],
            )?;
        }
        builder.build()
    }

    let foss = table(&[
        ("kebnekaise:bdw", 86000.0, 86000.0, 90000.0, 90000.0, -0.05),
        ("kebnekaise:sky", 121000.0, 121000.0, 112500.0, 112500.0, -0.05),
        ("kebnekaise:knl", 57000.0, 56000.0, 63000.0, 63000.0, -0.05),
        ("kebnekaise:lm", 191500.0, 191500.0, 198000.0, 198000.0, -0.05),
        ("UmU-Cloud:default", 166000.0, 166000.0, 182000.0, 182000.0, -0.05),
        ("alvis:8xT4", 135000.0, 135000.0, 152000.0, 152000.0, -0.05),
        ("alvis:4xA40", 283600.0, 282600.0, 294000.0, 294200.0, -0.05),
    ])?;

    let intel = table(&[
        ("kebnekaise:bdw", 120500.0, 120500.0, 111300.0, 111300.0, -0.05),
        ("kebnekaise:sky", 156000.0, 156000.0, 119300.0, 122200.0, -0.05),
        ("kebnekaise:knl", 57000.0, 57000.0, 57900.0, 57900.0, -0.05),
        ("kebnekaise:lm", 233000.0, 228000.0, 225000.0, 230000.0, -0.05),
        ("UmU-Cloud:default", 166000.0, 166000.0, 182000.0, 182000.0, -0.05),
        ("alvis:4xA40", 311600.0, 310700.0, 312800.0, 311500.0, -0.05),
        ("alvis:4xA100_MEM256", 285000.0, 290000.0, 290000.0, 290000.0, -0.1),
        ("alvis:4xA100_MEM512", 285000.0, 290000.0, 290000.0, 290000.0, -0.1),
        ("alvis:4xA100fat", 285000.0, 290000.0, 290000.0, 290000.0, -0.1),
    ])?;

    Ok(ReferenceCatalog::new()
        .with_variant("foss", foss)
        .with_variant("intel", intel)
        .with_default("foss"))
}

/// Toolchain family of a programming environment, as used by [`stream`].
///
/// `foss_2021a` and `fosscuda_2020b` are `foss`, `intelcuda_2020b` is
/// `intel`; anything else is measured against the `foss` references.
pub fn stream_variant_for(environment: &str) -> &'static str {
    let family = environment
        .split('_')
        .next()
        .unwrap_or_default()
        .replace("cuda", "");
    match family.as_str() {
        "intel" => "intel",
        _ => "foss",
    }
}

/// HPL, ±5% around the measured GFlops.
pub fn hpl() -> ReferenceResult<ReferenceCatalog> {
    let mut builder = ReferenceTable::builder();
    for (scope, target) in [
        ("kebnekaise:bdw", 871.0),
        ("kebnekaise:sky", 871.0),
        ("vera:skylake", 871.0),
        ("alvis:2xV100", 1140.0),
    ] {
        builder = builder.bound(
            key(scope)?,
            "GFlops",
            ReferenceBound::within(target, 0.05, "GFlops/s"),
        );
    }
    Ok(ReferenceCatalog::single(builder.build()?))
}

/// IOR bandwidth, one variant per file system, all under the wildcard scope.
///
/// `(file system, Some((write, read)))` rows are judged; rows without
/// measured values only report bandwidth.
pub fn ior() -> ReferenceResult<ReferenceCatalog> {
    const ROWS: &[(&str, Option<(f64, f64)>)] = &[
        ("/pfs/stor10/io-test", Some((1000.0, 2000.0))),
        ("/cephyr/NOBACKUP/priv/c3-alvis/reframe/io-test", Some((1000.0, 2000.0))),
        ("/mimer/NOBACKUP/groups/c3-staff/reframe/io-test", Some((1000.0, 2000.0))),
        ("/scratch/shared/fulen", None),
        ("/users", None),
    ];

    let mut catalog = ReferenceCatalog::new();
    for (fs, measured) in ROWS {
        let (write, read) = match measured {
            Some((write, read)) => (
                ReferenceBound::at_least(*write, 0.1, "MiB/s"),
                ReferenceBound::at_least(*read, 0.1, "MiB/s"),
            ),
            None => (
                ReferenceBound::informational("MiB/s"),
                ReferenceBound::informational("MiB/s"),
            ),
        };
        let table = ReferenceTable::builder()
            .scope(ScopeKey::Wildcard, [("write_bw", write), ("read_bw", read)])
            .build()?;
        catalog = catalog.with_variant(*fs, table);
    }
    Ok(catalog)
}

/// Metadata operations measured by mdtest, in row order.
pub const MDTEST_METRICS: &[(&str, &str)] = &[
    ("dir_create", "dirs/s"),
    ("dir_stat", "dirs/s"),
    ("dir_removal", "dirs/s"),
    ("file_create", "files/s"),
    ("file_stat", "files/s"),
    ("file_read", "files/s"),
    ("file_removal", "files/s"),
    ("tree_create", "dirs/s"),
    ("tree_removal", "dirs/s"),
];

/// mdtest metadata rates, one variant per file system under the wildcard scope.
///
/// File systems without measured rates get a zero target with a -10% floor,
/// which only checks that the rates are non-negative.
pub fn mdtest() -> ReferenceResult<ReferenceCatalog> {
    const ROWS: &[(&str, Option<[f64; 9]>)] = &[
        (
            "/pfs/stor10/io-test",
            Some([13000.0, 23000.0, 14000.0, 6500.0, 30000.0, 10000.0, 15000.0, 500.0, 400.0]),
        ),
        ("/scratch", None),
        (
            "/cephyr/NOBACKUP/priv/c3-staff/reframe/io-test",
            Some([3000.0, 60000.0, 1000.0, 4000.0, 60000.0, 35000.0, 1500.0, 37.0, 9.0]),
        ),
        (
            "/mimer/NOBACKUP/groups/c3-staff/reframe/io-test",
            Some([64000.0, 95000.0, 70000.0, 60000.0, 120000.0, 55000.0, 70000.0, 250.0, 450.0]),
        ),
    ];

    let mut catalog = ReferenceCatalog::new();
    for (fs, rates) in ROWS {
        let rates = rates.unwrap_or([0.0; 9]);
        let bounds = MDTEST_METRICS
            .iter()
            .zip(rates)
            .map(|((metric, unit), rate)| (*metric, ReferenceBound::at_least(rate, 0.1, *unit)));
        let table = ReferenceTable::builder()
            .scope(ScopeKey::Wildcard, bounds)
            .build()?;
        catalog = catalog.with_variant(*fs, table);
    }
    Ok(catalog)
}

/// GPU device-to-device bandwidth `bw`, with (`p2p`) and without (`no_p2p`)
/// peer access between devices.
pub fn memory_bandwidth() -> ReferenceResult<ReferenceCatalog> {
    // (scope, p2p, no_p2p)
    const ROWS: &[(&str, f64, f64)] = &[
        ("kebnekaise:gpu_2xK80", 163.0, 30.0),
        ("kebnekaise:gpu_4xK80", 9.5, 65.0),
        ("kebnekaise:gpu_2xV100", 9.55, 12.0),
        ("kebnekaise:gpu_2xA6000", 636.0, 12.0),
        ("kebnekaise:4xA40", 9.5, 31.0),
        ("alvis:4xA40", 54.3, 63.7),
        ("alvis:4xA100_MEM256", 262.69, 61.8),
        ("alvis:4xA100_MEM512", 262.69, 61.8),
        ("alvis:4xA100_MEM768", 262.69, 61.8),
        ("alvis:4xA100fat", 262.69, 61.8),
    ];

    let mut p2p = ReferenceTable::builder();
    let mut no_p2p = ReferenceTable::builder();
    for (scope, with_peer, without_peer) in ROWS {
        let scope = key(scope)?;
        p2p = p2p.bound(
            scope.clone(),
            "bw",
            ReferenceBound::at_least(*with_peer, 0.05, "GB/s"),
        );
        no_p2p = no_p2p.bound(
            scope,
            "bw",
            ReferenceBound::at_least(*without_peer, 0.05, "GB/s"),
        );
    }

    Ok(ReferenceCatalog::new()
        .with_variant("p2p", p2p.build()?)
        .with_variant("no_p2p", no_p2p.build()?))
}

/// Variant of [`memory_bandwidth`] for a run with or without peer access.
pub fn memory_bandwidth_variant(p2p: bool) -> &'static str {
    if p2p {
        "p2p"
    } else {
        "no_p2p"
    }
}

/// HECBioSim inputs run by the GROMACS check, in row order.
pub const GROMACS_BENCHMARKS: &[&str] = &[
    "HECBioSim/Crambin",
    "HECBioSim/Glutamine-Binding-Protein",
    "HECBioSim/hEGFRDimer",
    "HECBioSim/hEGFRDimerSmallerPL",
    "HECBioSim/hEGFRDimerPair",
    "HECBioSim/hEGFRtetramerPair",
];

/// GROMACS throughput in ns/day, informational only.
///
/// One variant per node count and architecture (see [`gromacs_variant`]);
/// the metric is the benchmark name. Combinations without a value are left
/// out, so asking for them is an unresolved reference.
pub fn gromacs() -> ReferenceResult<ReferenceCatalog> {
    type Row = (u32, &'static str, [Option<f64>; 6]);
    const ROWS: &[Row] = &[
        (1, "sm_60", [Some(195.0), Some(78.0), Some(8.5), Some(9.2), Some(3.0), None]),
        (1, "broadwell", [Some(116.0), Some(38.0), Some(4.0), Some(8.0), None, None]),
        (1, "zen2", [Some(320.0), Some(120.0), Some(16.0), Some(31.0), Some(7.0), None]),
        (1, "x86_64_v4", [Some(745.0), Some(322.0), Some(46.0), Some(67.0), Some(18.0), None]),
        (2, "sm_60", [Some(202.0), Some(111.0), Some(15.0), Some(18.0), Some(6.0), None]),
        (2, "broadwell", [Some(200.0), Some(65.0), Some(8.0), Some(13.0), Some(4.0), None]),
        (2, "zen2", [Some(355.0), Some(210.0), Some(31.0), Some(53.0), Some(13.0), None]),
        (2, "x86_64_v4", [Some(355.0), Some(210.0), Some(31.0), Some(53.0), Some(13.0), None]),
        (4, "sm_60", [Some(200.0), Some(133.0), Some(22.0), Some(28.0), Some(10.0), Some(5.0)]),
        (4, "broadwell", [Some(260.0), Some(111.0), Some(15.0), Some(23.0), Some(7.0), Some(3.0)]),
        (4, "zen2", [Some(340.0), Some(230.0), Some(56.0), Some(80.0), Some(25.0), Some(11.0)]),
        (4, "x86_64_v4", [Some(340.0), Some(230.0), Some(56.0), Some(80.0), Some(25.0), Some(11.0)]),
        (6, "sm_60", [Some(213.0), Some(142.0), Some(28.0), Some(29.346), Some(13.0), Some(8.0)]),
        (6, "broadwell", [Some(308.0), Some(127.0), Some(22.0), Some(29.0), Some(9.0), Some(5.0)]),
        (6, "zen2", [None, Some(240.0), Some(75.0), Some(110.0), Some(33.0), Some(13.0)]),
        (6, "x86_64_v4", [None, Some(240.0), Some(75.0), Some(110.0), Some(33.0), Some(13.0)]),
        (8, "sm_60", [Some(206.0), Some(149.0), Some(37.0), Some(39.0), Some(16.0), Some(9.0)]),
        (8, "broadwell", [Some(356.0), Some(158.0), Some(28.0), Some(39.0), Some(11.0), Some(6.0)]),
        (8, "zen2", [None, Some(250.0), Some(80.0), Some(104.0), Some(43.0), Some(20.0)]),
        (8, "x86_64_v4", [None, Some(250.0), Some(80.0), Some(104.0), Some(43.0), Some(20.0)]),
        (16, "sm_60", [None, Some(154.0), Some(43.0), Some(41.889), Some(21.0), Some(14.0)]),
        (16, "broadwell", [None, Some(200.0), Some(44.0), Some(31.47), Some(19.0), Some(10.0)]),
        (16, "zen2", [None, None, Some(82.0), Some(70.0), Some(49.0), Some(25.0)]),
        (16, "x86_64_v4", [None, None, Some(82.0), Some(70.0), Some(49.0), Some(25.0)]),
    ];

    let mut catalog = ReferenceCatalog::new();
    for (nodes, arch, perf) in ROWS {
        let bounds = GROMACS_BENCHMARKS
            .iter()
            .zip(perf)
            .filter_map(|(bench, value)| {
                value.map(|v| (*bench, ReferenceBound::new(v, None, None, "ns/day")))
            });
        let table = ReferenceTable::builder()
            .scope(ScopeKey::Wildcard, bounds)
            .build()?;
        catalog = catalog.with_variant(gromacs_variant(*nodes, arch), table);
    }
    Ok(catalog)
}

/// `<nodes>/<arch>`, e.g. `4/zen2`; `arch` is the GPU arch for GPU runs.
pub fn gromacs_variant(nodes: u32, arch: &str) -> String {
    format!("{}/{}", nodes, arch)
}
