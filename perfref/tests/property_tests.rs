//! Property-style tests for resolution and evaluation.
//!
//! Loop-driven over value grids rather than a generator crate.

use perfref::{
    evaluate, resolve, resolve_scoped, EvaluationResult, ExecutionContext, MetricSample,
    ReferenceBound, ReferenceError, ReferenceResolver, ReferenceTable, RunStatus, RunVerdict,
    ScopeKey, Verdict,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn result(verdict: Verdict) -> EvaluationResult {
    let bound = match verdict {
        Verdict::Info => ReferenceBound::informational("x"),
        _ => ReferenceBound::within(1.0, 0.1, "x"),
    };
    EvaluationResult {
        metric: "m".to_string(),
        value: 1.0,
        bound,
        verdict,
        low: None,
        high: None,
        scope: None,
        node: None,
    }
}

// ── Fallback order ─────────────────────────────────────────────────

#[test]
fn prop_first_scope_in_chain_wins() {
    let exact = ScopeKey::qualified("alvis", "4xA100_MEM512");
    let chain = [
        exact.clone(),
        ScopeKey::qualified("alvis", "A100"),
        ScopeKey::system("alvis"),
        ScopeKey::Wildcard,
    ];

    // every non-empty subset of the chain defines the metric
    for mask in 1u32..(1 << chain.len()) {
        let mut builder = ReferenceTable::builder();
        for (i, key) in chain.iter().enumerate() {
            if mask & (1 << i) != 0 {
                let target = 100.0 * (i as f64 + 1.0);
                builder = builder.bound(key.clone(), "bw", ReferenceBound::at_least(target, 0.1, "GB/s"));
            }
        }
        let table = builder.build().unwrap();
        let first = mask.trailing_zeros() as usize;

        let resolved = resolve_scoped(&table, &exact, &chain[1..], "bw").unwrap();
        assert_eq!(resolved.scope, &chain[first], "mask {:#06b}", mask);
        assert_eq!(resolved.bound.target, 100.0 * (first as f64 + 1.0));
    }
}

#[test]
fn prop_partition_beats_system_value() {
    let table = ReferenceTable::builder()
        .bound(
            ScopeKey::qualified("alvis", "4xA100_MEM512"),
            "bw",
            ReferenceBound::at_least(100.0, 0.1, "GB/s"),
        )
        .bound(
            ScopeKey::system("alvis"),
            "bw",
            ReferenceBound::at_least(50.0, 0.1, "GB/s"),
        )
        .build()
        .unwrap();
    let context = ExecutionContext::new("alvis", "4xA100_MEM512");
    let bound = resolve(&table, &context.exact_key(), &context.fallback_keys(), "bw").unwrap();
    assert_eq!(bound.target, 100.0);

    let other = ExecutionContext::new("alvis", "4xA40");
    let bound = resolve(&table, &other.exact_key(), &other.fallback_keys(), "bw").unwrap();
    assert_eq!(bound.target, 50.0);
}

// ── Termination ────────────────────────────────────────────────────

#[test]
fn prop_resolution_terminates_with_full_chain() {
    let table = ReferenceTable::builder()
        .bound(ScopeKey::system("vera"), "copy", ReferenceBound::within(1.0, 0.1, "GB/s"))
        .build()
        .unwrap();
    for partition in ["skylake", "icelake", "4xA100", "8xT4", "N/A"] {
        let context = ExecutionContext::new("alvis", partition);
        let err = resolve(&table, &context.exact_key(), &context.fallback_keys(), "copy")
            .unwrap_err();
        match err {
            ReferenceError::Unresolved { attempted, .. } => {
                assert_eq!(attempted, context.chain());
                assert_eq!(attempted.last(), Some(&ScopeKey::Wildcard));
            }
            other => panic!("{partition}: unexpected error {other}"),
        }
    }
}

// ── Threshold arithmetic ───────────────────────────────────────────

#[test]
fn prop_threshold_arithmetic() {
    let bound = ReferenceBound::at_least(1000.0, 0.05, "Gflop/s");
    assert_eq!(evaluate(949.0, &bound), Verdict::Fail);
    assert_eq!(evaluate(950.0, &bound), Verdict::Pass);
    assert_eq!(evaluate(10000.0, &bound), Verdict::Pass);

    for target in [1.0, 250.0, 6300.0, 97000.0, 1.0e9] {
        for frac in [0.01, 0.05, 0.1, 0.25] {
            let bound = ReferenceBound::within(target, frac, "u");
            let (low, high) = bound.window();
            assert_eq!(evaluate(target, &bound), Verdict::Pass);
            assert_eq!(evaluate(low, &bound), Verdict::Pass);
            assert_eq!(evaluate(high, &bound), Verdict::Pass);
            assert_eq!(evaluate(low - low.abs() * 1e-9, &bound), Verdict::Fail);
            assert_eq!(evaluate(high + high.abs() * 1e-9, &bound), Verdict::Fail);
            assert_eq!(evaluate(f64::NAN, &bound), Verdict::Fail);
        }
    }
}

#[test]
fn prop_open_sides_never_fail_on_that_side() {
    let floor = ReferenceBound::at_least(500.0, 0.1, "MiB/s");
    let ceiling = ReferenceBound::new(80.0, None, Some(0.1), "degC");
    for exp in 0..12 {
        let big = 10f64.powi(exp) * 500.0;
        assert_eq!(evaluate(big, &floor), Verdict::Pass);
        assert_eq!(evaluate(-big, &ceiling), Verdict::Pass);
    }
    assert_eq!(evaluate(f64::INFINITY, &floor), Verdict::Pass);
}

// ── INFO idempotence ───────────────────────────────────────────────

#[test]
fn prop_informational_is_always_info() {
    let bound = ReferenceBound::informational("degC");
    let values = [
        f64::NEG_INFINITY,
        -1.0e12,
        -1.0,
        0.0,
        1.0e-300,
        42.0,
        1.0e12,
        f64::INFINITY,
        f64::NAN,
    ];
    for value in values {
        assert_eq!(evaluate(value, &bound), Verdict::Info);
    }
}

// ── Aggregation dominance ──────────────────────────────────────────

#[test]
fn prop_aggregation_dominance() {
    use Verdict::{Fail, Info, Pass};

    let status = |verdicts: &[Verdict]| {
        RunVerdict::from_results(verdicts.iter().copied().map(result).collect(), Vec::new()).overall
    };
    assert_eq!(status(&[Pass, Pass, Fail]), RunStatus::Fail);
    assert_eq!(status(&[Pass, Info, Pass]), RunStatus::Pass);
    assert_eq!(status(&[]), RunStatus::Invalid);

    // every combination of up to four verdicts
    let all = [Pass, Fail, Info];
    for len in 1..=4u32 {
        for n in 0..3usize.pow(len) {
            let mut combo = Vec::new();
            let mut rest = n;
            for _ in 0..len {
                combo.push(all[rest % 3]);
                rest /= 3;
            }
            let expected = if combo.contains(&Fail) {
                RunStatus::Fail
            } else {
                RunStatus::Pass
            };
            assert_eq!(status(&combo), expected, "{:?}", combo);
        }
    }
}

#[test]
fn prop_exit_codes_are_ordered() {
    assert!(RunStatus::Pass.exit_code() < RunStatus::Fail.exit_code());
    assert!(RunStatus::Fail.exit_code() < RunStatus::Invalid.exit_code());
    assert!(RunStatus::Pass < RunStatus::Fail && RunStatus::Fail < RunStatus::Invalid);
}

// ── Per-node reporting ─────────────────────────────────────────────

#[test]
fn prop_failing_nodes_listed_exactly() {
    let table = ReferenceTable::builder()
        .bound(
            ScopeKey::system("kebnekaise"),
            "gpu_perf_min",
            ReferenceBound::at_least(1000.0, 0.1, "Gflop/s"),
        )
        .build()
        .unwrap();
    let exact = ScopeKey::qualified("kebnekaise", "2xK80");
    let fallback = [ScopeKey::system("kebnekaise")];
    let resolver = ReferenceResolver::default();

    // each bit of the mask marks a slow node
    for mask in [0u32, 0b0000_0001, 0b1010_0100, 0b1111_1111, 0b0100_0010] {
        let mut samples_by_node = BTreeMap::new();
        let mut expected = Vec::new();
        for i in 0..8 {
            let node = format!("b-cn{:04}", i);
            let value = if mask & (1 << i) != 0 {
                expected.push(node.clone());
                899.0
            } else {
                1001.0
            };
            samples_by_node.insert(
                node,
                vec![MetricSample::new("gpu_perf_min", value, "Gflop/s")],
            );
        }

        let verdict = resolver
            .evaluate_run_multi(&samples_by_node, &table, &exact, &fallback)
            .unwrap();
        let failing: Vec<String> = verdict
            .failing_nodes()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(failing, expected, "mask {:#010b}", mask);
        assert_eq!(verdict.failures.len(), expected.len());
        let expected_status = if expected.is_empty() {
            RunStatus::Pass
        } else {
            RunStatus::Fail
        };
        assert_eq!(verdict.overall, expected_status);
    }
}

// ── Shared tables under concurrency ────────────────────────────────

#[test]
fn prop_shared_table_gives_identical_results() {
    let table = Arc::new(
        ReferenceTable::builder()
            .scope(
                ScopeKey::qualified("kebnekaise", "sky"),
                [
                    ("copy", ReferenceBound::within(121000.0, 0.05, "MB/s")),
                    ("triad", ReferenceBound::within(112500.0, 0.05, "MB/s")),
                ],
            )
            .build()
            .unwrap(),
    );
    let context = ExecutionContext::new("kebnekaise", "sky");
    let samples = vec![
        MetricSample::new("copy", 120000.0, "MB/s"),
        MetricSample::new("triad", 100000.0, "MB/s"),
    ];
    let resolver = ReferenceResolver::default();
    let baseline = resolver
        .evaluate_run(&samples, &table, &context.exact_key(), &context.fallback_keys())
        .unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let (resolver, context, samples) = (&resolver, &context, &samples);
                s.spawn(move || {
                    (0..50)
                        .map(|_| {
                            resolver
                                .evaluate_run(
                                    samples,
                                    &table,
                                    &context.exact_key(),
                                    &context.fallback_keys(),
                                )
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for verdict in handle.join().unwrap() {
                assert_eq!(verdict.overall, baseline.overall);
                assert_eq!(verdict.results, baseline.results);
            }
        }
    });
    assert_eq!(baseline.overall, RunStatus::Fail);
}
