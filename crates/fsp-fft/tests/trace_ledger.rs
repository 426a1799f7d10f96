//! Trace ledger and shared plan cache observed across calls.
//!
//! Kept in its own test binary: both the ledger and the plan cache are
//! process-wide.

use fsp_fft::plan::{
    clear_shared_plan_cache, configure_shared_plan_cache, shared_plan_cache_len,
};
use fsp_fft::{
    CacheAdmissionPolicy, FftArgs, PlanCacheConfig, PlanStrategy, Tensor, TransformKind, fftn,
    take_transform_traces,
};
use num_complex::Complex;

#[test]
fn repeated_length_hits_the_plan_cache_and_traces_serialize() {
    let _ = take_transform_traces();
    let x = Tensor::from_complex128(vec![2, 4099], vec![Complex::new(0.5, -0.25); 2 * 4099])
        .expect("input");
    let args = FftArgs::new().with_dim([-1]);

    fftn(&x, &args).expect("first call");
    fftn(&x, &args).expect("second call");

    let traces = take_transform_traces();
    assert_eq!(traces.len(), 2);
    assert!(!traces[0].plan_cache_hit);
    assert!(traces[1].plan_cache_hit);
    assert_ne!(traces[0].operation_id, traces[1].operation_id);
    for trace in &traces {
        assert_eq!(trace.kind, TransformKind::Fftn);
        assert_eq!(trace.signal_sizes, vec![4099]);
        assert_eq!(trace.strategy, PlanStrategy::Bluestein);
        let value: serde_json::Value =
            serde_json::from_str(&trace.to_json_line()).expect("json line");
        assert_eq!(value["kind"], "Fftn");
        assert_eq!(value["input_shape"], serde_json::json!([2, 4099]));
    }
    assert!(take_transform_traces().is_empty());
    assert!(shared_plan_cache_len() >= 1);

    clear_shared_plan_cache();
    assert_eq!(shared_plan_cache_len(), 0);
    fftn(&x, &args).expect("after clear");
    assert!(!take_transform_traces()[0].plan_cache_hit);

    configure_shared_plan_cache(PlanCacheConfig {
        admission_policy: CacheAdmissionPolicy::Disabled,
        ..PlanCacheConfig::default()
    });
    fftn(&x, &args).expect("disabled first");
    fftn(&x, &args).expect("disabled second");
    assert!(take_transform_traces().iter().all(|trace| !trace.plan_cache_hit));
    assert_eq!(shared_plan_cache_len(), 0);
}
