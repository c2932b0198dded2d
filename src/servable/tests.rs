use std::sync::{Arc, Mutex};

use super::*;
use crate::export::{export, ExportConfig};
use crate::value::HostTensor;

/// Every successful load, by identifier. Tests use distinct identifiers so
/// they can run in parallel against the shared log.
static LOADS: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn loads_of(identifier: &str) -> usize {
    LOADS
        .lock()
        .unwrap()
        .iter()
        .filter(|id| id.as_str() == identifier)
        .count()
}

/// Loads anything not prefixed with `missing`; inference fails on an empty
/// argument list.
struct Echo {
    identifier: String,
}

impl Servable for Echo {
    type LoadError = String;

    fn load(identifier: &str) -> Result<Self, String> {
        if identifier.starts_with("missing") {
            return Err(format!("no such servable: {}", identifier));
        }
        LOADS.lock().unwrap().push(identifier.to_string());
        Ok(Self {
            identifier: identifier.to_string(),
        })
    }

    fn run_inference(&self, inputs: Vec<Value>) -> Result<Value, InferenceError> {
        if inputs.is_empty() {
            return Err(InferenceError::Arity {
                function: "forward".into(),
                expected: 1,
                found: 0,
            });
        }
        Ok(Value::Str(format!("{}:{}", self.identifier, inputs.len())))
    }
}

// ─── Cache Behaviour ───────────────────────────────────────────────

#[test]
fn second_request_hits_the_cache() {
    let manager = ServableManager::<Echo>::new(4, 0);
    let first = manager.get_servable("hit-a").unwrap();
    let second = manager.get_servable("hit-a").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loads_of("hit-a"), 1);
    assert_eq!(manager.size(), 1);
}

#[test]
fn load_failure_is_an_invalid_servable() {
    let manager = ServableManager::<Echo>::default();
    let err = manager.get_servable("missing-model").err().unwrap();
    assert!(matches!(err, ServingError::InvalidServable { ref identifier, .. } if identifier == "missing-model"));
    assert!(err.to_string().contains("no such servable"));
    assert_eq!(manager.size(), 0);
}

#[test]
fn capacity_bounds_the_cache() {
    let manager = ServableManager::<Echo>::new(2, 1);
    for id in ["cap-a", "cap-b", "cap-c"] {
        manager.get_servable(id).unwrap();
    }
    assert_eq!(manager.size(), 3);

    manager.get_servable("cap-d").unwrap();
    assert_eq!(manager.size(), 2);
    assert!(manager.contains("cap-c"));
    assert!(manager.contains("cap-d"));
    assert!(!manager.contains("cap-a"));
}

#[test]
fn certain_invalidation_reloads_every_time() {
    let manager = ServableManager::<Echo>::new(4, 0);
    for _ in 0..3 {
        manager.get_servable_with_invalidation("inv-a", 1.0).unwrap();
    }
    assert_eq!(loads_of("inv-a"), 3);
    assert_eq!(manager.size(), 1);
}

#[test]
fn zero_invalidation_never_reloads() {
    let manager = ServableManager::<Echo>::new(4, 0);
    for _ in 0..3 {
        manager.get_servable_with_invalidation("inv-b", 0.0).unwrap();
    }
    assert_eq!(loads_of("inv-b"), 1);
}

// ─── Inference Requests ────────────────────────────────────────────

#[test]
fn inference_request_runs_the_servable() {
    let manager = ServableManager::<Echo>::new(4, 0);
    let out = manager
        .inference_request("req-a", vec![Value::Int(1), Value::Int(2)], 0.0)
        .unwrap();
    assert_eq!(out, Value::Str("req-a:2".into()));
    assert!(manager.contains("req-a"));
}

#[test]
fn failed_inference_evicts_the_servable() {
    let manager = ServableManager::<Echo>::new(4, 0);
    manager.get_servable("evict-a").unwrap();

    let err = manager.inference_request("evict-a", vec![], 0.0).unwrap_err();
    assert!(matches!(err, ServingError::Inference(InferenceError::Arity { .. })));
    assert!(!manager.contains("evict-a"));

    manager
        .inference_request("evict-a", vec![Value::Int(1)], 0.0)
        .unwrap();
    assert_eq!(loads_of("evict-a"), 2);
}

#[test]
fn evict_reports_whether_the_servable_was_cached() {
    let manager = ServableManager::<Echo>::new(4, 0);
    manager.get_servable("drop-a").unwrap();
    assert!(manager.evict("drop-a"));
    assert!(!manager.evict("drop-a"));
    assert_eq!(manager.size(), 0);
}

#[test]
fn failed_load_leaves_other_entries_alone() {
    let manager = ServableManager::<Echo>::new(4, 0);
    manager.get_servable("keep-a").unwrap();
    assert!(manager
        .inference_request("missing-b", vec![Value::Int(1)], 0.0)
        .is_err());
    assert!(manager.contains("keep-a"));
    assert_eq!(manager.size(), 1);
}

#[tokio::test]
async fn async_request_completes_on_blocking_pool() {
    let manager = Arc::new(ServableManager::<Echo>::new(4, 0));
    let handles: Vec<_> = (1..=3)
        .map(|n| manager.async_inference_request("async-a", vec![Value::Int(0); n], 0.0))
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(
        results,
        vec![
            Value::Str("async-a:1".into()),
            Value::Str("async-a:2".into()),
            Value::Str("async-a:3".into()),
        ]
    );
    assert!(manager.contains("async-a"));
}

// ─── Script Servables ──────────────────────────────────────────────

#[test]
fn script_servable_serves_an_exported_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.pt");
    let config = ExportConfig {
        hidden_size: 8,
        bottleneck_size: 4,
        output: path.clone(),
        ..ExportConfig::default()
    };
    export(&config).unwrap();

    let manager = ServableManager::<ScriptServable>::new(2, 0);
    let identifier = path.to_string_lossy().into_owned();
    let servable = manager.get_servable(&identifier).unwrap();
    assert_eq!(servable.path(), path.as_path());

    let x = HostTensor::from_f32(vec![1, 2], vec![0.5, -0.5]).unwrap();
    let y = HostTensor::from_f32(vec![1, 3], vec![1.0, 2.0, 3.0]).unwrap();
    let out = manager
        .inference_request(&identifier, vec![Value::Tensor(x), Value::Tensor(y.clone())], 0.0)
        .unwrap();
    let Value::List(items) = out else {
        panic!("expected a list");
    };
    assert_eq!(items[1], Value::Tensor(y));
    assert_eq!(items[0].as_tensor().unwrap().shape(), &[1, 3]);
}

#[test]
fn script_servable_rejects_non_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"definitely not a model").unwrap();

    let manager = ServableManager::<ScriptServable>::default();
    let err = manager
        .get_servable(&path.to_string_lossy())
        .err()
        .unwrap();
    assert!(matches!(err, ServingError::InvalidServable { .. }));
}
