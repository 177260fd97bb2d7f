//! End-to-end tests of the policy lifecycle: serialize, load, evaluate
//! (including concurrently), and release.

use std::path::Path;
use std::sync::{Arc, Once};
use std::thread;

use remy_dna::dna::{Action, Cube, Point, Reaction, RemyDna, RuleTree, RuleTreeNode};
use remy_dna::error::Error;
use remy_dna::store::PolicyStore;

/// Helper to initialize tracing for tests.
fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .init();
    });
}

fn corner(value: f64) -> Point {
    Point {
        ack_ewma: value,
        send_ewma: value,
        rtt_ratio: value,
    }
}

fn snapshot(ack_ewma: f64, send_ewma: f64, rtt_ratio: f64) -> Point {
    Point {
        ack_ewma,
        send_ewma,
        rtt_ratio,
    }
}

/// A small trained-looking policy: the low half of the domain (short
/// inter-arrivals, RTT near its minimum) grows the window, the high half
/// backs off and paces.
fn sample_policy() -> RemyDna {
    let nodes = vec![
        RuleTreeNode::Leaf {
            domain: Cube {
                min: corner(0.),
                max: corner(2.),
            },
            action: Action {
                window_multiplier: 1.0,
                window_increment: 3,
                intersend_ms: 0.0,
            },
        },
        RuleTreeNode::Leaf {
            domain: Cube {
                min: corner(2.),
                max: corner(163_840.),
            },
            action: Action {
                window_multiplier: 0.5,
                window_increment: 0,
                intersend_ms: 5.0,
            },
        },
        RuleTreeNode::Node {
            domain: Cube {
                min: corner(0.),
                max: corner(163_840.),
            },
            children: vec![0, 1],
        },
    ];
    RemyDna::new(RuleTree::new(nodes, 2).unwrap())
}

#[test]
fn test_save_load_roundtrip_on_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.remy.dna");

    let original = sample_policy();
    original.save(&path).unwrap();
    let loaded = RemyDna::load(&path).unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn test_repeated_load_release_cycles() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycle.remy.dna");
    sample_policy().save(&path).unwrap();

    // Every loaded policy is dropped at the end of the iteration; nothing
    // accumulates between cycles.
    for _ in 0..100 {
        let dna = RemyDna::load(&path).unwrap();
        let reaction = dna.evaluate(&snapshot(1.0, 1.0, 1.0), 5);
        assert_eq!(reaction.new_window, 8);
    }
}

#[test]
fn test_loading_missing_path_is_an_error() {
    init_tracing();
    let result = RemyDna::load(Path::new("/definitely/missing.remy.dna"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_loading_corrupt_file_is_an_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.remy.dna");
    std::fs::write(&path, b"this is not a whisker tree").unwrap();
    assert!(RemyDna::load(&path).is_err());
}

#[test]
fn test_evaluation_is_deterministic() {
    init_tracing();
    let dna = sample_policy();
    let point = snapshot(1.5, 1.5, 1.0);
    let first = dna.evaluate(&point, 10);
    for _ in 0..1000 {
        assert_eq!(dna.evaluate(&point, 10), first);
    }
}

#[test]
fn test_evaluation_never_goes_negative() {
    init_tracing();
    let dna = sample_policy();
    let extremes = [
        snapshot(10.0, 10.0, 0.0),
        snapshot(10.0, 10.0, 1e9),
        snapshot(0.0, 0.0, 0.0),
        snapshot(1e12, -1e12, f64::NAN),
    ];
    for point in extremes {
        for window in [0, 1, 5, u32::MAX] {
            let Reaction {
                new_window,
                intersend,
            } = dna.evaluate(&point, window);
            assert!(new_window <= 1_000_000);
            assert!(intersend >= std::time::Duration::ZERO);
        }
    }
}

#[test]
fn test_uncongested_path_grows_window() {
    init_tracing();
    let dna = sample_policy();
    // At minimum RTT with short inter-arrivals the policy deems the path
    // uncongested and grows the window.
    let reaction = dna.evaluate(&snapshot(1.0, 1.0, 1.0), 5);
    assert!(reaction.new_window >= 5);
}

#[test]
fn test_concurrent_evaluation_matches_sequential() {
    init_tracing();
    let dna = Arc::new(sample_policy());

    let points: Vec<Point> = (0..64)
        .map(|i| snapshot(f64::from(i) * 0.1, f64::from(i) * 0.07, f64::from(i) * 0.05))
        .collect();
    let sequential: Vec<Reaction> = points.iter().map(|p| dna.evaluate(p, 7)).collect();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let dna = Arc::clone(&dna);
        let points = points.clone();
        handles.push(thread::spawn(move || {
            points.iter().map(|p| dna.evaluate(p, 7)).collect::<Vec<_>>()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), sequential);
    }
}

#[test]
fn test_store_shares_one_handle_per_path() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.remy.dna");
    sample_policy().save(&path).unwrap();

    let store = PolicyStore::new();
    let first = store.get_or_load(&path).unwrap();
    let second = store.get_or_load(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.len(), 1);

    assert!(store.evict(&path));
    assert!(store.is_empty());
    // Existing handles keep working after eviction.
    let reaction = first.evaluate(&snapshot(1.0, 1.0, 1.0), 5);
    assert_eq!(reaction.new_window, 8);
}

#[test]
fn test_store_concurrent_loads_agree() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("racy.remy.dna");
    sample_policy().save(&path).unwrap();

    let store = Arc::new(PolicyStore::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let path = path.clone();
        handles.push(thread::spawn(move || {
            store.get_or_load(&path).unwrap().evaluate(&snapshot(3.0, 3.0, 3.0), 8)
        }));
    }
    for handle in handles {
        // The back-off rule halves the window.
        assert_eq!(handle.join().unwrap().new_window, 4);
    }
    assert_eq!(store.len(), 1);
}
