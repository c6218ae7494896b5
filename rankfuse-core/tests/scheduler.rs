//! End-to-end scheduling: run files on disk in, fused files out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rankfuse_core::{
    read_runs, AlgorithmKind, FusionScheduler, Normalisation, RankFuseError, SchedulerConfig,
    SummarySnapshot, WorkerPool,
};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(60);

/// Three runs over two folds, users 1 and 2.
fn write_runs(dir: &Path) {
    let runs = [
        ("knn", "1 Q0 3 0 5.0 knn\n1 Q0 1 1 3.0 -\n1 Q0 2 2 1.0 -\n1 Q0 4 3 0.5 -\n2 Q0 9 0 1.0 knn\n"),
        ("svd", "1 Q0 1 0 2.0 svd\n1 Q0 2 1 1.5 -\n1 Q0 3 2 1.0 -\n1 Q0 4 3 0.5 -\n"),
        ("pop", "1 Q0 4 0 9.0 pop\n1 Q0 3 1 8.0 -\n2 Q0 8 0 4.0 pop\n2 Q0 9 1 2.0 -\n"),
    ];
    for fold in 1..=2 {
        for (name, body) in runs {
            fs::write(dir.join(format!("run-{name}-fold{fold}.txt")), body).unwrap();
        }
    }
}

/// Schedule every algorithm for every fold on a fresh pool and wait.
fn fuse_all(runs_dir: &Path, out_dir: &Path, config: SchedulerConfig) -> SummarySnapshot {
    let folds = read_runs(runs_dir, config.max_rank, Normalisation::None).unwrap();
    let pool = Arc::new(WorkerPool::new(Some(4)).unwrap());
    let scheduler = FusionScheduler::new(Arc::clone(&pool), config);

    for kind in AlgorithmKind::ALL {
        for (&fold, runs) in &folds {
            scheduler.schedule_fold(kind, fold, runs, out_dir).unwrap();
        }
    }
    assert!(pool.wait_idle(WAIT));
    scheduler.summary().snapshot()
}

fn outputs(dir: &Path) -> BTreeMap<PathBuf, (String, SystemTime)> {
    fs::read_dir(dir).unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| {
            let meta = fs::metadata(&p).unwrap();
            let text = fs::read_to_string(&p).unwrap();
            (p, (text, meta.modified().unwrap()))
        })
        .collect()
}

#[test]
fn test_fuses_every_combination_of_every_fold() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());

    let snap = fuse_all(runs.path(), out.path(), SchedulerConfig::default());

    // 3 runs per fold: 3 pairs + 1 triple, 2 folds, 6 algorithms.
    assert_eq!(snap.scheduled, 4 * 2 * 6);
    assert_eq!(snap.computed, snap.scheduled);
    assert_eq!(snap.failed, 0);

    let files = outputs(out.path());
    assert_eq!(files.len(), 48);
    assert!(files.keys().all(|p| p.extension().unwrap() == "txt"));
    assert!(out.path().join("combMNZ-none-n3-knn-pop-svd-fold2.txt").exists());
    assert!(out.path().join("condorcet-none-n2-knn-svd-fold1.txt").exists());
}

#[test]
fn test_output_contents() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());
    fuse_all(runs.path(), out.path(), SchedulerConfig { max_rank: 4, stale_marker_age: None });

    let text = fs::read_to_string(out.path().join("combSum-none-n2-knn-svd-fold1.txt")).unwrap();
    assert_eq!(text, "\
1\tQ0\t3\t0\t6.000000\tcombSum
1\tQ0\t1\t1\t5.000000\t-
1\tQ0\t2\t2\t2.500000\t-
1\tQ0\t4\t3\t1.000000\t-
2\tQ0\t9\t0\t1.000000\tcombSum
");

    let text = fs::read_to_string(out.path().join("copeland-none-n2-knn-svd-fold1.txt")).unwrap();
    let items: Vec<&str> = text.lines().map(|l| l.split('\t').nth(2).unwrap()).collect();
    assert_eq!(items, vec!["1", "3", "2", "4", "9"]);
}

#[test]
fn test_truncates_to_max_rank() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());
    fuse_all(runs.path(), out.path(), SchedulerConfig { max_rank: 2, stale_marker_age: None });

    for (path, (text, _)) in outputs(out.path()) {
        let mut per_user: BTreeMap<&str, usize> = BTreeMap::new();
        for line in text.lines() {
            *per_user.entry(line.split('\t').next().unwrap()).or_default() += 1;
        }
        assert!(per_user.values().all(|&n| n <= 2), "{} exceeds max rank", path.display());
    }
}

#[test]
fn test_second_invocation_changes_nothing() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());

    fuse_all(runs.path(), out.path(), SchedulerConfig::default());
    let before = outputs(out.path());

    std::thread::sleep(Duration::from_millis(20));
    let snap = fuse_all(runs.path(), out.path(), SchedulerConfig::default());

    assert_eq!(snap.computed, 0);
    assert_eq!(snap.already_done, snap.scheduled);
    assert_eq!(outputs(out.path()), before);
}

#[test]
fn test_markers_block_until_stale() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());

    let marker = out.path().join("borda-none-n2-knn-svd-fold1.tmp");
    let output = marker.with_extension("txt");
    fs::write(&marker, "").unwrap();

    // Fresh marker: someone else is on it.
    let config = SchedulerConfig { max_rank: 100, stale_marker_age: Some(Duration::from_secs(3600)) };
    let snap = fuse_all(runs.path(), out.path(), config);
    assert_eq!(snap.in_progress, 1);
    assert_eq!(snap.computed, snap.scheduled - 1);
    assert!(marker.exists());
    assert!(!output.exists());

    // Same marker, now older than the configured age.
    fs::File::options().write(true).open(&marker).unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
        .unwrap();
    let snap = fuse_all(runs.path(), out.path(), config);
    assert_eq!(snap.computed, 1);
    assert_eq!(snap.in_progress, 0);
    assert!(!marker.exists());
    assert!(output.exists());
}

#[test]
fn test_output_path_is_a_file() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());
    let not_a_dir = out.path().join("fused");
    fs::write(&not_a_dir, "").unwrap();

    let folds = read_runs(runs.path(), 100, Normalisation::None).unwrap();
    let pool = Arc::new(WorkerPool::new(Some(1)).unwrap());
    let scheduler = FusionScheduler::new(Arc::clone(&pool), SchedulerConfig::default());

    let err = scheduler.schedule_fold(AlgorithmKind::Borda, 1, &folds[&1], &not_a_dir).unwrap_err();
    assert!(matches!(err, RankFuseError::NotADirectory(_)));
    assert!(err.is_configuration());
    assert_eq!(scheduler.summary().snapshot().scheduled, 0);
}

#[test]
fn test_colliding_run_names_are_rejected_before_dispatch() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    for name in ["a-b", "c", "a", "b-c"] {
        fs::write(runs.path().join(format!("run-{name}-fold1.txt")), "1 Q0 1 0 1.0 x\n").unwrap();
    }

    let folds = read_runs(runs.path(), 100, Normalisation::None).unwrap();
    let pool = Arc::new(WorkerPool::new(Some(1)).unwrap());
    let scheduler = FusionScheduler::new(Arc::clone(&pool), SchedulerConfig::default());

    let err = scheduler.schedule_fold(AlgorithmKind::CombSum, 1, &folds[&1], out.path()).unwrap_err();
    assert!(matches!(err, RankFuseError::KeyCollision(_)));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_normalisation_appears_in_filenames() {
    let runs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_runs(runs.path());

    let folds = read_runs(runs.path(), 100, Normalisation::Zmuv { offset: 2.0 }).unwrap();
    let pool = Arc::new(WorkerPool::new(Some(2)).unwrap());
    let scheduler = FusionScheduler::new(Arc::clone(&pool), SchedulerConfig::default());
    scheduler.schedule_fold(AlgorithmKind::CombAnz, 1, &folds[&1], out.path()).unwrap();
    assert!(pool.wait_idle(WAIT));

    assert!(out.path().join("combANZ-zmuv2-n3-knn-pop-svd-fold1.txt").exists());
}
