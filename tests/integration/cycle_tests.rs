//! Integration tests for full snapshot cycles

use crate::common::assertions::*;
use crate::common::{sample_data, RecordingLoader, TestFixture, START_STAMP};
use std::fs;
use std::time::Duration;
use tabvault::loader::NoLoader;
use tabvault::{AcceptOutcome, CancellationToken, CycleOutcome, RepeatPolicy};

#[test]
fn test_first_cycle_installs_baseline() {
    let fixture = TestFixture::new().unwrap();
    fixture.drop_incoming(sample_data::BASELINE).unwrap();
    let mut loader = RecordingLoader::default();

    let mut orchestrator = fixture.orchestrator(&mut loader, fixture.clock());
    let report = orchestrator.run_cycle().unwrap();
    drop(orchestrator);

    assert!(matches!(
        report.outcome,
        CycleOutcome::Accepted {
            outcome: AcceptOutcome::Created { .. }
        }
    ));
    assert!(report.diff.as_ref().unwrap().baseline_missing);
    assert!(report.diff_artifact.is_none());
    assert!(report.deleted_artifact.is_none());
    assert!(loader.requests.is_empty(), "no changes, no downstream call");

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    assert_not_exists(&fixture.incoming());
}

#[test]
fn test_reordered_snapshot_is_discarded() {
    let fixture = TestFixture::new().unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    fixture.drop_incoming(sample_data::BASELINE_REORDERED).unwrap();
    let mut loader = RecordingLoader::default();

    let mut orchestrator = fixture.orchestrator(&mut loader, fixture.clock());
    let report = orchestrator.run_cycle().unwrap();
    drop(orchestrator);

    match report.outcome {
        CycleOutcome::Accepted {
            outcome: AcceptOutcome::DiscardedIdentical { canonical },
        } => assert_eq!(canonical, fixture.canonical()),
        other => panic!("unexpected outcome {:?}", other),
    }
    let diff = report.diff.unwrap();
    assert_eq!(diff.unchanged, 3);
    assert_eq!(diff.added + diff.modified + diff.deleted, 0);
    assert!(loader.requests.is_empty());

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    assert_not_exists(&fixture.incoming());
    assert_eq!(fixture.work_files(), vec!["R.csv"]);
}

#[test]
fn test_changed_snapshot_is_loaded_then_promoted() {
    let fixture = TestFixture::new().unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    fixture.drop_incoming(sample_data::UPDATED).unwrap();
    let mut loader = RecordingLoader::default();

    let mut orchestrator = fixture.orchestrator(&mut loader, fixture.clock());
    let report = orchestrator.run_cycle().unwrap();
    drop(orchestrator);

    let backup = fixture.work_file(&format!("R_{}.csv", START_STAMP));
    match &report.outcome {
        CycleOutcome::Accepted {
            outcome: AcceptOutcome::Replaced { canonical, backup: b },
        } => {
            assert_eq!(canonical, &fixture.canonical());
            assert_eq!(b, &backup);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let diff = report.diff.as_ref().unwrap();
    assert_eq!((diff.added, diff.modified, diff.deleted), (1, 1, 1));

    assert_eq!(loader.requests.len(), 1);
    let request = &loader.requests[0];
    assert_eq!(request.diff, Some(fixture.work_file("R_Diff.csv")));
    assert_eq!(request.deleted, Some(fixture.work_file("R_Del.csv")));

    assert_file_content(
        &fixture.work_file("R_Diff.csv"),
        "\"Item\";\"RecordId\";\"Product\";\"Amount\"\n\
         \"1\";\"100\";\"Apple\";\"1.60\"\n\
         \"3\";\"103\";\"Date\";\"3.00\"\n",
    );
    assert_file_content(
        &fixture.work_file("R_Del.csv"),
        "\"Item\";\"RecordId\";\"Product\";\"Amount\"\n\
         \"3\";\"102\";\"Cherry\";\"2.00\"\n",
    );
    assert_file_content(&fixture.canonical(), sample_data::UPDATED);
    assert_file_content(&backup, sample_data::BASELINE);
    assert_not_exists(&fixture.incoming());
}

#[test]
fn test_loader_failure_leaves_canonical_untouched() {
    let fixture = TestFixture::new().unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    fixture.drop_incoming(sample_data::UPDATED).unwrap();
    let mut loader = RecordingLoader::failing();

    let mut orchestrator = fixture.orchestrator(&mut loader, fixture.clock());
    let report = orchestrator.run_cycle().unwrap();
    drop(orchestrator);

    assert!(report.outcome.is_failure());
    match report.outcome {
        CycleOutcome::Quarantined {
            reason,
            artifacts,
            parked,
        } => {
            assert!(reason.contains("exited with status 1"));
            assert_eq!(
                artifacts,
                vec![
                    fixture.work_file(&format!("R_Diff_ERR_{}.csv", START_STAMP)),
                    fixture.work_file(&format!("R_Del_ERR_{}.csv", START_STAMP)),
                ]
            );
            assert_eq!(
                parked,
                Some(fixture.work_file(&format!("R_ERR_{}.csv", START_STAMP)))
            );
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    assert_not_exists(&fixture.work_file("R_Diff.csv"));
    assert_not_exists(&fixture.work_file("R_Del.csv"));
    assert_not_exists(&fixture.incoming());
}

#[test]
fn test_no_snapshot_still_sweeps() {
    let fixture = TestFixture::new().unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();

    let mut orchestrator = fixture.orchestrator(NoLoader, fixture.clock());
    let report = orchestrator.run_cycle().unwrap();

    assert!(matches!(report.outcome, CycleOutcome::NoSnapshot));
    assert!(!report.outcome.is_failure());
    let sweep = report.sweep.unwrap();
    assert_eq!(sweep.examined, 1);
    assert!(sweep.deleted.is_empty());
}

#[test]
fn test_repeated_run_processes_each_drop() {
    let fixture = TestFixture::new().unwrap();
    fixture.drop_incoming(sample_data::BASELINE).unwrap();
    let clock = fixture.clock();

    let mut orchestrator = fixture.orchestrator(NoLoader, clock.clone());
    let first = orchestrator
        .run(RepeatPolicy::Once, &CancellationToken::new())
        .unwrap();
    assert_eq!(first.cycles, 1);
    assert_eq!(first.failures, 0);

    fixture.drop_incoming(sample_data::UPDATED).unwrap();
    let summary = orchestrator
        .run(
            RepeatPolicy::Every {
                interval: Duration::from_secs(60),
                max_cycles: Some(2),
            },
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.failures, 0);
    assert!(matches!(
        summary.last.as_ref().map(|r| &r.outcome),
        Some(CycleOutcome::NoSnapshot)
    ));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
    assert_file_content(&fixture.canonical(), sample_data::UPDATED);
    assert!(fs::read_dir(fixture.work_dir()).unwrap().count() >= 4);
}
