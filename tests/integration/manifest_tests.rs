//! Integration tests for reading dbt manifests and running the compile step

use crate::common::{sample_data, CliTestRunner, TestFixture};
use serde_json::json;
use std::fs;
use vdc::manifest::{read_manifest, DbtRunner};
use vdc::prompt::Answer;
use vdc::VdcError;

#[test]
fn test_read_manifest_resource_types() {
    let fixture = TestFixture::new().unwrap();
    let manifest = json!({
        "nodes": {
            "model.p.orders": {"resource_type": "model", "relation_name": "\"PROD\".\"SALES\".\"ORDERS\"", "database": "PROD"},
            "snapshot.p.orders_snap": {"resource_type": "snapshot", "relation_name": "prod.snapshots.orders_snap", "database": "prod"},
            "seed.p.countries": {"resource_type": "seed", "relation_name": "prod.seeds.countries", "database": "prod"},
            "model.p.ephemeral": {"resource_type": "model", "relation_name": null, "database": "prod"},
            "test.p.not_null": {"resource_type": "test", "relation_name": "prod.tests.not_null", "database": "audit"}
        },
        "sources": {
            "source.p.raw.events": {"resource_type": "source", "relation_name": "raw.events.clicks", "database": "raw"}
        }
    });
    let path = fixture.root().join("manifest.json");
    fs::write(&path, manifest.to_string()).unwrap();

    let managed = read_manifest(&path).unwrap();
    assert!(managed.contains("prod.sales.orders"));
    assert!(managed.contains("prod.snapshots.orders_snap"));
    assert!(managed.contains("prod.seeds.countries"));
    assert!(managed.contains("raw.events.clicks"));
    assert!(!managed.contains("prod.tests.not_null"));
    assert_eq!(managed.table_count(), 4);
    assert_eq!(managed.databases(), vec!["prod", "raw"]);
}

#[test]
fn test_read_manifest_errors() {
    let fixture = TestFixture::new().unwrap();

    let missing = fixture.root().join("target").join("manifest.json");
    assert!(matches!(read_manifest(&missing), Err(VdcError::Manifest { .. })));

    let invalid = fixture.root().join("broken.json");
    fs::write(&invalid, "{ not json").unwrap();
    let err = read_manifest(&invalid).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn test_disposal_with_missing_manifest() {
    let mut fixture = TestFixture::new().unwrap();
    fixture.create_database("prod", sample_data::WASTE_SQL).unwrap();
    let missing = fixture.root().join("nope.json").to_string_lossy().to_string();
    let runner = CliTestRunner::new(fixture);

    let err = runner.expect_failure(&["waste", "disposal", "--manifest", &missing], vec![]);
    assert!(matches!(err, VdcError::Manifest { .. }));
}

#[test]
fn test_dbt_executable_not_found() {
    let runner = DbtRunner {
        executable: "vdc-test-no-such-dbt".to_string(),
        project_dir: "dbt".into(),
        profiles_dir: "dbt".into(),
        target: "prod".to_string(),
    };

    match runner.compile() {
        Err(VdcError::ExternalTool { tool, status, .. }) => {
            assert_eq!(tool, "vdc-test-no-such-dbt");
            assert!(status.contains("not found"));
        }
        other => panic!("Expected ExternalTool error, got {:?}", other),
    }
}

#[cfg(unix)]
mod fake_dbt {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable shell script standing in for dbt
    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-dbt");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Writes a manifest managing `prod.sales.orders` into `<project>/target`
    /// and records its arguments
    fn compiling_script(dir: &Path) -> PathBuf {
        let manifest = json!({
            "nodes": {
                "model.p.orders": {"resource_type": "model", "relation_name": "\"prod\".\"sales\".\"orders\"", "database": "prod"}
            },
            "sources": {}
        });
        write_script(
            dir,
            &format!(
                "mkdir -p \"$7/target\"\necho \"$@\" > \"$7/args.txt\"\ncat > \"$7/target/manifest.json\" <<'EOF'\n{}\nEOF",
                manifest
            ),
        )
    }

    #[test]
    fn test_compile_produces_manifest() {
        let fixture = TestFixture::new().unwrap();
        let project = fixture.root().join("analytics");
        fs::create_dir_all(&project).unwrap();
        let script = compiling_script(fixture.root());

        let runner = DbtRunner {
            executable: script.to_string_lossy().to_string(),
            project_dir: project.clone(),
            profiles_dir: fixture.root().join("profiles"),
            target: "ci".to_string(),
        };
        let manifest_path = runner.compile().unwrap();

        assert_eq!(manifest_path, project.join("target").join("manifest.json"));
        assert!(read_manifest(&manifest_path).unwrap().contains("prod.sales.orders"));

        let args = fs::read_to_string(project.join("args.txt")).unwrap();
        assert!(args.starts_with("compile --target ci --profiles-dir"));
    }

    #[test]
    fn test_compile_failure_reports_output() {
        let fixture = TestFixture::new().unwrap();
        let script = write_script(fixture.root(), "echo compiling\necho boom >&2\nexit 2");

        let runner = DbtRunner {
            executable: script.to_string_lossy().to_string(),
            project_dir: fixture.root().join("analytics"),
            profiles_dir: fixture.root().join("profiles"),
            target: "prod".to_string(),
        };

        match runner.compile() {
            Err(VdcError::ExternalTool { stdout, stderr, status, .. }) => {
                assert_eq!(stdout.trim(), "compiling");
                assert_eq!(stderr.trim(), "boom");
                assert!(status.contains('2'));
            }
            other => panic!("Expected ExternalTool error, got {:?}", other),
        }
    }

    #[test]
    fn test_disposal_runs_dbt_compile() {
        let mut fixture = TestFixture::new().unwrap();
        fixture.create_database("prod", sample_data::WASTE_SQL).unwrap();
        let project = fixture.root().join("analytics");
        fs::create_dir_all(&project).unwrap();
        let script = compiling_script(fixture.root());

        let mut runner = CliTestRunner::new(fixture);
        let mut config = runner.fixture.config();
        config.dbt.executable = script.to_string_lossy().to_string();
        runner.config = Some(config);

        let project_arg = project.to_string_lossy().to_string();
        let prompter = runner.expect_success(
            &["waste", "disposal", "--dbt-project-dir", &project_arg, "--dbt-target", "ci"],
            vec![
                Answer::Select(vec!["prod".to_string()]),
                Answer::Defaults,
                Answer::Select(vec!["prod.sales.scratch".to_string()]),
                Answer::Confirm(true),
                Answer::Select(vec!["2025-01".to_string()]),
            ],
        );

        assert_eq!(prompter.offered("databases").unwrap(), &["prod"]);
        let args = fs::read_to_string(project.join("args.txt")).unwrap();
        assert!(args.contains("--target ci"));

        let tables = runner.fixture.table_names().unwrap();
        assert!(tables.contains(&"prod.sales.scratch_bck_20240615_drp_202501".to_string()));
        assert!(tables.contains(&"prod.sales.orders".to_string()));
    }
}
