//! Diff extraction against real git repositories.

use std::path::Path;
use std::process::Command;

use covgate_core::{
    CovgateError, DiffExtractor, DiffFailurePolicy, DiffStrategy, PathRules, ReportFormat,
};

fn git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("git is installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write(repo: &Path, rel: &str, contents: &str) {
    let path = repo.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Repo with `main` holding a baseline and `feature` checked out.
fn repo_with_feature_branch() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init"]);
    git(repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(repo, &["config", "user.name", "test-user"]);
    git(repo, &["config", "user.email", "test@example.com"]);
    git(repo, &["config", "commit.gpgsign", "false"]);

    write(repo, "backend/app/models.py", "a = 1\nb = 2\nc = 3\n");
    write(repo, "frontend/src/a.ts", "export const a = 1;\n");
    git(repo, &["add", "."]);
    git(repo, &["commit", "-m", "baseline"]);

    git(repo, &["checkout", "-b", "feature"]);
    write(repo, "backend/app/models.py", "a = 1\nb = 2\nnew_1 = 4\nnew_2 = 5\nc = 3\n");
    write(repo, "backend/app/tests/test_models.py", "def test_x():\n    pass\n");
    write(repo, "frontend/src/a.ts", "export const a = 1;\nexport const b = 2;\n");
    write(repo, "docs/notes.md", "hello\n");
    git(repo, &["add", "."]);
    git(repo, &["commit", "-m", "feature work"]);
    dir
}

fn backend_rules() -> PathRules {
    PathRules::default()
        .with_include("backend")
        .with_strip_prefix("backend")
        .with_extensions(ReportFormat::CoveragePy.default_extensions())
}

#[test]
fn local_ref_fallback_finds_changed_lines() {
    let repo = repo_with_feature_branch();
    let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::Error);

    let changed = extractor
        .extract_changed_lines("main", &backend_rules())
        .expect("diff against local main");

    assert_eq!(changed.file_count(), 1, "test files and other partitions are excluded");
    let lines: Vec<u32> = changed.lines("app/models.py").unwrap().iter().copied().collect();
    assert_eq!(lines, vec![3, 4]);
}

#[test]
fn partitions_see_disjoint_files() {
    let repo = repo_with_feature_branch();
    let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::Error);
    let frontend = PathRules::default()
        .with_include("frontend")
        .with_strip_prefix("frontend")
        .with_extensions(ReportFormat::Istanbul.default_extensions());

    let changed = extractor.extract_changed_lines("main", &frontend).unwrap();
    assert_eq!(changed.file_count(), 1);
    assert!(changed.lines("src/a.ts").unwrap().contains(&2));
}

#[test]
fn staged_fallback_used_when_base_is_unknown() {
    let repo = repo_with_feature_branch();
    write(repo.path(), "backend/app/models.py", "a = 1\nb = 2\nnew_1 = 4\nnew_2 = 5\nc = 3\nd = 6\n");
    git(repo.path(), &["add", "."]);

    let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::Error);
    let changed = extractor
        .extract_changed_lines("no-such-branch", &backend_rules())
        .unwrap();
    let lines: Vec<u32> = changed.lines("app/models.py").unwrap().iter().copied().collect();
    assert_eq!(lines, vec![6]);
}

#[test]
fn exhausted_strategies_error_lists_attempts() {
    let repo = repo_with_feature_branch();
    let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::Error)
        .with_strategies(vec![DiffStrategy::RemoteTracking, DiffStrategy::LocalRef]);

    let err = extractor
        .extract_changed_lines("no-such-branch", &backend_rules())
        .unwrap_err();
    match err {
        CovgateError::DiffUnavailable { attempts, base } => {
            assert_eq!(base, "no-such-branch");
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].strategy, DiffStrategy::RemoteTracking);
            assert!(attempts[1].command.contains("no-such-branch...HEAD"));
        }
        other => panic!("expected DiffUnavailable, got {other:?}"),
    }
}

#[test]
fn exhausted_strategies_tolerated_when_policy_allows() {
    let repo = repo_with_feature_branch();
    let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::TreatAsEmpty)
        .with_strategies(vec![DiffStrategy::RemoteTracking, DiffStrategy::LocalRef]);

    let changed = extractor
        .extract_changed_lines("no-such-branch", &backend_rules())
        .unwrap();
    assert!(changed.is_empty());
}

#[test]
fn user_prefix_config_does_not_hide_changes() {
    let repo = repo_with_feature_branch();
    git(repo.path(), &["config", "diff.mnemonicPrefix", "true"]);
    git(repo.path(), &["config", "diff.noprefix", "true"]);
    write(repo.path(), "backend/app/staged.py", "x = 1\ny = 2\n");
    git(repo.path(), &["add", "."]);

    for strategy in [DiffStrategy::LocalRef, DiffStrategy::Staged] {
        let extractor = DiffExtractor::new(repo.path(), DiffFailurePolicy::Error)
            .with_strategies(vec![strategy]);
        let changed = extractor
            .extract_changed_lines("main", &backend_rules())
            .unwrap();
        assert!(!changed.is_empty(), "{strategy} diff lost its files");
    }
}
