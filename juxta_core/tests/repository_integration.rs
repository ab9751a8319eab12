mod support;

use git2::Repository as GitRepository;
use juxta_core::backend::{GitBackend, GitHandle, RangeRequest};
use juxta_core::repository::{Git2Backend, Repository};
use juxta_core::{Error, Result};

use support::{commit_all, write_file, Fixture};

fn range<'a>(
    base_path: &'a camino::Utf8Path,
    base_ref: &'a str,
    head_ref: &'a str,
    direct: bool,
) -> RangeRequest<'a> {
    RangeRequest {
        base_path,
        base_ref,
        head_ref,
        direct,
        file_only: false,
    }
}

#[test]
fn merge_base_range_within_one_repository() -> Result<()> {
    let fixture = Fixture::new()?;
    let path = fixture.path("alice/widget");
    let repo = Repository::open(&path)?;

    let info = repo.compare_info(&range(&path, "refs/heads/main", "refs/heads/develop", false))?;

    assert_eq!(info.base_commit_id, fixture.main_head.to_string());
    assert_eq!(info.merge_base, fixture.main_head.to_string());
    assert_eq!(info.head_commit_id, fixture.develop_head.to_string());
    assert_eq!(info.commits.len(), 1);
    assert_eq!(info.commits[0].oid, fixture.develop_head.to_string());
    assert_eq!(info.commits[0].summary.as_deref(), Some("Add develop work"));
    assert_eq!(info.files_changed, 1);
    Ok(())
}

#[test]
fn base_objects_are_reachable_from_fork() -> Result<()> {
    let fixture = Fixture::new()?;
    let upstream_path = fixture.path("alice/widget");
    let upstream = GitRepository::open(&upstream_path)?;
    write_file(&upstream, "third.txt", "only upstream has this\n");
    let third = commit_all(&upstream, "Third commit")?;

    let fork = Repository::open(fixture.path("bob/widget"))?;
    assert!(!fork.is_commit(&third.to_string())?);

    let merge = fork.compare_info(&range(
        &upstream_path,
        "refs/heads/main",
        "refs/heads/feature",
        false,
    ))?;
    assert_eq!(merge.base_commit_id, third.to_string());
    assert_eq!(merge.merge_base, fixture.main_head.to_string());
    assert_eq!(merge.commits.len(), 1);
    assert_eq!(merge.files_changed, 1);

    let direct = fork.compare_info(&range(
        &upstream_path,
        "refs/heads/main",
        "refs/heads/feature",
        true,
    ))?;
    assert_eq!(direct.commits.len(), 1);
    // third.txt removed, feature.txt added
    assert_eq!(direct.files_changed, 2);
    Ok(())
}

#[test]
fn unrelated_histories_have_no_commits() -> Result<()> {
    let fixture = Fixture::new()?;
    let upstream_path = fixture.path("alice/widget");
    let secret = Repository::open(fixture.path("erin/secret"))?;

    let info = secret.compare_info(&range(
        &upstream_path,
        "refs/heads/main",
        "refs/heads/main",
        false,
    ))?;

    assert_eq!(info.merge_base, info.base_commit_id);
    assert_eq!(info.base_commit_id, fixture.main_head.to_string());
    assert!(info.commits.is_empty());
    assert_eq!(info.files_changed, 2);
    Ok(())
}

#[test]
fn file_only_skips_commit_listing() -> Result<()> {
    let fixture = Fixture::new()?;
    let path = fixture.path("alice/widget");
    let repo = Repository::open(&path)?;

    let info = repo.compare_info(&RangeRequest {
        file_only: true,
        ..range(&path, "refs/heads/main", "refs/heads/develop", false)
    })?;

    assert!(info.commits.is_empty());
    assert_eq!(info.files_changed, 1);
    Ok(())
}

#[test]
fn short_commit_ids_resolve_only_when_unique_and_long_enough() -> Result<()> {
    let fixture = Fixture::new()?;
    let repo = Repository::open(fixture.path("alice/widget"))?;
    let full = fixture.main_initial.to_string();

    assert_eq!(repo.resolve_short_commit(&full[..7])?, Some(full.clone()));
    assert_eq!(repo.resolve_short_commit(&full[..3])?, None);
    assert_eq!(repo.resolve_short_commit("zzzzzzz")?, None);
    assert_eq!(repo.resolve_short_commit("main")?, None);
    assert_eq!(repo.resolve_short_commit(&"0".repeat(12))?, None);
    Ok(())
}

#[test]
fn commit_lookup_carries_message_and_signature() -> Result<()> {
    let fixture = Fixture::new()?;
    let repo = Repository::open(fixture.path("alice/widget"))?;

    let revision = repo.commit("develop")?;
    assert_eq!(revision.oid, fixture.develop_head.to_string());
    assert_eq!(revision.summary.as_deref(), Some("Add develop work"));
    assert_eq!(
        revision.message.as_deref(),
        Some("Add develop work\n\nLonger description.\n")
    );
    let author = revision.author.expect("author");
    assert_eq!(author.name, "Test User");
    assert!(revision.timestamp.is_some());
    Ok(())
}

#[test]
fn backend_reports_missing_repositories() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = camino::Utf8Path::from_path(temp.path()).expect("utf-8 path");

    let Err(err) = Git2Backend::new().open(&path.join("nowhere")) else {
        panic!("opened a missing repository");
    };
    assert!(matches!(err, Error::NotARepository { .. }));
}
