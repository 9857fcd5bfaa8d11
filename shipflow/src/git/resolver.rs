//! Resolves the repository identity from local git state.

use super::{RepositoryRef, VcsClient};
use crate::errors::GitError;
use tracing::debug;

/// Remote value meaning "track another local branch".
pub const RELATIVE_REMOTE: &str = ".";

/// How many relative remotes are followed before giving up.
pub const MAX_RELATIVE_REMOTE_DEPTH: usize = 5;

/// Resolves the repository the current branch publishes to.
///
/// Reads the current branch's upstream remote, follows relative remotes
/// (`.`) through the tracked local branches, and parses the final remote's
/// URL.
///
/// # Errors
///
/// - [`GitError::NotARepository`] outside a work tree
/// - [`GitError::NoRemote`] when no usable remote is configured
/// - [`GitError::RelativeRemoteTooDeep`] past [`MAX_RELATIVE_REMOTE_DEPTH`] hops
/// - [`GitError::UnsupportedUrl`] when the remote URL cannot be parsed
pub async fn resolve_from_local_config<C>(git: &C) -> Result<RepositoryRef, GitError>
where
    C: VcsClient + ?Sized,
{
    if !git.is_inside_repository().await {
        return Err(GitError::NotARepository);
    }

    let mut remote = git.current_branch_upstream_remote_name().await?;
    if remote == RELATIVE_REMOTE {
        remote = follow_relative_remote(git).await?;
    }

    let url = git.remote_url(&remote).await?;
    debug!(remote = %remote, url = %url, "resolved remote");
    Ok(RepositoryRef::from_url(&url)?)
}

async fn follow_relative_remote<C>(git: &C) -> Result<String, GitError>
where
    C: VcsClient + ?Sized,
{
    let start = git.current_branch().await?;
    let (mut remote, mut merge_ref) = git.branch_merge_config(&start).await?;
    let mut hops = 0;

    while remote == RELATIVE_REMOTE {
        if hops == MAX_RELATIVE_REMOTE_DEPTH {
            return Err(GitError::RelativeRemoteTooDeep {
                branch: start,
                max: MAX_RELATIVE_REMOTE_DEPTH,
            });
        }
        let next = short_branch_name(&merge_ref);
        if next.is_empty() {
            return Err(GitError::NoRemote);
        }
        debug!(branch = %next, "following relative remote");
        (remote, merge_ref) = git.branch_merge_config(next).await?;
        hops += 1;
    }

    Ok(remote)
}

fn short_branch_name(merge_ref: &str) -> &str {
    merge_ref.strip_prefix("refs/heads/").unwrap_or(merge_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::client::MockVcsClient;
    use crate::git::GitCli;
    use crate::testing::git_repo;
    use mockall::predicate::function;
    use pretty_assertions::assert_eq;

    fn tracking(remote: &str, merge: &str) -> Result<(String, String), GitError> {
        Ok((remote.to_string(), merge.to_string()))
    }

    #[tokio::test]
    async fn test_not_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_from_local_config(&GitCli::new(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "current folder is not a git repository");
    }

    #[tokio::test]
    async fn test_no_remote() {
        let dir = git_repo::init();
        let err = resolve_from_local_config(&GitCli::new(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no remote configured to list refs from");
    }

    #[tokio::test]
    async fn test_repo_name_from_origin() {
        let dir = git_repo::init();
        git_repo::run(dir.path(), &["remote", "add", "origin", "git@github.com:shipflow/shipflow.git"]);

        let repo = resolve_from_local_config(&GitCli::new(dir.path()))
            .await
            .unwrap();
        assert_eq!(repo.to_string(), "shipflow/shipflow");
    }

    #[tokio::test]
    async fn test_repo_name_with_different_remote() {
        let dir = git_repo::init();
        git_repo::run(dir.path(), &["remote", "add", "origin", "git@github.com:someone/fork.git"]);
        git_repo::run(dir.path(), &["remote", "add", "upstream", "https://github.com/shipflow/shipflow.git"]);
        git_repo::run(dir.path(), &["config", "branch.main.remote", "upstream"]);
        git_repo::run(dir.path(), &["config", "branch.main.merge", "refs/heads/main"]);

        let repo = resolve_from_local_config(&GitCli::new(dir.path()))
            .await
            .unwrap();
        assert_eq!(repo.to_string(), "shipflow/shipflow");
    }

    #[tokio::test]
    async fn test_relative_remote() {
        let dir = git_repo::init();
        git_repo::run(dir.path(), &["remote", "add", "upstream", "https://github.com/shipflow/shipflow.git"]);
        git_repo::run(dir.path(), &["config", "branch.main.remote", "upstream"]);
        git_repo::run(dir.path(), &["config", "branch.main.merge", "refs/heads/main"]);
        let git = GitCli::new(dir.path());
        let direct = resolve_from_local_config(&git).await.unwrap();

        git_repo::run(dir.path(), &["checkout", "-b", "relative_branch"]);
        git_repo::run(dir.path(), &["config", "branch.relative_branch.remote", "."]);
        git_repo::run(dir.path(), &["config", "branch.relative_branch.merge", "refs/heads/main"]);

        let config = git.run(&["config", "--local", "--list"]).await.unwrap();
        assert!(config.contains("branch.relative_branch.remote=."));

        let repo = resolve_from_local_config(&git).await.unwrap();
        assert_eq!(repo.to_string(), "shipflow/shipflow");
        assert_eq!(repo, direct);
    }

    #[tokio::test]
    async fn test_relative_remote_chain() {
        let mut git = MockVcsClient::new();
        git.expect_is_inside_repository().return_const(true);
        git.expect_current_branch_upstream_remote_name()
            .returning(|| Ok(RELATIVE_REMOTE.to_string()));
        git.expect_current_branch()
            .returning(|| Ok("feature".to_string()));
        git.expect_branch_merge_config()
            .with(function(|b: &str| b == "feature"))
            .returning(|_| tracking(".", "refs/heads/develop"));
        git.expect_branch_merge_config()
            .with(function(|b: &str| b == "develop"))
            .returning(|_| tracking(".", "refs/heads/main"));
        git.expect_branch_merge_config()
            .with(function(|b: &str| b == "main"))
            .returning(|_| tracking("origin", "refs/heads/main"));
        git.expect_remote_url()
            .with(function(|b: &str| b == "origin"))
            .times(1)
            .returning(|_| Ok("git@gitlab.com:group/nested/app.git".to_string()));

        let repo = resolve_from_local_config(&git).await.unwrap();
        assert_eq!(repo.to_string(), "group/nested/app");
    }

    #[tokio::test]
    async fn test_relative_remote_depth_is_bounded() {
        let mut git = MockVcsClient::new();
        git.expect_is_inside_repository().return_const(true);
        git.expect_current_branch_upstream_remote_name()
            .returning(|| Ok(RELATIVE_REMOTE.to_string()));
        git.expect_current_branch()
            .returning(|| Ok("a".to_string()));
        // a -> b -> a -> b ... never reaches a network remote
        git.expect_branch_merge_config()
            .with(function(|b: &str| b == "a"))
            .returning(|_| tracking(".", "refs/heads/b"));
        git.expect_branch_merge_config()
            .with(function(|b: &str| b == "b"))
            .returning(|_| tracking(".", "refs/heads/a"));
        git.expect_remote_url().never();

        let err = resolve_from_local_config(&git).await.unwrap_err();
        assert!(matches!(
            err,
            GitError::RelativeRemoteTooDeep { ref branch, max: MAX_RELATIVE_REMOTE_DEPTH } if branch == "a"
        ));
    }

    #[tokio::test]
    async fn test_unsupported_remote_url() {
        let mut git = MockVcsClient::new();
        git.expect_is_inside_repository().return_const(true);
        git.expect_current_branch_upstream_remote_name()
            .returning(|| Ok("origin".to_string()));
        git.expect_remote_url()
            .returning(|_| Ok("/srv/git/app".to_string()));

        let err = resolve_from_local_config(&git).await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported repository URL: /srv/git/app");
    }

    #[test]
    fn test_short_branch_name() {
        assert_eq!(short_branch_name("refs/heads/main"), "main");
        assert_eq!(short_branch_name("release/1.x"), "release/1.x");
    }
}
