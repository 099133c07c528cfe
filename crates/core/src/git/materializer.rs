//! Checking out pull request heads and the baseline into one working tree.
//!
//! All checkouts share a single working tree, so callers must run them one
//! at a time.

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{AutotagOption, BranchType, FetchOptions, Repository};
use tracing::{debug, info, instrument, warn};

use crate::config::ProjectConfig;
use crate::errors::MaterializeError;
use crate::models::ChangeId;

/// Makes a revision's file tree available in the working directory.
#[allow(async_fn_in_trait)]
pub trait Materializer {
    /// Check out the head of an open change.
    async fn checkout_change(&self, change: &ChangeId) -> Result<(), MaterializeError>;

    /// Check out the baseline revision.
    async fn checkout_baseline(&self) -> Result<(), MaterializeError>;
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Materializer backed by a local clone.
///
/// Pull request heads are fetched from `refs/pull/<n>/head` on the remote
/// into `refs/prconflict/pull/<n>` and checked out detached.
pub struct GitMaterializer {
    repo: Repository,
    remote: String,
    baseline_ref: String,
}

impl GitMaterializer {
    /// Open the clone at `repo_path`.
    pub fn new<P: AsRef<Path>>(
        repo_path: P,
        remote: impl Into<String>,
        baseline_ref: impl Into<String>,
    ) -> Result<Self, MaterializeError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| MaterializeError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self {
            repo,
            remote: remote.into(),
            baseline_ref: baseline_ref.into(),
        })
    }

    /// Open the clone described by the `[project]` section.
    pub fn from_config(config: &ProjectConfig) -> Result<Self, MaterializeError> {
        Self::new(&config.repo_path, &config.remote, &config.baseline_ref)
    }

    /// Local ref a change's head is fetched into.
    pub fn local_ref(change: &ChangeId) -> String {
        format!("refs/prconflict/pull/{}", change)
    }

    /// Fetch the head of `change` from the remote. Returns the local ref.
    #[instrument(skip(self), fields(remote = %self.remote))]
    fn fetch_change(&self, change: &ChangeId) -> Result<String, MaterializeError> {
        if change.number().is_none() {
            return Err(MaterializeError::InvalidChangeId(change.to_string()));
        }
        let local_ref = Self::local_ref(change);
        let refspec = format!("+refs/pull/{}/head:{}", change, local_ref);

        let mut remote = self.repo.find_remote(&self.remote)?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.download_tags(AutotagOption::None);
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_opts), None)
            .map_err(|e| {
                warn!(error = %e, "fetch failed");
                MaterializeError::FetchFailed {
                    change: change.to_string(),
                    detail: e.message().to_string(),
                }
            })?;

        debug!(local_ref = %local_ref, "fetched change head");
        Ok(local_ref)
    }

    /// Force-checkout `spec`, attaching HEAD when it names a local branch.
    fn checkout_spec(&self, spec: &str) -> Result<(), MaterializeError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|_| MaterializeError::RefNotFound(spec.to_string()))?;
        let commit = object.peel_to_commit()?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;

        let branch_ref = self
            .repo
            .find_branch(spec, BranchType::Local)
            .ok()
            .and_then(|b| b.get().name().map(str::to_string));
        match branch_ref {
            Some(name) => self.repo.set_head(&name)?,
            None => self.repo.set_head_detached(commit.id())?,
        }

        info!(spec, sha = %commit.id(), "checked out");
        Ok(())
    }
}

impl Materializer for GitMaterializer {
    async fn checkout_change(&self, change: &ChangeId) -> Result<(), MaterializeError> {
        let local_ref = self.fetch_change(change)?;
        self.checkout_spec(&local_ref)
    }

    async fn checkout_baseline(&self) -> Result<(), MaterializeError> {
        self.checkout_spec(&self.baseline_ref)
    }
}

// ---------------------------------------------------------------------------
// No-op
// ---------------------------------------------------------------------------

/// Leaves the working tree as it is. Used when the tree is prepared
/// externally or classification does not read files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMaterializer;

impl Materializer for NoopMaterializer {
    async fn checkout_change(&self, change: &ChangeId) -> Result<(), MaterializeError> {
        debug!(change = %change, "checkout skipped");
        Ok(())
    }

    async fn checkout_baseline(&self) -> Result<(), MaterializeError> {
        debug!("baseline checkout skipped");
        Ok(())
    }
}
