//! Paper catalog use-case service.
//!
//! # Responsibility
//! - Expose the catalog queries (existence, completion backlog, counts,
//!   description) to application callers.
//! - Own the import and enrichment write flows built on those queries.
//!
//! # Invariants
//! - Every query re-reads storage; nothing is cached between calls.
//! - Repository errors are returned unchanged, after one metadata-only log line.

use crate::model::paper::{Paper, PaperId, NO_ABSTRACT};
use crate::repo::paper_repo::{PaperRepository, RepoError, RepoResult};
use log::{debug, error, info, warn};

/// Result of importing one paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// A new row was created.
    Created(PaperId),
    /// A paper with the same `mendeley_id` is already catalogued.
    AlreadyPresent(PaperId),
}

impl ImportOutcome {
    pub fn paper_id(self) -> PaperId {
        match self {
            Self::Created(id) | Self::AlreadyPresent(id) => id,
        }
    }
}

/// Catalog service over any paper repository.
pub struct PaperCatalog<R: PaperRepository> {
    repo: R,
}

impl<R: PaperRepository> PaperCatalog<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns whether a paper with exactly this Mendeley id is catalogued.
    ///
    /// An unknown id is `Ok(false)`. Storage failures are `Err`.
    pub fn exists(&self, mendeley_id: &str) -> RepoResult<bool> {
        let found = self
            .repo
            .paper_exists(mendeley_id)
            .map_err(|err| log_failure("paper_exists", err))?;
        debug!("event=paper_exists module=catalog status=ok found={found}");
        Ok(found)
    }

    /// Returns papers still waiting for enrichment.
    ///
    /// The set is every paper with an empty abstract, minus papers whose
    /// abstract is `No abstract.`, in storage insertion order.
    pub fn papers_needing_completion(&self) -> RepoResult<Vec<Paper>> {
        let papers = self
            .repo
            .list_papers_to_complete()
            .map_err(|err| log_failure("papers_to_complete", err))?;
        debug!(
            "event=papers_to_complete module=catalog status=ok count={}",
            papers.len()
        );
        Ok(papers)
    }

    /// Counts all papers, or the papers associated with `category`.
    ///
    /// Unknown or blank categories count as `0`.
    pub fn count_papers(&self, category: Option<&str>) -> RepoResult<u64> {
        let count = self
            .repo
            .count_papers(category)
            .map_err(|err| log_failure("count_papers", err))?;
        debug!(
            "event=count_papers module=catalog status=ok filtered={} count={count}",
            category.is_some()
        );
        Ok(count)
    }

    /// Title followed by abstract with no separator.
    pub fn get_description(&self, paper: &Paper) -> String {
        paper.description()
    }

    pub fn get_paper(&self, id: PaperId) -> RepoResult<Option<Paper>> {
        self.repo.get_paper(id)
    }

    /// Creates `paper` unless its Mendeley id is already catalogued.
    ///
    /// Papers without a Mendeley id are always created.
    pub fn import_paper(&self, paper: &Paper) -> RepoResult<ImportOutcome> {
        if let Some(mendeley_id) = paper.mendeley_id.as_deref() {
            if let Some(existing) = self
                .repo
                .get_paper_by_mendeley_id(mendeley_id)
                .map_err(|err| log_failure("paper_import", err))?
            {
                info!(
                    "event=paper_import module=catalog status=skipped paper_id={}",
                    existing.id
                );
                return Ok(ImportOutcome::AlreadyPresent(existing.id));
            }
        }

        let id = self
            .repo
            .create_paper(paper)
            .map_err(|err| log_failure("paper_import", err))?;
        info!("event=paper_import module=catalog status=ok paper_id={id}");
        Ok(ImportOutcome::Created(id))
    }

    /// Stores the outcome of abstract enrichment for one paper.
    ///
    /// `None` or blank text records `No abstract.`, which removes the paper
    /// from the completion backlog just like a real abstract does.
    pub fn record_enrichment(
        &self,
        id: PaperId,
        abstract_text: Option<&str>,
    ) -> RepoResult<Paper> {
        let mut paper = self
            .repo
            .get_paper(id)
            .map_err(|err| log_failure("paper_enrich", err))?
            .ok_or(RepoError::NotFound(id))?;

        paper.abstract_text = match abstract_text {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => NO_ABSTRACT.to_string(),
        };
        self.repo
            .update_paper(&paper)
            .map_err(|err| log_failure("paper_enrich", err))?;

        info!(
            "event=paper_enrich module=catalog status=ok paper_id={id} state={:?}",
            paper.abstract_state()
        );
        Ok(paper)
    }

    /// Replaces the category labels associated with a paper.
    pub fn set_categories(&self, id: PaperId, categories: &[String]) -> RepoResult<()> {
        self.repo
            .set_paper_categories(id, categories)
            .map_err(|err| log_failure("paper_categories", err))
    }

    pub fn categories_of(&self, id: PaperId) -> RepoResult<Vec<String>> {
        self.repo.list_paper_categories(id)
    }

    pub fn list_categories(&self) -> RepoResult<Vec<String>> {
        self.repo.list_categories()
    }
}

fn log_failure(event: &str, err: RepoError) -> RepoError {
    match &err {
        RepoError::StorageUnavailable(_) => error!(
            "event={event} module=catalog status=error error_code=storage_unavailable error={err}"
        ),
        RepoError::ConstraintViolation(_) => warn!(
            "event={event} module=catalog status=error error_code=constraint_violation error={err}"
        ),
        RepoError::Validation(_) | RepoError::NotFound(_) => {
            warn!("event={event} module=catalog status=error error={err}")
        }
        _ => error!("event={event} module=catalog status=error error={err}"),
    }
    err
}
