//! Resolution of compare fragments into concrete comparisons.
//!
//! Given the repository a compare page was opened on, a fragment such as
//! `main...bob:feature` is resolved into the head repository, both refs and
//! the commit range between them. When the fragment names only an owner, the
//! head repository is searched for along fork relations in
//! [`ForkStrategy::ORDER`].

use std::fmt;
use std::sync::Arc;

use juxta_api::{
    short_id, CandidateRelation, CandidateRepository, CompareInfo, CompareSide, CompareSummary,
    ForkStrategy, HeadSource, Presentation, PullRequestDraft, ResolvedRef,
};
use juxta_directory_api::{Directory, Permission, RepositoryRecord, User};
use tracing::{debug, info, warn};

use crate::backend::{classify_ref, GitBackend, RangeRequest, SharedHandle};
use crate::directory::DirectoryService;
use crate::request::{CompareRequest, HeadSpec, DIRECT_SEPARATOR, MERGE_BASE_SEPARATOR};
use crate::{Error, Result};

/// Longest pull request title, in bytes.
pub const MAX_TITLE_LEN: usize = 255;

const ELLIPSIS: &str = "…";

/// The repository a comparison is requested on, with its open handle.
pub struct BaseRepository {
    /// Directory record.
    pub repository: RepositoryRecord,
    /// Owner of the repository.
    pub owner: User,
    /// Open handle; shared with the result when head and base coincide.
    pub git: SharedHandle,
    /// Signed-in user, `None` for anonymous visitors.
    pub actor: Option<User>,
}

impl fmt::Debug for BaseRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRepository")
            .field("repository", &self.repository.full_name())
            .field("actor", &self.actor.as_ref().map(|user| &user.name))
            .finish_non_exhaustive()
    }
}

/// Knobs for a single resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Only file names are wanted: skip commit listing and candidate repositories.
    pub file_only: bool,
}

/// A fully resolved comparison.
pub struct Comparison {
    /// Repository the comparison was requested on.
    pub base_repository: RepositoryRecord,
    /// Owner of the head side.
    pub head_user: User,
    /// Repository holding the head ref.
    pub head_repository: RepositoryRecord,
    /// Handle of the head repository.
    pub head_git: SharedHandle,
    /// Classified base ref.
    pub base_ref: ResolvedRef,
    /// Classified head ref.
    pub head_ref: ResolvedRef,
    /// Head and base are the same repository by request.
    pub is_same_repo: bool,
    /// `..` comparison.
    pub direct: bool,
    /// Pull request or plain diff.
    pub presentation: Presentation,
    /// How the head repository was found.
    pub head_source: HeadSource,
    /// Commit range.
    pub info: CompareInfo,
    /// Head is already contained in base.
    pub nothing_to_compare: bool,
    /// Alternative head repositories.
    pub candidates: Vec<CandidateRepository>,
}

impl Comparison {
    /// Start of the diff range.
    #[must_use]
    pub fn before_commit_id(&self) -> &str {
        if self.direct {
            &self.info.base_commit_id
        } else {
            &self.info.merge_base
        }
    }

    /// End of the diff range.
    #[must_use]
    pub fn after_commit_id(&self) -> &str {
        &self.info.head_commit_id
    }

    /// Whether an empty pull request may still be opened.
    ///
    /// Only meaningful when [`Self::nothing_to_compare`] is set. Comparing a
    /// branch with itself in same-named repositories never allows one.
    #[must_use]
    pub fn allow_empty_pull_request(&self) -> bool {
        !(self.base_ref.name == self.head_ref.name
            && self.base_repository.name == self.head_repository.name)
    }

    /// Page heading, e.g. `Comparing 1a2b3c4d5e...6f7a8b9c0d`.
    #[must_use]
    pub fn heading(&self) -> String {
        let separator = if self.direct {
            DIRECT_SEPARATOR
        } else {
            MERGE_BASE_SEPARATOR
        };
        format!(
            "Comparing {}{separator}{}",
            short_id(self.before_commit_id()),
            short_id(self.after_commit_id())
        )
    }

    /// Prefilled title and body for a new pull request.
    #[must_use]
    pub fn pull_request_draft(&self) -> PullRequestDraft {
        let (title, body) = match self.info.commits.as_slice() {
            [commit] => {
                let message = commit.message.as_deref().unwrap_or_default().trim();
                let (first, rest) = message.split_once('\n').unwrap_or((message, ""));
                let title = commit.summary.as_deref().unwrap_or(first).trim();
                (title.to_owned(), rest.trim().to_owned())
            }
            _ => (self.head_ref.name.clone(), String::new()),
        };
        split_title(title, body)
    }

    /// Serializable projection without the repository handle.
    #[must_use]
    pub fn summary(&self) -> CompareSummary {
        CompareSummary {
            base_repository: self.base_repository.full_name(),
            head_repository: self.head_repository.full_name(),
            head_user: self.head_user.name.clone(),
            base_ref: self.base_ref.clone(),
            head_ref: self.head_ref.clone(),
            is_same_repo: self.is_same_repo,
            direct: self.direct,
            presentation: self.presentation,
            head_source: self.head_source,
            info: self.info.clone(),
            nothing_to_compare: self.nothing_to_compare,
            candidates: self.candidates.clone(),
        }
    }
}

impl fmt::Debug for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparison")
            .field("base_repository", &self.base_repository.full_name())
            .field("head_repository", &self.head_repository.full_name())
            .field("base_ref", &self.base_ref)
            .field("head_ref", &self.head_ref)
            .field("presentation", &self.presentation)
            .field("head_source", &self.head_source)
            .finish_non_exhaustive()
    }
}

fn split_title(title: String, body: String) -> PullRequestDraft {
    if title.len() <= MAX_TITLE_LEN {
        return PullRequestDraft { title, body };
    }

    let mut end = MAX_TITLE_LEN - ELLIPSIS.len();
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    let trailer = format!("{ELLIPSIS}{}", &title[end..]);
    let body = if body.is_empty() {
        format!("{trailer}\n")
    } else {
        format!("{trailer}\n\n{body}")
    };
    PullRequestDraft {
        title: format!("{}{ELLIPSIS}", &title[..end]),
        body,
    }
}

/// Fork relations of the base repository, looked up once per resolution.
struct ForkContext<'a> {
    base: &'a RepositoryRecord,
    root: Option<&'a RepositoryRecord>,
    own_fork: Option<&'a RepositoryRecord>,
    head_user: &'a User,
}

/// Resolves compare fragments against a directory and a git backend.
pub struct CompareResolver {
    directory: DirectoryService,
    backend: Arc<dyn GitBackend>,
}

impl CompareResolver {
    /// Create a resolver over the given collaborators.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>, backend: Arc<dyn GitBackend>) -> Self {
        Self {
            directory: DirectoryService::new(directory),
            backend,
        }
    }

    /// Directory façade used by the resolver.
    #[must_use]
    pub const fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    /// Look up `owner/name`, open it and attach the acting user.
    ///
    /// # Errors
    ///
    /// Returns lookup errors for the repository, its owner or the actor, and
    /// backend errors when the repository cannot be opened.
    pub fn open_base(&self, owner: &str, name: &str, actor: Option<&str>) -> Result<BaseRepository> {
        let repository = self.directory.repository(owner, name)?;
        let owner = self.directory.user_by_id(repository.owner_id)?;
        let actor = actor
            .map(|login| self.directory.user_by_name(login))
            .transpose()?;
        let git = Arc::from(self.backend.open(&repository.path)?);
        Ok(BaseRepository {
            repository,
            owner,
            git,
            actor,
        })
    }

    /// Resolve `fragment` against `base`.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] when the actor may not read the base
    ///   repository; checked before anything else
    /// - [`Error::MalformedRequest`] when the fragment does not parse
    /// - [`Error::UserNotFound`] / [`Error::RepoNotFound`] for unknown head owners or repositories
    /// - [`Error::RefNotFound`] when either ref matches nothing
    /// - [`Error::PermissionDenied`] when the actor may not read the head repository
    /// - backend errors from the directory or git
    pub fn resolve(
        &self,
        fragment: &str,
        base: &BaseRepository,
        options: CompareOptions,
    ) -> Result<Comparison> {
        let actor = base.actor.as_ref();
        // nothing about an unreadable base may leak, not even its refs
        let base_permission = self.directory.ensure_code_readable(&base.repository, actor)?;
        let request = CompareRequest::parse(fragment)?;

        let (head_user, named_head) = match &request.head {
            HeadSpec::Implicit => (base.owner.clone(), Some(base.repository.clone())),
            HeadSpec::Owner(login) => {
                let user = self.directory.user_by_name(login)?;
                let repo = (user.id == base.repository.owner_id).then(|| base.repository.clone());
                (user, repo)
            }
            HeadSpec::Repository { owner, name } => {
                let repo = self.directory.repository(owner, name)?;
                let user = self.directory.user_by_id(repo.owner_id)?;
                (user, Some(repo))
            }
        };

        let base_ref = classify_ref(&*base.git, &request.base_ref)?.ok_or_else(|| {
            Error::RefNotFound {
                side: CompareSide::Base,
                reference: request.base_ref.clone(),
            }
        })?;

        let root = self.directory.root_repository(&base.repository)?;
        let own_fork = match actor {
            Some(user) if user.id != base.repository.owner_id => self
                .directory
                .forked_repository(user.id, base.repository.id)?,
            _ => None,
        };

        let (head_repository, head_source) = match named_head {
            Some(repo) if repo.id == base.repository.id => (repo, HeadSource::Base),
            Some(repo) => (repo, HeadSource::Explicit),
            None => {
                let context = ForkContext {
                    base: &base.repository,
                    root: root.as_ref(),
                    own_fork: own_fork.as_ref(),
                    head_user: &head_user,
                };
                match self.search_forks(&context)? {
                    Some((repo, strategy)) => (repo, HeadSource::Fork(strategy)),
                    None => {
                        warn!(
                            base = %base.repository.full_name(),
                            head_user = %head_user.name,
                            "no head repository found, falling back to diff against base"
                        );
                        (base.repository.clone(), HeadSource::Fallback)
                    }
                }
            }
        };
        let shares_base = head_repository.id == base.repository.id;

        let head_git: SharedHandle = if shares_base {
            Arc::clone(&base.git)
        } else {
            debug!(head = %head_repository.full_name(), path = %head_repository.path, "opening head repository");
            Arc::from(self.backend.open(&head_repository.path)?)
        };

        if !shares_base {
            self.directory.ensure_code_readable(&head_repository, actor)?;
        }

        let candidates = if options.file_only {
            Vec::new()
        } else {
            self.candidates(
                &base.repository,
                &head_repository,
                root.as_ref(),
                own_fork.as_ref(),
                actor,
            )?
        };

        let head_ref = classify_ref(&*head_git, &request.head_ref)?.ok_or_else(|| {
            Error::RefNotFound {
                side: CompareSide::Head,
                reference: request.head_ref.clone(),
            }
        })?;

        let presentation = presentation(
            head_source,
            request.direct,
            &base_ref,
            &head_ref,
            base_permission,
        );

        let info = head_git.compare_info(&RangeRequest {
            base_path: base.git.path(),
            base_ref: &base_ref.full_name(),
            head_ref: &head_ref.full_name(),
            direct: request.direct,
            file_only: options.file_only,
        })?;
        let nothing_to_compare = (!request.direct && info.head_commit_id == info.merge_base)
            || info.head_commit_id == info.base_commit_id;

        info!(
            base = %base.repository.full_name(),
            head = %head_repository.full_name(),
            base_ref = %base_ref.name,
            head_ref = %head_ref.name,
            direct = request.direct,
            ?presentation,
            commits = info.commits.len(),
            nothing_to_compare,
            "resolved comparison"
        );

        Ok(Comparison {
            base_repository: base.repository.clone(),
            head_user,
            head_repository,
            head_git,
            base_ref,
            head_ref,
            is_same_repo: head_source == HeadSource::Base,
            direct: request.direct,
            presentation,
            head_source,
            info,
            nothing_to_compare,
            candidates,
        })
    }

    fn search_forks(&self, context: &ForkContext<'_>) -> Result<Option<(RepositoryRecord, ForkStrategy)>> {
        for strategy in ForkStrategy::ORDER {
            if let Some(repo) = self.try_strategy(strategy, context)? {
                debug!(?strategy, head = %repo.full_name(), "found head repository");
                return Ok(Some((repo, strategy)));
            }
        }
        Ok(None)
    }

    fn try_strategy(
        &self,
        strategy: ForkStrategy,
        context: &ForkContext<'_>,
    ) -> Result<Option<RepositoryRecord>> {
        let head_user = context.head_user.id;
        match strategy {
            ForkStrategy::RootRepository => Ok(context
                .root
                .filter(|root| root.owner_id == head_user)
                .cloned()),
            ForkStrategy::ActorFork => Ok(context
                .own_fork
                .filter(|fork| fork.owner_id == head_user)
                .cloned()),
            ForkStrategy::HeadOwnerFork => {
                self.directory.forked_repository(head_user, context.base.id)
            }
            ForkStrategy::RootFork => match context.root {
                Some(root) => self.directory.forked_repository(head_user, root.id),
                None => Ok(None),
            },
        }
    }

    fn candidates(
        &self,
        base: &RepositoryRecord,
        head: &RepositoryRecord,
        root: Option<&RepositoryRecord>,
        own_fork: Option<&RepositoryRecord>,
        actor: Option<&User>,
    ) -> Result<Vec<CandidateRepository>> {
        let mut candidates = Vec::new();

        if let Some(root) = root {
            if root.id != head.id
                && root.id != base.id
                && self.directory.can_read_code(root, actor)?
            {
                candidates.push(self.candidate(root, CandidateRelation::RootRepository)?);
            }
        }

        if let Some(fork) = own_fork {
            if fork.id != head.id
                && fork.id != base.id
                && root.map_or(true, |root| root.id != fork.id)
                && self.directory.can_read_code(fork, actor)?
            {
                candidates.push(self.candidate(fork, CandidateRelation::OwnFork)?);
            }
        }

        Ok(candidates)
    }

    fn candidate(
        &self,
        repo: &RepositoryRecord,
        relation: CandidateRelation,
    ) -> Result<CandidateRepository> {
        let handle = self.backend.open(&repo.path)?;
        Ok(CandidateRepository {
            repository: repo.full_name(),
            relation,
            branches: handle.branches(0, 0)?,
            tags: handle.tags(0, 0)?,
        })
    }
}

impl fmt::Debug for CompareResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareResolver")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

fn presentation(
    head_source: HeadSource,
    direct: bool,
    base_ref: &ResolvedRef,
    head_ref: &ResolvedRef,
    base_permission: Permission,
) -> Presentation {
    let pull_request = head_source != HeadSource::Fallback
        && !direct
        && base_ref.is_branch()
        && head_ref.is_branch()
        && base_permission.can_read_issues_or_pulls(true);
    if pull_request {
        Presentation::PullRequest
    } else {
        Presentation::Diff
    }
}
