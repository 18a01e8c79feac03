use extpack_core::{ExtensionDependency, ExtensionMetadata, ExtensionProvider};
use semver::Version;

use crate::reason::FailReason;
use crate::search::Search;
use crate::types::{DependencyPath, ResolverConfig};

/// Resolves extension and library dependencies for one requested extension.
///
/// Given an extension id and version, the resolver explores every way of
/// satisfying its dependency tree (installing new extensions or replacing
/// installed ones) using the candidates the [`ExtensionProvider`] knows
/// about. Each consistent plan becomes a [`DependencyPath`]; each abandoned
/// branch leaves a [`FailReason`].
///
/// Mutating methods take `&mut self`, so one resolve/read cycle has exclusive
/// use of the instance. Wrap it in a `Mutex` to share it between threads.
#[derive(Debug)]
pub struct DependencyResolver<P> {
    provider: P,
    config: ResolverConfig,
    installed: Vec<ExtensionMetadata>,
    results: Option<Vec<DependencyPath>>,
    reasons: Vec<FailReason>,
}

impl<P> DependencyResolver<P>
where
    P: ExtensionProvider,
{
    pub fn new(provider: P, config: ResolverConfig) -> Self {
        Self {
            provider,
            config,
            installed: Vec::new(),
            results: None,
            reasons: Vec::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn set_installed_extensions(&mut self, installed: Vec<ExtensionMetadata>) {
        self.installed = installed;
    }

    pub fn installed_extensions(&self) -> &[ExtensionMetadata] {
        &self.installed
    }

    pub fn set_ignore_lib_conflicts(&mut self, ignore: bool) {
        self.config.ignore_lib_conflicts = ignore;
    }

    /// Searches for every valid plan rooted at `extension_id@version`.
    ///
    /// The previous results and reasons are discarded. When nothing resolves,
    /// [`Self::results`] is `None` and [`Self::fail_reasons`] says why.
    pub fn resolve_dependencies(&mut self, extension_id: &str, version: &Version) {
        self.results = None;
        self.reasons = Vec::new();

        if extension_id.trim().is_empty() {
            self.reasons.push(FailReason::RootNotFound {
                id: extension_id.to_string(),
                version: version.clone(),
                matches: 0,
            });
            return;
        }

        let request = ExtensionDependency::exact(extension_id, version.clone());
        let mut roots = match self.provider.dependency_metadata(&request) {
            Ok(found) => found,
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(request = %request, error = %message, "catalog lookup failed");
                self.reasons.push(FailReason::ProviderFailure {
                    dependency: request.clone(),
                    message,
                });
                Vec::new()
            }
        };
        if roots.len() != 1 {
            self.reasons.push(FailReason::RootNotFound {
                id: extension_id.to_string(),
                version: version.clone(),
                matches: roots.len(),
            });
            return;
        }
        let root = roots.remove(0);

        tracing::debug!(
            root = %root,
            installed = self.installed.len(),
            ignore_lib_conflicts = self.config.ignore_lib_conflicts,
            "resolving dependencies"
        );
        let outcome = Search::new(&self.provider, &self.config, &self.installed).run(&root);
        tracing::debug!(
            root = %root,
            paths = outcome.results.len(),
            reasons = outcome.reasons.len(),
            "dependency resolution finished"
        );

        self.reasons = outcome.reasons;
        if !outcome.results.is_empty() {
            self.results = Some(outcome.results);
        }
    }

    pub fn results(&self) -> Option<&[DependencyPath]> {
        self.results.as_deref()
    }

    pub fn fail_reasons(&self) -> &[FailReason] {
        &self.reasons
    }
}
