use std::collections::BTreeMap;

use extpack_core::{ExtensionDependency, ExtensionMetadata, ExtensionProvider, LibDependency};
use semver::Version;

use crate::libs::{add_libs, find_lib_conflicts, first_lib_incompatibility, remove_libs, LibMap};
use crate::order::install_order;
use crate::reason::FailReason;
use crate::types::{DependencyPath, ExtensionNode, ExtensionRef, ResolverConfig};

pub(crate) struct SearchOutcome {
    pub results: Vec<DependencyPath>,
    pub reasons: Vec<FailReason>,
}

enum Placement {
    Rejected,
    Satisfied,
    Placed {
        node: ExtensionNode,
        replaced_libs: Option<Vec<LibDependency>>,
    },
}

// A mutation of the shared search state, undone in reverse order when the
// visit that made it returns.
enum Change {
    ScheduledGroup,
    Pinned {
        id: String,
    },
    Placed {
        replaced_libs: Option<Vec<LibDependency>>,
    },
}

pub(crate) struct Search<'a, P: ?Sized> {
    provider: &'a P,
    config: &'a ResolverConfig,
    installed: &'a [ExtensionMetadata],
    installed_by_id: BTreeMap<&'a str, &'a ExtensionMetadata>,
    installed_libs: LibMap,
    visited_extensions: BTreeMap<String, Version>,
    visited_libs: LibMap,
    still_to_resolve: Vec<Vec<ExtensionMetadata>>,
    tree_path: Vec<ExtensionNode>,
    placed: Vec<ExtensionMetadata>,
    results: Vec<DependencyPath>,
    reasons: Vec<FailReason>,
    visits: usize,
    limit_reached: bool,
}

impl<'a, P> Search<'a, P>
where
    P: ExtensionProvider + ?Sized,
{
    pub(crate) fn new(
        provider: &'a P,
        config: &'a ResolverConfig,
        installed: &'a [ExtensionMetadata],
    ) -> Self {
        let mut installed_by_id = BTreeMap::new();
        let mut installed_libs = LibMap::new();
        for extension in installed {
            installed_by_id.insert(extension.id.as_str(), extension);
            add_libs(&mut installed_libs, &extension.id, &extension.lib_dependencies);
        }

        Self {
            provider,
            config,
            installed,
            installed_by_id,
            installed_libs,
            visited_extensions: BTreeMap::new(),
            visited_libs: LibMap::new(),
            still_to_resolve: Vec::new(),
            tree_path: Vec::new(),
            placed: Vec::new(),
            results: Vec::new(),
            reasons: Vec::new(),
            visits: 0,
            limit_reached: false,
        }
    }

    pub(crate) fn run(mut self, root: &ExtensionMetadata) -> SearchOutcome {
        self.visit(root);

        debug_assert!(self.visited_extensions.is_empty());
        debug_assert!(self.visited_libs.is_empty());
        debug_assert!(self.still_to_resolve.is_empty());
        debug_assert!(self.tree_path.is_empty());
        debug_assert!(self.placed.is_empty());

        SearchOutcome {
            results: self.results,
            reasons: self.reasons,
        }
    }

    fn visit(&mut self, extension: &ExtensionMetadata) {
        if self.limit_exceeded() {
            return;
        }
        tracing::trace!(extension = %extension, depth = self.tree_path.len(), "visiting extension");

        let mut journal = Vec::new();
        match self.classify(extension, &mut journal) {
            Placement::Rejected => {}
            Placement::Satisfied => self.continue_path(),
            Placement::Placed {
                node,
                replaced_libs,
            } => {
                self.place(extension, node, replaced_libs, &mut journal);
                self.continue_path();
            }
        }
        self.rollback(journal);
    }

    fn limit_exceeded(&mut self) -> bool {
        if self.limit_reached {
            return true;
        }
        self.visits += 1;
        match self.config.max_visits {
            Some(limit) if self.visits > limit => {
                tracing::warn!(limit, "dependency search hit its visit limit");
                self.limit_reached = true;
                self.reasons.push(FailReason::SearchLimitReached { limit });
                true
            }
            _ => false,
        }
    }

    fn classify(
        &mut self,
        extension: &ExtensionMetadata,
        journal: &mut Vec<Change>,
    ) -> Placement {
        if !extension.supports_platform(&self.config.platform_version) {
            self.reasons.push(FailReason::IncompatiblePlatform {
                extension: ExtensionRef::of(extension),
                platform_version: self.config.platform_version.clone(),
                supported: extension.platform.clone().unwrap_or_default(),
            });
            return Placement::Rejected;
        }

        if let Some(on_path) = self.visited_extensions.get(&extension.id) {
            if *on_path == extension.version {
                return Placement::Satisfied;
            }
            let on_path = on_path.clone();
            self.reasons.push(FailReason::DuplicateVersion {
                id: extension.id.clone(),
                on_path,
                required: extension.version.clone(),
            });
            return Placement::Rejected;
        }

        if let Some(installed) = self.installed_by_id.get(extension.id.as_str()).copied() {
            if installed.version == extension.version {
                // Kept installed versions hold the id for the rest of the path.
                self.visited_extensions
                    .insert(extension.id.clone(), extension.version.clone());
                journal.push(Change::Pinned {
                    id: extension.id.clone(),
                });
                return Placement::Satisfied;
            }
            let node = ExtensionNode::replace(
                extension.id.clone(),
                extension.version.clone(),
                installed.version.clone(),
            );
            return match self.handle_replace(extension, journal) {
                Some(replaced_libs) => Placement::Placed {
                    node,
                    replaced_libs: Some(replaced_libs),
                },
                None => Placement::Rejected,
            };
        }

        let node = ExtensionNode::install(extension.id.clone(), extension.version.clone());
        if self.handle_dependencies(extension, journal) {
            Placement::Placed {
                node,
                replaced_libs: None,
            }
        } else {
            Placement::Rejected
        }
    }

    fn handle_dependencies(
        &mut self,
        extension: &ExtensionMetadata,
        journal: &mut Vec<Change>,
    ) -> bool {
        self.libs_fit_path(extension) && self.schedule_dependencies(extension, journal)
    }

    fn handle_replace(
        &mut self,
        extension: &ExtensionMetadata,
        journal: &mut Vec<Change>,
    ) -> Option<Vec<LibDependency>> {
        if !self.libs_fit_path(extension) {
            return None;
        }

        if let Some(dependent) = self.placed.iter().find(|placed| {
            placed
                .dependency_on(&extension.id)
                .is_some_and(|dependency| !dependency.range.contains(&extension.version))
        }) {
            self.reasons.push(FailReason::BrokenDependency {
                replacement: ExtensionRef::of(extension),
                broken: ExtensionRef::of(dependent),
            });
            return None;
        }

        let installed = self.installed;
        let mut replaced_libs = Vec::new();
        let mut broken = Vec::new();
        for candidate in installed {
            if candidate.id == extension.id {
                replaced_libs = candidate.lib_dependencies.clone();
            } else if candidate
                .dependency_on(&extension.id)
                .is_some_and(|dependency| !dependency.range.contains(&extension.version))
            {
                broken.push(candidate);
            }
        }

        for broken_extension in broken.into_iter().rev() {
            let alternatives: Vec<ExtensionMetadata> = self
                .lookup(&ExtensionDependency::unbounded(broken_extension.id.clone()))
                .into_iter()
                .filter(|alternative| {
                    alternative
                        .dependency_on(&extension.id)
                        .map_or(true, |dependency| dependency.range.contains(&extension.version))
                })
                .collect();
            if alternatives.is_empty() {
                self.reasons.push(FailReason::BrokenDependency {
                    replacement: ExtensionRef::of(extension),
                    broken: ExtensionRef::of(broken_extension),
                });
                return None;
            }
            self.schedule(alternatives, journal);
        }

        self.schedule_dependencies(extension, journal).then_some(replaced_libs)
    }

    fn schedule_dependencies(
        &mut self,
        extension: &ExtensionMetadata,
        journal: &mut Vec<Change>,
    ) -> bool {
        // Reverse push so the first declaration is explored first.
        for dependency in extension.extension_dependencies.iter().rev() {
            let mut candidates = self.lookup(dependency);

            if let Some(installed) = self.installed_by_id.get(dependency.id.as_str()).copied() {
                let offered = candidates.iter().any(|candidate| candidate.is_same(installed));
                if !offered && dependency.range.contains(&installed.version) {
                    candidates.push(installed.clone());
                }
            }

            if candidates.is_empty() {
                self.reasons.push(FailReason::MissingDependency {
                    required_by: ExtensionRef::of(extension),
                    dependency: dependency.clone(),
                });
                return false;
            }
            self.schedule(candidates, journal);
        }
        true
    }

    fn libs_fit_path(&mut self, extension: &ExtensionMetadata) -> bool {
        if self.config.ignore_lib_conflicts {
            return true;
        }
        match first_lib_incompatibility(&extension.lib_dependencies, &self.visited_libs) {
            Some(lib_id) => {
                self.reasons.push(FailReason::LibIncompatible {
                    lib_id,
                    extension: ExtensionRef::of(extension),
                });
                false
            }
            None => true,
        }
    }

    fn lookup(&mut self, dependency: &ExtensionDependency) -> Vec<ExtensionMetadata> {
        match self.provider.dependency_metadata(dependency) {
            Ok(found) => {
                tracing::debug!(
                    dependency = %dependency,
                    candidates = found.len(),
                    "catalog lookup"
                );
                found
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(dependency = %dependency, error = %message, "catalog lookup failed");
                self.reasons.push(FailReason::ProviderFailure {
                    dependency: dependency.clone(),
                    message,
                });
                Vec::new()
            }
        }
    }

    fn schedule(&mut self, group: Vec<ExtensionMetadata>, journal: &mut Vec<Change>) {
        self.still_to_resolve.push(group);
        journal.push(Change::ScheduledGroup);
    }

    fn place(
        &mut self,
        extension: &ExtensionMetadata,
        node: ExtensionNode,
        replaced_libs: Option<Vec<LibDependency>>,
        journal: &mut Vec<Change>,
    ) {
        self.visited_extensions
            .insert(extension.id.clone(), extension.version.clone());
        add_libs(&mut self.visited_libs, &extension.id, &extension.lib_dependencies);
        self.tree_path.push(node);
        self.placed.push(extension.clone());
        if let Some(libs) = &replaced_libs {
            remove_libs(&mut self.installed_libs, &extension.id, libs);
        }
        journal.push(Change::Placed { replaced_libs });
    }

    fn continue_path(&mut self) {
        match self.still_to_resolve.pop() {
            Some(group) => {
                for candidate in &group {
                    self.visit(candidate);
                }
                // Restored for sibling branches that share this stack prefix.
                self.still_to_resolve.push(group);
            }
            None => self.record_path(),
        }
    }

    fn record_path(&mut self) {
        let (lib_choices, conflicts_found) =
            find_lib_conflicts(&self.visited_libs, &self.installed_libs);
        if conflicts_found && !self.config.ignore_lib_conflicts {
            self.reasons.extend(
                lib_choices
                    .into_iter()
                    .filter(|choice| choice.conflict)
                    .map(|choice| FailReason::LibConflict { choice }),
            );
            return;
        }

        let path = DependencyPath {
            nodes: self.tree_path.clone(),
            lib_choices,
            install_order: install_order(&self.placed),
        };
        tracing::debug!(
            nodes = path.nodes.len(),
            conflicts = path.has_lib_conflicts(),
            "recorded dependency path"
        );
        self.results.push(path);
    }

    fn rollback(&mut self, journal: Vec<Change>) {
        for change in journal.into_iter().rev() {
            match change {
                Change::ScheduledGroup => {
                    self.still_to_resolve.pop();
                }
                Change::Pinned { id } => {
                    self.visited_extensions.remove(&id);
                }
                Change::Placed { replaced_libs } => {
                    self.tree_path.pop();
                    if let Some(extension) = self.placed.pop() {
                        tracing::trace!(extension = %extension, "undoing placement");
                        self.visited_extensions.remove(&extension.id);
                        remove_libs(
                            &mut self.visited_libs,
                            &extension.id,
                            &extension.lib_dependencies,
                        );
                        if let Some(libs) = replaced_libs {
                            add_libs(&mut self.installed_libs, &extension.id, &libs);
                        }
                    }
                }
            }
        }
    }
}
