use extpack_core::{
    parse_version, select_matching, ExtensionDependency, ExtensionMetadata, ExtensionProvider,
    LibDependency, VersionRange,
};
use semver::Version;

use super::*;

struct Catalog(Vec<ExtensionMetadata>);

impl ExtensionProvider for Catalog {
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> anyhow::Result<Vec<ExtensionMetadata>> {
        Ok(select_matching(&self.0, dependency))
    }
}

fn v(input: &str) -> Version {
    parse_version(input).expect("version must parse")
}

fn ext(id: &str, version: &str) -> ExtensionMetadata {
    ExtensionMetadata::new(id, v(version))
}

fn dep(id: &str, min: &str, max: &str) -> ExtensionDependency {
    ExtensionDependency::new(id, VersionRange::between(v(min), v(max)))
}

fn lib(id: &str, version: &str, min: &str, max: &str) -> LibDependency {
    LibDependency::new(id, v(version), VersionRange::between(v(min), v(max)))
}

fn resolver(catalog: Vec<ExtensionMetadata>) -> DependencyResolver<Catalog> {
    DependencyResolver::new(Catalog(catalog), ResolverConfig::new(v("6.0")))
}

fn plans(resolver: &DependencyResolver<Catalog>) -> Vec<Vec<String>> {
    resolver
        .results()
        .unwrap_or_default()
        .iter()
        .map(|path| path.nodes.iter().map(ToString::to_string).collect())
        .collect()
}

fn kinds(resolver: &DependencyResolver<Catalog>) -> Vec<FailKind> {
    resolver
        .fail_reasons()
        .iter()
        .map(FailReason::kind)
        .collect()
}

#[test]
fn picks_only_dependency_versions_inside_declared_range() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
        ext("b", "1.5"),
        ext("b", "2.5"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["install a@1.0.0", "install b@1.5.0"]]
    );
    let path = &resolver.results().expect("must resolve")[0];
    assert_eq!(path.install_order, vec!["b", "a"]);
    assert!(path.lib_choices.is_empty());
}

#[test]
fn request_already_installed_at_same_version_resolves_without_nodes() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "1.0")),
        ext("b", "1.0"),
    ]);
    resolver.set_installed_extensions(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "1.0")),
        ext("b", "1.0"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    let results = resolver.results().expect("must resolve");
    assert_eq!(results.len(), 1);
    assert!(results[0].is_empty());
    assert_eq!(results[0].replacements().count(), 0);
}

#[test]
fn unknown_root_fails_without_search() {
    let mut resolver = resolver(vec![ext("a", "1.0")]);

    resolver.resolve_dependencies("a", &v("2.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::RootNotFound {
            id: "a".to_string(),
            version: v("2.0"),
            matches: 0,
        }]
    );
}

#[test]
fn ambiguous_root_fails() {
    let mut resolver = resolver(vec![ext("a", "1.0"), ext("a", "1.0")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert!(matches!(
        resolver.fail_reasons(),
        [FailReason::RootNotFound { matches: 2, .. }]
    ));
}

#[test]
fn blank_root_id_fails_without_asking_provider() {
    let mut resolver = DependencyResolver::new(
        |_: &ExtensionDependency| -> anyhow::Result<Vec<ExtensionMetadata>> {
            panic!("provider must not be called for a blank id")
        },
        ResolverConfig::new(v("6.0")),
    );

    resolver.resolve_dependencies("  ", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(resolver.fail_reasons().len(), 1);
    assert_eq!(resolver.fail_reasons()[0].kind(), FailKind::RootNotFound);
}

#[test]
fn records_every_valid_alternative() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
        ext("b", "1.0"),
        ext("b", "1.5"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![
            vec!["install a@1.0.0", "install b@1.5.0"],
            vec!["install a@1.0.0", "install b@1.0.0"],
        ]
    );
    assert!(resolver.fail_reasons().is_empty());
}

#[test]
fn explores_cartesian_product_of_candidate_groups() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "2.0"))
            .with_dependency(dep("c", "1.0", "2.0")),
        ext("b", "1.0"),
        ext("b", "2.0"),
        ext("c", "1.0"),
        ext("c", "2.0"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    let found = plans(&resolver);
    assert_eq!(found.len(), 4);
    assert_eq!(
        found[0],
        vec!["install a@1.0.0", "install b@2.0.0", "install c@2.0.0"]
    );
    assert_eq!(
        found[3],
        vec!["install a@1.0.0", "install b@1.0.0", "install c@1.0.0"]
    );
}

#[test]
fn shared_dependency_on_path_at_same_version_is_satisfied() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.0").with_dependency(dep("d", "1.0", "2.0")),
        ext("c", "1.0").with_dependency(dep("d", "1.0", "1.0")),
        ext("d", "1.0"),
        ext("d", "2.0"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec![
            "install a@1.0.0",
            "install b@1.0.0",
            "install d@1.0.0",
            "install c@1.0.0",
        ]]
    );
    assert_eq!(
        resolver.results().expect("must resolve")[0].install_order,
        vec!["d", "b", "c", "a"]
    );
    assert_eq!(kinds(&resolver), vec![FailKind::DuplicateVersion]);
}

#[test]
fn same_extension_at_two_versions_on_one_path_is_rejected() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.0"),
        ext("b", "2.0"),
        ext("c", "1.0").with_dependency(dep("b", "2.0", "2.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::DuplicateVersion {
            id: "b".to_string(),
            on_path: v("1.0"),
            required: v("2.0"),
        }]
    );
}

#[test]
fn dependency_cycle_at_same_version_terminates() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "1.0")),
        ext("b", "1.0").with_dependency(dep("a", "1.0", "1.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    let results = resolver.results().expect("cycle must resolve");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].nodes.len(), 2);
    assert_eq!(results[0].install_order, vec!["b", "a"]);
}

#[test]
fn missing_dependency_rejects_branch() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::MissingDependency {
            required_by: ExtensionRef {
                id: "a".to_string(),
                version: v("1.0"),
            },
            dependency: dep("b", "1.0", "2.0"),
        }]
    );
}

#[test]
fn installed_version_inside_range_counts_as_candidate() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
    ]);
    resolver.set_installed_extensions(vec![ext("b", "1.2")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(plans(&resolver), vec![vec!["install a@1.0.0"]]);
}

#[test]
fn installed_version_outside_range_is_not_offered() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
    ]);
    resolver.set_installed_extensions(vec![ext("b", "3.0")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(kinds(&resolver), vec![FailKind::MissingDependency]);
}

#[test]
fn installed_dependency_is_upgraded_when_required() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "2.0", "3.0")),
        ext("b", "2.0"),
    ]);
    resolver.set_installed_extensions(vec![ext("b", "1.0")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["install a@1.0.0", "replace b 1.0.0 -> 2.0.0"]]
    );
    let path = &resolver.results().expect("must resolve")[0];
    assert_eq!(path.replacements().count(), 1);
    assert_eq!(
        path.node("b").and_then(|node| node.old_version.clone()),
        Some(v("1.0"))
    );
}

#[test]
fn replace_that_breaks_installed_dependent_fails() {
    let mut resolver = resolver(vec![
        ext("d", "2.0"),
        ext("e", "1.0").with_dependency(dep("d", "1.0", "1.0")),
    ]);
    resolver.set_installed_extensions(vec![
        ext("d", "1.0"),
        ext("e", "1.0").with_dependency(dep("d", "1.0", "1.0")),
    ]);

    resolver.resolve_dependencies("d", &v("2.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::BrokenDependency {
            replacement: ExtensionRef {
                id: "d".to_string(),
                version: v("2.0"),
            },
            broken: ExtensionRef {
                id: "e".to_string(),
                version: v("1.0"),
            },
        }]
    );
    assert!(resolver.fail_reasons()[0].to_string().contains("e@1.0.0"));
}

#[test]
fn replace_schedules_compatible_version_of_broken_dependent() {
    let mut resolver = resolver(vec![
        ext("d", "2.0"),
        ext("e", "1.0").with_dependency(dep("d", "1.0", "1.0")),
        ext("e", "2.0").with_dependency(dep("d", "2.0", "2.0")),
    ]);
    resolver.set_installed_extensions(vec![
        ext("d", "1.0"),
        ext("e", "1.0").with_dependency(dep("d", "1.0", "1.0")),
    ]);

    resolver.resolve_dependencies("d", &v("2.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["replace d 1.0.0 -> 2.0.0", "replace e 1.0.0 -> 2.0.0"]]
    );
    let path = &resolver.results().expect("must resolve")[0];
    assert_eq!(path.install_order, vec!["d", "e"]);
}

#[test]
fn kept_installed_dependency_cannot_be_replaced_later_on_the_path() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.0").with_dependency(dep("e", "1.0", "1.0")),
        ext("c", "1.0").with_dependency(dep("e", "2.0", "2.0")),
        ext("e", "2.0"),
    ]);
    resolver.set_installed_extensions(vec![ext("e", "1.0")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::DuplicateVersion {
            id: "e".to_string(),
            on_path: v("1.0"),
            required: v("2.0"),
        }]
    );
}

#[test]
fn replace_is_rejected_when_a_placed_extension_excludes_the_new_version() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_dependency(dep("e", "2.0", "2.0")),
        ext("b", "1.0").with_dependency(dep("e", "1.0", "1.0")),
        ext("e", "1.0"),
        ext("e", "2.0"),
    ]);
    resolver.set_installed_extensions(vec![ext("e", "3.0")]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::BrokenDependency {
            replacement: ExtensionRef {
                id: "e".to_string(),
                version: v("1.0"),
            },
            broken: ExtensionRef {
                id: "a".to_string(),
                version: v("1.0"),
            },
        }]
    );
}

#[test]
fn conflicting_libraries_on_path_reject_it() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "2.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.5").with_lib(lib("x", "1.0", "1.0", "1.0")),
        ext("c", "1.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::LibIncompatible {
            lib_id: "x".to_string(),
            extension: ExtensionRef {
                id: "c".to_string(),
                version: v("1.0"),
            },
        }]
    );
    assert!(resolver.fail_reasons()[0]
        .to_string()
        .contains("library dependency incompatibility for lib id 'x'"));
}

#[test]
fn ignored_library_conflicts_are_flagged_on_the_path() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "2.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.5").with_lib(lib("x", "1.0", "1.0", "1.0")),
        ext("c", "1.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
    ]);
    resolver.set_ignore_lib_conflicts(true);

    resolver.resolve_dependencies("a", &v("1.0"));

    let results = resolver.results().expect("conflicts are ignored");
    assert_eq!(results.len(), 1);
    let path = &results[0];
    assert!(path.has_lib_conflicts());
    assert_eq!(path.lib_choices.len(), 1);
    let choice = &path.lib_choices[0];
    assert_eq!(choice.lib_id, "x");
    assert!(choice.conflict);
    let declared_by: Vec<&str> = choice
        .declarations
        .iter()
        .map(|declaration| declaration.declared_by.as_str())
        .collect();
    assert_eq!(declared_by, vec!["b", "c"]);
    assert!(resolver.fail_reasons().is_empty());
}

#[test]
fn compatible_duplicate_libraries_are_reported_without_conflict() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_lib(lib("x", "1.0", "1.0", "2.0")),
        ext("b", "1.0").with_lib(lib("x", "1.5", "1.0", "1.5")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    let path = &resolver.results().expect("must resolve")[0];
    assert_eq!(path.lib_choices.len(), 1);
    assert!(!path.lib_choices[0].conflict);
    assert!(!path.has_lib_conflicts());
}

#[test]
fn installed_library_conflict_is_detected_when_path_completes() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
    ]);
    resolver.set_installed_extensions(vec![
        ext("l", "1.0").with_lib(lib("x", "1.0", "1.0", "1.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    let reasons = resolver.fail_reasons();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].kind(), FailKind::LibConflict);
    assert_eq!(reasons[0].lib_id(), Some("x"));
}

#[test]
fn replaced_extension_libraries_no_longer_count() {
    let mut resolver = resolver(vec![
        ext("l", "2.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
    ]);
    resolver.set_installed_extensions(vec![
        ext("l", "1.0").with_lib(lib("x", "1.0", "1.0", "1.0")),
        ext("m", "1.0"),
    ]);

    resolver.resolve_dependencies("l", &v("2.0"));

    assert_eq!(plans(&resolver), vec![vec!["replace l 1.0.0 -> 2.0.0"]]);
    assert!(resolver.results().expect("must resolve")[0]
        .lib_choices
        .is_empty());
}

#[test]
fn platform_incompatible_versions_are_skipped() {
    let mut resolver = resolver(vec![
        ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
        ext("b", "2.0").with_platform(VersionRange::between(v("7.0"), v("7.9"))),
        ext("b", "1.0").with_platform(VersionRange::between(v("6.0"), v("6.9"))),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["install a@1.0.0", "install b@1.0.0"]]
    );
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::IncompatiblePlatform {
            extension: ExtensionRef {
                id: "b".to_string(),
                version: v("2.0"),
            },
            platform_version: v("6.0"),
            supported: VersionRange::between(v("7.0"), v("7.9")),
        }]
    );
}

#[test]
fn provider_failure_counts_as_no_candidates() {
    let catalog = vec![ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0"))];
    let mut resolver = DependencyResolver::new(
        move |dependency: &ExtensionDependency| -> anyhow::Result<Vec<ExtensionMetadata>> {
            if dependency.id == "b" {
                anyhow::bail!("catalog offline");
            }
            Ok(select_matching(&catalog, dependency))
        },
        ResolverConfig::new(v("6.0")),
    );

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(resolver.results().is_none());
    let reasons: Vec<FailKind> = resolver.fail_reasons().iter().map(FailReason::kind).collect();
    assert_eq!(
        reasons,
        vec![FailKind::ProviderFailure, FailKind::MissingDependency]
    );
    assert!(resolver.fail_reasons()[0]
        .to_string()
        .contains("catalog offline"));
}

#[test]
fn visit_limit_stops_search_and_keeps_found_paths() {
    let mut resolver = DependencyResolver::new(
        Catalog(vec![
            ext("a", "1.0").with_dependency(dep("b", "1.0", "2.0")),
            ext("b", "1.0"),
            ext("b", "1.5"),
        ]),
        ResolverConfig::new(v("6.0")).with_max_visits(Some(2)),
    );

    resolver.resolve_dependencies("a", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["install a@1.0.0", "install b@1.5.0"]]
    );
    assert_eq!(
        resolver.fail_reasons(),
        &[FailReason::SearchLimitReached { limit: 2 }]
    );
}

#[test]
fn repeated_resolution_is_deterministic() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "2.0"))
            .with_dependency(dep("c", "1.0", "2.0")),
        ext("b", "1.0").with_lib(lib("x", "1.0", "1.0", "1.5")),
        ext("b", "2.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
        ext("c", "1.0").with_lib(lib("x", "1.2", "1.0", "2.0")),
        ext("c", "2.0"),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));
    let first_results = resolver.results().map(<[DependencyPath]>::to_vec);
    let first_reasons = resolver.fail_reasons().to_vec();

    resolver.resolve_dependencies("a", &v("1.0"));

    assert!(first_results.is_some());
    assert_eq!(resolver.results().map(<[DependencyPath]>::to_vec), first_results);
    assert_eq!(resolver.fail_reasons(), first_reasons.as_slice());
}

#[test]
fn failed_resolution_does_not_leak_into_next_call() {
    let mut resolver = resolver(vec![
        ext("a", "1.0")
            .with_dependency(dep("b", "1.0", "1.0"))
            .with_dependency(dep("c", "1.0", "1.0")),
        ext("b", "1.0").with_lib(lib("x", "1.0", "1.0", "1.0")),
        ext("c", "1.0").with_lib(lib("x", "2.0", "2.0", "2.0")),
        ext("z", "1.0")
            .with_dependency(dep("c", "1.0", "1.0"))
            .with_lib(lib("x", "2.0", "2.0", "2.0")),
    ]);

    resolver.resolve_dependencies("a", &v("1.0"));
    assert!(resolver.results().is_none());
    assert!(!resolver.fail_reasons().is_empty());

    resolver.resolve_dependencies("z", &v("1.0"));

    assert_eq!(
        plans(&resolver),
        vec![vec!["install z@1.0.0", "install c@1.0.0"]]
    );
    assert!(resolver.fail_reasons().is_empty());
}

#[test]
fn fail_reasons_serialize_with_kind_tag() {
    let reason = FailReason::SearchLimitReached { limit: 10 };
    let rendered = serde_json::to_string(&reason).expect("must serialize");
    assert_eq!(rendered, r#"{"kind":"search_limit_reached","limit":10}"#);
}
