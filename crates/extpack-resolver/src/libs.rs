use std::collections::BTreeMap;

use extpack_core::LibDependency;
use semver::Version;

use crate::types::{LibChoice, TrackableLibDependency};

pub(crate) type LibMap = BTreeMap<String, Vec<TrackableLibDependency>>;

pub(crate) fn add_libs(libs_map: &mut LibMap, declared_by: &str, libs: &[LibDependency]) {
    for lib in libs {
        libs_map
            .entry(lib.id.clone())
            .or_default()
            .push(TrackableLibDependency::new(lib.clone(), declared_by));
    }
}

pub(crate) fn remove_libs(libs_map: &mut LibMap, declared_by: &str, libs: &[LibDependency]) {
    for lib in libs {
        if let Some(declarations) = libs_map.get_mut(&lib.id) {
            declarations.retain(|declaration| declaration.declared_by != declared_by);
            if declarations.is_empty() {
                libs_map.remove(&lib.id);
            }
        }
    }
}

pub(crate) fn first_lib_incompatibility(
    libs: &[LibDependency],
    existing: &LibMap,
) -> Option<String> {
    libs.iter().find_map(|lib| {
        let same_libs = existing.get(&lib.id)?;
        let declarations = std::iter::once(lib)
            .chain(same_libs.iter().map(|declaration| &declaration.lib))
            .collect::<Vec<_>>();
        compatible_versions(&declarations)
            .is_empty()
            .then(|| lib.id.clone())
    })
}

// Collects a [`LibChoice`] for every library declared more than once across
// the path and the installed extensions. The flag is set when any of them
// has no version acceptable to all declarations.
pub(crate) fn find_lib_conflicts(visited: &LibMap, installed: &LibMap) -> (Vec<LibChoice>, bool) {
    let mut choices = Vec::new();
    let mut conflicts_found = false;

    for (lib_id, visited_declarations) in visited {
        let installed_declarations = installed.get(lib_id).map(Vec::as_slice).unwrap_or(&[]);
        let combined: Vec<TrackableLibDependency> = visited_declarations
            .iter()
            .chain(installed_declarations)
            .cloned()
            .collect();
        if combined.len() < 2 {
            continue;
        }

        let declarations = combined
            .iter()
            .map(|declaration| &declaration.lib)
            .collect::<Vec<_>>();
        let conflict = compatible_versions(&declarations).is_empty();
        conflicts_found |= conflict;
        choices.push(LibChoice {
            lib_id: lib_id.clone(),
            conflict,
            declarations: combined,
        });
    }

    (choices, conflicts_found)
}

fn compatible_versions(declarations: &[&LibDependency]) -> Vec<Version> {
    let mut available: Vec<Version> = declarations
        .iter()
        .map(|declaration| declaration.version.clone())
        .collect();
    for declaration in declarations {
        available.retain(|version| declaration.range.contains(version));
    }
    available
}
