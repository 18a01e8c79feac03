use std::collections::{BTreeMap, BTreeSet, HashSet};

use extpack_core::ExtensionMetadata;

// Orders placed extensions so that every extension follows the placed
// extensions it depends on. Ties break lexicographically; nodes left on a
// cycle are appended in reverse discovery order.
pub(crate) fn install_order(placed: &[ExtensionMetadata]) -> Vec<String> {
    let placed_ids: HashSet<&str> = placed.iter().map(|metadata| metadata.id.as_str()).collect();
    let mut reverse: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();

    for metadata in placed {
        let dependencies: BTreeSet<&str> = metadata
            .extension_dependencies
            .iter()
            .map(|dependency| dependency.id.as_str())
            .filter(|id| placed_ids.contains(id))
            .collect();
        in_degree.insert(metadata.id.as_str(), dependencies.len());
        for dependency in dependencies {
            reverse
                .entry(dependency)
                .or_default()
                .insert(metadata.id.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter_map(|(id, degree)| (*degree == 0).then_some(*id))
        .collect();
    let mut ordered = Vec::with_capacity(placed.len());

    while let Some(next) = ready.pop_first() {
        ordered.push(next.to_string());
        if let Some(dependents) = reverse.get(&next) {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
    }

    if ordered.len() != placed.len() {
        let ordered_set: HashSet<String> = ordered.iter().cloned().collect();
        ordered.extend(
            placed
                .iter()
                .rev()
                .filter(|metadata| !ordered_set.contains(&metadata.id))
                .map(|metadata| metadata.id.clone()),
        );
    }

    ordered
}
