use std::collections::HashSet;

use proptest::prelude::*;

use forgedag::graph::{NodeDefinition, resolve};
use forgedag_test_utils::builders::DefinitionBuilder;

/// Strategy for a valid acyclic definition set.
///
/// Acyclicity is guaranteed by only letting node N depend on nodes 0..N-1;
/// each raw index is split between input and order dependencies.
fn acyclic_defs_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<NodeDefinition>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        let deps = proptest::collection::vec(
            proptest::collection::vec((any::<usize>(), any::<bool>()), 0..num_nodes),
            num_nodes,
        );

        deps.prop_map(move |raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut builder = DefinitionBuilder::task(&format!("node_{}", i));

                    let mut inputs = HashSet::new();
                    let mut orders = HashSet::new();
                    for (raw_idx, as_input) in potential {
                        if i == 0 {
                            continue;
                        }
                        let dep = raw_idx % i;
                        if as_input {
                            inputs.insert(dep);
                        } else if !inputs.contains(&dep) {
                            orders.insert(dep);
                        }
                    }

                    let mut inputs: Vec<usize> = inputs.into_iter().collect();
                    inputs.sort_unstable();
                    let mut orders: Vec<usize> = orders
                        .into_iter()
                        .filter(|d| !inputs.contains(d))
                        .collect();
                    orders.sort_unstable();

                    for dep in inputs {
                        builder = builder.needs(&format!("node_{}", dep));
                    }
                    for dep in orders {
                        builder = builder.after(&format!("node_{}", dep));
                    }
                    builder.build()
                })
                .collect()
        })
    })
}

proptest! {
    /// Any acyclic set with resolvable names produces a graph whose linked
    /// dependency sets exactly match the declared name lists.
    #[test]
    fn resolution_matches_declarations(defs in acyclic_defs_strategy(10)) {
        let graph = resolve(&defs).expect("acyclic definitions must resolve");
        prop_assert_eq!(graph.node_count(), defs.len());

        for def in &defs {
            let inputs = graph.input_deps_of(&def.name).unwrap();
            prop_assert_eq!(&inputs, &def.input_dependencies);

            let orders = graph.order_deps_of(&def.name).unwrap();
            prop_assert_eq!(&orders, &def.order_dependencies);

            // No triggers in the set, so no controlling triggers anywhere.
            let gates = graph.controlling_triggers_of(&def.name).unwrap();
            prop_assert!(gates.is_empty());
        }
    }

    /// Reversing one declared edge into a back reference always produces a
    /// cycle error naming the nodes on the loop.
    #[test]
    fn any_back_edge_is_rejected(defs in acyclic_defs_strategy(8), seed in any::<usize>()) {
        // Pick a node with at least one dependency and point that
        // dependency back at the node, closing a loop.
        let candidates: Vec<usize> = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.input_dependencies.is_empty())
            .map(|(i, _)| i)
            .collect();
        prop_assume!(!candidates.is_empty());

        let victim = candidates[seed % candidates.len()];
        let mut defs = defs;
        let dep_name = defs[victim].input_dependencies[0].clone();
        let victim_name = defs[victim].name.clone();
        let dep_idx = defs.iter().position(|d| d.name == dep_name).unwrap();
        defs[dep_idx].order_dependencies.push(victim_name.clone());

        match resolve(&defs) {
            Err(forgedag::errors::ForgedagError::DependencyCycle { path }) => {
                prop_assert!(path.contains(&victim_name));
                prop_assert!(path.contains(&dep_name));
            }
            Err(other) => prop_assert!(false, "expected DependencyCycle, got: {:?}", other),
            Ok(_) => prop_assert!(false, "cycle was not rejected"),
        }
    }
}
