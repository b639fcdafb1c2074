
use std::{fs, path::Path};

use example_scenario::ExampleScenario;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use tree_reconcile::{
    GenerationStamper, NodeId, RenderedDocument, dead_ranges, first_changed_position,
    initial_patch, new_ranges, reconcile,
};

#[test]
fn test_first_changed_positions() {
    for (scenario, stamper, roots) in &build_all_scenarios() {
        for (generation, root) in scenario.generations.iter().zip(roots) {
            assert_eq!(
                first_changed_position(stamper, *root).unwrap(),
                generation.first_changed,
                "{}",
                scenario.name
            );
        }
    }
}

#[test]
fn test_dead_ranges() {
    for (scenario, stamper, roots) in &build_all_scenarios() {
        for (generation, previous) in scenario.generations.iter().skip(1).zip(roots) {
            let Some(expected) = &generation.dead else {
                continue;
            };

            let dead = dead_ranges(stamper, *previous)
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            assert_eq!(&dead, expected, "{}", scenario.name);
        }
    }
}

#[test]
fn test_new_ranges() {
    for (scenario, stamper, roots) in &build_all_scenarios() {
        for (generation, root) in scenario.generations.iter().zip(roots) {
            let Some(expected) = &generation.new else {
                continue;
            };

            let new = new_ranges(stamper, *root)
                .unwrap()
                .into_iter()
                .map(|range| [range.start, range.end])
                .collect::<Vec<_>>();
            assert_eq!(&new, expected, "{}", scenario.name);
        }
    }
}

#[test]
fn test_patches() {
    for (scenario, stamper, roots) in &build_all_scenarios() {
        for (index, generation) in scenario.generations.iter().enumerate() {
            let Some(expected) = &generation.patch else {
                continue;
            };

            let patch = if index == 0 {
                initial_patch(stamper, roots[0])
            } else {
                reconcile(stamper, roots[index - 1], roots[index])
            };

            let patch = patch
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            assert_eq!(&patch, expected, "{}", scenario.name);
        }
    }
}

#[test]
fn test_patches_round_trip() {
    for (scenario, stamper, roots) in &build_all_scenarios() {
        let mut document = RenderedDocument::placeholder(stamper.config());
        document
            .apply_all(&initial_patch(stamper, roots[0]).unwrap())
            .unwrap();
        assert_eq!(
            document,
            RenderedDocument::from_tree(stamper, roots[0]).unwrap(),
            "{}",
            scenario.name
        );

        for pair in roots.windows(2) {
            document
                .apply_all(&reconcile(stamper, pair[0], pair[1]).unwrap())
                .unwrap();
            assert_eq!(
                document,
                RenderedDocument::from_tree(stamper, pair[1]).unwrap(),
                "{}",
                scenario.name
            );
        }
    }
}

fn build_all_scenarios() -> Vec<(ExampleScenario, GenerationStamper, Vec<NodeId>)> {
    get_all_scenarios()
        .into_iter()
        .map(|scenario| {
            let mut stamper = GenerationStamper::new();
            let roots = scenario.build(&mut stamper);

            (scenario, stamper, roots)
        })
        .collect()
}

fn get_all_scenarios() -> Vec<ExampleScenario> {
    let examples_dir = Path::new("tests/examples");
    let entries = fs::read_dir(examples_dir)
        .expect("Failed to read examples directory")
        .collect::<Vec<_>>();

    let mut scenarios = Vec::new();

    for entry in entries {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("yml") {
            let file = fs::File::open(&path).expect("Failed to open example file");
            for document in serde_yaml::Deserializer::from_reader(file) {
                let scenario = ExampleScenario::deserialize(document)
                    .expect("Failed to deserialize scenario");
                scenarios.push(scenario);
            }
        }
    }

    assert!(!scenarios.is_empty(), "No scenarios found");

    scenarios
}
