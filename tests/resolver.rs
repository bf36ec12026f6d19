use std::path::PathBuf;

use taskmake::engine::{ExecutionSession, MAX_RESOLUTION_DEPTH, Resolver};
use taskmake::errors::BuildError;
use taskmake::fs::mock::{MockFileSystem, at};
use taskmake::inventory::Inventory;
use taskmake::pattern::template::STEM;
use taskmake::task::{Action, TaskSpec};
use taskmake_test_utils::builders::TaskSpecBuilder;

fn compile_rule(label: &str, output: &str) -> TaskSpec {
    TaskSpecBuilder::new(label)
        .command(
            "cc",
            &["-c", "src/${fileBasenameNoExtension}.c", "-o", "${file}"],
        )
        .input("src/${fileBasenameNoExtension}.c")
        .output(output)
        .build()
}

fn link() -> TaskSpec {
    TaskSpecBuilder::new("link")
        .command("ld", &["-o", "out/app", "out/main.o"])
        .input("out/main.o")
        .output("out/app")
        .build()
}

#[test]
fn wildcard_producer_is_instantiated_for_the_requested_path() {
    let fs = MockFileSystem::new();
    fs.add_file("src/main.c", at(1));
    let link = link();
    let inventory = Inventory::new(vec![link.clone(), compile_rule("compile", "out/*.o")]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&link);

    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);
    assert_eq!(resolution.runners.len(), 1);
    let runner = &resolution.runners[0];
    assert_eq!(runner.id, "compile (out/main.o)");
    assert_eq!(runner.spec.inputs, vec!["src/main.c".to_string()]);
    assert_eq!(runner.spec.outputs, vec!["out/main.o".to_string()]);
    assert_eq!(
        runner.spec.action,
        Some(Action::Command {
            command: "cc".to_string(),
            args: ["-c", "src/main.c", "-o", "out/main.o"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    );
    let table = runner.placeholders.as_ref().unwrap();
    assert_eq!(table.get(STEM), Some("main"));
    assert_eq!(runner.depth, 1);
    assert!(runner.completion.is_some());
    assert!(session.is_claimed("compile (out/main.o)"));
}

#[test]
fn exact_producer_beats_wildcard_rule() {
    let fs = MockFileSystem::new();
    let link = link();
    let special = TaskSpecBuilder::new("special")
        .command("special-cc", &[])
        .output("out/main.o")
        .build();
    let inventory = Inventory::new(vec![
        compile_rule("compile", "out/*.o"),
        special,
        link.clone(),
    ]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&link);

    assert_eq!(resolution.runners.len(), 1);
    assert_eq!(resolution.runners[0].id, "special");
    assert!(resolution.runners[0].placeholders.is_none());
}

#[test]
fn first_matching_wildcard_rule_wins() {
    let fs = MockFileSystem::new();
    fs.add_file("src/main.c", at(1));
    let link = link();
    let inventory = Inventory::new(vec![
        compile_rule("first", "out/*.o"),
        compile_rule("second", "out/**"),
        link.clone(),
    ]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&link);

    assert_eq!(resolution.runners.len(), 1);
    assert_eq!(resolution.runners[0].id, "first (out/main.o)");
}

#[test]
fn unproducible_missing_input_is_a_soft_failure() {
    let fs = MockFileSystem::new();
    fs.add_file("src/present.c", at(1));
    let task = TaskSpecBuilder::new("build")
        .command("cc", &[])
        .input("src/missing.c")
        .input("src/present.c")
        .output("out/app")
        .build();
    let inventory = Inventory::new(vec![task.clone()]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&task);

    assert!(resolution.runners.is_empty());
    assert_eq!(
        resolution.diagnostics,
        vec![BuildError::UnresolvedInput {
            path: PathBuf::from("src/missing.c")
        }]
    );
    assert_eq!(resolution.diagnostics[0].to_string(), "Can't make src/missing.c");
}

#[test]
fn wildcard_inputs_never_produce_runners() {
    let fs = MockFileSystem::new();
    let task = TaskSpecBuilder::new("link")
        .command("ld", &[])
        .input("out/*.o")
        .output("out/app")
        .build();
    let inventory = Inventory::new(vec![task.clone(), compile_rule("compile", "out/*.o")]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&task);

    assert!(resolution.runners.is_empty());
    assert!(resolution.diagnostics.is_empty());
}

#[test]
fn explicit_dependencies_are_claimed_once_and_then_awaited() {
    let fs = MockFileSystem::new();
    let shared = TaskSpecBuilder::new("shared").command("prep", &[]).build();
    let left = TaskSpecBuilder::new("left")
        .command("l", &[])
        .depends_on("shared")
        .build();
    let right = TaskSpecBuilder::new("right")
        .command("r", &[])
        .depends_on("shared")
        .build();
    let inventory = Inventory::new(vec![shared, left.clone(), right.clone()]);
    let session = ExecutionSession::new();

    let first = Resolver::new(&inventory, &fs, &session).resolve(&left);
    let second = Resolver::new(&inventory, &fs, &session).resolve(&right);

    assert_eq!(first.runners.len(), 1);
    assert_eq!(first.runners[0].id, "shared");
    assert!(first.awaited.is_empty());
    assert!(second.runners.is_empty());
    assert_eq!(second.awaited.len(), 1);
    assert_eq!(second.awaited[0].id, "shared");

    // The waiter sees the owner's exit code.
    first.runners[0].completion.as_ref().unwrap().finish(0);
    assert_eq!(second.awaited[0].completion.code(), Some(0));
}

#[test]
fn unknown_explicit_dependency_is_reported() {
    let fs = MockFileSystem::new();
    let task = TaskSpecBuilder::new("main")
        .command("x", &[])
        .depends_on("ghost")
        .build();
    let inventory = Inventory::new(vec![task.clone()]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&task);

    assert!(resolution.runners.is_empty());
    assert_eq!(
        resolution.diagnostics,
        vec![BuildError::UnknownDependency {
            task: "main".to_string(),
            name: "ghost".to_string()
        }]
    );
}

#[test]
fn producer_inputs_are_resolved_only_when_the_producer_is() {
    let fs = MockFileSystem::new();
    fs.add_file("src/main.c", at(1));
    let gen_header = TaskSpecBuilder::new("gen")
        .command("gen", &[])
        .output("include/config.h")
        .build();
    let object = TaskSpecBuilder::new("object")
        .command("cc", &[])
        .input("src/main.c")
        .input("include/config.h")
        .output("out/main.o")
        .build();
    let link = link();
    let inventory = Inventory::new(vec![gen_header, object, link.clone()]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&link);

    assert_eq!(resolution.runners.len(), 1);
    let object = &resolution.runners[0];
    assert_eq!(object.id, "object");
    assert!(!session.is_claimed("gen"));

    let nested = Resolver::new(&inventory, &fs, &session).resolve_at(&object.spec, object.depth);
    let ids: Vec<&str> = nested.runners.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["gen"]);
    assert_eq!(nested.runners[0].depth, 2);
}

#[test]
fn inputs_are_normalized_before_lookup() {
    let fs = MockFileSystem::new();
    let producer = TaskSpecBuilder::new("producer")
        .command("p", &[])
        .output("out/data.bin")
        .build();
    let consumer = TaskSpecBuilder::new("consumer")
        .command("c", &[])
        .input("./out/../out/data.bin")
        .build();
    let inventory = Inventory::new(vec![producer, consumer.clone()]);
    let session = ExecutionSession::new();

    let resolution = Resolver::new(&inventory, &fs, &session).resolve(&consumer);

    assert_eq!(resolution.runners.len(), 1);
    assert_eq!(resolution.runners[0].id, "producer");
}

#[test]
fn runaway_wildcard_chains_are_bounded() {
    let fs = MockFileSystem::new();
    // Every instance asks for a longer name that the same rule produces.
    let grow = TaskSpecBuilder::new("grow")
        .command("grow", &[])
        .input("out/${fileBasename}.o")
        .output("out/*.o")
        .build();
    let top = TaskSpecBuilder::new("top")
        .command("top", &[])
        .input("out/a.o")
        .build();
    let inventory = Inventory::new(vec![grow, top.clone()]);
    let session = ExecutionSession::new();

    let mut spec = top;
    let mut depth = 0;
    let mut bounded = false;
    for _ in 0..=MAX_RESOLUTION_DEPTH {
        let resolution = Resolver::new(&inventory, &fs, &session).resolve_at(&spec, depth);
        if resolution
            .diagnostics
            .iter()
            .any(|d| matches!(d, BuildError::ResolutionTooDeep { .. }))
        {
            assert!(resolution.runners.is_empty());
            bounded = true;
            break;
        }
        assert_eq!(resolution.runners.len(), 1);
        let next = &resolution.runners[0];
        depth = next.depth;
        spec = (*next.spec).clone();
    }

    assert!(bounded);
    assert_eq!(depth, MAX_RESOLUTION_DEPTH);
}
