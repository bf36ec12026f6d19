use std::path::PathBuf;
use std::time::Duration;

use taskmake::config::{dependency_warnings, load_and_validate, parse_duration, parse_str};
use taskmake::config::ConfigFile;
use taskmake::errors::TaskmakeError;
use taskmake::inventory::{TaskProvider, TomlTaskProvider};
use taskmake::task::Action;
use taskmake::types::CyclePolicy;
use taskmake_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

const SAMPLE: &str = r#"
[config]
inventory_ttl = "250ms"
on_cycle = "fail"

[task.compile]
command = "cc"
args = ["-c", "src/${fileBasenameNoExtension}.c", "-o", "${file}"]
inputs = ["src/${fileBasenameNoExtension}.c"]
outputs = ["out/*.o"]

[task.link]
command = "cc"
args = ["-o", "out/app", "out/main.o"]
inputs = ["out/main.o"]
outputs = ["out/app"]
dependsOn = ["prepare"]
ignoreErrors = true

[task.prepare]
process = "mkdir"
args = ["-p", "out"]
scope = "setup"

[task.prepare.options]
cwd = "build"
env = { MODE = "release" }

[task.all]
task = "link"
"#;

fn write_task_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Taskmake.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

fn config_error(result: Result<ConfigFile, TaskmakeError>) -> String {
    match result {
        Err(TaskmakeError::ConfigError(msg)) => msg,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn sample_file_loads_with_declaration_order_and_aliases() {
    let (_dir, path) = write_task_file(SAMPLE);
    let cfg = load_and_validate(&path).unwrap();

    let keys: Vec<&str> = cfg.task.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["compile", "link", "prepare", "all"]);
    assert_eq!(cfg.inventory_ttl(), Duration::from_millis(250));
    assert_eq!(cfg.on_cycle(), CyclePolicy::Fail);

    let link = &cfg.task["link"];
    assert_eq!(link.depends_on, vec!["prepare".to_string()]);
    assert!(link.ignore_errors);

    let prepare = &cfg.task["prepare"];
    assert_eq!(prepare.effective_id("prepare"), "setup:prepare");
    assert_eq!(prepare.options.cwd, Some(PathBuf::from("build")));
    assert_eq!(prepare.options.env.get("MODE").map(String::as_str), Some("release"));
}

#[test]
fn defaults_apply_without_config_section() {
    let raw = parse_str("[task.a]\ncommand = \"true\"\n").unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.inventory_ttl(), Duration::from_secs(5));
    assert_eq!(cfg.on_cycle(), CyclePolicy::Skip);
}

#[test]
fn task_specs_carry_actions_and_root_dir() {
    let (_dir, path) = write_task_file(SAMPLE);
    let cfg = load_and_validate(&path).unwrap();
    let root = path.parent().unwrap();
    let specs = cfg.task_specs(root);

    assert_eq!(specs.len(), 4);
    assert!(specs.iter().all(|s| s.dir == root));
    assert_eq!(
        specs[2].action,
        Some(Action::Process {
            process: "mkdir".to_string(),
            args: vec!["-p".to_string(), "out".to_string()],
        })
    );
    assert_eq!(specs[2].working_dir(), root.join("build"));
    assert_eq!(
        specs[3].action,
        Some(Action::Task {
            task: "link".to_string()
        })
    );
}

#[test]
fn task_without_action_is_accepted() {
    let cfg = ConfigFileBuilder::new()
        .with_task("empty", TaskConfigBuilder::empty().build())
        .build();
    let specs = cfg.task_specs(&PathBuf::from("."));
    assert_eq!(specs[0].action, None);
}

#[test]
fn empty_task_file_is_rejected() {
    let raw = parse_str("[config]\non_cycle = \"skip\"\n").unwrap();
    let msg = config_error(ConfigFile::try_from(raw));
    assert!(msg.contains("at least one"), "{msg}");
}

#[test]
fn several_actions_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("both", TaskConfigBuilder::command("cc").process("gcc").build())
        .raw();
    let msg = config_error(ConfigFile::try_from(raw));
    assert!(msg.contains("'both'"), "{msg}");
}

#[test]
fn forwarding_with_args_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("alias", TaskConfigBuilder::empty().forward("real").arg("-v").build())
        .with_task("real", TaskConfigBuilder::command("true").build())
        .raw();
    config_error(ConfigFile::try_from(raw));
}

#[test]
fn duplicate_ids_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("one", TaskConfigBuilder::command("a").label("build").build())
        .with_task("two", TaskConfigBuilder::command("b").label("build").build())
        .raw();
    let msg = config_error(ConfigFile::try_from(raw));
    assert!(msg.contains("'build'"), "{msg}");

    // Different scopes keep equal labels apart.
    ConfigFileBuilder::new()
        .with_task("one", TaskConfigBuilder::command("a").label("build").scope("x").build())
        .with_task("two", TaskConfigBuilder::command("b").label("build").scope("y").build())
        .build();
}

#[test]
fn bad_inventory_ttl_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::command("true").build())
        .inventory_ttl("5 parsecs")
        .raw();
    let msg = config_error(ConfigFile::try_from(raw));
    assert!(msg.contains("inventory_ttl"), "{msg}");
}

#[test]
fn unknown_cycle_policy_fails_to_parse() {
    let err = parse_str("[config]\non_cycle = \"explode\"\n[task.a]\ncommand = \"x\"\n").unwrap_err();
    assert!(matches!(err, TaskmakeError::TomlError(_)));
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("5").is_err());
    assert!(parse_duration("").is_err());
    assert!(parse_duration("3d").is_err());
}

#[test]
fn oversized_durations_are_rejected_not_wrapped() {
    let huge = format!("{}h", u64::MAX / 60);
    assert!(parse_duration(&huge).is_err());
    assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
    assert_eq!(
        parse_duration(&format!("{}s", u64::MAX)),
        Ok(Duration::from_secs(u64::MAX))
    );

    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::command("true").build())
        .inventory_ttl(&huge)
        .raw();
    let msg = config_error(ConfigFile::try_from(raw));
    assert!(msg.contains("too large"), "{msg}");
}

#[test]
fn cycle_policy_defaults_to_skip() {
    assert_eq!(CyclePolicy::default(), CyclePolicy::Skip);
    assert_eq!("FAIL".parse::<CyclePolicy>(), Ok(CyclePolicy::Fail));
}

#[test]
fn dependency_problems_are_only_warnings() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::command("a").depends_on("b").build())
        .with_task("b", TaskConfigBuilder::command("b").depends_on("a").build())
        .with_task("c", TaskConfigBuilder::command("c").depends_on("ghost").build())
        .raw();

    let warnings = dependency_warnings(&raw);
    assert_eq!(warnings.len(), 2, "{warnings:?}");
    assert!(warnings.iter().any(|w| w.contains("unknown task 'ghost'")));
    assert!(warnings.iter().any(|w| w.contains("cycle")));

    // Still loads.
    ConfigFile::try_from(raw).unwrap();
}

#[test]
fn acyclic_dependencies_produce_no_warnings() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::command("a").build())
        .with_task("b", TaskConfigBuilder::command("b").depends_on("a").build())
        .with_task("c", TaskConfigBuilder::command("c").depends_on("a").depends_on("b").build())
        .raw();
    assert!(dependency_warnings(&raw).is_empty());
}

#[tokio::test]
async fn toml_provider_rereads_the_file() {
    let (dir, path) = write_task_file("[task.a]\ncommand = \"true\"\n");
    let provider = TomlTaskProvider::new(&path);

    let tasks = provider.fetch_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].dir, dir.path());

    std::fs::write(&path, "[task.a]\ncommand = \"true\"\n[task.b]\ncommand = \"false\"\n").unwrap();
    let tasks = provider.fetch_tasks().await.unwrap();
    let labels: Vec<&str> = tasks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b"]);
}

#[tokio::test]
async fn toml_provider_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = TomlTaskProvider::new(dir.path().join("nope.toml"));
    let err = provider.fetch_tasks().await.unwrap_err();
    assert!(matches!(err, TaskmakeError::IoError(_)));
}
