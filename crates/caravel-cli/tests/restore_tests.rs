//! End-to-end restore pipeline tests driven through the library API.

use caravel_cli::driver::{RestoreDriver, RestoreOptions};
use caravel_cli::hooks::{HookOutput, HookRunner};
use caravel_core::Version;
use caravel_lockfile::LockFile;
use caravel_store::sha512_base64_file;
use caravel_test_utils::{MockFeed, TempSolution, seed_store_package};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use url::Url;

const APP_MANIFEST: &str = r#"{"dependencies":{"A":"1.0"},"frameworks":{"net1":{}}}"#;

fn options_with(solution: &TempSolution, sources: &[String]) -> RestoreOptions {
    RestoreOptions {
        packages_dir: Some(solution.store_root()),
        sources: sources
            .iter()
            .map(|s| Url::parse(s).expect("valid url"))
            .collect(),
        ..RestoreOptions::default()
    }
}

fn lock_of(solution: &TempSolution, project: &str) -> LockFile {
    LockFile::read(&solution.lock_path(project)).expect("readable lock file")
}

#[tokio::test]
async fn local_only_restore_locks_the_graph_and_installs_nothing() {
    // S1: A/1.0 declares B/1.0, both present locally.
    let solution = TempSolution::new();
    let app = solution.add_project("App", APP_MANIFEST);
    seed_store_package(
        &solution.store_root(),
        "A",
        "1.0",
        r#"{"dependencySets":{"*":{"B":"1.0"}}}"#,
    );
    seed_store_package(&solution.store_root(), "B", "1.0", "{}");

    let driver = RestoreDriver::new(options_with(&solution, &[]));
    let summary = driver.restore(&app).await.expect("restore succeeds");

    assert_eq!(summary.installed, 0);
    assert!(summary.lock_written);

    let lock = lock_of(&solution, "App");
    assert!(lock.libraries.contains_key("A/1.0"));
    assert!(lock.libraries.contains_key("B/1.0"));
    assert_eq!(
        lock.framework_dependencies[""],
        vec!["A >= 1.0".to_string()]
    );
}

#[tokio::test]
async fn missing_package_is_downloaded_and_recorded() {
    // S2: B only exists on the feed.
    let solution = TempSolution::new();
    let app = solution.add_project("App", APP_MANIFEST);
    seed_store_package(
        &solution.store_root(),
        "A",
        "1.0",
        r#"{"dependencySets":{"*":{"B":"1.0"}}}"#,
    );
    let mut feed = MockFeed::start().await;
    feed.publish("B", "1.0", "{}").await;

    let driver = RestoreDriver::new(options_with(&solution, &[feed.url()]));
    let summary = driver.restore(&app).await.expect("restore succeeds");
    assert_eq!(summary.installed, 1);

    let lock = lock_of(&solution, "App");
    let locked_b = &lock.libraries["B/1.0"];
    assert!(!locked_b.sha.is_empty());

    // The recorded sha matches the archive bytes on disk.
    let archive = solution
        .store_root()
        .join("B")
        .join("1.0")
        .join("B.1.0.zip");
    assert_eq!(sha512_base64_file(&archive).unwrap(), locked_b.sha);

    // A second restore with --no-cache and a dead feed still succeeds:
    // everything resolves locally before remote providers are consulted.
    let dead = RestoreOptions {
        no_cache: true,
        ..options_with(&solution, &["http://127.0.0.1:1/".to_string()])
    };
    let summary = RestoreDriver::new(dead)
        .restore(&app)
        .await
        .expect("offline restore succeeds");
    assert_eq!(summary.installed, 0);
}

#[tokio::test]
async fn unsatisfiable_range_fails_without_writing_a_lock() {
    // S3: the manifest wants C 1.0; the feed only has 2.0.
    let solution = TempSolution::new();
    let app = solution.add_project(
        "App",
        r#"{"dependencies":{"C":"1.0"},"frameworks":{"net1":{}}}"#,
    );
    let mut feed = MockFeed::start().await;
    feed.publish("C", "2.0", "{}").await;

    let driver = RestoreDriver::new(options_with(&solution, &[feed.url()]));
    let err = driver.restore(&app).await.expect_err("restore fails");
    assert!(err.to_string().contains("Unable to locate C >= 1.0"));
    assert!(!solution.lock_path("App").exists());
}

#[tokio::test]
async fn two_runs_produce_byte_identical_lock_files() {
    let solution = TempSolution::new();
    let app = solution.add_project(
        "App",
        r#"{
            "dependencies": {"A": "1.0"},
            "frameworks": {"net1": {"dependencies": {"B": "1.0"}}, "net45": {}}
        }"#,
    );
    seed_store_package(&solution.store_root(), "A", "1.0", "{}");
    seed_store_package(&solution.store_root(), "B", "1.0", "{}");

    let driver = RestoreDriver::new(options_with(&solution, &[]));
    driver.restore(&app).await.unwrap();
    let first = fs::read(solution.lock_path("App")).unwrap();

    driver.restore(&app).await.unwrap();
    let second = fs::read(solution.lock_path("App")).unwrap();
    assert_eq!(first, second);

    // Group order: "" first, then frameworks in declaration order.
    let text = String::from_utf8(first).unwrap();
    let empty = text.find("\"\":").unwrap();
    let net1 = text.find("\"net1\":").unwrap();
    let net45 = text.find("\"net45\":").unwrap();
    assert!(empty < net1 && net1 < net45);
}

#[tokio::test]
async fn locked_lock_file_replays_offline() {
    // Property 4: restore with --lock, then replay with no sources.
    let solution = TempSolution::new();
    let app = solution.add_project(APP_PROJECT_NAME, APP_MANIFEST);
    seed_store_package(
        &solution.store_root(),
        "A",
        "1.0",
        r#"{"dependencySets":{"*":{"B":"1.0"}}}"#,
    );
    let mut feed = MockFeed::start().await;
    feed.publish("B", "1.0", "{}").await;

    let lock_options = RestoreOptions {
        lock: true,
        ..options_with(&solution, &[feed.url()])
    };
    RestoreDriver::new(lock_options)
        .restore(&app)
        .await
        .expect("locking restore succeeds");
    assert!(lock_of(&solution, APP_PROJECT_NAME).locked);

    let offline = RestoreDriver::new(options_with(&solution, &[]));
    let summary = offline.restore(&app).await.expect("replay succeeds");
    assert_eq!(summary.installed, 0);
    assert!(!summary.lock_written);
}

const APP_PROJECT_NAME: &str = "App";

#[tokio::test]
async fn tampered_archive_fails_locked_replay() {
    // S5: the lock records sha X, the disk archive hashes to Y.
    let solution = TempSolution::new();
    let app = solution.add_project(APP_PROJECT_NAME, APP_MANIFEST);
    seed_store_package(&solution.store_root(), "A", "1.0", "{}");

    let lock_options = RestoreOptions {
        lock: true,
        ..options_with(&solution, &[])
    };
    RestoreDriver::new(lock_options)
        .restore(&app)
        .await
        .expect("locking restore succeeds");

    let archive = solution
        .store_root()
        .join("A")
        .join("1.0")
        .join("A.1.0.zip");
    fs::write(&archive, b"tampered").unwrap();

    let err = RestoreDriver::new(options_with(&solution, &[]))
        .restore(&app)
        .await
        .expect_err("replay fails");
    assert!(err.to_string().contains("sha mismatch"));
}

#[tokio::test]
async fn broken_feed_is_fatal_unless_ignored() {
    let solution = TempSolution::new();
    let app = solution.add_project(
        "App",
        r#"{"dependencies":{"D":"1.0"},"frameworks":{"net1":{}}}"#,
    );
    let mut feed = MockFeed::start().await;
    feed.break_name("D").await;

    let driver = RestoreDriver::new(options_with(&solution, &[feed.url()]));
    assert!(driver.restore(&app).await.is_err());

    // Ignored, the broken feed demotes to a warning and the range simply
    // stays unresolved.
    let ignoring = RestoreOptions {
        ignore_failed_sources: true,
        ..options_with(&solution, &[feed.url()])
    };
    let err = RestoreDriver::new(ignoring)
        .restore(&app)
        .await
        .expect_err("still unresolved");
    assert!(err.to_string().contains("Unable to locate D >= 1.0"));
}

#[tokio::test]
async fn fallback_sources_are_used_only_when_primaries_miss() {
    let solution = TempSolution::new();
    let app = solution.add_project(
        "App",
        r#"{"dependencies":{"E":"1.0"},"frameworks":{"net1":{}}}"#,
    );
    let primary = MockFeed::start().await;
    let mut fallback = MockFeed::start().await;
    fallback.publish("E", "1.0", "{}").await;

    let options = RestoreOptions {
        fallback_sources: vec![Url::parse(&fallback.url()).unwrap()],
        ..options_with(&solution, &[primary.url()])
    };
    let summary = RestoreDriver::new(options)
        .restore(&app)
        .await
        .expect("fallback satisfies the range");
    assert_eq!(summary.installed, 1);
}

#[tokio::test]
async fn install_one_package_returns_the_root_and_writes_no_lock() {
    let solution = TempSolution::new();
    let mut feed = MockFeed::start().await;
    feed.publish("Tool", "1.2", "{}").await;

    let options = RestoreOptions {
        package_id: Some(("Tool".to_string(), Some(Version::parse("1.2").unwrap()))),
        ..options_with(&solution, &[feed.url()])
    };
    let summary = RestoreDriver::new(options)
        .restore(solution.path())
        .await
        .expect("install succeeds");

    let root = summary.install_root.expect("install root returned");
    assert!(root.ends_with(Path::new("Tool").join("1.2")));
    assert!(root.join("Tool.1.2.zip").is_file());
    assert!(!summary.lock_written);
}

/// Hook runner that records invocations and fails a chosen hook.
struct ScriptedHooks {
    fail: Option<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl HookRunner for ScriptedHooks {
    fn run(
        &self,
        name: &str,
        _command: &str,
        _project_dir: &Path,
        _env: &[(String, String)],
    ) -> std::io::Result<HookOutput> {
        self.seen.lock().unwrap().push(name.to_string());
        if self.fail == Some(name) {
            Ok(HookOutput {
                exit_code: 7,
                stderr: "hook exploded".to_string(),
            })
        } else {
            Ok(HookOutput {
                exit_code: 0,
                stderr: String::new(),
            })
        }
    }
}

const HOOKED_MANIFEST: &str = r#"{
    "frameworks": {"net1": {}},
    "scripts": {"prerestore": "a", "postrestore": "b", "prepare": "c"}
}"#;

#[tokio::test]
async fn hooks_run_in_lifecycle_order() {
    let solution = TempSolution::new();
    let app = solution.add_project("App", HOOKED_MANIFEST);

    let hooks = std::sync::Arc::new(ScriptedHooks {
        fail: None,
        seen: Mutex::new(Vec::new()),
    });
    let driver =
        RestoreDriver::new(options_with(&solution, &[])).with_hook_runner(hooks.clone());
    driver.restore(&app).await.expect("restore succeeds");

    assert_eq!(
        *hooks.seen.lock().unwrap(),
        vec!["prerestore", "postrestore", "prepare"]
    );
}

#[tokio::test]
async fn failing_prerestore_aborts_with_its_stderr() {
    let solution = TempSolution::new();
    let app = solution.add_project("App", HOOKED_MANIFEST);

    let hooks = std::sync::Arc::new(ScriptedHooks {
        fail: Some("prerestore"),
        seen: Mutex::new(Vec::new()),
    });
    let driver =
        RestoreDriver::new(options_with(&solution, &[])).with_hook_runner(hooks.clone());
    let err = driver.restore(&app).await.expect_err("restore aborts");
    assert!(err.to_string().contains("hook exploded"));
    // postrestore never ran.
    assert_eq!(*hooks.seen.lock().unwrap(), vec!["prerestore"]);
}

#[tokio::test]
async fn case_mismatch_reports_the_providers_spelling() {
    // Property 6: Foo declared, only foo exists.
    let solution = TempSolution::new();
    let app = solution.add_project(
        "App",
        r#"{"dependencies":{"Foo":"1.0"},"frameworks":{"net1":{}}}"#,
    );
    seed_store_package(&solution.store_root(), "foo", "1.0", "{}");

    let err = RestoreDriver::new(options_with(&solution, &[]))
        .restore(&app)
        .await
        .expect_err("case mismatch is an error");
    let message = err.to_string();
    assert!(message.contains("Unable to locate Foo >= 1.0"));
    assert!(message.contains("'foo'"));
}

#[tokio::test]
async fn solution_restore_covers_every_project() {
    let solution = TempSolution::new();
    solution.add_project("One", r#"{"frameworks":{"net1":{}}}"#);
    solution.add_project("Two", r#"{"frameworks":{"net1":{}}}"#);

    let driver = RestoreDriver::new(options_with(&solution, &[]));
    let summary = driver.restore(solution.path()).await.unwrap();
    assert_eq!(summary.projects, 2);
    assert!(solution.lock_path("One").exists());
    assert!(solution.lock_path("Two").exists());
}
