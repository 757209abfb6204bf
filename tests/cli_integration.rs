//! Integration tests for the nbgit binary.
//!
//! Each test runs the binary with a scrubbed environment so that settings
//! only come from what the test passes in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The binary with no inherited settings; config lookups land in `home`.
fn nbgit(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nbgit").unwrap();
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("GIT_CONFIG_NOSYSTEM", "1");
    cmd
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git command failed");
    assert!(status.success(), "git {args:?} failed");
}

mod basics {
    use super::*;

    #[test]
    fn help_lists_commands() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("export").and(predicate::str::contains("backout")));
    }

    #[test]
    fn version_flag_works() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nbgit"));
    }

    #[test]
    fn debug_and_quiet_conflict() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .args(["--debug", "--quiet", "export"])
            .assert()
            .failure()
            .code(2);
    }
}

mod settings {
    use super::*;

    #[test]
    fn export_without_settings_names_missing_key() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .env("NBGIT_CONFIG", home.path().join("absent.toml"))
            .arg("export")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Error:").and(predicate::str::contains("NETBOX_URL")));
    }

    #[test]
    fn backout_without_local_path_fails() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .env("NETBOX_URL", "http://netbox.invalid")
            .env("NETBOX_TOKEN", "x")
            .arg("backout")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("GIT_LOCAL_PATH"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .arg("--config")
            .arg(home.path().join("missing.toml"))
            .arg("export")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("failed to read config file"));
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        let home = TempDir::new().unwrap();
        let config = home.path().join("nbgit.toml");
        std::fs::write(&config, "netbox_url = \"http://x\"\nnetbox_colour = \"blue\"\n").unwrap();

        nbgit(home.path())
            .arg("--config")
            .arg(&config)
            .arg("export")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("failed to parse config file"));
    }

    #[test]
    fn invalid_no_change_action_is_rejected() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .env("GIT_NO_CHANGE_ACTION", "shred")
            .arg("export")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("shred"));
    }

    #[test]
    fn invalid_tag_branch_is_rejected() {
        let home = TempDir::new().unwrap();
        nbgit(home.path())
            .env("NETBOX_URL", "http://netbox.invalid")
            .env("NETBOX_TOKEN", "x")
            .env("GIT_REMOTE_URL", "/nowhere.git")
            .env("GIT_LOCAL_PATH", home.path().join("snapshot"))
            .env("GIT_BRANCH_MAIN", "main")
            .args(["export", "--tag", "bad tag"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("NETBOX_TAG"));
    }
}

mod export_run {
    use super::*;

    fn page(results: serde_json::Value) -> serde_json::Value {
        let count = results.as_array().map(Vec::len).unwrap_or(0);
        json!({"count": count, "next": null, "previous": null, "results": results})
    }

    async fn netbox() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/extras/tags/"))
            .and(query_param("slug", "release-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
                {"id": 4, "name": "release-42", "slug": "release-42"}
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dcim/interfaces/"))
            .and(query_param("tag", "release-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{
                "id": 7,
                "url": "http://netbox/api/dcim/interfaces/7/",
                "name": "ge-0/0/1",
                "device": {"id": 1, "name": "sw1"},
                "type": {"value": "1000base-t", "label": "1000BASE-T"},
                "description": "uplink",
            }]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dcim/devices/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "name": "sw1",
                "primary_ip": {"id": 9, "address": "192.0.2.1/24"},
                "platform": {"id": 2, "name": "EOS", "slug": "eos"},
                "virtual_chassis": null,
            })))
            .mount(&server)
            .await;
        server
    }

    /// A bare remote with `main` and a clone of it with a commit identity.
    fn repositories(root: &Path) -> (String, std::path::PathBuf) {
        let remote = root.join("remote.git");
        let local = root.join("snapshot");
        run_git(root, &["init", "--bare", "remote.git"]);
        run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(root, &["clone", &remote.to_string_lossy(), "snapshot"]);
        run_git(&local, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&local, &["config", "user.email", "test@example.com"]);
        run_git(&local, &["config", "user.name", "Test User"]);
        run_git(&local, &["config", "commit.gpgsign", "false"]);
        std::fs::write(local.join("README.md"), "snapshots\n").unwrap();
        run_git(&local, &["add", "README.md"]);
        run_git(&local, &["commit", "-m", "Initial commit"]);
        run_git(&local, &["push", "origin", "main"]);
        (remote.to_string_lossy().into_owned(), local)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn export_writes_commits_and_pushes() {
        let server = netbox().await;
        let home = TempDir::new().unwrap();
        let (remote, local) = repositories(home.path());

        let config = home.path().join("nbgit.toml");
        std::fs::write(
            &config,
            format!(
                "netbox_url = \"{}\"\nnetbox_token = \"secret\"\nnetbox_threading = false\n\
                 git_remote_url = \"{remote}\"\ngit_local_path = \"{}\"\ngit_branch_main = \"main\"\n",
                server.uri(),
                local.display()
            ),
        )
        .unwrap();

        nbgit(home.path())
            .arg("--config")
            .arg(&config)
            .args(["export", "--tag", "release-42"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "release-42: 1 devices, 1 interfaces, committed and pushed",
            ));

        let snapshot = local.join("devices/sw1/interfaces/ge-0-0-1.json");
        assert!(snapshot.is_file());
        let devices = std::fs::read_to_string(local.join("devices/devices.json")).unwrap();
        assert!(devices.contains("\"platform\": \"eos\""));

        let pushed = std::process::Command::new("git")
            .args(["rev-parse", "--verify", "refs/heads/release-42"])
            .current_dir(&remote)
            .status()
            .unwrap();
        assert!(pushed.success());
    }
}
