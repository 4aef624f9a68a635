//! CLI integration tests for the jsonapi-document binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const BLOG: &str = "tests/fixtures/blog.json";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jsonapi-document"))
}

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn build_json(args: &[&str]) -> Value {
    let output = cmd().arg("build").arg(BLOG).args(args).output().unwrap();
    assert!(output.status.success(), "build failed: {:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

mod build_command {
    use super::*;

    #[test]
    fn basic_build() {
        cmd()
            .args(["build", BLOG])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""author":{"data":{"type":"people","id":"10"}}"#,
            ))
            .stdout(predicate::str::contains(r#""jsonapi":{"version":"1.1"}"#))
            .stdout(predicate::str::contains("included").not());
    }

    #[test]
    fn build_with_include_chain() {
        let document = build_json(&["--include", "author.blogs.reviewer.favoriteFood"]);
        let included: Vec<String> = document["included"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| format!("{}/{}", r["type"].as_str().unwrap(), r["id"].as_str().unwrap()))
            .collect();
        assert_eq!(
            included,
            [
                "people/10",
                "blogs/100",
                "blogs/101",
                "people/11",
                "foods/1000"
            ]
        );
    }

    #[test]
    fn build_with_pretty() {
        cmd()
            .args(["build", BLOG, "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn build_with_output_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("document.json");

        cmd()
            .args(["build", BLOG, "-i", "author", "--output"])
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["included"][0]["id"], "10");
    }

    #[test]
    fn build_with_sparse_fields() {
        let document = build_json(&["--fields", "articles=title", "--fields", "people="]);
        assert_eq!(
            document["data"]["attributes"],
            serde_json::json!({ "title": "JSON:API paints my bikeshed!" })
        );
        assert!(document["data"].get("relationships").is_none());
    }

    #[test]
    fn build_with_base_url_links() {
        let document = build_json(&["--base-url", "https://example.com/api/"]);
        assert_eq!(
            document["data"]["links"]["self"],
            "https://example.com/api/articles/1"
        );
        assert_eq!(
            document["data"]["relationships"]["author"]["links"]["related"],
            "https://example.com/api/articles/1/author"
        );
    }

    #[test]
    fn build_with_null_policy_renders_unloaded() {
        let document = build_json(&["--unloaded", "null"]);
        assert_eq!(
            document["data"]["relationships"]["reviewer"],
            serde_json::json!({ "data": null })
        );

        let document = build_json(&[]);
        assert!(document["data"]["relationships"].get("reviewer").is_none());
    }

    #[test]
    fn build_with_resource_meta_after_write() {
        let document = build_json(&[
            "--op",
            "CREATE",
            "--resource-meta",
            "notice=Resource created",
            "-i",
            "author",
        ]);
        assert_eq!(document["data"]["meta"]["notice"], "Resource created");
        assert_eq!(document["included"][0]["meta"]["notice"], "Resource created");
    }

    #[test]
    fn resource_meta_is_left_out_on_read() {
        for op in ["read", "READ"] {
            let document = build_json(&[
                "--op",
                op,
                "--resource-meta",
                "notice=Resource created",
                "-i",
                "author",
            ]);
            assert!(document["data"].get("meta").is_none());
            assert!(document["included"][0].get("meta").is_none());
        }

        // read is the default operation
        let document = build_json(&["--resource-meta", "notice=Resource created"]);
        assert!(document["data"].get("meta").is_none());
    }

    #[test]
    fn resource_meta_is_attached_on_update() {
        let document = build_json(&["--op", "update", "--resource-meta", "copyright=Example Corp."]);
        assert_eq!(document["data"]["meta"]["copyright"], "Example Corp.");
    }

    #[test]
    fn build_with_check() {
        cmd()
            .args(["build", BLOG, "--include", "author.blogs", "--check"])
            .assert()
            .success();
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn validate_built_document() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("document.json");
        cmd()
            .args(["build", BLOG, "-i", "author.blogs.reviewer", "--output"])
            .arg(&output)
            .assert()
            .success();

        cmd()
            .arg("validate")
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn validate_duplicate_included() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(
            &dir,
            "document.json",
            r#"{
                "data": { "type": "articles", "id": "1" },
                "included": [
                    { "type": "people", "id": "9" },
                    { "type": "people", "id": "9" }
                ]
            }"#,
        );

        cmd()
            .args(["validate", document.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("/included/1"));
    }

    #[test]
    fn validate_missing_data() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "document.json", r#"{ "meta": {} }"#);

        cmd()
            .args(["validate", document.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"));
    }

    #[test]
    fn validate_json_output_valid() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "document.json", r#"{ "data": null }"#);

        cmd()
            .args(["validate", document.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""valid":true"#));
    }

    #[test]
    fn validate_json_output_invalid() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(
            &dir,
            "document.json",
            r#"{
                "data": [{ "type": "people", "id": "9" }],
                "included": [{ "type": "people", "id": "9" }]
            }"#,
        );

        let output = cmd()
            .args(["validate", document.to_str().unwrap(), "--json"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let report: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["errors"][0]["path"], "/included/0");
    }

    #[test]
    fn validate_json_output_file_error() {
        cmd()
            .args(["validate", "/nonexistent/document.json", "--json"])
            .assert()
            .code(3)
            .stdout(predicate::str::contains(r#""valid":false"#));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn dataset_not_found() {
        cmd()
            .args(["build", "/nonexistent/dataset.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn invalid_dataset_json() {
        let dir = TempDir::new().unwrap();
        let dataset = write_temp_file(&dir, "bad.json", r#"{ not valid json"#);

        cmd()
            .args(["build", dataset.to_str().unwrap()])
            .assert()
            .code(2);
    }

    #[test]
    fn dangling_reference_in_dataset() {
        let dir = TempDir::new().unwrap();
        let dataset = write_temp_file(
            &dir,
            "dataset.json",
            r#"{
                "types": [{ "name": "articles", "relationships": [
                    { "name": "author", "type": "people", "cardinality": "one" }
                ]}, { "name": "people" }],
                "resources": [{ "type": "articles", "id": "1",
                    "relationships": { "author": { "type": "people", "id": "404" } } }],
                "primary": { "type": "articles", "id": "1" }
            }"#,
        );

        cmd()
            .args(["build", dataset.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("404"));
    }

    #[test]
    fn unknown_include_relationship() {
        cmd()
            .args(["build", BLOG, "--include", "author.editor"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("editor"));
    }

    #[test]
    fn empty_include_segment() {
        cmd()
            .args(["build", BLOG, "--include", "author..blogs"])
            .assert()
            .code(2);
    }

    #[test]
    fn unknown_operation() {
        cmd()
            .args(["build", BLOG, "--op", "delete"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown operation"));
    }

    #[test]
    fn unknown_unloaded_policy() {
        cmd()
            .args(["build", BLOG, "--unloaded", "skip"])
            .assert()
            .code(2);
    }

    #[test]
    fn malformed_fields_entry() {
        cmd()
            .args(["build", BLOG, "--fields", "title,body"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains(r#"invalid fieldset "title,body""#));
    }

    #[test]
    fn malformed_resource_meta() {
        cmd()
            .args(["build", BLOG, "--resource-meta", "notice"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("KEY=VALUE"));
    }

    #[test]
    fn invalid_document_json() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "document.json", "[1, 2");

        cmd()
            .args(["validate", document.to_str().unwrap()])
            .assert()
            .code(2);
    }
}

mod required_args {
    use super::*;

    #[test]
    fn missing_dataset_path() {
        cmd()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("DATASET"));
    }

    #[test]
    fn missing_document_for_validate() {
        cmd()
            .arg("validate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("DOCUMENT"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Build and validate JSON:API compound documents",
            ));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("jsonapi-document"));
    }

    #[test]
    fn build_help() {
        cmd()
            .args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--include"))
            .stdout(predicate::str::contains("--fields"))
            .stdout(predicate::str::contains("--unloaded"));
    }
}

/// Dataset loading over HTTP, served by a local mock server.
#[cfg(feature = "remote")]
mod remote {
    use super::*;

    #[test]
    fn build_from_url() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/blog.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(fs::read_to_string(BLOG).unwrap())
            .create();

        cmd()
            .args(["build", &format!("{}/blog.json", server.url()), "-i", "author"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""included":[{"type":"people","id":"10""#));
    }

    #[test]
    fn build_url_404() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing.json").with_status(404).create();

        cmd()
            .args(["build", &format!("{}/missing.json", server.url())])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("failed to fetch"));
    }
}
