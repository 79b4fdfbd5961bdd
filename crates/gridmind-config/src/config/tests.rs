#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::io::Write;

use super::*;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tempfile");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

#[test]
fn empty_document_yields_defaults() {
    let file = write_config("");
    let config = GridmindConfig::load_file(file.path()).expect("load");
    assert_eq!(config.orchestrator.max_concurrent_jobs, 3);
    assert_eq!(config.cache.ttl_seconds, 300);
    assert_eq!(config.object_store.bucket, "ml-models");
    assert_eq!(config.orchestrator.max_page_size, 100);
}

#[test]
fn sections_override_defaults() {
    let file = write_config(
        r#"
[orchestrator]
max_concurrent_jobs = 1

[object_store]
provider = "s3"
bucket = "models-prod"
endpoint = "http://minio:9000"
force_path_style = true

[cache]
backend = "redis"
url = "redis://redis:6379"
"#,
    );
    let config = GridmindConfig::load_file(file.path()).expect("load");
    assert_eq!(config.orchestrator.max_concurrent_jobs, 1);
    assert_eq!(config.object_store.provider, ObjectStoreProvider::S3);
    assert_eq!(config.cache.backend, CacheBackend::Redis);
}

#[test]
fn redis_backend_without_url_fails_closed() {
    let file = write_config("[cache]\nbackend = \"redis\"\n");
    assert!(GridmindConfig::load_file(file.path()).is_err());
}

#[test]
fn zero_concurrency_fails_closed() {
    let file = write_config("[orchestrator]\nmax_concurrent_jobs = 0\n");
    assert!(GridmindConfig::load_file(file.path()).is_err());
}

#[test]
fn unknown_keys_fail_closed() {
    let file = write_config("[orchestrator]\nmax_threads = 8\n");
    assert!(GridmindConfig::load_file(file.path()).is_err());
}

#[test]
fn absolute_prefix_fails_closed() {
    let file = write_config("[object_store]\nprefix = \"/models\"\n");
    assert!(GridmindConfig::load_file(file.path()).is_err());
}

#[test]
fn explicit_missing_file_errors() {
    assert!(GridmindConfig::load(Some(Path::new("/nonexistent/gridmind.toml"))).is_err());
}
