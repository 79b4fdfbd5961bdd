#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use gridmind_object_store::MemoryObjectStore;

use super::*;

fn registry() -> ModelRegistry {
    ModelRegistry::new(Arc::new(MemoryObjectStore::new("ml-models")))
}

fn reference(version: &str) -> ModelVersionRef {
    ModelVersionRef::new("tenant-a".into(), "forecast_lgb".into(), version.into())
}

fn register(registry: &ModelRegistry, version: &str) -> ModelMetadata {
    let mut metrics = BTreeMap::new();
    metrics.insert("mae".to_string(), 12.5);
    registry
        .register(RegisterRequest {
            reference: reference(version),
            artifact: vec![1, 2, 3, 4],
            model_type: "gbt_regressor".to_string(),
            metadata: BTreeMap::new(),
            metrics: Some(metrics),
        })
        .expect("register")
}

#[test]
fn register_writes_all_three_sidecars() {
    let registry = registry();
    let metadata = register(&registry, "v1");
    assert_eq!(metadata.stage, ModelStage::Staging);
    assert_eq!(metadata.model_size_bytes, 4);
    let record = registry.get(&reference("v1")).expect("get").expect("present");
    assert_eq!(record.metadata.version, "v1");
    assert_eq!(record.metrics.get("mae"), Some(&12.5));
    assert_eq!(registry.get_artifact(&reference("v1")).expect("artifact"), vec![1, 2, 3, 4]);
}

#[test]
fn register_rejects_duplicate_version() {
    let registry = registry();
    register(&registry, "v1");
    let result = registry.register(RegisterRequest {
        reference: reference("v1"),
        artifact: vec![9],
        model_type: "gbt_regressor".to_string(),
        metadata: BTreeMap::new(),
        metrics: None,
    });
    assert!(matches!(result, Err(PlatformError::Conflict(_))));
}

#[test]
fn missing_metrics_sidecar_degrades_to_empty() {
    let registry = registry();
    registry
        .register(RegisterRequest {
            reference: reference("v1"),
            artifact: vec![1],
            model_type: "gbt_regressor".to_string(),
            metadata: BTreeMap::new(),
            metrics: None,
        })
        .expect("register");
    assert!(registry.get_metrics(&reference("v1")).expect("metrics").is_empty());
}

#[test]
fn list_versions_is_unique_and_newest_first() {
    let registry = registry();
    register(&registry, "v1");
    register(&registry, "v2");
    let versions = registry.list_versions("tenant-a", "forecast_lgb").expect("list");
    assert_eq!(versions.len(), 2);
    let mut names: Vec<&str> = versions.iter().map(|m| m.version.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 2);
}

#[test]
fn promote_to_production_updates_stage_in_place() {
    // Scenario: register v1 in staging, promote, and list exactly once.
    let registry = registry();
    register(&registry, "v1");
    let promoted = registry
        .promote(&reference("v1"), ModelStage::Production, Some("weekly cut".to_string()))
        .expect("promote");
    assert_eq!(promoted.stage, ModelStage::Production);
    let record = registry.get(&reference("v1")).expect("get").expect("present");
    assert_eq!(record.metadata.stage, ModelStage::Production);
    assert_eq!(record.metadata.promotion_reason.as_deref(), Some("weekly cut"));
    let versions = registry.list_versions("tenant-a", "forecast_lgb").expect("list");
    assert_eq!(versions.iter().filter(|m| m.version == "v1").count(), 1);
}

#[test]
fn promote_demotes_previous_production() {
    let registry = registry();
    register(&registry, "v1");
    register(&registry, "v2");
    registry.promote(&reference("v1"), ModelStage::Production, None).expect("promote v1");
    registry.promote(&reference("v2"), ModelStage::Production, None).expect("promote v2");
    let versions = registry.list_versions("tenant-a", "forecast_lgb").expect("list");
    let stage_of = |version: &str| {
        versions
            .iter()
            .find(|m| m.version == version)
            .map(|m| m.stage)
            .expect("version present")
    };
    assert_eq!(stage_of("v1"), ModelStage::Archived);
    assert_eq!(stage_of("v2"), ModelStage::Production);
}

#[test]
fn promote_unknown_version_is_not_found() {
    let registry = registry();
    assert!(matches!(
        registry.promote(&reference("ghost"), ModelStage::Production, None),
        Err(PlatformError::NotFound(_))
    ));
}

#[test]
fn delete_production_requires_force() {
    // Scenario: unforced delete fails with a precondition, forced delete
    // removes every object.
    let registry = registry();
    register(&registry, "v1");
    registry.promote(&reference("v1"), ModelStage::Production, None).expect("promote");
    assert!(matches!(
        registry.delete(&reference("v1"), false),
        Err(PlatformError::Precondition(_))
    ));
    let deleted = registry.delete(&reference("v1"), true).expect("delete");
    assert_eq!(deleted.len(), 3);
    assert!(registry.get(&reference("v1")).expect("get").is_none());
}

#[test]
fn copy_derives_target_metadata_from_source() {
    let registry = registry();
    register(&registry, "v1");
    let copied = registry
        .copy(&reference("v1"), &VersionId::from("v1-prod"))
        .expect("copy");
    assert_eq!(copied.version, "v1-prod");
    assert_eq!(copied.copied_from.as_deref(), Some("v1"));
    assert!(copied.copied_at.is_some());
    // The source stays intact; the target carries all sidecars.
    let source = registry.get(&reference("v1")).expect("get").expect("present");
    assert_eq!(source.metadata.stage, ModelStage::Staging);
    let target = registry.get(&reference("v1-prod")).expect("get").expect("present");
    assert_eq!(target.metrics.get("mae"), Some(&12.5));
    assert_eq!(
        registry.get_artifact(&reference("v1-prod")).expect("artifact"),
        registry.get_artifact(&reference("v1")).expect("artifact")
    );
}

#[test]
fn copy_rejects_existing_target() {
    let registry = registry();
    register(&registry, "v1");
    register(&registry, "v2");
    assert!(matches!(
        registry.copy(&reference("v1"), &VersionId::from("v2")),
        Err(PlatformError::Conflict(_))
    ));
}
