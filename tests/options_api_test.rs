//! Integration tests for option normalization.

use std::collections::BTreeMap;
use templet::manifest::{Dimension, TemplateManifest};
use templet::options::OptionsNormalizer;
use templet::TempletError;

fn dimensions() -> BTreeMap<String, Dimension> {
    BTreeMap::from([
        (
            "deployment".to_string(),
            Dimension::single("deployment", &["aws", "gcp"]).with_defaults(&["aws"]),
        ),
        (
            "features".to_string(),
            Dimension::multi("features", &["lint", "test", "docker"]),
        ),
    ])
}

#[test]
fn no_tokens_yield_defaults() {
    let dims = dimensions();
    let normalized = OptionsNormalizer::new(&dims)
        .normalize::<&str>(&[])
        .unwrap();
    assert_eq!(normalized.single("deployment"), Some("aws"));
    assert!(normalized.values("features").is_empty());
}

#[test]
fn later_single_select_value_wins() {
    let dims = dimensions();
    let normalized = OptionsNormalizer::new(&dims)
        .normalize(&["deployment=aws", "deployment=gcp"])
        .unwrap();
    assert_eq!(normalized.values("deployment"), ["gcp".to_string()]);
}

#[test]
fn multi_select_accumulates() {
    let dims = dimensions();
    let normalized = OptionsNormalizer::new(&dims)
        .normalize(&["features=lint+test", "features=docker"])
        .unwrap();
    assert!(normalized.is_selected("features", "lint"));
    assert!(normalized.is_selected("features", "docker"));
    assert_eq!(normalized.values("features").len(), 3);
}

#[test]
fn plus_join_on_single_select_names_dimension() {
    let dims = dimensions();
    let err = OptionsNormalizer::new(&dims)
        .normalize(&["deployment=aws+gcp"])
        .unwrap_err();
    let TempletError::Validation { issues } = err else {
        panic!("expected validation error");
    };
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("deployment"));
}

#[test]
fn every_issue_is_reported_together() {
    let dims = dimensions();
    let err = OptionsNormalizer::new(&dims)
        .normalize(&["deployment=aws+gcp", "features="])
        .unwrap_err();
    let TempletError::Validation { issues } = err else {
        panic!("expected validation error");
    };
    assert_eq!(issues.len(), 2);
}

#[test]
fn flat_and_rich_manifests_normalize_alike() {
    let flat = TemplateManifest::from_yaml_str("dimensions:\n  deployment: [aws, gcp]\n").unwrap();
    let rich = TemplateManifest::from_yaml_str(
        "dimensions:\n  deployment:\n    arity: single\n    values: [aws, gcp]\n",
    )
    .unwrap();

    for manifest in [&flat, &rich] {
        let normalized = OptionsNormalizer::for_manifest(manifest)
            .normalize(&["deployment=gcp"])
            .unwrap();
        assert_eq!(normalized.single("deployment"), Some("gcp"));
    }
}
