//! Cross-layer lookups from a rendered invocation.

use fsroute::core::RouterError;
use fsroute::test_utils::LayeredFixture;
use serde_json::json;
use std::sync::Arc;

use crate::common::{MODES, capture_router};

fn fixture() -> LayeredFixture {
    let fixture = LayeredFixture::new()
        .unwrap()
        .template_layer("ov")
        .template_layer("th")
        .template_layer("app")
        .context_layer("c-th")
        .context_layer("c-app");
    // tied providers must agree on their parent
    fixture.template("th", "x", json!({ "main": "theme", "parent": "base" })).unwrap();
    fixture.template("app", "x", json!({ "main": "app", "parent": "base" })).unwrap();
    fixture.template("app", "base", json!({ "frame": "base" })).unwrap();
    fixture.context("c-th", "x", json!({ "title": "theme" })).unwrap();
    fixture.context("c-app", "x", json!({ "title": "app" })).unwrap();
    fixture
}

#[tokio::test]
async fn test_next_layer_provider_is_found() {
    let fixture = fixture();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();
        let head = invocation.template.as_ref().unwrap();
        assert_eq!(head.chain_ids(), vec!["x/t@th", "x/t@app", "base/t@app"]);

        // served from the resolved chain, not rebuilt
        let next = invocation.parent_layer.find("x/t@th").await.unwrap();
        assert_eq!(next.id(), "x/t@app");
        assert!(Arc::ptr_eq(&next, head.parent().unwrap()));
        assert_eq!(next.chain_ids(), vec!["x/t@app", "base/t@app"]);

        let context = invocation.parent_layer.find("x/c@c-th").await.unwrap();
        assert_eq!(context.id(), "x/c@c-app");
        assert_eq!(context.get("title"), Some(&json!("app")));
    }
}

#[tokio::test]
async fn test_search_without_layer_starts_at_first_layer() {
    let fixture = fixture();
    let router = capture_router(fixture.options(), false).await;
    let invocation = router.render("x", None, None).await.unwrap();

    let found = invocation.parent_layer.find("x/t").await.unwrap();
    assert_eq!(found.id(), "x/t@th");
}

#[tokio::test]
async fn test_last_layer_has_no_next_provider() {
    let fixture = fixture();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();

        let err = invocation.parent_layer.find("x/t@app").await.unwrap_err();
        assert!(err.is_final_not_found());
        assert_eq!(err.to_string(), "No provider found for 'x/t@app'");
    }
}

#[tokio::test]
async fn test_search_is_exact_not_prefix() {
    let fixture = fixture();
    fixture.template("app", "", json!({ "main": "root" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();

        // only the root artifact exists at a shorter path in later layers
        let err = invocation.parent_layer.find("x/deeper/t@ov").await.unwrap_err();
        assert!(err.is_final_not_found());
    }
}

#[tokio::test]
async fn test_search_outside_resolved_chain() {
    let fixture = fixture();
    fixture.template("app", "other", json!({ "main": "other" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();

        let found = invocation.parent_layer.find("other/t@ov").await.unwrap();
        assert_eq!(found.id(), "other/t@app");
    }
}

#[tokio::test]
async fn test_unknown_layer_is_an_error() {
    let fixture = fixture();
    let router = capture_router(fixture.options(), false).await;
    let invocation = router.render("x", None, None).await.unwrap();

    let err = invocation.parent_layer.find("x/t@nope").await.unwrap_err();
    assert!(matches!(err, RouterError::UnknownLayer { ref layer, .. } if layer == "nope"));
}

#[tokio::test]
async fn test_precomputed_search_completes_synchronously() {
    let fixture = fixture();
    let router = capture_router(fixture.options(), false).await;
    let invocation = router.render("x", None, None).await.unwrap();

    let found = invocation.parent_layer.find_ready("x/t@th").unwrap().unwrap();
    assert_eq!(found.id(), "x/t@app");
}
