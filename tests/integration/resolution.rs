//! Provider chain resolution across layers.

use fsroute::core::{ArtifactKind, RouterError};
use fsroute::test_utils::LayeredFixture;
use serde_json::json;

use crate::common::{MODES, capture_router, template_ids};

fn three_layers() -> LayeredFixture {
    LayeredFixture::new().unwrap().template_layer("ov").template_layer("th").template_layer("app")
}

#[tokio::test]
async fn test_only_layer_with_match_is_used() {
    let fixture = three_layers();
    fixture.template("app", "x", json!({ "main": "app" })).unwrap();
    fixture.template("ov", "y", json!({ "main": "elsewhere" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["x/t@app"]);
    }
}

#[tokio::test]
async fn test_same_depth_matches_chain_in_layer_order() {
    let fixture = three_layers();
    fixture.template("th", "x", json!({ "title": "theme" })).unwrap();
    fixture.template("app", "x", json!({ "body": "app" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["x/t@th", "x/t@app"]);

        let head = invocation.template.unwrap();
        assert_eq!(head.lookup("title").unwrap().0.id(), "x/t@th");
        assert_eq!(head.lookup("body").unwrap().0.id(), "x/t@app");
    }
}

#[tokio::test]
async fn test_deeper_match_beats_layer_priority() {
    let fixture = three_layers();
    fixture.template("ov", "", json!({ "main": "override root" })).unwrap();
    fixture.template("th", "blog", json!({ "main": "theme blog" })).unwrap();
    fixture.template("app", "blog/post", json!({ "main": "app post" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;

        let invocation = router.render("blog/post/comments", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["blog/post/t@app"]);

        let invocation = router.render("blog/other", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["blog/t@th"]);

        let invocation = router.render("about", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["/t@ov"]);
    }
}

#[tokio::test]
async fn test_unmatched_url_falls_back_to_root() {
    let fixture = three_layers();
    fixture.template("app", "", json!({ "main": "root" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("no/such/page", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["/t@app"]);
    }
}

#[tokio::test]
async fn test_query_and_slashes_are_ignored_for_matching() {
    let fixture = three_layers();
    fixture.template("app", "functionality/url-property", json!({ "main": "u" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation =
            router.render("/functionality//url-property/?param1=alpha&param2=42", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["functionality/url-property/t@app"]);
        assert_eq!(
            invocation.call_context.fields["url"],
            json!("/functionality//url-property/?param1=alpha&param2=42")
        );
    }
}

#[tokio::test]
async fn test_parent_chain_follows_parent_urls() {
    let fixture = three_layers();
    fixture.template("app", "page", json!({ "parent": "layout" })).unwrap();
    fixture.template("th", "layout", json!({ "parent": "base" })).unwrap();
    fixture.template("app", "base", json!({ "main": "base" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("page/1", None, None).await.unwrap();
        assert_eq!(template_ids(&invocation), vec!["page/t@app", "layout/t@th", "base/t@app"]);
    }
}

#[tokio::test]
async fn test_empty_parent_ends_the_chain() {
    let fixture = three_layers();
    fixture.template("app", "x", json!({ "parent": "", "main": "x" })).unwrap();

    let router = capture_router(fixture.options(), false).await;
    let invocation = router.render("x", None, None).await.unwrap();
    assert_eq!(template_ids(&invocation), vec!["x/t@app"]);
}

#[tokio::test]
async fn test_parent_cycle_reports_visit_order() {
    let fixture = three_layers();
    fixture.template("app", "a", json!({ "parent": "b" })).unwrap();
    fixture.template("app", "b", json!({ "parent": "a" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let err = router.render("a", None, None).await.unwrap_err();
        match err {
            RouterError::CircularReference {
                url,
                visited,
            } => {
                assert_eq!(url, "a");
                assert_eq!(visited, vec![("a".to_string(), 0), ("b".to_string(), 1)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_tied_providers_must_agree_on_parent() {
    let fixture = three_layers();
    fixture.template("th", "x", json!({ "parent": "one" })).unwrap();
    fixture.template("app", "x", json!({})).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let err = router.render("x", None, None).await.unwrap_err();
        match err {
            RouterError::ProviderMismatch {
                providers,
                ..
            } => assert_eq!(providers, vec!["x/t@th", "x/t@app"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_module_artifacts_resolve_like_plain_ones() {
    let fixture = three_layers().context_layer("ctx");
    fixture.module("app", ArtifactKind::Template, "x", json!({ "main": "module" })).unwrap();
    fixture.module("ctx", ArtifactKind::Context, "x", json!({ "title": "ctx" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("x", None, None).await.unwrap();
        assert_eq!(invocation.lookup("main").unwrap().1, &json!("module"));
        assert_eq!(invocation.lookup("title"), Some(("x/c@ctx", &json!("ctx"))));
    }
}

#[tokio::test]
async fn test_template_and_context_cycles_are_independent() {
    let fixture = LayeredFixture::new().unwrap().template_layer("app").context_layer("app");
    // the same URLs appear in both chains without being a cycle
    fixture.template("app", "a", json!({ "parent": "b" })).unwrap();
    fixture.template("app", "b", json!({})).unwrap();
    fixture.context("app", "a", json!({ "parent": "b" })).unwrap();
    fixture.context("app", "b", json!({})).unwrap();

    let router = capture_router(fixture.options(), false).await;
    let invocation = router.render("a", None, None).await.unwrap();
    assert_eq!(template_ids(&invocation), vec!["a/t@app", "b/t@app"]);
    assert_eq!(invocation.call_context.parent.unwrap().chain_ids(), vec!["a/c@app", "b/c@app"]);
}

#[tokio::test]
async fn test_precomputed_index_ignores_new_files() {
    let fixture = three_layers();
    fixture.template("app", "", json!({ "main": "root" })).unwrap();

    let precomputed = capture_router(fixture.options(), false).await;
    let on_demand = capture_router(fixture.options(), true).await;
    fixture.template("app", "late", json!({ "main": "late" })).unwrap();

    let invocation = precomputed.render("late", None, None).await.unwrap();
    assert_eq!(template_ids(&invocation), vec!["/t@app"]);
    let invocation = on_demand.render("late", None, None).await.unwrap();
    assert_eq!(template_ids(&invocation), vec!["late/t@app"]);
}

#[tokio::test]
async fn test_invalid_artifact_names_the_file() {
    let fixture = three_layers();
    fixture.template("app", "x", json!({ "mixin": "not-a-list" })).unwrap();

    let router = fsroute::router::Router::new(fixture.options().with_hot_update(true), crate::common::Capture).unwrap();
    let err = router.render("x", None, None).await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidArtifact { ref path, .. } if path.ends_with("template.json")));
}
