//! Mixin merging through full resolution.

use fsroute::core::RouterError;
use fsroute::test_utils::LayeredFixture;
use serde_json::json;

use crate::common::{MODES, capture_router, template_ids};

#[tokio::test]
async fn test_mixin_fields_are_merged() {
    let fixture = LayeredFixture::new().unwrap().template_layer("app");
    fixture.template("app", "page", json!({ "mixin": ["partials/greeting"], "main": "page" })).unwrap();
    fixture.template("app", "partials/greeting", json!({ "greet": "hello", "parent": "ignored" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("page", None, None).await.unwrap();

        assert_eq!(template_ids(&invocation), vec!["page/t@app"]);
        assert_eq!(invocation.lookup("greet"), Some(("page/t@app", &json!("hello"))));
        assert_eq!(invocation.lookup("main"), Some(("page/t@app", &json!("page"))));
        let head = invocation.template.unwrap();
        assert!(head.parent_url().is_none());
    }
}

#[tokio::test]
async fn test_mixins_stay_in_their_layer() {
    let fixture = LayeredFixture::new().unwrap().template_layer("th").template_layer("app");
    fixture.template("th", "page", json!({ "mixin": ["shared"] })).unwrap();
    fixture.template("th", "shared", json!({ "tone": "theme" })).unwrap();
    fixture.template("app", "page", json!({ "mixin": ["shared"] })).unwrap();
    fixture.template("app", "shared", json!({ "tone": "app" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let invocation = router.render("page", None, None).await.unwrap();

        let head = invocation.template.unwrap();
        let chain: Vec<_> = head.chain().map(|provider| provider.get("tone").cloned()).collect();
        assert_eq!(chain, vec![Some(json!("theme")), Some(json!("app"))]);
    }
}

#[tokio::test]
async fn test_mixin_collision_names_field() {
    let fixture = LayeredFixture::new().unwrap().template_layer("app");
    fixture.template("app", "page", json!({ "mixin": ["one", "two"] })).unwrap();
    fixture.template("app", "one", json!({ "greet": "hi" })).unwrap();
    fixture.template("app", "two", json!({ "greet": "hello" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let err = router.render("page", None, None).await.unwrap_err();

        match &err {
            RouterError::MixinCollision {
                field,
                mixin,
                provider,
                ..
            } => {
                assert_eq!(field, "greet");
                assert_eq!(mixin, "two");
                assert_eq!(provider, "page/t@app");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("greet"));
    }
}

#[tokio::test]
async fn test_missing_mixin_is_reported() {
    let fixture = LayeredFixture::new().unwrap().template_layer("app");
    fixture.template("app", "page", json!({ "mixin": ["nowhere"] })).unwrap();
    // an ancestor artifact does not satisfy a mixin
    fixture.template("app", "", json!({ "main": "root" })).unwrap();

    for hot_update in MODES {
        let router = capture_router(fixture.options(), hot_update).await;
        let err = router.render("page", None, None).await.unwrap_err();

        assert!(
            matches!(&err, RouterError::MixinNotFound { mixin, provider, .. } if mixin == "nowhere" && provider == "page/t@app"),
            "unexpected error: {err}"
        );
        assert!(err.to_string().starts_with("Mixin 'nowhere' for provider 'page/t@app' in directory"));
    }
}

#[tokio::test]
async fn test_mixin_cycle_is_detected() {
    let fixture = LayeredFixture::new().unwrap().template_layer("app");
    fixture.template("app", "page", json!({ "mixin": ["a"] })).unwrap();
    fixture.template("app", "a", json!({ "mixin": ["b"], "fromA": 1 })).unwrap();
    fixture.template("app", "b", json!({ "mixin": ["a"], "fromB": 2 })).unwrap();

    let router = capture_router(fixture.options(), true).await;
    let err = router.render("page", None, None).await.unwrap_err();
    match err {
        RouterError::MixinCycle {
            provider,
            chain,
        } => {
            assert_eq!(provider, "page/t@app");
            assert_eq!(chain, vec!["a", "b", "a"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}
