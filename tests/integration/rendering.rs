//! End-to-end rendering with the Tera evaluator.

use fsroute::router::{CallContext, Router, RouterOptions};
use fsroute::templating::TeraEvaluator;
use fsroute::test_utils::LayeredFixture;
use serde_json::json;

fn site() -> LayeredFixture {
    let fixture = LayeredFixture::new()
        .unwrap()
        .template_layer("t-theme")
        .template_layer("t-app")
        .context_layer("c-site")
        .context_layer("c-app");
    fixture
        .template("t-app", "", json!({ "main": "<html>{{ field(name=\"content\") }}</html>", "content": "home" }))
        .unwrap();
    fixture
        .template("t-app", "docs", json!({ "content": "<h1>{{ title }}</h1><p>{{ section }}</p>", "parent": "" }))
        .unwrap();
    fixture
        .template("t-theme", "docs", json!({ "main": "<html>{{ field(name=\"content\") }}</html>", "footer": "{{ site }}" }))
        .unwrap();
    fixture.context("c-site", "", json!({ "site": "Example" })).unwrap();
    fixture.context("c-app", "docs", json!({ "title": "Docs", "parent": "" })).unwrap();
    fixture
}

async fn tera_router(options: RouterOptions) -> Router<TeraEvaluator> {
    fsroute::test_utils::init_test_logging(None);
    let router = Router::new(options, TeraEvaluator::new()).unwrap();
    router.init().await.unwrap();
    router
}

#[tokio::test]
async fn test_render_merges_chains_and_call_context() {
    let fixture = site();
    let router = tera_router(fixture.options()).await;

    let context = CallContext::new().with_field("section", "intro");
    let html = router.render("docs/start", None, Some(context)).await.unwrap();
    assert_eq!(html, "<html><h1>Docs</h1><p>intro</p></html>");
}

#[tokio::test]
async fn test_context_chain_uses_deepest_match_only() {
    let fixture = site();
    fixture.template("t-app", "about", json!({ "main": "{{ site }}" })).unwrap();
    let router = tera_router(fixture.options()).await;

    // only c-site matches "about"
    assert_eq!(router.render("about", None, None).await.unwrap(), "Example");
    // c-app matches "docs" deeper than c-site, and declares no parent
    assert!(router.render("docs", Some("footer"), None).await.is_err());
    assert_eq!(router.render("elsewhere", None, None).await.unwrap(), "<html>home</html>");
}

#[tokio::test]
async fn test_configured_entrypoint_and_factory() {
    let fixture = site();
    let options = fixture
        .options()
        .with_entrypoint("content")
        .with_call_context_factory(|url: &str, entrypoint: &str| {
            CallContext::new().with_field("section", format!("{url}#{entrypoint}"))
        });
    let router = tera_router(options).await;

    let html = router.render("docs", None, None).await.unwrap();
    assert_eq!(html, "<h1>Docs</h1><p>docs#content</p>");

    // an explicit entrypoint overrides the configured one
    let html = router.render("docs", Some("main"), None).await.unwrap();
    assert_eq!(html, "<html><h1>Docs</h1><p>docs#main</p></html>");
}

#[tokio::test]
async fn test_resource_path_property_is_configurable() {
    let fixture = site();
    fixture.template("t-app", "where", json!({ "main": "{{ path }}" })).unwrap();
    let mut options = fixture.options();
    options.resource_path_property = "path".to_string();
    let router = tera_router(options).await;

    assert_eq!(router.render("where?x=1", None, None).await.unwrap(), "where?x=1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_renamed_parent_layer_function() {
    let fixture = site();
    fixture
        .template("t-theme", "wrap", json!({ "main": "[{{ superLayer(id=\"wrap/t@t-theme\") }}]" }))
        .unwrap();
    fixture.template("t-app", "wrap", json!({ "main": "inner" })).unwrap();

    for hot_update in [false, true] {
        let mut options = fixture.options().with_hot_update(hot_update);
        options.parent_layer_property = "superLayer".to_string();
        let router = tera_router(options).await;

        assert_eq!(router.render("wrap", None, None).await.unwrap(), "[inner]");
    }
}

#[tokio::test]
async fn test_invalid_options_are_rejected() {
    let fixture = LayeredFixture::new().unwrap().template_layer("same").template_layer("same");
    let err = Router::new(fixture.options(), TeraEvaluator::new()).unwrap_err();
    assert!(err.to_string().contains("duplicate template layer id 'same'"));
}
