//! Routers built over custom artifact loaders.

use futures::FutureExt;
use futures::future::BoxFuture;
use fsroute::core::{Artifact, ArtifactForm, Result, RouterError};
use fsroute::index::ArtifactLoader;
use fsroute::router::Router;
use fsroute::test_utils::LayeredFixture;
use serde_json::json;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::Capture;

/// Refuses every artifact file.
struct DeniedLoader;

impl ArtifactLoader for DeniedLoader {
    fn load<'a>(&'a self, path: &'a Path, _form: ArtifactForm) -> BoxFuture<'a, Result<Artifact>> {
        async move {
            Err(RouterError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            )))
        }
        .boxed()
    }
}

/// Ignores file contents and names each artifact after its directory.
#[derive(Default)]
struct SyntheticLoader {
    loads: AtomicUsize,
}

impl ArtifactLoader for SyntheticLoader {
    fn load<'a>(&'a self, path: &'a Path, form: ArtifactForm) -> BoxFuture<'a, Result<Artifact>> {
        async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let dir = path.parent().and_then(Path::file_name).map(|name| name.to_string_lossy().into_owned());
            let mut object = serde_json::Map::new();
            object.insert("main".to_string(), json!(format!("synthetic {}", dir.unwrap_or_default())));
            object.insert("form".to_string(), json!(format!("{form:?}")));
            Artifact::from_object(object, path)
        }
        .boxed()
    }
}

fn fixture() -> LayeredFixture {
    let fixture = LayeredFixture::new().unwrap().template_layer("app").context_layer("ctx");
    fixture.template("app", "", json!({ "main": "root on disk" })).unwrap();
    fixture.template("app", "x", json!({ "main": "x on disk" })).unwrap();
    fixture.context("ctx", "x", json!({ "title": "on disk" })).unwrap();
    fixture
}

fn assert_permission_denied(err: &RouterError) {
    match err {
        RouterError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_loader_errors_fail_on_demand_render() {
    let fixture = fixture();
    let router =
        Router::with_loader(fixture.options().with_hot_update(true), Capture, Arc::new(DeniedLoader)).unwrap();
    router.init().await.unwrap();

    let err = router.render("x", None, None).await.unwrap_err();
    assert_permission_denied(&err);
}

#[tokio::test]
async fn test_loader_errors_fail_precomputed_init() {
    let fixture = fixture();
    let router =
        Router::with_loader(fixture.options().with_hot_update(false), Capture, Arc::new(DeniedLoader)).unwrap();

    let err = router.init().await.unwrap_err();
    assert_permission_denied(&err);

    // nothing was indexed, so renders keep failing
    let err = router.render("x", None, None).await.unwrap_err();
    assert!(matches!(err, RouterError::NotInitialized { .. }));
}

#[tokio::test]
async fn test_resolution_serves_loaded_artifacts() {
    let fixture = fixture();

    for hot_update in [false, true] {
        let loader = Arc::new(SyntheticLoader::default());
        let shared: Arc<dyn ArtifactLoader> = Arc::clone(&loader) as Arc<dyn ArtifactLoader>;
        let router = Router::with_loader(fixture.options().with_hot_update(hot_update), Capture, shared).unwrap();
        router.init().await.unwrap();

        let invocation = router.render("x/y", None, None).await.unwrap();
        assert_eq!(invocation.lookup("main"), Some(("x/t@app", &json!("synthetic x"))));
        assert_eq!(invocation.lookup("form"), Some(("x/t@app", &json!("Plain"))));
        assert!(invocation.lookup("title").is_none());

        let invocation = router.render("other", None, None).await.unwrap();
        assert_eq!(invocation.lookup("main").unwrap().1, &json!("synthetic app"));

        let after_renders = loader.loads.load(Ordering::SeqCst);
        router.render("x", None, None).await.unwrap();
        if hot_update {
            assert!(loader.loads.load(Ordering::SeqCst) > after_renders);
        } else {
            // every file was loaded once by init
            assert_eq!(after_renders, 3);
            assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
        }
    }
}
