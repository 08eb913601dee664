//! Shared helpers for integration tests.

use futures::FutureExt;
use futures::future::BoxFuture;
use fsroute::core::Result;
use fsroute::router::{Evaluator, Invocation, Router, RouterOptions};

/// Both index modes, as `hot_update` values.
pub const MODES: [bool; 2] = [false, true];

/// Evaluator that hands the invocation back unchanged.
pub struct Capture;

impl Evaluator for Capture {
    type Output = Invocation;

    fn evaluate<'a>(&'a self, _router: &'a Router<Self>, invocation: Invocation) -> BoxFuture<'a, Result<Invocation>> {
        async move { Ok(invocation) }.boxed()
    }
}

/// Builds and initializes a capturing router.
pub async fn capture_router(options: RouterOptions, hot_update: bool) -> Router<Capture> {
    fsroute::test_utils::init_test_logging(None);
    let router = Router::new(options.with_hot_update(hot_update), Capture).unwrap();
    router.init().await.unwrap();
    router
}

/// Template chain ids of an invocation.
pub fn template_ids(invocation: &Invocation) -> Vec<String> {
    invocation.template.as_ref().map(|head| head.chain_ids()).unwrap_or_default()
}
