//! Handler-backed tester with a fixture store: the handler factory receives
//! the seeded store, so the handler under test can read fixture data.

use crate::config::TestConfig;
use crate::db::DbTester;
use crate::error::{Error, Result};
use crate::http::{RequestFn, serve_into};
use crate::lifecycle::{Lifecycle, LifecycleState, Phase, Retarget, run_one_with};
use crate::store::{FixtureStore, StoreConfig};
use axum::Router;
use axum::body::Body;
use axum::http::Request;

/// Builds a fresh handler around the fixture store for each Act.
pub type StoreHandlerFactory = Box<dyn FnMut(&FixtureStore) -> Router + Send>;

/// Tester layer combining a fixture store with a request handler.
///
/// The store survives across runs between Init and Close, so a sequence of
/// [`run_test_with`](crate::lifecycle::run_test_with) calls can build up and
/// modify its contents.
pub struct HttpDbTester {
    inner: DbTester,
    create_handler: StoreHandlerFactory,
    request: Option<RequestFn>,
}

impl HttpDbTester {
    pub fn new<H>(create_handler: H) -> Self
    where
        H: FnMut(&FixtureStore) -> Router + Send + 'static,
    {
        Self::with_config(TestConfig::default(), create_handler)
    }

    pub fn with_config<H>(config: TestConfig, create_handler: H) -> Self
    where
        H: FnMut(&FixtureStore) -> Router + Send + 'static,
    {
        Self {
            inner: DbTester::with_config(config),
            create_handler: Box::new(create_handler),
            request: None,
        }
    }

    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.inner = self.inner.with_store_config(config);
        self
    }

    pub fn with_setup_sql(mut self, sql: impl Into<String>) -> Self {
        self.inner = self.inner.with_setup_sql(sql);
        self
    }

    pub fn set_request<R>(&mut self, request: R)
    where
        R: FnMut() -> anyhow::Result<Request<Body>> + Send + 'static,
    {
        self.request = Some(Box::new(request));
    }

    pub fn config(&self) -> &TestConfig {
        self.inner.config()
    }

    pub fn config_mut(&mut self) -> &mut TestConfig {
        self.inner.config_mut()
    }

    pub fn store(&self) -> Option<&FixtureStore> {
        self.inner.store()
    }

    /// Init, run one test named `base_name` with `request`, then Close.
    pub fn run_with<R>(&mut self, base_name: &str, request: R) -> Result<()>
    where
        R: FnMut() -> anyhow::Result<Request<Body>> + Send + 'static,
    {
        run_one_with(self, base_name, Box::new(request))
    }
}

impl Lifecycle for HttpDbTester {
    fn init(&mut self) -> Result<()> {
        self.inner.init()
    }

    fn arrange(&mut self) -> Result<()> {
        self.inner.arrange()
    }

    fn act(&mut self) -> Result<()> {
        self.inner.state().check(Phase::Act)?;
        let mut request = self.request.take().ok_or(Error::NoActionConfigured)?;
        let create_handler = &mut self.create_handler;
        let result = self.inner.act_with(|store, sink| {
            let router = create_handler(store);
            let request = request().map_err(Error::Action)?;
            serve_into(router, request, sink)
        });
        self.request = Some(request);
        result
    }

    fn assert(&mut self) -> Result<()> {
        self.inner.assert()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn state(&self) -> LifecycleState {
        self.inner.state()
    }
}

impl Retarget for HttpDbTester {
    type Action = RequestFn;

    fn retarget(&mut self, base_name: &str, request: RequestFn) {
        self.inner.config_mut().base_name = Some(base_name.to_string());
        self.request = Some(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{run, run_test_with};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use tempfile::tempdir;

    async fn list(State(store): State<FixtureStore>) -> (StatusCode, String) {
        match store.query_text("SELECT n, s FROM t ORDER BY n") {
            Ok(text) => (StatusCode::OK, format!("{text}\n")),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    async fn add(State(store): State<FixtureStore>) -> StatusCode {
        let added = store
            .lock()
            .map_err(|e| e.to_string())
            .and_then(|conn| {
                conn.execute("INSERT INTO t VALUES (9, 'added')", [])
                    .map_err(|e| e.to_string())
            });
        match added {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn router(store: &FixtureStore) -> Router {
        Router::new()
            .route("/rows", get(list))
            .route("/add", post(add))
            .with_state(store.clone())
    }

    fn request(method: &'static str, uri: &'static str) -> RequestFn {
        Box::new(move || -> anyhow::Result<Request<Body>> {
            Ok(Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())?)
        })
    }

    const SETUP: &str = "CREATE TABLE t (n int, s text); INSERT INTO t VALUES (1, 'a'), (2, 'b');";

    #[test]
    fn test_handler_reads_fixture_rows() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("rows.golden"), "1\ta\n2\tb\n").unwrap();

        let mut t = HttpDbTester::with_config(
            TestConfig::default().with_base_dir(dir.path()),
            router,
        )
        .with_setup_sql(SETUP);
        t.run_with("rows", || Ok(Request::get("/rows").body(Body::empty())?))
            .unwrap();
        assert!(t.store().is_none());
    }

    #[test]
    fn test_store_state_carries_across_runs() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("t.setup"), SETUP).unwrap();
        std::fs::write(dir.path().join("after.golden"), "1\ta\n2\tb\n9\tadded\n").unwrap();

        let mut t = HttpDbTester::with_config(
            TestConfig::new("t").with_base_dir(dir.path()),
            router,
        );
        // Both runs share the setup file; only the first may create the table.
        t.config_mut().setup.base_name = Some("t".to_string());
        t.init().unwrap();

        let err = run_test_with(&mut t, "add", request("POST", "/add")).unwrap_err();
        // The add handler answers with an empty body, which is rejected,
        // but its insert has already happened.
        assert!(matches!(err, Error::EmptyResponse { .. }), "{err}");

        t.config_mut().setup.base_name = Some("no-more-setup".to_string());
        run_test_with(&mut t, "after", request("GET", "/rows")).unwrap();
        t.close().unwrap();
    }

    #[test]
    fn test_handler_error_status() {
        let dir = tempdir().unwrap();
        // No setup: the table does not exist and the handler answers 500.
        let mut t = HttpDbTester::with_config(
            TestConfig::new("broken").with_base_dir(dir.path()),
            router,
        );
        t.set_request(|| Ok(Request::get("/rows").body(Body::empty())?));
        let err = run(&mut t).unwrap_err();
        assert!(
            matches!(err, Error::UnexpectedStatus { status: 500, .. }),
            "{err}"
        );
    }
}
