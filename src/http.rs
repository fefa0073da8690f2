//! Handler-backed tester: each Act sends one synthetic request to an
//! [`axum::Router`] and records the response body as the test output.

use crate::base::{OutputSink, Tester};
use crate::config::TestConfig;
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, LifecycleState, Phase, Retarget, run_one_with};
use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, StatusCode};
use std::io::Write;
use tower::ServiceExt;

/// Status and body captured from one handler invocation.
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Send `request` to `router` and capture the response.
///
/// Runs on a private current-thread runtime, so this must not be called
/// from inside an async context.
pub fn invoke(router: Router, request: Request<Body>) -> Result<Captured> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::resource("error creating runtime for handler", e))?;

    runtime.block_on(async move {
        let response = match router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| Error::resource("error reading response body", e))?;
        Ok(Captured { status, body })
    })
}

/// Invoke the handler and write its body verbatim to `sink`.
///
/// Fails unless the status is 200 OK and the body is non-empty.
pub fn serve_into(router: Router, request: Request<Body>, sink: &mut OutputSink) -> Result<()> {
    let uri = request.uri().to_string();
    let captured = invoke(router, request)?;
    tracing::debug!(%uri, status = %captured.status, bytes = captured.body.len(), "handler responded");

    if captured.status != StatusCode::OK {
        return Err(Error::UnexpectedStatus {
            uri,
            status: captured.status.as_u16(),
            body: String::from_utf8_lossy(&captured.body).into_owned(),
        });
    }
    if captured.body.is_empty() {
        return Err(Error::EmptyResponse { uri });
    }
    sink.write_all(&captured.body).map_err(|e| {
        Error::resource(
            format!("error writing output file {}", sink.path().display()),
            e,
        )
    })
}

/// Builds a fresh handler for each Act.
pub type HandlerFactory = Box<dyn FnMut() -> Router + Send>;

/// Produces the request to send during Act.
pub type RequestFn = Box<dyn FnMut() -> anyhow::Result<Request<Body>> + Send>;

/// Tester layer that records a handler's response.
///
/// For one test:
///
/// ```no_run
/// # use golden::http::HttpTester;
/// # use axum::{Router, routing::get, body::Body, http::Request};
/// let mut t = HttpTester::new(|| Router::new().route("/", get(|| async { "hi" })));
/// t.run_with("hello", || Ok(Request::get("/").body(Body::empty())?)).unwrap();
/// ```
///
/// For several tests sharing one tester, call `init`, then
/// [`run_test_with`](crate::lifecycle::run_test_with) once per test, then `close`.
pub struct HttpTester {
    inner: Tester,
    create_handler: HandlerFactory,
    request: Option<RequestFn>,
}

impl HttpTester {
    pub fn new<H>(create_handler: H) -> Self
    where
        H: FnMut() -> Router + Send + 'static,
    {
        Self::with_config(TestConfig::default(), create_handler)
    }

    pub fn with_config<H>(config: TestConfig, create_handler: H) -> Self
    where
        H: FnMut() -> Router + Send + 'static,
    {
        Self {
            inner: Tester::with_config(config),
            create_handler: Box::new(create_handler),
            request: None,
        }
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

    pub fn out_path(&self) -> std::path::PathBuf {
        self.inner.out_path()
    }

    pub fn golden_path(&self) -> std::path::PathBuf {
        self.inner.golden_path()
    }

    /// Init, run one test named `base_name` with `request`, then Close.
    pub fn run_with<R>(&mut self, base_name: &str, request: R) -> Result<()>
    where
        R: FnMut() -> anyhow::Result<Request<Body>> + Send + 'static,
    {
        run_one_with(self, base_name, Box::new(request))
    }
}

impl Lifecycle for HttpTester {
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
        let result = self.inner.act_with(|sink| {
            let router = create_handler();
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

impl Retarget for HttpTester {
    type Action = RequestFn;

    fn retarget(&mut self, base_name: &str, request: RequestFn) {
        self.inner.set_base_name(base_name);
        self.request = Some(request);
    }
}
