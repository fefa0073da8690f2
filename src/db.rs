//! Database-backed tester: a fixture store is seeded from the setup artifact
//! before the action runs, and the action gets the store alongside the
//! output sink.

use crate::base::{OutputSink, Tester};
use crate::config::TestConfig;
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, LifecycleState, Phase, Retarget, run};
use crate::sql::{load_setup_file, load_setup_string};
use crate::store::{FixtureStore, StoreConfig};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Callback run by [`DbTester`] during Act.
pub type DbAction = Box<dyn FnMut(&FixtureStore, &mut OutputSink) -> anyhow::Result<()> + Send>;

/// Tester layer that owns a fixture store.
///
/// The store is opened by Init (or by Arrange when Init was skipped), kept
/// across runs, and released by Close. Each Arrange loads the setup artifact
/// into it.
pub struct DbTester {
    inner: Tester,
    store_config: StoreConfig,
    setup_sql: Option<String>,
    store: Option<FixtureStore>,
    action: Option<DbAction>,
}

impl DbTester {
    /// Create a tester using `base_name` for all artifacts.
    pub fn new<F>(base_name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&FixtureStore, &mut OutputSink) -> anyhow::Result<()> + Send + 'static,
    {
        let mut t = Self::with_config(TestConfig::new(base_name));
        t.set_action(action);
        t
    }

    pub fn with_config(config: TestConfig) -> Self {
        Self {
            inner: Tester::with_config(config),
            store_config: StoreConfig::default(),
            setup_sql: None,
            store: None,
            action: None,
        }
    }

    /// Use `config` when opening the fixture store.
    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// Seed the store from `sql` instead of the setup file.
    pub fn with_setup_sql(mut self, sql: impl Into<String>) -> Self {
        self.setup_sql = Some(sql.into());
        self
    }

    pub fn set_action<F>(&mut self, action: F)
    where
        F: FnMut(&FixtureStore, &mut OutputSink) -> anyhow::Result<()> + Send + 'static,
    {
        self.action = Some(Box::new(action));
    }

    pub fn config(&self) -> &TestConfig {
        self.inner.config()
    }

    pub fn config_mut(&mut self) -> &mut TestConfig {
        self.inner.config_mut()
    }

    pub fn setup_path(&self) -> PathBuf {
        self.inner.setup_path()
    }

    pub fn out_path(&self) -> PathBuf {
        self.inner.out_path()
    }

    pub fn golden_path(&self) -> PathBuf {
        self.inner.golden_path()
    }

    /// The fixture store, once opened.
    pub fn store(&self) -> Option<&FixtureStore> {
        self.store.as_ref()
    }

    /// Run `f` as this run's Act with the store and the output sink.
    pub fn act_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&FixtureStore, &mut OutputSink) -> Result<()>,
    {
        self.inner.state().check(Phase::Act)?;
        let store = self.store.as_ref().ok_or(Error::PhaseOrder {
            phase: Phase::Act,
            state: self.inner.state(),
        })?;
        self.inner.act_with(|sink| f(store, sink))
    }

    fn open_store(&mut self) -> Result<&mut FixtureStore> {
        let store = match self.store.take() {
            Some(store) => store,
            None => FixtureStore::open(&self.store_config)
                .map_err(|e| Error::resource("error opening fixture store", e))?,
        };
        Ok(self.store.insert(store))
    }

    fn load_setup(&mut self) -> Result<()> {
        let setup_path = self.setup_path();
        let setup_sql = self.setup_sql.clone();
        // Only the derived setup path is optional; an explicit one must exist.
        let explicit = self
            .config()
            .setup
            .path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        let store = self.open_store()?;
        if let Some(sql) = setup_sql {
            return load_setup_string(store, &sql);
        }
        if explicit {
            return load_setup_file(store, &setup_path);
        }
        match std::fs::metadata(&setup_path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(setup = %setup_path.display(), "no setup file, store left empty");
                Ok(())
            }
            _ => load_setup_file(store, &setup_path),
        }
    }
}

impl Lifecycle for DbTester {
    fn init(&mut self) -> Result<()> {
        self.inner.init()?;
        self.open_store()?;
        Ok(())
    }

    fn arrange(&mut self) -> Result<()> {
        self.inner.arrange()?;
        self.load_setup()
    }

    fn act(&mut self) -> Result<()> {
        self.inner.state().check(Phase::Act)?;
        let mut action = self.action.take().ok_or(Error::NoActionConfigured)?;
        let result = self.act_with(|store, sink| action(store, sink).map_err(Error::Action));
        self.action = Some(action);
        result
    }

    fn assert(&mut self) -> Result<()> {
        self.inner.assert()
    }

    fn close(&mut self) -> Result<()> {
        let released = match self.store.take() {
            Some(store) => store
                .close()
                .map_err(|e| Error::resource("error closing fixture store", e)),
            None => Ok(()),
        };
        let closed = self.inner.close();
        released.and(closed)
    }

    fn state(&self) -> LifecycleState {
        self.inner.state()
    }
}

impl Retarget for DbTester {
    type Action = DbAction;

    fn retarget(&mut self, base_name: &str, action: DbAction) {
        self.inner.set_base_name(base_name);
        self.action = Some(action);
    }
}

/// Seed a fresh store from `{base_name}.setup`, run `callback` to produce
/// `{base_name}.out`, and compare it with `{base_name}.golden`, all under
/// `testdata/`.
pub fn from_setup_to_golden<F>(base_name: &str, callback: F) -> Result<()>
where
    F: FnMut(&FixtureStore, &mut OutputSink) -> anyhow::Result<()> + Send + 'static,
{
    let mut tester = DbTester::new(base_name, callback);
    run(&mut tester)
}
