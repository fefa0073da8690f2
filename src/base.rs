//! Plain file-based tester: the action writes to an output file which is then
//! compared against the golden file.

use crate::compare::compare_out_to_golden;
use crate::config::TestConfig;
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, LifecycleState, Phase, Retarget};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writable stream bound to a test's output file.
///
/// Opened (truncating) by Arrange and closed by Assert.
pub struct OutputSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutputSink {
    /// Create or truncate the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            Error::resource(
                format!("error creating output file {}", path.display()),
                e,
            )
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered output and close the file.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(|e| {
            Error::resource(
                format!("error flushing output file {}", self.path.display()),
                e,
            )
        })
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Callback run by [`Tester`] during Act.
pub type Action = Box<dyn FnMut(&mut OutputSink) -> anyhow::Result<()> + Send>;

/// Base tester layer.
///
/// Holds the configuration, the lifecycle state and the output sink; the
/// database and handler layers are built on top of it.
pub struct Tester {
    config: TestConfig,
    action: Option<Action>,
    sink: Option<OutputSink>,
    state: LifecycleState,
}

impl Tester {
    /// Create a tester using `base_name` for all artifacts.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self::with_config(TestConfig::new(base_name))
    }

    pub fn with_config(config: TestConfig) -> Self {
        Self {
            config,
            action: None,
            sink: None,
            state: LifecycleState::Uninitialized,
        }
    }

    /// Builder-style variant of [`Tester::set_action`].
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&mut OutputSink) -> anyhow::Result<()> + Send + 'static,
    {
        self.set_action(action);
        self
    }

    pub fn set_action<F>(&mut self, action: F)
    where
        F: FnMut(&mut OutputSink) -> anyhow::Result<()> + Send + 'static,
    {
        self.action = Some(Box::new(action));
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Mutable access to the configuration; derived paths follow changes.
    pub fn config_mut(&mut self) -> &mut TestConfig {
        &mut self.config
    }

    pub fn set_base_name(&mut self, base_name: &str) {
        self.config.base_name = Some(base_name.to_string());
    }

    pub fn setup_path(&self) -> PathBuf {
        self.config.setup_path()
    }

    pub fn out_path(&self) -> PathBuf {
        self.config.out_path()
    }

    pub fn golden_path(&self) -> PathBuf {
        self.config.golden_path()
    }

    /// Run `f` as this run's Act, handing it the open output sink.
    ///
    /// Layers that assemble a richer context for their own callbacks call
    /// this instead of [`Lifecycle::act`], so the state checks and
    /// transition stay in one place.
    pub fn act_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut OutputSink) -> Result<()>,
    {
        self.state.check(Phase::Act)?;
        let sink = self.sink.as_mut().ok_or(Error::PhaseOrder {
            phase: Phase::Act,
            state: self.state,
        })?;
        f(sink)?;
        self.state = LifecycleState::Acted;
        Ok(())
    }
}

impl Lifecycle for Tester {
    fn init(&mut self) -> Result<()> {
        self.state.check(Phase::Init)?;
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    fn arrange(&mut self) -> Result<()> {
        self.state.check(Phase::Arrange)?;
        // Leftovers from an aborted run are discarded unflushed.
        self.sink = None;
        let out_path = self.out_path();
        tracing::debug!(out = %out_path.display(), "opening output sink");
        self.sink = Some(OutputSink::create(&out_path)?);
        self.state = LifecycleState::Arranged;
        Ok(())
    }

    fn act(&mut self) -> Result<()> {
        self.state.check(Phase::Act)?;
        let mut action = self.action.take().ok_or(Error::NoActionConfigured)?;
        let result = self.act_with(|sink| action(sink).map_err(Error::Action));
        self.action = Some(action);
        result
    }

    fn assert(&mut self) -> Result<()> {
        self.state.check(Phase::Assert)?;
        let sink = self.sink.take().ok_or(Error::PhaseOrder {
            phase: Phase::Assert,
            state: self.state,
        })?;
        sink.finish()?;
        compare_out_to_golden(&self.out_path(), &self.golden_path())?;
        tracing::debug!(golden = %self.golden_path().display(), "output matches golden file");
        self.state = LifecycleState::Asserted;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take()
            && let Err(e) = sink.finish()
        {
            tracing::warn!(error = %e, "discarding output sink on close");
        }
        self.state = LifecycleState::Closed;
        Ok(())
    }

    fn state(&self) -> LifecycleState {
        self.state
    }
}

impl Retarget for Tester {
    type Action = Action;

    fn retarget(&mut self, base_name: &str, action: Action) {
        self.set_base_name(base_name);
        self.action = Some(action);
    }
}
