//! The five-phase test lifecycle and the drivers that sequence it.
//!
//! Every tester layer implements [`Lifecycle`]. A layer that extends another
//! owns the inner tester and calls the matching inner phase explicitly from
//! each of its own phases, adding its behavior before or after.

use crate::error::{Error, Result};

/// One step of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Arrange,
    Act,
    Assert,
    Close,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Where a tester is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Arranged,
    Acted,
    Asserted,
    Closed,
}

impl LifecycleState {
    /// Whether `phase` may run from this state.
    ///
    /// Arrange may start a new run from any open state, so one tester can
    /// drive several runs between Init and Close. Close is always allowed.
    pub fn admits(self, phase: Phase) -> bool {
        use LifecycleState::*;
        match phase {
            Phase::Init => self == Uninitialized,
            Phase::Arrange => self != Closed,
            Phase::Act => self == Arranged,
            Phase::Assert => self == Acted,
            Phase::Close => true,
        }
    }

    /// State reached when `phase` succeeds.
    pub fn after(phase: Phase) -> Self {
        match phase {
            Phase::Init => LifecycleState::Initialized,
            Phase::Arrange => LifecycleState::Arranged,
            Phase::Act => LifecycleState::Acted,
            Phase::Assert => LifecycleState::Asserted,
            Phase::Close => LifecycleState::Closed,
        }
    }

    /// Fail with [`Error::PhaseOrder`] unless `phase` may run now.
    pub fn check(self, phase: Phase) -> Result<()> {
        if self.admits(phase) {
            Ok(())
        } else {
            Err(Error::PhaseOrder { phase, state: self })
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The five-phase capability every tester layer provides.
pub trait Lifecycle {
    /// One-time setup of resources shared by every run.
    fn init(&mut self) -> Result<()>;
    /// Open the output sink and prepare any fixtures.
    fn arrange(&mut self) -> Result<()>;
    /// Invoke the action under test.
    fn act(&mut self) -> Result<()>;
    /// Close the output sink and compare it against the golden file.
    fn assert(&mut self) -> Result<()>;
    /// Release held resources. Safe to call after any failure, and repeatedly.
    fn close(&mut self) -> Result<()>;
    /// Current lifecycle state.
    fn state(&self) -> LifecycleState;
}

/// A tester that can be pointed at a new artifact set and action between runs.
pub trait Retarget: Lifecycle {
    /// The callback type this layer runs during Act.
    type Action;

    /// Set the global base name and the action for the next run.
    fn retarget(&mut self, base_name: &str, action: Self::Action);
}

/// Run Arrange, Act and Assert, stopping at the first failure.
///
/// Neither Init nor Close is called, so repeated calls share whatever state
/// the tester keeps between runs.
pub fn run_test<T: Lifecycle + ?Sized>(tester: &mut T) -> Result<()> {
    tester.arrange()?;
    tester.act()?;
    tester.assert()
}

/// Run the full lifecycle once.
///
/// Close runs even when an earlier phase fails; the first error is returned.
pub fn run<T: Lifecycle + ?Sized>(tester: &mut T) -> Result<()> {
    let result = tester.init().and_then(|()| run_test(tester));
    if let Err(e) = &result {
        tracing::debug!(error = %e, state = %tester.state(), "run failed, closing tester");
    }
    let closed = tester.close();
    result.and(closed)
}

/// Retarget the tester and run one test against it.
pub fn run_test_with<T: Retarget + ?Sized>(
    tester: &mut T,
    base_name: &str,
    action: T::Action,
) -> Result<()> {
    tester.retarget(base_name, action);
    run_test(tester)
}

/// Init, run one retargeted test, then Close.
pub fn run_one_with<T: Retarget + ?Sized>(
    tester: &mut T,
    base_name: &str,
    action: T::Action,
) -> Result<()> {
    let result = tester
        .init()
        .and_then(|()| run_test_with(tester, base_name, action));
    let closed = tester.close();
    result.and(closed)
}

/// Like [`run`], but panics with the error message on failure.
///
/// Intended to be the last line of a `#[test]` function.
#[track_caller]
pub fn run_or_panic<T: Lifecycle + ?Sized>(tester: &mut T) {
    if let Err(e) = run(tester) {
        panic!("golden test failed: {e}");
    }
}
