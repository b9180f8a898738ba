/// Events emitted by long-running procedures such as operational-domain sweeps.
#[derive(Debug, Clone)]
pub enum Progress {
    /// A named phase begins, e.g. the seeding or expansion phase of a flood fill.
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// A batch of `total_steps` units of work (parameter points) begins.
    TaskStart { total_steps: u64 },
    /// One unit of work finished.
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback.
///
/// The reporter is `Sync`, so parallel workers may report increments directly.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Reports a message, building it only when someone listens.
    pub fn message(&self, build: impl FnOnce() -> String) {
        if let Some(cb) = &self.callback {
            cb(Progress::Message(build()));
        }
    }
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("active", &self.is_active())
            .finish()
    }
}
