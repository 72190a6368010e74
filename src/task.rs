// src/task.rs

//! `Task`: launch configuration plus the single-use `launch` entry point.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use futures::stream::{Stream, StreamExt, TryStreamExt};

use crate::config::TaskConfig;
use crate::event::{TaskError, TaskEvent};
use crate::exec::process::LaunchSpec;
use crate::exec::stdin::StdinSource;
use crate::exec::{TaskStream, spawn_multiplexer};
use crate::ext::TaskEventStreamExt;

/// An external process to launch, and what to feed it on stdin.
///
/// A `Task` is consumed by [`Task::launch`]; launching again requires a new
/// value. `Task` is cheap to build, so callers wanting a template can keep a
/// function that returns fresh ones.
///
/// ```no_run
/// # async fn demo() -> Result<(), taskstream::TaskError> {
/// use futures::stream;
/// use taskstream::{Task, TaskEvent};
///
/// let events = Task::new("/bin/cat")
///     .stdin(stream::iter(vec!["hello\n".to_string()]))
///     .run()
///     .await?;
/// assert_eq!(events.last(), Some(&TaskEvent::Exit { code: 0 }));
/// # Ok(())
/// # }
/// ```
pub struct Task {
    spec: LaunchSpec,
    stdin: Option<StdinSource>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("spec", &self.spec)
            .field("stdin", &self.stdin.is_some())
            .finish()
    }
}

impl Task {
    pub fn new(launch_path: impl Into<PathBuf>) -> Self {
        Self {
            spec: LaunchSpec::new(launch_path),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.spec.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.spec.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.spec.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.spec
            .env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.current_dir = Some(dir.into());
        self
    }

    /// Feed each string from `source` to the child's stdin as it arrives.
    ///
    /// Stdin is closed once `source` ends. Without a source, stdin is closed
    /// right after spawning.
    pub fn stdin<S>(mut self, source: S) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
    {
        self.stdin = Some(source.map(Ok).boxed());
        self
    }

    /// Like [`Task::stdin`], for sources that can fail.
    ///
    /// An error stops feeding and closes stdin; it does not fail the task.
    pub fn stdin_fallible<S, E>(mut self, source: S) -> Self
    where
        S: Stream<Item = Result<String, E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        self.stdin = Some(source.map_err(|e| -> anyhow::Error { e.into() }).boxed());
        self
    }

    /// Build a task from a validated `[task]` config section.
    pub fn from_config(cfg: &TaskConfig) -> Self {
        let mut task = Task::new(&cfg.cmd)
            .args(cfg.args.iter().cloned())
            .envs(cfg.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(dir) = &cfg.cwd {
            task = task.current_dir(dir);
        }
        if let Some(lines) = &cfg.stdin {
            task = task.stdin(futures::stream::iter(lines.clone()));
        }
        task
    }

    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Spawn the process and return its event stream.
    ///
    /// Every normal exit, including a non-zero one, ends the stream with
    /// `Ok(TaskEvent::Exit)`. Use [`TaskEventStreamExt::fail_on_nonzero`] to
    /// turn non-zero codes into `TaskError::Exit`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn launch(self) -> TaskStream {
        spawn_multiplexer(self.spec, self.stdin)
    }

    /// Launch, wait for the end, and collect every event.
    ///
    /// Non-zero exit codes are reported as `TaskError::Exit`.
    pub async fn run(self) -> Result<Vec<TaskEvent>, TaskError> {
        self.launch().fail_on_nonzero().try_collect().await
    }
}
