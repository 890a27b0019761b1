//! Recurring-task scheduling for background sync.
//!
//! A provider either runs on demand ([`Schedule::Manual`]) or hands a
//! refresh closure to a [`TaskRunner`] at connect time. The bundled
//! [`IntervalTaskRunner`] awaits each invocation to completion before
//! sleeping, so overlapping runs of the same task cannot happen.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Boxed future produced by one task invocation.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Factory for task invocations. Called once per run; each call produces a
/// fresh future. Failures are the closure's problem to absorb and log.
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// A named recurring task handed to a runner.
#[derive(Clone)]
pub struct ScheduledTask {
    /// Stable identifier, used in log output.
    pub id: String,
    pub task: TaskFn,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask").field("id", &self.id).finish()
    }
}

/// Accepts recurring tasks for background execution.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Register `task` for repeated execution. Returns once the task is
    /// registered, not when it finishes.
    async fn run(&self, task: ScheduledTask);
}

/// How a provider refreshes.
#[derive(Clone)]
pub enum Schedule {
    /// No background runs; callers drive each pass themselves.
    Manual,
    /// Background runs handed to the given runner at connect time.
    Task(Arc<dyn TaskRunner>),
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Manual => f.write_str("Manual"),
            Schedule::Task(_) => f.write_str("Task(..)"),
        }
    }
}

/// Fixed-period runner on the tokio runtime.
///
/// Each iteration awaits the task future, then sleeps for the full period,
/// so a slow run delays the next one rather than overlapping it.
#[derive(Debug, Clone)]
pub struct IntervalTaskRunner {
    period: Duration,
}

impl IntervalTaskRunner {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

#[async_trait]
impl TaskRunner for IntervalTaskRunner {
    async fn run(&self, task: ScheduledTask) {
        let period = self.period;
        tokio::spawn(async move {
            tracing::info!(task = %task.id, period_secs = period.as_secs(), "task scheduled");
            loop {
                (task.task)().await;
                tokio::time::sleep(period).await;
            }
        });
    }
}
