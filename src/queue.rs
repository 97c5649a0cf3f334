//! Deferred task queue with cooperative suspend/resume.
//!
//! Tasks run strictly in the order they were enqueued, one at a time. A task
//! that has to wait for something (an image load) calls
//! [`TaskContext::suspend`] before returning; the queue then stops draining
//! until the returned [`ResumeToken`] is consumed, at which point draining
//! continues with the next task.
//!
//! # State Machine
//!
//! ```text
//!            enqueue                drive()
//!   Idle ───────────► Pending ───────────────► Draining ◄──────┐
//!    ▲                                          │   │          │
//!    │              queue empty                 │   │ pop head │ task returned
//!    └──────────────────────────────────────────┘   ▼          │ without suspending
//!                                                 Running ─────┘
//!                                                   │
//!                                   task suspended  │
//!                                                   ▼
//!                      ResumeToken::resume()      Paused
//!            Draining ◄───────────────────────────┘
//! ```
//!
//! The head task is popped *before* its body runs. A completion callback
//! that fires after the task has started can therefore never cause the task
//! to run again, and the boxed `FnOnce` body makes a second run impossible
//! anyway.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Task
// ============================================================================

/// Identifier assigned to a task when it is enqueued.
///
/// Identifiers increase monotonically for the lifetime of a queue and are
/// never reused, so they stay stable as earlier tasks are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type TaskBody = Box<dyn FnOnce(&TaskContext<'_>)>;

/// A deferred, at-most-once unit of work.
pub struct Task {
    label: Cow<'static, str>,
    body: TaskBody,
}

impl Task {
    /// Creates a task. The label only shows up in logs.
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        body: impl FnOnce(&TaskContext<'_>) + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            body: Box::new(body),
        }
    }

    /// The task's label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish_non_exhaustive()
    }
}

struct QueuedTask {
    id: TaskId,
    task: Task,
}

// ============================================================================
// Queue State
// ============================================================================

/// Observable state of a [`TaskQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing queued and nothing in flight.
    Idle,
    /// Tasks are queued but the queue has not been driven yet.
    Pending,
    /// The driver loop is popping and running tasks.
    Draining,
    /// A task body is executing.
    Running,
    /// A task has suspended and the queue waits for it to resume.
    Paused,
}

#[derive(Default)]
struct QueueInner {
    tasks: VecDeque<QueuedTask>,
    paused: bool,
    draining: bool,
    running: bool,
    next_id: usize,
    started: usize,
}

// ============================================================================
// TaskQueue
// ============================================================================

/// FIFO scheduler for deferred drawing tasks.
///
/// Cloning a `TaskQueue` yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task. Never starts execution by itself.
    pub fn enqueue(&self, task: Task) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = TaskId(inner.next_id);
        inner.next_id += 1;
        tracing::debug!(
            task = %id,
            label = %task.label,
            queued = inner.tasks.len() + 1,
            "task enqueued"
        );
        inner.tasks.push_back(QueuedTask { id, task });
        id
    }

    /// Runs queued tasks in order until the queue empties or a task suspends.
    ///
    /// Has no effect while paused or while already draining, so calling it
    /// from inside a task or a completion callback is harmless.
    pub fn drive(&self) -> QueueState {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.paused {
                tracing::trace!("drive ignored: queue is paused");
                return QueueState::Paused;
            }
            if inner.draining {
                tracing::trace!("drive ignored: queue is already draining");
                return QueueState::Draining;
            }
            inner.draining = true;
        }

        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let next = inner.tasks.pop_front();
                if next.is_some() {
                    inner.running = true;
                    inner.started += 1;
                } else {
                    inner.draining = false;
                }
                next
            };

            let Some(QueuedTask { id, task }) = next else {
                tracing::debug!("queue idle");
                return QueueState::Idle;
            };

            tracing::trace!(task = %id, label = %task.label, "running task");
            let ctx = TaskContext { queue: self, id };
            (task.body)(&ctx);

            let mut inner = self.inner.borrow_mut();
            inner.running = false;
            if inner.paused {
                inner.draining = false;
                tracing::debug!(task = %id, remaining = inner.tasks.len(), "queue paused");
                return QueueState::Paused;
            }
        }
    }

    /// Clears the pause flag and drives the queue again.
    ///
    /// Only reachable through [`ResumeToken::resume`].
    fn resume(&self) -> QueueState {
        self.inner.borrow_mut().paused = false;
        tracing::debug!("queue resumed");
        self.drive()
    }

    fn pause(&self) {
        self.inner.borrow_mut().paused = true;
    }

    /// Current state.
    pub fn state(&self) -> QueueState {
        let inner = self.inner.borrow();
        if inner.running {
            QueueState::Running
        } else if inner.paused {
            QueueState::Paused
        } else if inner.draining {
            QueueState::Draining
        } else if inner.tasks.is_empty() {
            QueueState::Idle
        } else {
            QueueState::Pending
        }
    }

    /// Number of tasks waiting to start.
    pub fn len(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Returns true if no task is waiting to start.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().tasks.is_empty()
    }

    /// Returns true while a suspended task holds the queue.
    pub fn is_paused(&self) -> bool {
        self.inner.borrow().paused
    }

    /// Number of task bodies started so far.
    pub fn started(&self) -> usize {
        self.inner.borrow().started
    }

    /// Labels of the tasks waiting to start, in execution order.
    pub fn pending_labels(&self) -> Vec<String> {
        self.inner
            .borrow()
            .tasks
            .iter()
            .map(|queued| queued.task.label.to_string())
            .collect()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("state", &self.state())
            .field("len", &self.len())
            .field("started", &self.started())
            .finish()
    }
}

// ============================================================================
// TaskContext / ResumeToken
// ============================================================================

/// Passed to a running task body.
pub struct TaskContext<'a> {
    queue: &'a TaskQueue,
    id: TaskId,
}

impl TaskContext<'_> {
    /// The running task's identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Pauses the queue on behalf of this task.
    ///
    /// The queue stays paused until the returned token is resumed. Dropping
    /// the token without resuming leaves the queue paused for good.
    pub fn suspend(&self) -> ResumeToken {
        self.queue.pause();
        tracing::trace!(task = %self.id, "task suspended");
        ResumeToken {
            queue: self.queue.clone(),
            id: self.id,
            resumed: false,
        }
    }
}

/// One-shot permission to resume a paused queue.
#[must_use = "the queue stays paused until the token is resumed"]
pub struct ResumeToken {
    queue: TaskQueue,
    id: TaskId,
    resumed: bool,
}

impl ResumeToken {
    /// The task that suspended.
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    /// Resumes the queue and continues draining.
    ///
    /// The token is the only way to un-pause a queue; the queue itself has
    /// no public resume:
    ///
    /// ```compile_fail
    /// let queue = infograph_renderer::TaskQueue::new();
    /// queue.resume();
    /// ```
    pub fn resume(mut self) -> QueueState {
        self.resumed = true;
        tracing::trace!(task = %self.id, "task finished asynchronously");
        self.queue.resume()
    }
}

impl Drop for ResumeToken {
    fn drop(&mut self) {
        if !self.resumed {
            tracing::debug!(task = %self.id, "resume token dropped; queue stays paused");
        }
    }
}

impl fmt::Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeToken").field("task", &self.id).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
