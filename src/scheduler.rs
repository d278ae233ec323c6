use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

const MAX_TIMER_ROUNDS: usize = 10_000;

/// Handle of a scheduled timer. Timers fire in deadline order, ties in
/// scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    deadline: Duration,
    seq: u64,
}

impl TimerId {
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

type Task = Box<dyn FnOnce()>;

struct SchedulerInner {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    timers: RefCell<BTreeMap<TimerId, Task>>,
    microtasks: RefCell<VecDeque<Task>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

/// Single-threaded cooperative scheduler driven by a virtual clock.
///
/// Nothing happens on its own: callers move time forward with [`advance`]
/// or drain pending work with [`flush`]. Timers, microtasks and spawned
/// futures all run on the calling thread, one at a time.
///
/// [`advance`]: Scheduler::advance
/// [`flush`]: Scheduler::flush
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            inner: Rc::new(SchedulerInner {
                now: Cell::new(Duration::ZERO),
                next_seq: Cell::new(0),
                timers: RefCell::new(BTreeMap::new()),
                microtasks: RefCell::new(VecDeque::new()),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    pub fn now(&self) -> Duration {
        self.inner.now.get()
    }

    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerId {
        self.schedule_at(self.now() + delay, task)
    }

    fn schedule_at(&self, deadline: Duration, task: impl FnOnce() + 'static) -> TimerId {
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);
        let id = TimerId { deadline, seq };
        self.inner.timers.borrow_mut().insert(id, Box::new(task));
        id
    }

    /// Discards a pending timer. Returns `false` if it already fired.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.inner.timers.borrow_mut().remove(&id).is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.inner.spawner.spawn_local(future) {
            tracing::error!(?err, "failed to spawn task on scheduler");
        }
    }

    /// A future that resolves once the virtual clock reaches `now + delay`.
    pub fn sleep(&self, delay: Duration) -> Sleep {
        Sleep {
            scheduler: Rc::downgrade(&self.inner),
            deadline: self.now() + delay,
            timer: None,
        }
    }

    /// Runs queued microtasks and ready tasks until neither makes progress.
    ///
    /// Must not be called from inside a spawned task.
    pub fn flush(&self) {
        loop {
            self.run_microtasks();
            match self.inner.pool.try_borrow_mut() {
                Ok(mut pool) => pool.run_until_stalled(),
                Err(_) => {
                    tracing::warn!("scheduler flush requested from inside a running task");
                    return;
                }
            }
            if self.inner.microtasks.borrow().is_empty() {
                break;
            }
        }
    }

    /// Moves the clock forward by `delay`, firing due timers in order and
    /// flushing after each one.
    pub fn advance(&self, delay: Duration) {
        let target = self.now() + delay;
        self.flush();
        while let Some((id, task)) = self.pop_due(target) {
            if id.deadline > self.now() {
                self.inner.now.set(id.deadline);
            }
            task();
            self.flush();
        }
        if target > self.now() {
            self.inner.now.set(target);
        }
    }

    /// Fires every pending timer, including ones scheduled while draining.
    pub fn run_all(&self) {
        self.flush();
        for _ in 0..MAX_TIMER_ROUNDS {
            let next = self.inner.timers.borrow().keys().next().copied();
            let Some(next) = next else {
                return;
            };
            self.advance(next.deadline.saturating_sub(self.now()));
        }
        tracing::warn!(
            pending = self.pending_timers(),
            "timers still pending after {MAX_TIMER_ROUNDS} rounds"
        );
    }

    fn run_microtasks(&self) {
        loop {
            let task = self.inner.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    fn pop_due(&self, limit: Duration) -> Option<(TimerId, Task)> {
        let mut timers = self.inner.timers.borrow_mut();
        let id = *timers.keys().next()?;
        if id.deadline > limit {
            return None;
        }
        timers.remove(&id).map(|task| (id, task))
    }
}

/// Future returned by [`Scheduler::sleep`].
pub struct Sleep {
    scheduler: Weak<SchedulerInner>,
    deadline: Duration,
    timer: Option<TimerId>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let Some(inner) = this.scheduler.upgrade() else {
            return Poll::Ready(());
        };
        let scheduler = Scheduler { inner };
        if scheduler.now() >= this.deadline {
            this.timer = None;
            return Poll::Ready(());
        }
        if let Some(timer) = this.timer.take() {
            scheduler.cancel(timer);
        }
        let waker = cx.waker().clone();
        this.timer = Some(scheduler.schedule_at(this.deadline, move || waker.wake()));
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let (Some(timer), Some(inner)) = (self.timer.take(), self.scheduler.upgrade()) {
            if let Ok(mut timers) = inner.timers.try_borrow_mut() {
                timers.remove(&timer);
            }
        }
    }
}
