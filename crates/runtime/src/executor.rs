//! The task executor: a FIFO of runnable tasks drained until everything
//! is suspended, then one blocking trip through the poller.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::task::{Context, Waker};

use crate::net::Acceptor;

type TaskFuture = Pin<Box<dyn Future<Output = ()>>>;

/// FIFO of runnable task ids, shared with the wakers parked in the poller.
#[derive(Default)]
struct ReadyQueue {
    queue: Mutex<VecDeque<u64>>,
}

impl ReadyQueue {
    fn push(&self, id: u64) {
        self.queue.lock().expect("ready queue poisoned").push_back(id);
    }

    fn pop(&self) -> Option<u64> {
        self.queue.lock().expect("ready queue poisoned").pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.lock().expect("ready queue poisoned").is_empty()
    }
}

/// Waking a task means putting its id back on the ready FIFO.
struct TaskWaker {
    id: u64,
    ready: Arc<ReadyQueue>,
}

impl std::task::Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.ready.push(self.id);
    }
}

/// A detached task: the boxed future is the task's self-owned frame, freed
/// when the executor removes the entry at final completion.
struct Task {
    future: RefCell<TaskFuture>,
}

/// The single-threaded executor.
///
/// Owns every spawned task and the [`Acceptor`] that doubles as the
/// readiness poller. All I/O futures in this crate park their waker in
/// the acceptor's table; [`run`](Executor::run) alternates between
/// draining the ready FIFO and blocking in `poll(2)`.
pub struct Executor {
    acceptor: Rc<Acceptor>,
    tasks: RefCell<HashMap<u64, Rc<Task>>>,
    ready: Arc<ReadyQueue>,
    next_id: Cell<u64>,
}

impl Executor {
    pub fn new(acceptor: Rc<Acceptor>) -> Rc<Self> {
        Rc::new(Self {
            acceptor,
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(ReadyQueue::default()),
            next_id: Cell::new(0),
        })
    }

    /// The acceptor this executor polls on.
    #[must_use]
    pub fn acceptor(&self) -> &Rc<Acceptor> {
        &self.acceptor
    }

    /// Spawns a detached, fire-and-forget task. The future's storage is
    /// self-owned: it lives on the heap until the task runs to completion
    /// and is then dropped by the executor.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.tasks.borrow_mut().insert(
            id,
            Rc::new(Task {
                future: RefCell::new(Box::pin(future)),
            }),
        );
        self.ready.push(id);
    }

    /// Drives every spawned task until none remain.
    ///
    /// Each outer iteration drains the ready FIFO, then blocks in the
    /// poller until at least one parked continuation is woken — after
    /// which the FIFO must be non-empty again. A server whose accept loop
    /// never finishes therefore never returns from here.
    pub fn run(&self) {
        loop {
            while let Some(id) = self.ready.pop() {
                // A stale id: the task already completed after a wake was
                // queued for it.
                let Some(task) = self.tasks.borrow().get(&id).cloned() else {
                    continue;
                };

                let waker = Waker::from(Arc::new(TaskWaker {
                    id,
                    ready: self.ready.clone(),
                }));
                let mut cx = Context::from_waker(&waker);

                let finished = task.future.borrow_mut().as_mut().poll(&mut cx).is_ready();
                if finished {
                    self.tasks.borrow_mut().remove(&id);
                }
            }

            if self.tasks.borrow().is_empty() {
                return;
            }

            self.acceptor.poll_all();
            assert!(
                !self.ready.is_empty(),
                "poller returned without waking a continuation"
            );
        }
    }
}
