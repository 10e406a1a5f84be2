//! # Runtime — single-threaded cooperative I/O
//!
//! A small executor and readiness poller for the redka server. One OS
//! thread runs every task; nothing executes while another task is running,
//! so engine state is shared without locks. The suspension points are
//! exactly the awaits inside [`Acceptor::accept`],
//! [`TcpSocket::read_some`], and [`TcpSocket::write_some`] (and the `_all`
//! loops over them) — any stretch of code between two awaits is atomic
//! with respect to every other task.
//!
//! ## Shape
//!
//! ```text
//! ┌───────────────┐  spawn()   ┌─────────────────────────────┐
//! │   Executor    │←───────────│ detached task (self-owned)  │
//! │  ready FIFO   │            └─────────────────────────────┘
//! └──────┬────────┘
//!        │ run(): drain FIFO, then block in
//!        v
//! ┌───────────────┐  fd → (read waker, write waker)
//! │   Acceptor    │  poll(2) on every fd with a pending waker;
//! │ (poller +     │  POLLIN wakes the read side, POLLOUT the write
//! │  listener)    │  side, then the executor drains again
//! └───────────────┘
//! ```
//!
//! A *continuation* is a [`std::task::Waker`] parked in the acceptor's
//! table; at most one may be pending per direction per fd. Tasks are
//! ordinary futures: an `async fn` is the value-returning suspendable
//! computation, and [`Executor::spawn`] turns one into a detached task
//! whose heap frame frees itself at final completion.
//!
//! There is no cancellation and there are no timeouts. A task finishes
//! when its I/O completes or errors; a panic inside a task aborts the
//! process, which is the intended failure mode.

mod executor;
mod net;

pub use executor::Executor;
pub use net::{Acceptor, TcpSocket};
