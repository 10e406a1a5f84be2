//! Sockets and the readiness poller.
//!
//! The [`Acceptor`] owns the non-blocking listening socket and the table of
//! parked continuations, and its [`poll_all`](Acceptor::poll_all) is the
//! only place the process blocks. [`TcpSocket`] wraps one accepted
//! connection; its `read_some`/`write_some` register a continuation,
//! suspend, and then issue a single non-blocking syscall.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

/// At most one pending continuation per direction per fd.
#[derive(Default)]
struct FdEvents {
    read: Option<Waker>,
    write: Option<Waker>,
}

/// The listening socket plus the readiness poller.
pub struct Acceptor {
    listener: TcpListener,
    events: RefCell<HashMap<RawFd, FdEvents>>,
}

impl Acceptor {
    /// Binds a non-blocking listener on `addr`.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Rc<Self>> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Rc::new(Self {
            listener,
            events: RefCell::new(HashMap::new()),
        }))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Awaits an incoming connection and yields it as a [`TcpSocket`].
    ///
    /// Takes the acceptor by `Rc` because the socket keeps a handle to the
    /// poller for the rest of its life; call as
    /// `Rc::clone(&acceptor).accept().await`.
    pub async fn accept(self: Rc<Self>) -> io::Result<TcpSocket> {
        loop {
            self.readiness(self.listener.as_raw_fd(), Direction::Read)
                .await;
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    return TcpSocket::new(self, stream);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Blocks in `poll(2)` until at least one fd with a parked continuation
    /// becomes ready, then wakes the matching continuations: `POLLIN` the
    /// read side, `POLLOUT` the write side. Hang-up and error bits wake the
    /// same continuations as readiness — the I/O call that follows surfaces
    /// the actual error.
    ///
    /// A failing `poll` other than `EINTR` is fatal: with the poller gone
    /// no task can ever resume.
    pub fn poll_all(&self) {
        let mut pollfds: Vec<libc::pollfd> = Vec::new();
        {
            let events = self.events.borrow();
            for (&fd, ev) in events.iter() {
                let mut interest: libc::c_short = 0;
                if ev.read.is_some() {
                    interest |= libc::POLLIN;
                }
                if ev.write.is_some() {
                    interest |= libc::POLLOUT;
                }
                if interest != 0 {
                    pollfds.push(libc::pollfd {
                        fd,
                        events: interest,
                        revents: 0,
                    });
                }
            }
        }

        if pollfds.is_empty() {
            // Nothing to wait on; the executor's runnable-queue assertion
            // turns this into a diagnosable deadlock instead of a hang.
            return;
        }

        loop {
            let rc = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, -1) };
            if rc >= 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                panic!("poll(2) failed: {err}");
            }
        }

        let mut events = self.events.borrow_mut();
        for pfd in &pollfds {
            let Some(entry) = events.get_mut(&pfd.fd) else {
                continue;
            };
            if pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0 {
                if let Some(waker) = entry.read.take() {
                    waker.wake();
                }
            }
            if pfd.revents & (libc::POLLOUT | libc::POLLERR | libc::POLLHUP) != 0 {
                if let Some(waker) = entry.write.take() {
                    waker.wake();
                }
            }
        }
    }

    /// Parks `waker` as the continuation for `fd` in the given direction.
    ///
    /// Panics if a *different* task already has a continuation pending on
    /// the same direction of the same fd; re-arming by the same task (a
    /// spurious re-poll) is allowed.
    fn register(&self, fd: RawFd, dir: Direction, waker: &Waker) {
        let mut events = self.events.borrow_mut();
        let entry = events.entry(fd).or_default();
        let slot = match dir {
            Direction::Read => &mut entry.read,
            Direction::Write => &mut entry.write,
        };
        assert!(
            slot.as_ref().is_none_or(|parked| parked.will_wake(waker)),
            "a {dir:?} continuation is already pending for fd {fd}"
        );
        *slot = Some(waker.clone());
    }

    /// Drops any continuations for `fd`; called when a socket closes.
    fn forget(&self, fd: RawFd) {
        self.events.borrow_mut().remove(&fd);
    }

    fn readiness(&self, fd: RawFd, dir: Direction) -> Readiness<'_> {
        Readiness {
            acceptor: self,
            fd,
            dir,
            registered: false,
        }
    }
}

/// The suspension primitive: first poll parks the continuation and
/// suspends; the wake from the poller completes it.
struct Readiness<'a> {
    acceptor: &'a Acceptor,
    fd: RawFd,
    dir: Direction,
    registered: bool,
}

impl Future for Readiness<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.registered {
            return Poll::Ready(());
        }
        this.acceptor.register(this.fd, this.dir, cx.waker());
        this.registered = true;
        Poll::Pending
    }
}

/// One accepted connection, non-blocking, tied to the acceptor's poller.
///
/// Dropping the socket erases its continuations from the poller and closes
/// the fd.
pub struct TcpSocket {
    acceptor: Rc<Acceptor>,
    stream: TcpStream,
}

impl TcpSocket {
    fn new(acceptor: Rc<Acceptor>, stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { acceptor, stream })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Suspends until the socket is readable, then issues one non-blocking
    /// read. Returns `Ok(0)` when the peer has closed.
    pub async fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.stream.as_raw_fd();
        loop {
            self.acceptor.readiness(fd, Direction::Read).await;
            match (&self.stream).read(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                result => return result,
            }
        }
    }

    /// Suspends until the socket is writable, then issues one non-blocking
    /// write.
    pub async fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        let fd = self.stream.as_raw_fd();
        loop {
            self.acceptor.readiness(fd, Direction::Write).await;
            match (&self.stream).write(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                result => return result,
            }
        }
    }

    /// Reads until `buf` is full or the peer closes; returns the bytes
    /// actually read.
    pub async fn read_all(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_some(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Writes the whole of `buf`, looping over partial writes.
    pub async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write_some(&buf[written..]).await?;
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            written += n;
        }
        Ok(())
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        self.acceptor.forget(self.stream.as_raw_fd());
    }
}
