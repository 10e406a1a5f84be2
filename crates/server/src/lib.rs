//! # Server — TCP glue for the redka engine
//!
//! One detached task per accepted connection. Each task reads request
//! frames, classifies them ([`request::classify`]), runs them against the
//! shared engine, and writes the response. The engine is shared as
//! `Rc<RefCell<Engine>>`: the runtime is single-threaded and engine calls
//! contain no suspension point, so a borrow never lives across an await.
//!
//! ## Responses
//!
//! | Request | Success                          | Failure            |
//! |---------|----------------------------------|--------------------|
//! | create  | the freshly allocated 36-byte id | `'2'`, close       |
//! | update  | echo of the id                   | `'2'`, close       |
//! | read    | serialized merged record         | `'0'` (unknown id) |
//! | —       |                                  | `'1'`, close       |
//!
//! Statuses are single ASCII digits without a newline. `'1'` (malformed
//! frame) and `'2'` (execution failure) close the connection; `'0'` is an
//! ordinary response and the connection stays open.

pub mod request;

use std::cell::RefCell;
use std::rc::Rc;

use engine::Engine;
use runtime::TcpSocket;
use tracing::{debug, error};
use uuid::Uuid;

use crate::request::{classify, Request, Status, FRAME_SIZE};

/// Serves one connection until the peer disconnects, a frame is rejected,
/// or an I/O error ends the task.
pub async fn handle_client(socket: TcpSocket, engine: Rc<RefCell<Engine>>) {
    let mut buf = [0u8; FRAME_SIZE];
    loop {
        let n = match socket.read_some(&mut buf).await {
            Ok(0) => {
                debug!("client disconnected");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "read failed");
                return;
            }
        };

        let frame = &buf[..n];
        debug!(frame = %String::from_utf8_lossy(frame), "received frame");

        let (response, close) = respond(frame, &engine);
        if let Err(e) = socket.write_all(response.as_bytes()).await {
            debug!(error = %e, "write failed");
            return;
        }
        if close {
            return;
        }
    }
}

/// Executes one classified frame; returns the response bytes and whether
/// the connection must close afterwards.
pub fn respond(frame: &[u8], engine: &Rc<RefCell<Engine>>) -> (String, bool) {
    match classify(frame) {
        Some(Request::Create(fields)) => {
            let id = Uuid::new_v4().to_string();
            match engine.borrow_mut().create(&id, &fields) {
                Ok(()) => (id, false),
                Err(e) => {
                    error!(error = %e, "create failed");
                    (Status::Rejected.as_str().to_string(), true)
                }
            }
        }
        Some(Request::Update { id, fields }) => match engine.borrow_mut().update(&id, &fields) {
            Ok(()) => (id, false),
            Err(e) => {
                error!(error = %e, id, "update failed");
                (Status::Rejected.as_str().to_string(), true)
            }
        },
        Some(Request::Read { id }) => match engine.borrow_mut().read(&id) {
            Ok(Some(record)) => (record.to_string(), false),
            Ok(None) => (Status::UnknownId.as_str().to_string(), false),
            Err(e) => {
                error!(error = %e, id, "read failed");
                (Status::Rejected.as_str().to_string(), true)
            }
        },
        None => (Status::Malformed.as_str().to_string(), true),
    }
}
