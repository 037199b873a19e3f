//! Wrapper-function calls over a reliable byte stream.
//!
//! The client side is a [`Dispatch`] that forwards each call as one
//! [`Request::Call`] frame; the server side feeds frames to another
//! [`Dispatch`] (usually a [`Registry`](crate::Registry)) and answers with
//! the result bytes or the out-of-band message.

use std::io::{self, Read, Write};
use std::sync::Mutex;

use sps::WrapperFunctionResult;
use sps_proto::{FrameError, Request, Response};

use crate::dispatch::{Dispatch, FnTag};

/// A [`Dispatch`] that sends calls to a server over a stream.
///
/// Calls are serialized on an internal lock; one request is in flight at a
/// time.
#[derive(Debug)]
pub struct StreamClient<S> {
    /// The connection, held for one request/response exchange at a time.
    stream: Mutex<S>,
}

impl<S: Read + Write> StreamClient<S> {
    /// Wraps an already connected stream.
    pub const fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    /// Sends a ping and waits for a pong.
    pub fn ping(&self) -> Result<(), FrameError> {
        self.expect(&Request::Ping, |r| matches!(r, Response::Pong))
    }

    /// Asks the server to stop accepting connections.
    pub fn shutdown(&self) -> Result<(), FrameError> {
        self.expect(&Request::Shutdown, |r| matches!(r, Response::Ok))
    }

    /// Sends `req` and checks the reply with `ok`.
    fn expect(&self, req: &Request, ok: impl FnOnce(&Response) -> bool) -> Result<(), FrameError> {
        let resp = self.roundtrip(req)?;
        if ok(&resp) {
            Ok(())
        } else {
            Err(unexpected(&resp).into())
        }
    }

    /// Writes one request frame and reads one response frame.
    fn roundtrip(&self, req: &Request) -> Result<Response, FrameError> {
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| io::Error::other("stream lock poisoned"))?;
        sps_proto::encode(&mut *stream, req)?;
        sps_proto::decode(&mut *stream)
    }
}

#[cfg(unix)]
impl StreamClient<std::os::unix::net::UnixStream> {
    /// Connects to a server listening on a Unix socket.
    pub fn connect(path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        std::os::unix::net::UnixStream::connect(path).map(Self::new)
    }
}

impl<S: Read + Write> Dispatch for StreamClient<S> {
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        let req = Request::Call {
            tag: tag.0,
            args: args.to_vec(),
        };
        match self.roundtrip(&req) {
            Ok(Response::Result(bytes)) => WrapperFunctionResult::copy_from(&bytes),
            Ok(Response::OutOfBandError(msg)) => WrapperFunctionResult::create_out_of_band_error(msg),
            Ok(other) => WrapperFunctionResult::create_out_of_band_error(unexpected(&other).to_string()),
            Err(e) => WrapperFunctionResult::create_out_of_band_error(format!("transport error: {e}")),
        }
    }
}

/// Error for a response that does not answer the request sent.
fn unexpected(resp: &Response) -> io::Error {
    io::Error::other(format!("unexpected response: {resp:?}"))
}

/// How a served connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Session {
    /// The peer closed the stream.
    Closed,
    /// The peer sent [`Request::Shutdown`].
    Shutdown,
}

/// Answers requests read from `r` on `w` until the peer closes the stream
/// or asks for shutdown.
///
/// A stream that ends inside a frame is reported as
/// [`FrameError::Truncated`].
pub fn serve_connection<R, W, D>(r: &mut R, w: &mut W, dispatcher: &D) -> Result<Session, FrameError>
where
    R: Read,
    W: Write,
    D: Dispatch + ?Sized,
{
    loop {
        let req: Request = match sps_proto::decode(r) {
            Ok(req) => req,
            Err(e) if e.is_eof() => return Ok(Session::Closed),
            Err(e) => return Err(e),
        };

        match req {
            Request::Call { tag, args } => {
                let fn_tag = FnTag(tag);
                let result = dispatcher.dispatch(fn_tag, &args);
                tracing::trace!(tag = %fn_tag, arg_len = args.len(), result_len = result.size(), "call");
                let resp = match result.out_of_band_error() {
                    Some(msg) => Response::OutOfBandError(msg.to_string_lossy().into_owned()),
                    None => Response::Result(result.data().to_vec()),
                };
                sps_proto::encode(w, &resp)?;
            }
            Request::Ping => sps_proto::encode(w, &Response::Pong)?,
            Request::Shutdown => {
                tracing::debug!("shutdown requested");
                sps_proto::encode(w, &Response::Ok)?;
                return Ok(Session::Shutdown);
            }
            other => {
                tracing::warn!(request = ?other, "unsupported request");
                sps_proto::encode(
                    w,
                    &Response::OutOfBandError(format!("unsupported request: {other:?}")),
                )?;
            }
        }
    }
}

#[cfg(unix)]
pub use unix::serve_unix;

/// Unix-socket server.
#[cfg(unix)]
mod unix {
    use std::io::{self, BufReader, BufWriter};
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::{Session, serve_connection};
    use crate::dispatch::Dispatch;

    /// Accepts connections on `listener`, serving each on its own thread,
    /// until a client sends [`Request::Shutdown`](sps_proto::Request::Shutdown).
    pub fn serve_unix<D>(listener: &UnixListener, dispatcher: Arc<D>) -> io::Result<()>
    where
        D: Dispatch + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let wake_path = listener
            .local_addr()?
            .as_pathname()
            .map(std::path::Path::to_path_buf);

        for incoming in listener.incoming() {
            if stop.load(Ordering::Acquire) {
                break;
            }
            let stream = match incoming {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            tracing::debug!("connection accepted");

            let handler = Arc::clone(&dispatcher);
            let stop_flag = Arc::clone(&stop);
            let wake = wake_path.clone();
            std::thread::spawn(move || match session(stream, &*handler) {
                Ok(Session::Closed) => tracing::debug!("connection closed"),
                Ok(Session::Shutdown) => {
                    stop_flag.store(true, Ordering::Release);
                    // Unblock the accept loop so it observes the flag.
                    if let Some(path) = wake {
                        let _ = UnixStream::connect(path);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "session error"),
            });
        }
        Ok(())
    }

    /// Serves one accepted connection through buffered halves.
    fn session<D: Dispatch + ?Sized>(
        stream: UnixStream,
        dispatcher: &D,
    ) -> Result<Session, sps_proto::FrameError> {
        let mut r = BufReader::new(stream.try_clone()?);
        let mut w = BufWriter::new(stream);
        serve_connection(&mut r, &mut w, dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use sps::SpsString;

    use super::*;
    use crate::error::Error;
    use crate::registry::Registry;
    use crate::wrapper::WrapperFunction;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register::<fn(SpsString) -> SpsString, _, _, _>(FnTag(1), |s: String| s.to_uppercase());
        reg
    }

    #[test]
    fn serve_connection_answers_in_order() {
        let mut input = Vec::new();
        sps_proto::encode(&mut input, &Request::Ping).unwrap();
        sps_proto::encode(
            &mut input,
            &Request::Call {
                tag: 1,
                args: vec![2, 0, 0, 0, 0, 0, 0, 0, b'o', b'k'],
            },
        )
        .unwrap();
        sps_proto::encode(&mut input, &Request::Call { tag: 9, args: vec![] }).unwrap();

        let mut output = Vec::new();
        let end = serve_connection(&mut Cursor::new(input), &mut output, &registry()).unwrap();
        assert_eq!(end, Session::Closed);

        let mut out = Cursor::new(output);
        assert_eq!(sps_proto::decode::<Response>(&mut out).unwrap(), Response::Pong);
        assert_eq!(
            sps_proto::decode::<Response>(&mut out).unwrap(),
            Response::Result(vec![2, 0, 0, 0, 0, 0, 0, 0, b'O', b'K'])
        );
        assert_eq!(
            sps_proto::decode::<Response>(&mut out).unwrap(),
            Response::OutOfBandError("no wrapper function registered for tag 0x9".into())
        );
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut input = Vec::new();
        sps_proto::encode(&mut input, &Request::Shutdown).unwrap();
        sps_proto::encode(&mut input, &Request::Ping).unwrap();

        let mut output = Vec::new();
        let end = serve_connection(&mut Cursor::new(input), &mut output, &registry()).unwrap();
        assert_eq!(end, Session::Shutdown);

        let mut out = Cursor::new(output);
        assert_eq!(sps_proto::decode::<Response>(&mut out).unwrap(), Response::Ok);
        assert!(sps_proto::decode::<Response>(&mut out).unwrap_err().is_eof());
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut input = Vec::new();
        sps_proto::encode(&mut input, &Request::Ping).unwrap();
        sps_proto::encode(&mut input, &Request::Call { tag: 1, args: vec![0; 10] }).unwrap();
        input.truncate(input.len() - 3);

        let mut output = Vec::new();
        let err = serve_connection(&mut Cursor::new(input), &mut output, &registry()).unwrap_err();
        assert!(matches!(err, FrameError::Truncated));

        let mut out = Cursor::new(output);
        assert_eq!(sps_proto::decode::<Response>(&mut out).unwrap(), Response::Pong);
    }

    #[cfg(unix)]
    #[test]
    fn call_over_unix_socket() {
        use std::os::unix::net::UnixListener;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sps.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = std::thread::spawn(move || serve_unix(&listener, Arc::new(registry())));

        let client = StreamClient::connect(&path).unwrap();
        client.ping().unwrap();

        let s: String =
            WrapperFunction::<fn(SpsString) -> SpsString>::call_with(&client, FnTag(1), ("abc",))
                .unwrap();
        assert_eq!(s, "ABC");

        let err = WrapperFunction::<fn()>::call_with::<_, (), _>(&client, FnTag(2), ()).unwrap_err();
        assert!(matches!(err, Error::OutOfBand(m) if m.contains("tag 0x2")));

        client.shutdown().unwrap();
        server.join().unwrap().unwrap();
    }

    #[test]
    fn broken_stream_is_out_of_band() {
        let client = StreamClient::new(Cursor::new(Vec::new()));
        let r = client.dispatch(FnTag(1), &[]);
        let msg = r.out_of_band_error().unwrap().to_string_lossy().into_owned();
        assert!(msg.starts_with("transport error"), "{msg}");
    }
}
