/*!
 * Cancellable Byte Sources
 *
 * Upstream byte sources whose blocking reads can be abandoned on cancellation.
 *
 * # Contract
 *
 * `read_cancellable` must not touch `buf` after it returns. For sources whose
 * reads can block forever (pipes), `ThreadedSource` performs the read on a
 * dedicated thread into a private scratch buffer, so an abandoned read can
 * never write into a chunk that has already gone back to the pool.
 */

use crate::core::limits::READER_THREAD_NAME;
use crate::core::sync::CancellationToken;
use std::io::{self, Read};
use std::thread;
use tracing::{debug, trace};

/// Outcome of one cancellable read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRead {
    /// `n` bytes were written to the front of the buffer
    Data(usize),
    /// The source has no more data
    Ended,
    /// Cancellation fired before data arrived
    Cancelled,
}

impl SourceRead {
    /// Bytes produced, treating end and cancellation alike
    pub fn len(&self) -> usize {
        match self {
            SourceRead::Data(n) => *n,
            SourceRead::Ended | SourceRead::Cancelled => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pull-based byte source with a cancellable read
pub trait CancellableSource: Send {
    /// Read up to `buf.len()` bytes, giving up once `token` is cancelled
    ///
    /// Errors other than cancellation are returned as `Err`.
    fn read_cancellable(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> io::Result<SourceRead>;
}

impl<S: CancellableSource + ?Sized> CancellableSource for Box<S> {
    fn read_cancellable(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> io::Result<SourceRead> {
        (**self).read_cancellable(buf, token)
    }
}

impl<S: CancellableSource + ?Sized> CancellableSource for &mut S {
    fn read_cancellable(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> io::Result<SourceRead> {
        (**self).read_cancellable(buf, token)
    }
}

/// Adapter for readers that never block indefinitely (files, in-memory cursors)
///
/// Cancellation is checked before each read; the read itself runs on the
/// calling thread directly into the caller's buffer.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> CancellableSource for ReaderSource<R> {
    fn read_cancellable(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> io::Result<SourceRead> {
        loop {
            if token.is_cancelled() {
                return Ok(SourceRead::Cancelled);
            }
            match self.inner.read(buf) {
                Ok(0) => return Ok(SourceRead::Ended),
                Ok(n) => return Ok(SourceRead::Data(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reply from the reader thread: its scratch buffer and the read result
struct Reply {
    scratch: Vec<u8>,
    result: io::Result<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadedState {
    Ready,
    Ended,
    /// A read was abandoned on cancellation; its late result is discarded
    Abandoned,
}

/// Adapter for readers that may block forever (pipes, sockets)
///
/// A dedicated reader thread performs each blocking read into a scratch
/// buffer it owns for the duration of the read. The caller races the reply
/// against cancellation; whichever resolves first wins. Successful data is
/// copied out of the scratch buffer, so the caller's buffer is never shared
/// with the reader thread.
///
/// Once a read has been abandoned the source stays cancelled: every later
/// call reports `Cancelled` and the abandoned result is dropped unread.
pub struct ThreadedSource {
    requests: Option<flume::Sender<Vec<u8>>>,
    replies: flume::Receiver<Reply>,
    scratch: Option<Vec<u8>>,
    state: ThreadedState,
}

impl ThreadedSource {
    /// Move `reader` onto a new reader thread
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        let (requests, request_rx) = flume::bounded::<Vec<u8>>(1);
        let (reply_tx, replies) = flume::bounded::<Reply>(1);

        thread::Builder::new()
            .name(READER_THREAD_NAME.to_string())
            .spawn(move || reader_loop(reader, request_rx, reply_tx))?;

        Ok(Self {
            requests: Some(requests),
            replies,
            scratch: Some(Vec::new()),
            state: ThreadedState::Ready,
        })
    }
}

fn reader_loop<R: Read>(
    mut reader: R,
    requests: flume::Receiver<Vec<u8>>,
    replies: flume::Sender<Reply>,
) {
    while let Ok(mut scratch) = requests.recv() {
        let result = loop {
            match reader.read(&mut scratch) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let finished = !matches!(result, Ok(n) if n > 0);

        if replies.send(Reply { scratch, result }).is_err() {
            trace!("Read result discarded; requester is gone");
            break;
        }
        if finished {
            break;
        }
    }
    debug!("Reader thread exiting");
}

enum Race {
    Completed(Result<Reply, flume::RecvError>),
    Cancelled,
}

impl CancellableSource for ThreadedSource {
    fn read_cancellable(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> io::Result<SourceRead> {
        match self.state {
            ThreadedState::Ended => return Ok(SourceRead::Ended),
            ThreadedState::Abandoned => return Ok(SourceRead::Cancelled),
            ThreadedState::Ready => {}
        }
        if token.is_cancelled() {
            return Ok(SourceRead::Cancelled);
        }

        let mut scratch = self.scratch.take().unwrap_or_default();
        scratch.resize(buf.len(), 0);

        let sent = match &self.requests {
            Some(requests) => requests.send(scratch).is_ok(),
            None => false,
        };
        if !sent {
            self.state = ThreadedState::Ended;
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "reader thread exited",
            ));
        }

        let race = flume::Selector::new()
            .recv(&self.replies, Race::Completed)
            .recv(token.signal(), |_| Race::Cancelled)
            .wait();

        match race {
            Race::Cancelled => {
                // The in-flight read keeps its scratch buffer. Hanging up makes
                // the thread exit once that read returns; its reply is never consumed.
                self.state = ThreadedState::Abandoned;
                self.requests = None;
                debug!("Source read abandoned on cancellation");
                Ok(SourceRead::Cancelled)
            }
            Race::Completed(Err(_)) => {
                self.state = ThreadedState::Ended;
                Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "reader thread exited without replying",
                ))
            }
            Race::Completed(Ok(Reply { scratch, result })) => {
                let outcome = match result {
                    Ok(0) => {
                        self.state = ThreadedState::Ended;
                        Ok(SourceRead::Ended)
                    }
                    Ok(n) => {
                        buf[..n].copy_from_slice(&scratch[..n]);
                        Ok(SourceRead::Data(n))
                    }
                    Err(e) => {
                        self.state = ThreadedState::Ended;
                        Err(e)
                    }
                };
                self.scratch = Some(scratch);
                outcome
            }
        }
    }
}
