/*!
 * Cancellation Tests
 * Cancelling source reads ends the stream gracefully on the consumer side
 */

use pipe_bridge::{
    init_tracing, BridgeError, CancellableSource, CancellationToken, SourceRead, StreamBridge,
    ThreadedSource,
};
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Pipe whose writer never sends anything
struct SilentPipe;

impl Read for SilentPipe {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        loop {
            thread::park();
        }
    }
}

/// Pipe that delivers one payload once the test releases it
struct GatedPipe {
    gate: Arc<Barrier>,
    payload: &'static [u8],
    sent: bool,
}

impl Read for GatedPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Ok(0);
        }
        self.gate.wait();
        self.sent = true;
        buf[..self.payload.len()].copy_from_slice(self.payload);
        Ok(self.payload.len())
    }
}

struct BrokenPipe;

impl Read for BrokenPipe {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broken"))
    }
}

#[test]
fn test_cancellation_ends_blocked_read() {
    init_tracing();

    let (writer, mut reader) = StreamBridge::new().split();
    let token = CancellationToken::new();
    let source = ThreadedSource::spawn(SilentPipe).unwrap();
    let fill = writer.spawn_fill_loop(source, token.clone()).unwrap();

    let delay = Duration::from_millis(100);
    token.cancel_after(delay).unwrap();

    let start = Instant::now();
    let mut buf = [0u8; 64];
    assert_eq!(reader.read(&mut buf), 0);
    assert!(start.elapsed() < delay * 10);

    assert_eq!(fill.join().unwrap(), 0);
    assert!(reader.is_completed());
}

#[test]
fn test_data_before_cancellation_is_delivered() {
    let (writer, mut reader) = StreamBridge::new().split();
    let token = CancellationToken::new();

    // Chained so the fill loop blocks on the silent pipe after the prefix
    let pipe = Cursor::new(b"prefix".to_vec()).chain(SilentPipe);
    let fill = writer
        .spawn_fill_loop(ThreadedSource::spawn(pipe).unwrap(), token.clone())
        .unwrap();

    let mut buf = [0u8; 6];
    assert_eq!(reader.read(&mut buf), 6);
    assert_eq!(&buf, b"prefix");

    token.cancel();
    assert_eq!(reader.read(&mut buf), 0);
    assert_eq!(fill.join().unwrap(), 6);
}

/// Cancellation racing a completing read is an accepted nondeterminism:
/// either the data is delivered or the read reports cancelled. Both are
/// valid; what must hold is that a cancelled read never delivers later.
#[test]
fn test_cancel_racing_completion_is_either_outcome() {
    for _ in 0..20 {
        let gate = Arc::new(Barrier::new(2));
        let pipe = GatedPipe {
            gate: gate.clone(),
            payload: b"race",
            sent: false,
        };
        let mut source = ThreadedSource::spawn(pipe).unwrap();
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                gate.wait();
                token.cancel();
            })
        };

        let mut buf = [0u8; 16];
        match source.read_cancellable(&mut buf, &token).unwrap() {
            SourceRead::Data(n) => assert_eq!(&buf[..n], b"race"),
            SourceRead::Cancelled => {
                assert_eq!(
                    source.read_cancellable(&mut buf, &token).unwrap(),
                    SourceRead::Cancelled
                );
            }
            SourceRead::Ended => panic!("source ended before delivering its payload"),
        }

        canceller.join().unwrap();
    }
}

#[test]
fn test_cancelled_fill_returns_chunk_to_pool() {
    let bridge = StreamBridge::new();
    let pool = bridge.pool().clone();
    let (mut writer, _reader) = bridge.split();

    let token = CancellationToken::new();
    token.cancel();
    let mut source = ThreadedSource::spawn(SilentPipe).unwrap();

    assert!(!writer.fill_from_source(&mut source, &token).unwrap());
    writer.signal_completion();

    let stats = pool.stats();
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.available, 1);
}

#[test]
fn test_source_failure_propagates_and_completes() {
    let (writer, mut reader) = StreamBridge::new().split();
    let token = CancellationToken::new();
    let fill = writer
        .spawn_fill_loop(ThreadedSource::spawn(BrokenPipe).unwrap(), token)
        .unwrap();

    match fill.join() {
        Err(BridgeError::SourceReadFailed(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected source failure, got {:?}", other),
    }

    let mut buf = [0u8; 8];
    assert_eq!(reader.read(&mut buf), 0);
    assert_eq!(reader.stats().pool.outstanding, 0);
}
