//! Buffered line reading over one non-blocking descriptor.
//!
//! IRC and the command protocol are line-oriented, but the transport
//! delivers bytes in arbitrary chunks. [`BufferedStream`] decouples
//! "bytes available" from "lines consumable": the reactor fills the
//! buffer whenever a descriptor is ready and then drains every complete
//! line, with no per-source framing logic.
//!
//! Incoming bytes land in a queue of fixed-size blocks. Blocks drained by
//! line extraction go back to a small reuse pool instead of the allocator,
//! which keeps steady-state traffic allocation-free.

use std::collections::VecDeque;
use std::io;

use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::net::unix::pipe;
use tracing::warn;

/// Bytes per buffer block.
const BLOCK_SIZE: usize = 200;

/// Maximum number of drained blocks kept for reuse.
const MAX_POOL: usize = 4;

/// One readable descriptor: a server socket or a command pipe.
///
/// Command pipes are opened read-write so the FIFO stays open across
/// writers and never reads EOF.
pub enum Source {
    Tcp(TcpStream),
    Fifo(pipe::Receiver),
}

impl Source {
    /// Wait until the descriptor is ready for reading.
    pub async fn readable(&self) -> io::Result<()> {
        match self {
            Source::Tcp(sock) => sock.ready(Interest::READABLE).await.map(|_| ()),
            Source::Fifo(rx) => rx.readable().await,
        }
    }

    /// Non-blocking read; `WouldBlock` when no data is queued.
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Tcp(sock) => sock.try_read(buf),
            Source::Fifo(rx) => rx.try_read(buf),
        }
    }

    /// Non-blocking write; only sockets accept output.
    pub fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Source::Tcp(sock) => sock.try_write(buf),
            Source::Fifo(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "command pipes are read-only",
            )),
        }
    }
}

/// Outcome of one [`BufferedStream::fill`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillStatus {
    /// Descriptor drained until it would block; still open.
    Open,
    /// The peer closed the stream without error.
    Closed,
    /// The read failed.
    Failed(io::ErrorKind),
}

struct Block {
    data: [u8; BLOCK_SIZE],
    /// Bytes written so far.
    len: usize,
    /// Bytes already delivered through `take_line`.
    pos: usize,
}

impl Block {
    fn new() -> Block {
        Block {
            data: [0; BLOCK_SIZE],
            len: 0,
            pos: 0,
        }
    }
}

/// Chunked read buffer over one non-blocking descriptor.
pub struct BufferedStream {
    source: Option<Source>,
    blocks: VecDeque<Block>,
    pool: Vec<Block>,
    pending_lines: usize,
    closed_gracefully: bool,
    last_error: Option<io::ErrorKind>,
}

impl Default for BufferedStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedStream {
    /// A stream with no descriptor attached. `fill` is a no-op until
    /// [`attach`](Self::attach) is called.
    pub fn new() -> BufferedStream {
        BufferedStream {
            source: None,
            blocks: VecDeque::new(),
            pool: Vec::new(),
            pending_lines: 0,
            closed_gracefully: false,
            last_error: None,
        }
    }

    pub fn attach(&mut self, source: Source) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Number of complete lines buffered and not yet taken.
    pub fn pending_lines(&self) -> usize {
        self.pending_lines
    }

    /// Whether the peer ended the stream without error.
    pub fn closed_gracefully(&self) -> bool {
        self.closed_gracefully
    }

    pub fn last_error(&self) -> Option<io::ErrorKind> {
        self.last_error
    }

    /// Read until the descriptor would block, the peer closes, or the read
    /// fails. Never blocks the caller; buffered lines survive any outcome
    /// and can still be drained afterwards.
    pub fn fill(&mut self) -> FillStatus {
        let mut chunk = [0u8; BLOCK_SIZE];
        loop {
            let result = match self.source.as_ref() {
                Some(source) => source.try_read(&mut chunk),
                None => return FillStatus::Open,
            };
            match result {
                Ok(0) => {
                    self.closed_gracefully = true;
                    return FillStatus::Closed;
                }
                Ok(n) => self.push_bytes(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return FillStatus::Open,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last_error = Some(e.kind());
                    return FillStatus::Failed(e.kind());
                }
            }
        }
    }

    /// Append bytes to the block queue, counting newlines. This is the
    /// path `fill` feeds; it is public so callers owning their own read
    /// loop (and tests) can supply arbitrary chunkings.
    pub fn push_bytes(&mut self, mut bytes: &[u8]) {
        self.pending_lines += bytes.iter().filter(|&&b| b == b'\n').count();

        while !bytes.is_empty() {
            if self.blocks.back().is_none_or(|b| b.len == BLOCK_SIZE) {
                let block = match self.pool.pop() {
                    Some(mut b) => {
                        b.len = 0;
                        b.pos = 0;
                        b
                    }
                    None => Block::new(),
                };
                self.blocks.push_back(block);
            }
            let back = self.blocks.back_mut().expect("block just pushed");
            let n = (BLOCK_SIZE - back.len).min(bytes.len());
            back.data[back.len..back.len + n].copy_from_slice(&bytes[..n]);
            back.len += n;
            bytes = &bytes[n..];
        }
    }

    /// Take the oldest complete line, without its newline and with one
    /// trailing carriage return stripped. Returns `None` (and touches
    /// nothing) when no complete line is buffered. Lines may span any
    /// number of blocks; fully consumed full blocks go back to the pool.
    pub fn take_line(&mut self) -> Option<String> {
        if self.pending_lines == 0 {
            return None;
        }

        let mut line = Vec::new();
        loop {
            let front = self.blocks.front_mut()?;
            let unread = &front.data[front.pos..front.len];
            match unread.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    line.extend_from_slice(&unread[..idx]);
                    front.pos += idx + 1;
                    if front.pos == front.len && front.len == BLOCK_SIZE {
                        let block = self.blocks.pop_front().expect("front exists");
                        self.recycle(block);
                    }
                    break;
                }
                None => {
                    line.extend_from_slice(unread);
                    front.pos = front.len;
                    if front.len == BLOCK_SIZE {
                        let block = self.blocks.pop_front().expect("front exists");
                        self.recycle(block);
                    } else {
                        // Partial tail block without a newline; the counter
                        // said one exists, so this cannot be the last block.
                        return None;
                    }
                }
            }
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.pending_lines -= 1;

        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Write a full buffer without blocking. A partial acceptance is
    /// retried immediately; `WouldBlock` drops the remainder rather than
    /// stalling the loop.
    pub fn try_write_all(&self, mut bytes: &[u8]) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        while !bytes.is_empty() {
            match source.try_write(bytes) {
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    warn!(dropped = bytes.len(), "outbound buffer full, dropping line tail");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "outbound write failed");
                    return;
                }
            }
        }
    }

    /// Release every block (active and pooled) and detach the descriptor.
    pub fn close(&mut self) {
        self.blocks.clear();
        self.pool.clear();
        self.pending_lines = 0;
        self.source = None;
    }

    fn recycle(&mut self, block: Block) {
        if self.pool.len() < MAX_POOL {
            self.pool.push(block);
        }
    }

    #[cfg(test)]
    fn pool_len(&self) -> usize {
        self.pool.len()
    }
}
