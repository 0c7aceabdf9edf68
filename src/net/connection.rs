use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use super::Error;

const LENGTH_PREFIX: usize = 4;

/// A pure, socket-free splitter for the length-prefixed wire format: a
/// 4-byte little-endian length followed by that many payload bytes.
/// Unit-testable without any I/O.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    content: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            content: BytesMut::new(),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.content.extend_from_slice(bytes);
    }

    /// True once a full frame is buffered.
    pub fn ready(&self) -> bool {
        if self.content.len() < LENGTH_PREFIX {
            return false;
        }
        let len = LittleEndian::read_u32(&self.content[..LENGTH_PREFIX]) as usize;
        self.content.len() >= LENGTH_PREFIX + len
    }

    /// Remove and return the first buffered frame's payload. Panics if
    /// `ready()` was false; callers must check first.
    pub fn take_frame(&mut self) -> Bytes {
        assert!(self.ready(), "take_frame called without a ready frame");
        let len = LittleEndian::read_u32(&self.content[..LENGTH_PREFIX]) as usize;
        self.content.advance(LENGTH_PREFIX);
        self.content.split_to(len).freeze()
    }

    pub fn encode_frame(payload: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(LENGTH_PREFIX + payload.len());
        let mut len_bytes = [0u8; LENGTH_PREFIX];
        LittleEndian::write_u32(&mut len_bytes, payload.len() as u32);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(payload);
        out.freeze()
    }
}

/// Wraps a `TcpStream` with a `FrameBuffer`, feeding it from the socket as
/// needed and writing framed replies back out.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: FrameBuffer,
    read_buf: [u8; 1024],
}

impl Connection {
    pub fn new(socket: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(socket),
            buffer: FrameBuffer::new(),
            read_buf: [0u8; 1024],
        }
    }

    /// Reads frames from the socket until one is complete, or returns `None`
    /// on a clean shutdown (peer closed with no partial frame buffered).
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            if self.buffer.ready() {
                return Ok(Some(self.buffer.take_frame()));
            }

            let n = self.stream.get_mut().read(&mut self.read_buf).await?;
            if n == 0 {
                if self.buffer.content.is_empty() {
                    return Ok(None);
                }
                return Err(Error::ConnectionReset);
            }
            self.buffer.extend(&self.read_buf[..n]);
        }
    }

    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), Error> {
        let frame = FrameBuffer::encode_frame(payload);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
