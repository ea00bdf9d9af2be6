//! Length-prefixed framing shared by both lanes.
//!
//! Every message travels as a 4-byte big-endian length followed by that many
//! payload bytes. The prefix covers the payload only, never itself. Frames
//! larger than [`MAX_FRAME_LEN`] are refused on both sides before any
//! payload allocation happens.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

/// Upper bound on a frame payload. 16 MiB.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Writes one frame: the payload's length, then the payload, then a flush.
///
/// # Errors
///
/// Fails with `InvalidInput` when the payload exceeds [`MAX_FRAME_LEN`], and
/// otherwise surfaces the underlying I/O error.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds the {MAX_FRAME_LEN} byte limit", payload.len()),
        ));
    }
    // The check above keeps the length within u32 range.
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Reads one frame payload.
///
/// Returns `Ok(None)` on a clean end of stream, meaning the peer closed the
/// connection exactly at a frame boundary. A close mid-header or mid-payload
/// is an `UnexpectedEof` error instead.
///
/// # Errors
///
/// Fails with `InvalidData` when the declared length exceeds
/// [`MAX_FRAME_LEN`], with `UnexpectedEof` on a truncated frame, and
/// otherwise surfaces the underlying I/O error.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside a frame header",
            ));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame declares {len} bytes, above the {MAX_FRAME_LEN} byte limit"),
        ));
    }

    let mut payload = vec![0; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_frame(&mut client, b"first").await.expect("write");
        write_frame(&mut client, b"").await.expect("write empty");
        drop(client);

        assert_eq!(
            read_frame(&mut server).await.expect("read"),
            Some(b"first".to_vec())
        );
        assert_eq!(read_frame(&mut server).await.expect("read"), Some(Vec::new()));
        assert_eq!(read_frame(&mut server).await.expect("clean eof"), None);
    }

    #[tokio::test]
    async fn close_at_a_boundary_is_not_an_error() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert_eq!(read_frame(&mut server).await.expect("clean eof"), None);
    }

    #[tokio::test]
    async fn close_inside_a_header_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &[0, 0])
            .await
            .expect("partial header");
        drop(client);

        let err = read_frame(&mut server).await.expect_err("truncated header");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn close_inside_a_payload_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &8_u32.to_be_bytes())
            .await
            .expect("header");
        tokio::io::AsyncWriteExt::write_all(&mut client, b"abc")
            .await
            .expect("partial payload");
        drop(client);

        let err = read_frame(&mut server).await.expect_err("truncated payload");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn oversize_declarations_are_refused_without_allocation() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let declared = (MAX_FRAME_LEN as u32) + 1;
        tokio::io::AsyncWriteExt::write_all(&mut client, &declared.to_be_bytes())
            .await
            .expect("header");

        let err = read_frame(&mut server).await.expect_err("oversize");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn oversize_writes_are_refused() {
        let (mut client, _server) = tokio::io::duplex(64);
        let payload = vec![0; MAX_FRAME_LEN + 1];
        let err = write_frame(&mut client, &payload).await.expect_err("oversize");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
