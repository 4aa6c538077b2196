//! NUL-delimited frame codec for the client↔router TCP stream.
//!
//! Every message between client and router is one frame terminated by a NUL
//! byte. A frame body may itself contain newlines (the full quote listing and
//! the position report are multi-line), which is why the delimiter is NUL and
//! not `\n`.

use super::{CommsError, MAX_MESSAGE};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads the next frame, or `None` once the peer has closed the stream.
///
/// The read itself is capped at one byte past [`MAX_MESSAGE`], so a peer
/// streaming data with no terminator is rejected at the cap instead of
/// being buffered without bound. A final unterminated frame before EOF is
/// still delivered; the original protocol treats whatever arrived before
/// the close as the last message.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>, CommsError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buf = Vec::new();
    let mut capped = reader.take(MAX_MESSAGE as u64 + 1);
    let n = capped.read_until(b'\0', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_MESSAGE {
        return Err(CommsError::FrameTooLarge);
    }
    if buf.last() == Some(&b'\0') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Writes one frame and its NUL terminator.
pub async fn write_frame<W>(writer: &mut W, body: &str) -> Result<(), CommsError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() >= MAX_MESSAGE {
        return Err(CommsError::FrameTooLarge);
    }
    writer.write_all(body.as_bytes()).await?;
    writer.write_all(b"\0").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn round_trips_frames_including_newlines() {
        let (client, server) = tokio::io::duplex(1024);
        let (_read_half, mut write_half) = tokio::io::split(client);
        let (read_half, _keep) = tokio::io::split(server);
        let mut reader = BufReader::new(read_half);

        write_frame(&mut write_half, "quote").await.unwrap();
        write_frame(&mut write_half, "GOOG 100.000000\nTSLA 250.000000\n")
            .await
            .unwrap();

        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), "quote");
        assert_eq!(
            read_frame(&mut reader).await.unwrap().unwrap(),
            "GOOG 100.000000\nTSLA 250.000000\n"
        );
    }

    #[tokio::test]
    async fn eof_yields_none_and_final_partial_frame_is_delivered() {
        let (client, server) = tokio::io::duplex(1024);
        let (_read_half, mut write_half) = tokio::io::split(client);
        let (read_half, _keep) = tokio::io::split(server);
        let mut reader = BufReader::new(read_half);

        write_half.write_all(b"position").await.unwrap();
        drop(write_half);

        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), "position");
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_oversized_frames() {
        let (client, server) = tokio::io::duplex(64);
        let (_read_half, mut write_half) = tokio::io::split(client);
        let (_server_read, _server_write) = tokio::io::split(server);

        let big = "x".repeat(MAX_MESSAGE + 1);
        assert!(matches!(
            write_frame(&mut write_half, &big).await,
            Err(CommsError::FrameTooLarge)
        ));
    }

    #[tokio::test]
    async fn unterminated_stream_is_rejected_at_the_cap() {
        let (client, server) = tokio::io::duplex(1024);
        let (_read_half, mut write_half) = tokio::io::split(client);
        let (read_half, _keep) = tokio::io::split(server);
        let mut reader = BufReader::new(read_half);

        // A peer streaming bytes with no NUL terminator in sight.
        tokio::spawn(async move {
            let chunk = vec![b'x'; MAX_MESSAGE + 16];
            let _ = write_half.write_all(&chunk).await;
        });

        assert!(matches!(
            read_frame(&mut reader).await,
            Err(CommsError::FrameTooLarge)
        ));
    }
}
