//! Newline-delimited decoding of raw output streams.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::cluster::LineStream;
use crate::error::ClientError;

/// Decodes a byte stream into a [`LineStream`].
///
/// Lines are split on `\n` (a trailing `\r` is stripped) and have no maximum
/// length. A final line without a newline is still delivered at EOF.
pub fn lines<R>(reader: R) -> LineStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    FramedRead::new(reader, LinesCodec::new())
        .map(|res| res.map_err(decode_error))
        .boxed()
}

fn decode_error(err: LinesCodecError) -> ClientError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => ClientError::Stream("line too long".into()),
        LinesCodecError::Io(e) => ClientError::Stream(e.to_string()),
    }
}
