//! Host method channel protocol.
//!
//! A call names a method and carries an untyped argument bundle; it is
//! answered with exactly one value or the not-implemented signal. The
//! binary frames calls and replies as one JSON object per line.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::router::CommandRouter;

pub const FAVORITE_CHANNEL: &str = "picsor.favorite";
pub const ALBUMS_CHANNEL: &str = "picsor.albums";

/// Named channels the host registers handlers on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Favorite,
    Albums,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            FAVORITE_CHANNEL => Some(Self::Favorite),
            ALBUMS_CHANNEL => Some(Self::Albums),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Favorite => FAVORITE_CHANNEL,
            Self::Albums => ALBUMS_CHANNEL,
        }
    }
}

/// A single method invocation arriving from the host
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Channel the call arrived on; `None` routes by method name alone
    pub channel: Option<String>,
    pub method: String,
    /// Usually an object; anything else has no usable arguments
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            channel: None,
            method: method.into(),
            args,
        }
    }

    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// What goes back to the host for one call
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(Value),
    NotImplemented,
}

#[derive(Debug, Deserialize)]
struct CallFrame {
    id: u64,
    #[serde(default)]
    channel: Option<String>,
    method: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyFrame<'a> {
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_implemented: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Decode one line into a call id and the call itself
pub fn decode_call(line: &str) -> Result<(u64, MethodCall), serde_json::Error> {
    let frame: CallFrame = serde_json::from_str(line)?;
    Ok((
        frame.id,
        MethodCall {
            channel: frame.channel,
            method: frame.method,
            args: frame.args,
        },
    ))
}

/// Encode the reply for call `id` as one line (without the newline)
pub fn encode_reply(id: u64, reply: &Reply) -> Result<String, serde_json::Error> {
    let frame = match reply {
        Reply::Success(value) => ReplyFrame {
            id: Some(id),
            result: Some(value),
            not_implemented: None,
            error: None,
        },
        Reply::NotImplemented => ReplyFrame {
            id: Some(id),
            result: None,
            not_implemented: Some(true),
            error: None,
        },
    };
    serde_json::to_string(&frame)
}

/// Reply line for input that could not be decoded as a call
pub fn malformed_reply() -> Result<String, serde_json::Error> {
    serde_json::to_string(&ReplyFrame {
        id: None,
        result: None,
        not_implemented: None,
        error: Some("malformed call"),
    })
}

/// Serve JSON-lines calls from `reader` until it is exhausted.
///
/// Each call runs on its own task, so replies may be written out of order.
/// Lines that are not UTF-8 or not a call get the malformed reply and the
/// loop carries on. Calls still pending when input ends are drained before
/// the writer is handed back.
pub async fn serve<R, W>(mut reader: R, mut writer: W, router: CommandRouter) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, io::Error>(writer)
    });

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "call is not valid UTF-8");
                send_malformed(&tx);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let (id, call) = match decode_call(line) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "malformed call");
                send_malformed(&tx);
                continue;
            }
        };

        let router = router.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let reply = router.handle(&call).await;
            match encode_reply(id, &reply) {
                Ok(line) => {
                    let _ = tx.send(line);
                }
                Err(e) => error!(id, error = %e, "failed to encode reply"),
            }
        });
    }

    // Pending calls still hold senders; the writer drains until they finish.
    drop(tx);
    writer_task.await.map_err(io::Error::other)?
}

fn send_malformed(tx: &mpsc::UnboundedSender<String>) {
    match malformed_reply() {
        Ok(line) => {
            let _ = tx.send(line);
        }
        Err(e) => error!(error = %e, "failed to encode malformed reply"),
    }
}
