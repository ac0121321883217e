//! Call channels to RPC backends.
//!
//! A channel is opened per invocation and dropped afterwards; nothing is
//! pooled. [`RpcConnector`] is the seam the dispatcher opens channels through,
//! so tests can substitute an in-process backend.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::rpc::codec::{decode_reply, encode_call, read_frame, write_frame};
use crate::rpc::error::RpcError;
use crate::rpc::marshal::CallArgument;
use crate::rpc::resolver::BackendTarget;

/// Per-protocol channel deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimeouts {
    pub connect: Duration,
    pub call: Duration,
}

/// An open call channel.
pub trait RpcChannel: Send {
    fn call<'a>(
        &'a mut self,
        method: &'a str,
        args: &'a [CallArgument],
    ) -> BoxFuture<'a, Result<Value, RpcError>>;
}

/// Opens call channels to backend targets.
pub trait RpcConnector: Send + Sync {
    fn connect<'a>(
        &'a self,
        target: &'a BackendTarget,
        timeouts: ChannelTimeouts,
    ) -> BoxFuture<'a, Result<Box<dyn RpcChannel>, RpcError>>;
}

/// Connector speaking length-prefixed JSON frames over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl RpcConnector for TcpConnector {
    fn connect<'a>(
        &'a self,
        target: &'a BackendTarget,
        timeouts: ChannelTimeouts,
    ) -> BoxFuture<'a, Result<Box<dyn RpcChannel>, RpcError>> {
        Box::pin(async move {
            let authority = target.authority();
            let stream = match timeout(timeouts.connect, TcpStream::connect(&authority)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => {
                    return Err(RpcError::Connect {
                        target: authority,
                        source,
                    })
                }
                Err(_) => return Err(RpcError::ConnectTimeout(authority)),
            };
            stream.set_nodelay(true)?;

            tracing::trace!(target = %target, "RPC channel opened");
            Ok(Box::new(TcpChannel {
                stream,
                authority,
                call_timeout: timeouts.call,
                next_seq: 1,
            }) as Box<dyn RpcChannel>)
        })
    }
}

/// A single TCP session to one backend.
pub struct TcpChannel {
    stream: TcpStream,
    authority: String,
    call_timeout: Duration,
    next_seq: u64,
}

impl TcpChannel {
    async fn round_trip(&mut self, seq: u64, frame: &[u8]) -> Result<Value, RpcError> {
        write_frame(&mut self.stream, frame).await?;
        let reply = read_frame(&mut self.stream).await?;
        decode_reply(seq, &reply)
    }
}

impl RpcChannel for TcpChannel {
    fn call<'a>(
        &'a mut self,
        method: &'a str,
        args: &'a [CallArgument],
    ) -> BoxFuture<'a, Result<Value, RpcError>> {
        Box::pin(async move {
            let seq = self.next_seq;
            self.next_seq += 1;
            let frame = encode_call(seq, method, args)?;

            let deadline = self.call_timeout;
            let outcome = timeout(deadline, self.round_trip(seq, &frame)).await;
            match outcome {
                Ok(result) => result,
                Err(_) => Err(RpcError::CallTimeout {
                    target: self.authority.clone(),
                    millis: deadline.as_millis() as u64,
                }),
            }
        })
    }
}
