//! Socket transport for `remotecore`: the persistent bidirectional
//! connection layer, its extended-JSON wire codec, remote-callback
//! lifecycle, and the HTTP↔socket trust bridge.

pub mod bridge;
pub mod callback;
pub mod codec;
pub mod connection;
pub mod message;
pub mod single_retry;

pub use bridge::{AccessProofGranularity, BridgePayload, SocketId, TokenBridge};
pub use callback::{CallbackHandle, CallbackId, CallbackRegistry};
pub use codec::ExtValue;
pub use connection::SocketConnection;
pub use single_retry::SingleRetryableOperation;
