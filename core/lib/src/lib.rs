//! Transport-and-security engine for calling server-side classes as remote
//! services over HTTP and a persistent bidirectional socket.
//!
//! This crate owns the CSRF/cross-origin protection state machine, the
//! cookie-session abstraction, the signed/encrypted token facility, and
//! the HTTP argument-binding grammar. An embedding HTTP framework supplies
//! routing and body parsing; [`contrib`](https://docs.rs/remotecore_socket)
//! supplies the socket transport.

#[doc(hidden)]
pub use tracing;

#[macro_use]
pub mod trace;

pub mod call_context;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod security;
pub mod session;
pub mod token;

pub use call_context::CallContext;
pub use config::Config;
pub use dispatch::HttpDispatcher;
pub use error::{Error, Result};
pub use registry::RemoteMethodRegistry;
pub use security::group::SecurityGroupRegistry;
pub use token::TokenBox;
