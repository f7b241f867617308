//! An in-process RPC network for testing distributed systems.
//!
//! A [`Network`] connects [`ClientEnd`]s to [`Server`]s. Each server holds
//! [`Service`]s, and each service exposes some methods of a handler object
//! under `"Service.Method"` names. Arguments and replies are encoded with
//! labcodec on the way in and on the way out, so callers and handlers never
//! share memory.
//!
//! The network can be degraded at any time: a client end can be disabled or
//! connected to another server, a server can be deleted, and an unreliable
//! network delays requests, loses some of them and loses some replies. The
//! caller of [`ClientEnd::call`] only learns whether a reply came back.
//!
//! ```ignore
//! let net = labrpc::Network::new();
//! let end = net.create_client("end1-99");
//!
//! let server = labrpc::Server::new();
//! server.add_service(labrpc::Service::new(Arc::new(JunkServer::default())));
//! net.add_server("server99", server);
//!
//! net.connect("end1-99", "server99");
//! net.enable("end1-99", true);
//!
//! let mut reply = String::new();
//! assert!(end.call("JunkServer.Handler2", &111i64, &mut reply));
//! assert_eq!(reply, "handler2-111");
//! ```
#![allow(clippy::new_without_default)]

#[macro_use]
mod macros;

mod client;
mod config;
mod error;
mod name;
mod network;
mod server;

pub use self::client::ClientEnd;
pub use self::config::NetConfig;
pub use self::error::{Error, Result};
pub use self::name::Name;
pub use self::network::Network;
pub use self::server::{Handler, RpcFuture, Server, Service, ServiceBuilder};
