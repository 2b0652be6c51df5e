//! # scan-relay
//!
//! Pairing relay for Scan to Speak.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections from a desktop and a mobile client
//! - Pairs them by a client-generated session token
//! - Forwards frames verbatim between the two roles
//! - Probes liveness and expires abandoned sessions
//!
//! ## Architecture
//!
//! ```text
//! Desktop ──┐                       ┌── Mobile
//!           │   WebSocket /ws       │
//!           ├──────────────────────►│
//!           │                       │
//!       ┌───┴───────────────────────┴───┐
//!       │          scan-relay           │
//!       │  ┌─────────────────────────┐  │
//!       │  │ SessionRegistry (memory)│  │
//!       │  └─────────────────────────┘  │
//!       └───────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Clients connect to `/ws?role=desktop|mobile&session=<token>`:
//! - A desktop join creates the session; a mobile join requires it (4001)
//! - A bad join is closed with 4000; a same-role reconnect closes the
//!   older connection with 4002
//! - `{"type":"status","payload":{"event":"partner_connected"}}` and
//!   `partner_disconnected` report pairing changes
//! - Every other frame is relayed to the partner untouched

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod http;
pub mod pairing;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
