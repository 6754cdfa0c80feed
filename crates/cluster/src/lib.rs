//! Cluster removal client with live progress reporting.
//!
//! A removal runs asynchronously on the ACE control plane. This crate
//! dispatches the job over HTTP and follows its progress on a
//! publish/subscribe transport, correlating the two through a
//! client-generated [`CorrelationToken`](ace_core::types::CorrelationToken).
//!
//! - [`api`] / [`dispatcher`] -- submitting the removal job.
//! - [`transport`] -- NATS and in-process progress transports.
//! - [`subscriber`] -- the progress receive loop.
//! - [`sync`] -- completion and cancellation signals between the two.
//! - [`orchestrator`] -- ties token, subscription, dispatch and wait together.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod factory;
pub mod orchestrator;
pub mod printer;
pub mod subscriber;
pub mod sync;
pub mod transport;
