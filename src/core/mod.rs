//! Runtime core: discovery, supervision and shutdown.
//!
//! The only public API from this module is [`Orchestrator`] (built with
//! [`OrchestratorBuilder`]), its [`Config`] and the [`StreamSupervisor`] it
//! exposes for direct control of single streams.
//!
//! Internal modules:
//! - [`watcher`]: turns the partition feed into add/remove calls through the selector;
//! - [`partitions`]: one discoverer task per partition in scope;
//! - [`discoverer`]: lists and watches workloads, starts and stops their streams;
//! - [`supervisor`]: identity-keyed stream tasks with panic containment;
//! - [`actor`]: retry loop of one stream with backoff and attempt bound;
//! - [`runner`]: one attempt, from opening the feed to its end or cancellation;
//! - [`slots`]: keyed table of cancellable slots shared by the two levels above;
//! - [`shutdown`]: cross-platform termination signals.

mod actor;
mod builder;
mod config;
mod discoverer;
mod orchestrator;
mod partitions;
mod runner;
mod shutdown;
mod slots;
mod supervisor;
mod watcher;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use orchestrator::Orchestrator;
pub use supervisor::StreamSupervisor;
