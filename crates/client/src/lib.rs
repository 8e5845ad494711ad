//! Client code for eus-offline.
//!
//! This crate provides the network fetch pipeline and the offline cache
//! router that sits between the client application and the network.

pub mod fetch;
pub mod router;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use router::schedule::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use router::sessions::{ClientSessions, SessionRegistry};
pub use router::{
    ActivationReport, OfflineRouter, ResponseSource, RouteClass, RouteOutcome, RouterConfig, RouterState,
};
