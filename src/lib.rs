//! Core pipelines for the workbox helper: item-path enrichment over a
//! mutating host document, and batched workflow advancement for selected
//! items. The hosting shell (frame discovery, settings UI, notification
//! rendering) sits outside this crate and talks to it through `Page`,
//! `EnvironmentSettings`, and the run-report types.

pub mod cache;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod detect;
pub mod enrich;
pub mod page;
pub mod remote;
pub mod selection;
pub mod session;
pub mod store;
pub mod util;
pub mod workflow;
