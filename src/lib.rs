//! jobdesk: scheduled job listings grouped into archives.
//!
//! Principals act on jobs within the archives they are granted. Every
//! mutation runs through [`workflow::Workflow`], which authorizes it, runs
//! the registered hooks around the write, and appends a version snapshot.

pub mod access;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod hooks;
pub mod identity;
pub mod intent;
pub mod ledger;
pub mod model;
pub mod storage;
pub mod workflow;
