//! Cloud tenancy housekeeping.
//!
//! Two batch jobs against a resource-management API:
//!
//! - **Inventory**: enumerate every resource in the tenancy through the
//!   paginated search endpoint and flatten the results into a CSV report,
//!   decorated with compartment names.
//! - **Cleanup**: find volume backups that exceed a per-volume "keep the
//!   newest N" retention policy and delete them, with bounded retries,
//!   pacing between deletes, and a dry-run mode.
//!
//! Both jobs share the same traversal and retry machinery: [`fetch`] walks
//! server-paginated result sets exactly once, [`remote::retry`] wraps every
//! remote call in a configurable backoff policy, and [`run`] sequences the
//! phases and aggregates the per-run summary.

pub mod compartments;
pub mod config;
pub mod fetch;
pub mod inventory;
pub mod model;
pub mod mutate;
pub mod remote;
pub mod retention;
pub mod run;
