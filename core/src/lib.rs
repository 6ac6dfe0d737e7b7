//! # lpardiff core
//!
//! Read-only client logic for comparing the configuration profiles of two
//! LPARs managed by an HMC (Hardware Management Console).
//!
//! The crate is organised around four pieces:
//! 1. [`session`] — one authenticated connection to a management host,
//!    with guaranteed logoff on every exit path.
//! 2. [`fetch`] — the two-call search-then-profile protocol that flattens
//!    a partition's configuration into a [`record::ProfileRecord`].
//! 3. [`failover`] — tries a list of management hosts in order until both
//!    partitions of a pair have been located.
//! 4. [`diff`] — reconciles two records and produces the rows the
//!    presentation layer renders.

pub mod diff;
pub mod failover;
pub mod fetch;
pub mod record;
pub mod session;
