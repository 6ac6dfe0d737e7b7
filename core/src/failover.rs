//! # Host Failover Search
//!
//! Walks an ordered list of management hosts until both partitions of a
//! comparison pair have been located.
//!
//! A comparison may legitimately span production and disaster-recovery
//! estates managed by different appliances; trying every configured host
//! lets one invocation query across all of them without the caller
//! knowing which host owns which partition.
//!
//! The search is written against the [`PartitionSource`] seam so the
//! policy can be exercised without a network; [`HmcSource`] is the
//! production implementation over [`Session`] + [`ProfileFetcher`].

use tracing::{debug, warn};

use crate::fetch::{LookupOutcome, ProfileFetcher, QueryFailure};
use crate::session::{Credentials, Session, SessionError, SessionSettings};

/// Opens authenticated connections to management hosts.
pub trait PartitionSource {
    type Conn: PartitionConnection;

    fn open(&self, host: &str, credentials: &Credentials) -> Result<Self::Conn, SessionError>;
}

/// One open connection the search can look partitions up on.
pub trait PartitionConnection {
    fn lookup(&mut self, partition: &str) -> Result<LookupOutcome, SessionError>;

    fn close(&mut self) -> Result<(), SessionError>;
}

/// Production source: a [`Session`] per host, driven by a shared fetcher
/// configuration.
pub struct HmcSource {
    settings: SessionSettings,
    fetcher: ProfileFetcher,
}

impl HmcSource {
    pub fn new(settings: SessionSettings, fetcher: ProfileFetcher) -> Self {
        Self { settings, fetcher }
    }
}

pub struct HmcConnection {
    session: Session,
    fetcher: ProfileFetcher,
}

impl PartitionSource for HmcSource {
    type Conn = HmcConnection;

    fn open(&self, host: &str, credentials: &Credentials) -> Result<HmcConnection, SessionError> {
        let session = Session::open(&self.settings, host, credentials)?;
        Ok(HmcConnection {
            session,
            fetcher: self.fetcher.clone(),
        })
    }
}

impl PartitionConnection for HmcConnection {
    fn lookup(&mut self, partition: &str) -> Result<LookupOutcome, SessionError> {
        self.fetcher.fetch(&self.session, partition)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.session.close()
    }
}

/// Tries `hosts` strictly in order until both partitions resolve to
/// `Found` or the list is exhausted.
///
/// Per host: open, look up whichever names are still unresolved, close —
/// always, even when a lookup failed. A non-`Found` outcome never
/// short-circuits the search for that name; whatever non-`Found` outcome
/// was observed last is returned once the hosts run out.
///
/// An authentication rejection (logon or logoff) is fatal and aborts the
/// search. A transport-level failure to reach a host is not: during open
/// it is recorded as a `QueryError` for the still-unresolved names and
/// the next host is tried; during close it is logged and the outcomes
/// already resolved on that host are kept.
pub fn locate<S: PartitionSource>(
    source: &S,
    hosts: &[String],
    credentials: &Credentials,
    partitions: (&str, &str),
) -> Result<(LookupOutcome, LookupOutcome), SessionError> {
    let names = [partitions.0, partitions.1];
    let mut outcomes: [Option<LookupOutcome>; 2] = [None, None];

    for host in hosts {
        if outcomes.iter().all(is_found) {
            break;
        }

        let mut connection = match source.open(host, credentials) {
            Ok(connection) => connection,
            Err(SessionError::Transport { source: cause, .. }) => {
                warn!(%host, error = %cause, "management host unreachable, trying next");
                let unreachable =
                    LookupOutcome::QueryError(QueryFailure::Transport(cause.to_string()));
                for slot in outcomes.iter_mut().filter(|slot| !is_found(slot)) {
                    *slot = Some(unreachable.clone());
                }
                continue;
            }
            Err(fatal) => return Err(fatal),
        };

        let mut lookup_result = Ok(());
        for (slot, name) in outcomes.iter_mut().zip(names) {
            if is_found(slot) {
                continue;
            }
            match connection.lookup(name) {
                Ok(outcome) => {
                    debug!(%host, partition = name, found = outcome.is_found(), "lookup done");
                    *slot = Some(outcome);
                }
                Err(error) => {
                    lookup_result = Err(error);
                    break;
                }
            }
        }

        // The session is released before the next host is considered,
        // whatever the lookups did.
        let close_result = connection.close();
        lookup_result?;
        match close_result {
            Ok(()) => {}
            Err(SessionError::Transport { source: cause, .. }) => {
                warn!(%host, error = %cause, "logoff failed, server session may linger");
            }
            Err(fatal) => return Err(fatal),
        }
    }

    let [first, second] = outcomes;
    Ok((resolve(first), resolve(second)))
}

fn is_found(slot: &Option<LookupOutcome>) -> bool {
    matches!(slot, Some(LookupOutcome::Found(_)))
}

fn resolve(slot: Option<LookupOutcome>) -> LookupOutcome {
    slot.unwrap_or_else(|| {
        LookupOutcome::QueryError(QueryFailure::Transport(
            "no management hosts attempted".to_string(),
        ))
    })
}
