use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;
use crate::record::TimestampedRecord;

/// A client operation on a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Get,
    /// Upsert with the request body.
    Put(Bytes),
    /// Written as a tombstone on the replicated path.
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "GET",
            Operation::Put(_) => "PUT",
            Operation::Delete => "DELETE",
        }
    }
}

/// The `ack/from` pair: contact `from` replicas, succeed once `ack` answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationFactor {
    pub ack: usize,
    pub from: usize,
}

impl ReplicationFactor {
    pub fn new(ack: usize, from: usize) -> Self {
        Self { ack, from }
    }

    /// `(⌊n/2⌋ + 1) / n`, the default when a request names no factor.
    pub fn majority(cluster_size: usize) -> Self {
        Self::new(cluster_size / 2 + 1, cluster_size)
    }

    /// Enforces `1 <= ack <= from <= cluster_size`.
    pub fn validate(&self, cluster_size: usize) -> Result<(), StoreError> {
        if self.ack < 1 {
            return Err(StoreError::bad_request("ack must be at least 1"));
        }
        if self.ack > self.from {
            return Err(StoreError::bad_request(format!(
                "ack {} exceeds from {}",
                self.ack, self.from
            )));
        }
        if self.from > cluster_size {
            return Err(StoreError::bad_request(format!(
                "from {} exceeds cluster size {}",
                self.from, cluster_size
            )));
        }
        Ok(())
    }
}

impl FromStr for ReplicationFactor {
    type Err = StoreError;

    /// Parses `"<ack>/<from>"`. Range checks are left to [`Self::validate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StoreError::bad_request(format!("malformed replicas '{}'", s));

        let (ack, from) = s.split_once('/').ok_or_else(malformed)?;
        let ack = ack.trim().parse::<usize>().map_err(|_| malformed())?;
        let from = from.trim().parse::<usize>().map_err(|_| malformed())?;
        Ok(Self::new(ack, from))
    }
}

impl fmt::Display for ReplicationFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ack, self.from)
    }
}

/// What a successfully coordinated operation reports back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// GET resolved to a live value (possibly empty).
    Value(Bytes),
    /// GET resolved to a tombstone or nothing at all.
    NotFound,
    /// PUT acknowledged by a quorum.
    Created,
    /// DELETE acknowledged by a quorum.
    Accepted,
}

impl Outcome {
    /// Maps the resolved winner onto a result. For writes the winner's content
    /// is irrelevant: reaching quorum is the success.
    pub fn resolve(op: &Operation, winner: Option<&TimestampedRecord>) -> Self {
        match op {
            Operation::Get => match winner.and_then(|record| record.payload()) {
                Some(value) => Outcome::Value(value.clone()),
                None => Outcome::NotFound,
            },
            Operation::Put(_) => Outcome::Created,
            Operation::Delete => Outcome::Accepted,
        }
    }
}
