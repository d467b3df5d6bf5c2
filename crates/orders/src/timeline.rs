//! Append-only audit log embedded in every order.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::DomainError;

use crate::error::{OrderError, OrderResult};
use crate::status::OrderStatus;
use crate::value_objects::Actor;

/// What a timeline entry records: a status the order reached, or a step of
/// the refund sub-workflow (which does not change the order status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TimelineStatus {
    Order(OrderStatus),
    RefundRequested,
    RefundApproved,
    RefundRejected,
}

impl TimelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineStatus::Order(status) => status.as_str(),
            TimelineStatus::RefundRequested => "refund_requested",
            TimelineStatus::RefundApproved => "refund_approved",
            TimelineStatus::RefundRejected => "refund_rejected",
        }
    }
}

impl From<OrderStatus> for TimelineStatus {
    fn from(status: OrderStatus) -> Self {
        TimelineStatus::Order(status)
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimelineStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refund_requested" => Ok(TimelineStatus::RefundRequested),
            "refund_approved" => Ok(TimelineStatus::RefundApproved),
            "refund_rejected" => Ok(TimelineStatus::RefundRejected),
            other => other.parse::<OrderStatus>().map(TimelineStatus::Order),
        }
    }
}

impl From<TimelineStatus> for String {
    fn from(status: TimelineStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<String> for TimelineStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: TimelineStatus,
    pub timestamp: DateTime<Utc>,
    pub note: String,
    pub updated_by: Actor,
}

/// Ordered, append-only list of [`TimelineEntry`].
///
/// There is no API to edit or remove entries. Timestamps never go backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    /// Reject a timestamp earlier than the newest entry.
    pub fn ensure_accepts(&self, at: DateTime<Utc>) -> OrderResult<()> {
        match self.entries.last() {
            Some(last) if at < last.timestamp => Err(OrderError::OutOfOrderTimestamp {
                last: last.timestamp,
                attempted: at,
            }),
            _ => Ok(()),
        }
    }

    /// Append an entry, enforcing non-decreasing timestamps.
    pub fn append(
        &mut self,
        status: impl Into<TimelineStatus>,
        note: impl Into<String>,
        updated_by: Actor,
        at: DateTime<Utc>,
    ) -> OrderResult<&TimelineEntry> {
        self.ensure_accepts(at)?;
        Ok(self.record(status.into(), note.into(), updated_by, at))
    }

    /// Push without re-checking; callers validated `at` while deciding.
    pub(crate) fn record(
        &mut self,
        status: TimelineStatus,
        note: String,
        updated_by: Actor,
        at: DateTime<Utc>,
    ) -> &TimelineEntry {
        self.entries.push(TimelineEntry {
            status,
            timestamp: at,
            note,
            updated_by,
        });
        &self.entries[self.entries.len() - 1]
    }
}
