use crate::Key;
use std::{
    collections::BTreeMap,
    time::{Duration, SystemTime},
};

/// Last-write time of an artifact or of the brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(SystemTime);

impl Timestamp {
    #[must_use]
    pub fn as_system_time(self) -> SystemTime {
        self.0
    }
}

/// Records when each key was last written.
///
/// Every `touch` returns a stamp strictly greater than any stamp the ledger
/// handed out before, even if the wall clock stalls or steps backwards, so
/// "written after" is always well defined within a session.
#[derive(Debug, Default, Clone)]
pub struct TimestampLedger {
    stamps: BTreeMap<Key, Timestamp>,
    latest: Option<Timestamp>,
}

impl TimestampLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, key: impl Into<Key>) -> Timestamp {
        let now = SystemTime::now();
        let stamp = match self.latest {
            Some(Timestamp(latest)) if now <= latest => {
                Timestamp(latest + Duration::from_nanos(1))
            }
            _ => Timestamp(now),
        };
        self.latest = Some(stamp);
        self.stamps.insert(key.into(), stamp);
        stamp
    }

    #[must_use]
    pub fn time_of(&self, key: impl Into<Key>) -> Option<Timestamp> {
        self.stamps.get(&key.into()).copied()
    }
}
