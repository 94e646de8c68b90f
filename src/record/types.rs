use bytes::Bytes;

/// What a record carries. The discriminants are the on-wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A zero-length value that was explicitly written.
    Empty = 0,
    /// A delete marker. Also used for a confirmed local absence.
    Tombstone = 1,
    /// A non-empty value.
    Value = 2,
}

impl RecordKind {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(RecordKind::Empty),
            1 => Some(RecordKind::Tombstone),
            2 => Some(RecordKind::Value),
            _ => None,
        }
    }
}

/// A value (or its absence) stamped with the time of the local mutation.
///
/// The kind is never stored independently; it is derived from `value`:
/// absent → `Tombstone`, zero-length → `Empty`, anything else → `Value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedRecord {
    value: Option<Bytes>,
    timestamp: u64,
}

impl TimestampedRecord {
    pub fn new(value: Option<Bytes>, timestamp: u64) -> Self {
        Self { value, timestamp }
    }

    /// Wraps a written body. An empty body yields an `Empty` record.
    pub fn value(value: Bytes, timestamp: u64) -> Self {
        Self::new(Some(value), timestamp)
    }

    pub fn tombstone(timestamp: u64) -> Self {
        Self::new(None, timestamp)
    }

    /// A confirmed absence: a tombstone older than any real mutation, so it
    /// only wins resolution when no replica has ever seen the key.
    pub fn absent() -> Self {
        Self::tombstone(0)
    }

    pub fn kind(&self) -> RecordKind {
        match &self.value {
            None => RecordKind::Tombstone,
            Some(v) if v.is_empty() => RecordKind::Empty,
            Some(_) => RecordKind::Value,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The readable value, `None` for tombstones.
    pub fn payload(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Newest-wins resolution across replica answers.
///
/// The strictly greatest timestamp wins. On an exact tie the record seen first
/// is kept, so at millisecond resolution the outcome of a tie depends on the
/// order replicas answered in.
pub fn latest_of<'a, I>(records: I) -> Option<&'a TimestampedRecord>
where
    I: IntoIterator<Item = &'a TimestampedRecord>,
{
    let mut winner: Option<&TimestampedRecord> = None;
    for record in records {
        match winner {
            Some(current) if record.timestamp <= current.timestamp => {}
            _ => winner = Some(record),
        }
    }
    winner
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
