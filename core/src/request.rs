//! Request payloads sent to the API under test

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp layout of the `date` field, e.g. `7/3/2024 02:05:09 PM`
pub const DATE_FORMAT: &str = "%-d/%-m/%Y %I:%M:%S %p";

/// JSON body of one POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Caller name
    pub name: String,

    /// UTC send time, formatted with [`DATE_FORMAT`]
    pub date: String,

    /// Sequence number of this payload within the process, starting at 1
    pub requests_sent: u64,
}

impl RequestPayload {
    /// Build a payload stamped with the given time
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>, requests_sent: u64) -> Self {
        Self {
            name: name.into(),
            date: timestamp.format(DATE_FORMAT).to_string(),
            requests_sent,
        }
    }
}

/// Produces payloads with a shared, monotonically increasing sequence number
///
/// Shared across workers via `Arc`.
#[derive(Debug)]
pub struct PayloadFactory {
    name: String,
    sent: AtomicU64,
}

impl PayloadFactory {
    /// Create a factory for the given caller name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: AtomicU64::new(0),
        }
    }

    /// Next payload, stamped with the current UTC time
    pub fn next_payload(&self) -> RequestPayload {
        let seq = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        RequestPayload::new(self.name.clone(), Utc::now(), seq)
    }

    /// Number of payloads produced so far
    pub fn produced(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_date_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        let payload = RequestPayload::new("Ada", ts, 1);
        assert_eq!(payload.date, "7/3/2024 02:05:09 PM");
    }

    #[test]
    fn test_payload_json_format() {
        let ts = Utc.with_ymd_and_hms(2024, 12, 25, 0, 30, 0).unwrap();
        let payload = RequestPayload::new("Ada", ts, 42);
        let json = serde_json::to_string(&payload).unwrap();

        assert!(json.contains("\"name\":\"Ada\""));
        assert!(json.contains("\"date\":\"25/12/2024 12:30:00 AM\""));
        assert!(json.contains("\"requests_sent\":42"));
    }

    #[test]
    fn test_factory_sequence() {
        let factory = PayloadFactory::new("Ada");
        assert_eq!(factory.produced(), 0);

        let first = factory.next_payload();
        let second = factory.next_payload();

        assert_eq!(first.requests_sent, 1);
        assert_eq!(second.requests_sent, 2);
        assert_eq!(second.name, "Ada");
        assert_eq!(factory.produced(), 2);
    }

    #[test]
    fn test_factory_shared_across_threads() {
        let factory = std::sync::Arc::new(PayloadFactory::new("Ada"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| factory.next_payload().requests_sent)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();

        assert_eq!(seen, (1..=100).collect::<Vec<_>>());
    }
}
