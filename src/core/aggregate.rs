//! Batch outcome collection and aggregation
//!
//! A [`BatchResult`] pairs every submitted descriptor with exactly one
//! [`Outcome`], in submission order. Aggregation helpers partition the pairs
//! into successes and failures and derive diagnostic metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::core::errors::{Result, ZabanError};
use crate::core::models::{RequestDescriptor, ResponsePayload};

/// Terminal state of one dispatched invocation
#[derive(Debug)]
pub enum Outcome {
    Success(ResponsePayload),
    Failure(ZabanError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn payload(&self) -> Option<&ResponsePayload> {
        match self {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ZabanError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }
}

impl From<Result<ResponsePayload>> for Outcome {
    fn from(result: Result<ResponsePayload>) -> Self {
        match result {
            Ok(payload) => Outcome::Success(payload),
            Err(err) => Outcome::Failure(err),
        }
    }
}

/// One (descriptor, outcome) pair of a batch
#[derive(Debug)]
pub struct BatchItem {
    pub descriptor: RequestDescriptor,
    pub outcome: Outcome,
}

/// Ordered outcomes of a dispatched batch
///
/// The sequence always matches submission order, independent of the order in
/// which the remote calls completed.
#[derive(Debug)]
pub struct BatchResult {
    items: Vec<BatchItem>,
    started_at: DateTime<Utc>,
    elapsed: Duration,
}

impl BatchResult {
    pub(crate) fn new(items: Vec<BatchItem>, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        Self {
            items,
            started_at,
            elapsed,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time the whole batch took
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Successful payloads, in submission order
    pub fn successes(&self) -> Vec<&ResponsePayload> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.payload())
            .collect()
    }

    /// Failed items with their errors, in submission order
    pub fn failures(&self) -> Vec<(&RequestDescriptor, &ZabanError)> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.error().map(|err| (&item.descriptor, err)))
            .collect()
    }

    /// Partition into (successes, failures), both in submission order
    pub fn partition(
        &self,
    ) -> (
        Vec<(&RequestDescriptor, &ResponsePayload)>,
        Vec<(&RequestDescriptor, &ZabanError)>,
    ) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for item in &self.items {
            match &item.outcome {
                Outcome::Success(payload) => successes.push((&item.descriptor, payload)),
                Outcome::Failure(err) => failures.push((&item.descriptor, err)),
            }
        }
        (successes, failures)
    }

    /// All payloads in submission order, or the first error encountered
    pub fn into_payloads(self) -> Result<Vec<ResponsePayload>> {
        self.items
            .into_iter()
            .map(|item| match item.outcome {
                Outcome::Success(payload) => Ok(payload),
                Outcome::Failure(err) => Err(err),
            })
            .collect()
    }

    /// Diagnostic summary of the batch
    pub fn report(&self) -> BatchReport {
        let succeeded = self
            .items
            .iter()
            .filter(|item| item.outcome.is_success())
            .count();
        let total = self.items.len();
        let secs = self.elapsed.as_secs_f64();
        let requests_per_sec = if secs > 0.0 { total as f64 / secs } else { 0.0 };

        BatchReport {
            total,
            succeeded,
            failed: total - succeeded,
            started_at: self.started_at,
            elapsed: self.elapsed,
            requests_per_sec,
        }
    }
}

impl IntoIterator for BatchResult {
    type Item = BatchItem;
    type IntoIter = std::vec::IntoIter<BatchItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a BatchItem;
    type IntoIter = std::slice::Iter<'a, BatchItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Aggregate metrics for one batch, observational only
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub requests_per_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Operation, Translation, TranslationRequest};

    fn item(id: u64, outcome: Outcome) -> BatchItem {
        let request = TranslationRequest::new("Hello", "hin_Deva").unwrap();
        BatchItem {
            descriptor: RequestDescriptor::with_id(id, Operation::Translate(request)),
            outcome,
        }
    }

    fn success(id: u64) -> BatchItem {
        item(
            id,
            Outcome::Success(ResponsePayload::Translation(Translation {
                translated_text: format!("result-{}", id),
                source_lang: None,
                model: None,
            })),
        )
    }

    fn failure(id: u64) -> BatchItem {
        item(
            id,
            Outcome::Failure(ZabanError::Api {
                status: 500,
                message: "server error".to_string(),
            }),
        )
    }

    #[test]
    fn test_partition_preserves_order() {
        let result = BatchResult::new(
            vec![success(1), failure(2), success(3)],
            Utc::now(),
            Duration::from_millis(100),
        );

        let (successes, failures) = result.partition();
        assert_eq!(successes.len(), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(successes[0].0.id(), 1);
        assert_eq!(successes[1].0.id(), 3);
        assert_eq!(failures[0].0.id(), 2);
    }

    #[test]
    fn test_report_counts() {
        let result = BatchResult::new(
            vec![success(1), failure(2), success(3), success(4)],
            Utc::now(),
            Duration::from_secs(2),
        );

        let report = result.report();
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert!((report.requests_per_sec - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_batch_report() {
        let result = BatchResult::new(Vec::new(), Utc::now(), Duration::ZERO);
        assert!(result.is_empty());

        let report = result.report();
        assert_eq!(report.total, 0);
        assert_eq!(report.requests_per_sec, 0.0);
    }

    #[test]
    fn test_into_payloads_surfaces_first_error() {
        let result = BatchResult::new(
            vec![success(1), failure(2), success(3)],
            Utc::now(),
            Duration::from_millis(10),
        );
        assert!(matches!(
            result.into_payloads().unwrap_err(),
            ZabanError::Api { status: 500, .. }
        ));

        let result = BatchResult::new(
            vec![success(1), success(2)],
            Utc::now(),
            Duration::from_millis(10),
        );
        assert_eq!(result.into_payloads().unwrap().len(), 2);
    }
}
