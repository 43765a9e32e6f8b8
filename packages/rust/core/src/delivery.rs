//! Batched delivery of canonical records to a downstream queue.
//!
//! Records become JSON message bodies, grouped into batches no larger than
//! the queue's batch limit. A failing batch is logged and never stops the
//! remaining batches.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument};

use tenderfeed_shared::{
    CanonicalRecord, DeliveryConfig, MAX_BATCH_SIZE, Result, TenderFeedError,
};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One queue entry, shaped like a FIFO queue batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueMessage {
    pub id: String,
    pub message_body: String,
    pub message_group_id: String,
    pub message_deduplication_id: String,
}

impl QueueMessage {
    pub fn new(id: String, body: String, group_id: &str) -> Self {
        let message_deduplication_id = content_hash(&body);
        Self {
            id,
            message_body: body,
            message_group_id: group_id.to_string(),
            message_deduplication_id,
        }
    }
}

fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// An entry the sink refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMessage {
    pub id: String,
    pub reason: String,
}

/// Per-entry result of one batch send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Ids of the accepted entries.
    pub successful: Vec<String>,
    pub failed: Vec<FailedMessage>,
}

/// Encoded messages ready to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedBatches {
    pub batches: Vec<Vec<QueueMessage>>,
    /// Records dropped because they could not be encoded.
    pub unencodable: usize,
}

/// Totals for one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub batches: usize,
    pub sent: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Sink capability
// ---------------------------------------------------------------------------

/// Anything that accepts a batch of queue messages.
///
/// `Err` means the whole batch was lost; partial acceptance is reported
/// through [`BatchOutcome::failed`].
pub trait QueueSink: Send {
    fn send_batch(
        &mut self,
        messages: &[QueueMessage],
    ) -> impl Future<Output = Result<BatchOutcome>> + Send;
}

impl<S: QueueSink> QueueSink for &mut S {
    fn send_batch(
        &mut self,
        messages: &[QueueMessage],
    ) -> impl Future<Output = Result<BatchOutcome>> + Send {
        (**self).send_batch(messages)
    }
}

/// Writes one JSON envelope per line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl JsonLinesSink<Box<dyn Write + Send>> {
    /// Sink for a configured output: `-` is stdout, anything else a file,
    /// created or truncated here.
    pub fn open(output: &str) -> Result<Self> {
        let writer: Box<dyn Write + Send> = if output == "-" {
            Box::new(std::io::stdout())
        } else {
            let path = Path::new(output);
            let file = File::create(path).map_err(|e| TenderFeedError::io(path, e))?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self { writer })
    }
}

impl<W: Write + Send> QueueSink for JsonLinesSink<W> {
    async fn send_batch(&mut self, messages: &[QueueMessage]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for message in messages {
            let written = serde_json::to_string(message)
                .map_err(|e| e.to_string())
                .and_then(|line| writeln!(self.writer, "{line}").map_err(|e| e.to_string()));

            match written {
                Ok(()) => outcome.successful.push(message.id.clone()),
                Err(reason) => outcome.failed.push(FailedMessage {
                    id: message.id.clone(),
                    reason,
                }),
            }
        }

        self.writer
            .flush()
            .map_err(|e| TenderFeedError::Delivery(format!("flush failed: {e}")))?;

        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Batcher
// ---------------------------------------------------------------------------

/// Splits records into queue batches and pushes them through a sink.
#[derive(Debug, Clone)]
pub struct DeliveryBatcher {
    batch_size: usize,
    group_id: String,
}

impl DeliveryBatcher {
    /// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(batch_size: usize, group_id: impl Into<String>) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            group_id: group_id.into(),
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(config.batch_size, config.message_group_id.clone())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Encode `records` and split them into message batches. Records that
    /// fail to encode are logged and counted, never sent.
    pub fn prepare<R: CanonicalRecord>(&self, records: &[R]) -> PreparedBatches {
        let mut unencodable = 0;
        let bodies: Vec<String> = records
            .iter()
            .filter_map(|record| match encode(record) {
                Ok(body) => Some(body),
                Err(e) => {
                    unencodable += 1;
                    error!(source = record.source(), error = %e, "record not serializable, skipping");
                    None
                }
            })
            .collect();

        let batches = bodies
            .chunks(self.batch_size)
            .enumerate()
            .map(|(batch, chunk)| {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(i, body)| {
                        QueueMessage::new(
                            format!("tender_message_{batch}_{i}"),
                            body.clone(),
                            &self.group_id,
                        )
                    })
                    .collect()
            })
            .collect();

        PreparedBatches {
            batches,
            unencodable,
        }
    }

    /// Send every record, batch by batch.
    #[instrument(skip_all, fields(records = records.len(), batch_size = self.batch_size))]
    pub async fn deliver<R, S>(&self, records: &[R], sink: &mut S) -> DeliveryReport
    where
        R: CanonicalRecord,
        S: QueueSink,
    {
        let prepared = self.prepare(records);
        let mut report = DeliveryReport {
            failed: prepared.unencodable,
            ..DeliveryReport::default()
        };

        for batch in prepared.batches {
            report.batches += 1;

            match sink.send_batch(&batch).await {
                Ok(outcome) => {
                    report.sent += outcome.successful.len();
                    report.failed += outcome.failed.len();
                    info!(entries = batch.len(), "sent message batch");
                    for failure in &outcome.failed {
                        error!(id = %failure.id, reason = %failure.reason, "message rejected");
                    }
                }
                Err(e) => {
                    report.failed += batch.len();
                    error!(entries = batch.len(), error = %e, "failed to send message batch");
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "delivery complete");
        report
    }
}

fn encode<R: CanonicalRecord>(record: &R) -> Result<String> {
    let map = record.to_canonical_record()?;
    serde_json::to_string(&map)
        .map_err(|e| TenderFeedError::validation(format!("record encoding failed: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use tenderfeed_shared::{Tender, TenderCommon};

    /// Keeps every batch; optionally refuses given ids or whole batches.
    #[derive(Debug, Default)]
    pub(crate) struct MemorySink {
        pub(crate) batches: Vec<Vec<QueueMessage>>,
        reject_ids: Vec<String>,
        fail_batches: Vec<usize>,
        calls: usize,
    }

    impl MemorySink {
        fn rejecting(ids: &[&str]) -> Self {
            Self {
                reject_ids: ids.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn failing_batch(index: usize) -> Self {
            Self {
                fail_batches: vec![index],
                ..Self::default()
            }
        }
    }

    impl QueueSink for MemorySink {
        async fn send_batch(&mut self, messages: &[QueueMessage]) -> Result<BatchOutcome> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_batches.contains(&call) {
                return Err(TenderFeedError::Delivery("queue unavailable".into()));
            }

            let mut outcome = BatchOutcome::default();
            for message in messages {
                if self.reject_ids.contains(&message.id) {
                    outcome.failed.push(FailedMessage {
                        id: message.id.clone(),
                        reason: "AccessDenied".into(),
                    });
                } else {
                    outcome.successful.push(message.id.clone());
                }
            }
            self.batches.push(messages.to_vec());
            Ok(outcome)
        }
    }

    /// Per-process file under the temp dir.
    pub(crate) fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tenderfeed-{name}-{}.jsonl", std::process::id()))
    }

    /// Serializes to a bare string, which no canonical record may be.
    #[derive(Serialize)]
    #[serde(transparent)]
    struct NotAnObject(String);

    impl CanonicalRecord for NotAnObject {
        fn source(&self) -> &str {
            "test"
        }
    }

    fn tender(n: usize) -> Tender {
        Tender {
            common: TenderCommon {
                title: format!("Tender {n}"),
                description: "Road works".into(),
                source: "SANRAL".into(),
                published_date: None,
                closing_date: None,
                supporting_documents: Vec::new(),
                tags: Vec::new(),
            },
            tender_number: format!("RFP{n}"),
            category: "Construction".into(),
            region: "Gauteng".into(),
            email: String::new(),
            full_notice_text: String::new(),
        }
    }

    fn tenders(count: usize) -> Vec<Tender> {
        (0..count).map(tender).collect()
    }

    #[test]
    fn batches_respect_size_and_ids() {
        let batcher = DeliveryBatcher::new(10, "SanralTenderScrape");
        let batches = batcher.prepare(&tenders(23)).batches;

        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![10, 10, 3]
        );
        assert_eq!(batches[0][0].id, "tender_message_0_0");
        assert_eq!(batches[2][2].id, "tender_message_2_2");
        assert!(batches
            .iter()
            .flatten()
            .all(|m| m.message_group_id == "SanralTenderScrape"));
    }

    #[test]
    fn batch_size_is_clamped() {
        assert_eq!(DeliveryBatcher::new(0, "g").batch_size(), 1);
        assert_eq!(DeliveryBatcher::new(50, "g").batch_size(), MAX_BATCH_SIZE);
        let config = DeliveryConfig {
            batch_size: 4,
            ..DeliveryConfig::default()
        };
        assert_eq!(DeliveryBatcher::from_config(&config).batch_size(), 4);
    }

    #[test]
    fn body_is_canonical_record_with_dedup_hash() {
        let batcher = DeliveryBatcher::new(10, "g");
        let batches = batcher.prepare(&tenders(1)).batches;
        let message = &batches[0][0];

        let body: serde_json::Value = serde_json::from_str(&message.message_body).unwrap();
        assert_eq!(body["tenderNumber"], "RFP0");
        assert_eq!(body["source"], "SANRAL");
        assert!(body["publishedDate"].is_null());

        assert_eq!(message.message_deduplication_id.len(), 64);
        assert_eq!(
            message.message_deduplication_id,
            content_hash(&message.message_body)
        );
    }

    #[test]
    fn identical_records_share_dedup_id() {
        let batcher = DeliveryBatcher::new(10, "g");
        let records = vec![tender(1), tender(1), tender(2)];
        let batch = &batcher.prepare(&records).batches[0];

        assert_eq!(
            batch[0].message_deduplication_id,
            batch[1].message_deduplication_id
        );
        assert_ne!(
            batch[0].message_deduplication_id,
            batch[2].message_deduplication_id
        );
    }

    #[test]
    fn no_records_no_batches() {
        let batcher = DeliveryBatcher::new(10, "g");
        assert_eq!(batcher.prepare::<Tender>(&[]), PreparedBatches::default());
    }

    #[tokio::test]
    async fn delivers_all_batches() {
        let mut sink = MemorySink::default();
        let report = DeliveryBatcher::new(10, "g")
            .deliver(&tenders(12), &mut sink)
            .await;

        assert_eq!(
            report,
            DeliveryReport {
                batches: 2,
                sent: 12,
                failed: 0
            }
        );
        assert_eq!(sink.batches.len(), 2);
    }

    #[tokio::test]
    async fn partial_failures_are_counted() {
        let mut sink = MemorySink::rejecting(&["tender_message_0_0"]);
        let report = DeliveryBatcher::new(10, "g")
            .deliver(&tenders(3), &mut sink)
            .await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_the_rest() {
        let mut sink = MemorySink::failing_batch(0);
        let report = DeliveryBatcher::new(2, "g")
            .deliver(&tenders(5), &mut sink)
            .await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.sent, 3);
        assert_eq!(sink.batches.len(), 2);
    }

    #[tokio::test]
    async fn unencodable_records_count_as_failed() {
        let mut sink = MemorySink::default();
        let records = vec![NotAnObject("a".into()), NotAnObject("b".into())];
        let report = DeliveryBatcher::new(10, "g")
            .deliver(&records, &mut sink)
            .await;

        assert_eq!(
            report,
            DeliveryReport {
                batches: 0,
                sent: 0,
                failed: 2
            }
        );
        assert!(sink.batches.is_empty());
    }

    #[tokio::test]
    async fn json_lines_sink_writes_one_envelope_per_line() {
        let path = scratch_path("envelopes");
        let mut sink = JsonLinesSink::open(path.to_str().unwrap()).unwrap();
        let report = DeliveryBatcher::new(10, "SanralTenderScrape")
            .deliver(&tenders(2), &mut sink)
            .await;
        assert_eq!(report.sent, 2);
        drop(sink);

        let output = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let envelope: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(envelope["Id"], "tender_message_0_1");
        assert_eq!(envelope["MessageGroupId"], "SanralTenderScrape");
        assert!(envelope["MessageBody"].as_str().unwrap().contains("RFP1"));
        assert!(envelope["MessageDeduplicationId"].is_string());
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let err = JsonLinesSink::open("/nonexistent-dir/out.jsonl").err().expect("open should fail");
        assert!(matches!(err, TenderFeedError::Io { .. }));
    }
}
