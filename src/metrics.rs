use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing request activity.
#[derive(Default)]
pub struct ServiceMetrics {
    questions_answered: AtomicU64,
    documents_summarized: AtomicU64,
    extraction_failures: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed question-answering request.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed summarization request.
    pub fn record_summary(&self) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upload that could not be turned into text.
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of request counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Question-answering requests completed since startup.
    pub questions_answered: u64,
    /// Summarization requests completed since startup.
    pub documents_summarized: u64,
    /// Uploads rejected because text extraction failed.
    pub extraction_failures: u64,
}
