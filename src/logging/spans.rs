//! Structured spans for pipeline stages and HTTP requests
//!
//! Fields are declared up front as empty and filled in as the work
//! progresses, so they show up in the JSON file output.

use std::time::{Duration, Instant};
use tracing::{field::Empty, span, Level, Span};
use uuid::Uuid;

/// Span for one pipeline stage
pub struct StageSpan {
    span: Span,
    start_time: Instant,
    stage_name: &'static str,
}

impl StageSpan {
    pub fn new(stage_name: &'static str, correlation_id: Option<Uuid>) -> Self {
        let span = span!(
            Level::INFO,
            "pipeline_stage",
            stage = stage_name,
            correlation_id = Empty,
            input_width = Empty,
            input_height = Empty,
            output_count = Empty,
            success = Empty,
            execution_time_ms = Empty,
        );
        if let Some(corr_id) = correlation_id {
            span.record("correlation_id", tracing::field::display(corr_id));
        }

        Self {
            span,
            start_time: Instant::now(),
            stage_name,
        }
    }

    /// Record the size of the image the stage works on
    pub fn record_input(&self, width: usize, height: usize) {
        self.span.record("input_width", width);
        self.span.record("input_height", height);
        tracing::debug!(
            parent: &self.span,
            input_width = width,
            input_height = height,
            "Pipeline stage input recorded"
        );
    }

    /// Record how many items (corners, matches, inliers...) the stage produced
    pub fn record_output(&self, count: usize) {
        self.span.record("output_count", count);
    }

    /// Close the stage and return its wall-clock duration
    pub fn finish(self, success: bool) -> Duration {
        let duration = self.start_time.elapsed();
        self.span.record("success", success);
        self.span.record("execution_time_ms", duration.as_secs_f64() * 1000.0);

        if success {
            tracing::info!(
                parent: &self.span,
                stage = self.stage_name,
                execution_time_ms = duration.as_millis() as u64,
                "Pipeline stage completed"
            );
        } else {
            tracing::warn!(
                parent: &self.span,
                stage = self.stage_name,
                execution_time_ms = duration.as_millis() as u64,
                "Pipeline stage failed"
            );
        }
        duration
    }

    pub fn stage_name(&self) -> &'static str {
        self.stage_name
    }

    /// Get the underlying span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Span for a single HTTP request
pub struct RequestSpan {
    span: Span,
    start_time: Instant,
}

impl RequestSpan {
    pub fn new(route: &str, correlation_id: Uuid) -> Self {
        let span = span!(
            Level::INFO,
            "http_request",
            route = route,
            correlation_id = %correlation_id,
            status = Empty,
            execution_time_ms = Empty,
        );
        Self {
            span,
            start_time: Instant::now(),
        }
    }

    pub fn record_upload(&self, field: &str, bytes: usize) {
        tracing::debug!(parent: &self.span, field_name = field, bytes, "Multipart field received");
    }

    /// Record the response status and log completion
    pub fn record_status(&self, status: u16) {
        let duration = self.start_time.elapsed();
        self.span.record("status", status);
        self.span.record("execution_time_ms", duration.as_secs_f64() * 1000.0);
        tracing::info!(
            parent: &self.span,
            status,
            execution_time_ms = duration.as_millis() as u64,
            "Request completed"
        );
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_stage_span_logs_completion() {
        let span = StageSpan::new("harris", Some(Uuid::new_v4()));
        {
            let _enter = span.enter();
            span.record_input(640, 480);
            span.record_output(12);
        }
        let elapsed = span.finish(true);
        assert!(elapsed.as_secs() < 60);
        assert!(logs_contain("Pipeline stage completed"));
    }

    #[traced_test]
    #[test]
    fn test_stage_span_logs_failure() {
        let span = StageSpan::new("ransac", None);
        assert_eq!(span.stage_name(), "ransac");
        span.finish(false);
        assert!(logs_contain("Pipeline stage failed"));
    }

    #[traced_test]
    #[test]
    fn test_request_span() {
        let span = RequestSpan::new("/stitch", Uuid::new_v4());
        span.record_upload("image1", 1024);
        span.record_status(200);
        assert!(logs_contain("Request completed"));
    }
}
