//! Line-oriented JSON log stream.
//!
//! Each input line is one serialized [`ResourceLogs`]. Lines are enriched
//! by the [`EnrichmentProcessor`] one at a time and written back as JSON
//! lines in input order. Malformed lines are logged and skipped; blank
//! lines are ignored.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use dockmeta_container_metadata::{EndpointDiscovery, MetadataFetcher};
use dockmeta_core::metrics as m;
use dockmeta_core::types::ResourceLogs;
use dockmeta_log_enrichment::EnrichmentProcessor;

/// Counters for one stream run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Non-blank lines read.
    pub lines: u64,
    /// Lines that were enriched and written.
    pub written: u64,
    /// Lines that failed to parse.
    pub malformed: u64,
}

/// Outcome of decoding a single input line.
#[derive(Debug)]
pub enum LineOutcome {
    /// The line was blank.
    Blank,
    /// The line did not parse as a resource log.
    Malformed(serde_json::Error),
    /// The line parsed.
    Parsed(ResourceLogs),
}

/// Decode one input line.
pub fn decode_line(line: &str) -> LineOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }
    match serde_json::from_str(trimmed) {
        Ok(logs) => LineOutcome::Parsed(logs),
        Err(e) => LineOutcome::Malformed(e),
    }
}

/// Read resource logs from `reader` until EOF, enrich them, and write
/// them to `writer`.
///
/// The writer is flushed after every line so downstream consumers see
/// records as soon as they are enriched.
///
/// # Errors
///
/// Returns an error if reading or writing fails, or if the processor is
/// not running.
pub async fn run<R, W, D, F>(
    reader: R,
    writer: &mut W,
    processor: &EnrichmentProcessor<D, F>,
) -> Result<StreamStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    D: EndpointDiscovery,
    F: MetadataFetcher,
{
    let mut stats = StreamStats::default();
    let mut lines = reader.lines();
    let mut out = Vec::with_capacity(4096);

    while let Some(line) = lines.next_line().await? {
        let logs = match decode_line(&line) {
            LineOutcome::Blank => continue,
            LineOutcome::Malformed(e) => {
                stats.lines += 1;
                stats.malformed += 1;
                metrics::counter!(m::DAEMON_INPUT_LINES_TOTAL, m::LABEL_RESULT => "malformed")
                    .increment(1);
                tracing::warn!(line = stats.lines, error = %e, "skipping malformed input line");
                continue;
            }
            LineOutcome::Parsed(logs) => logs,
        };
        stats.lines += 1;

        let enriched = processor
            .process_logs(vec![logs])
            .map_err(|e| anyhow::anyhow!("failed to process line {}: {}", stats.lines, e))?;

        for logs in &enriched {
            out.clear();
            serde_json::to_writer(&mut out, logs)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
        }
        writer.flush().await?;

        stats.written += 1;
        metrics::counter!(m::DAEMON_INPUT_LINES_TOTAL, m::LABEL_RESULT => "ok").increment(1);
    }

    tracing::debug!(
        lines = stats.lines,
        written = stats.written,
        malformed = stats.malformed,
        "input stream reached EOF"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert!(matches!(decode_line(""), LineOutcome::Blank));
        assert!(matches!(decode_line("   \t"), LineOutcome::Blank));
    }

    #[test]
    fn malformed_lines_are_reported() {
        assert!(matches!(decode_line("{not json"), LineOutcome::Malformed(_)));
        assert!(matches!(decode_line("[1, 2]"), LineOutcome::Malformed(_)));
    }

    #[test]
    fn resource_logs_line_parses() {
        let line = r#"{"resource":{"attributes":{"container.id":"abc"}},"records":[]}"#;
        let LineOutcome::Parsed(logs) = decode_line(line) else {
            panic!("expected parsed line");
        };
        assert_eq!(
            logs.resource.get("container.id").map(ToString::to_string),
            Some("abc".to_owned())
        );
    }
}
