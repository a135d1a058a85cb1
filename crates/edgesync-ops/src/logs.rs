//! Recent log event tailing

use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::types::OrderBy;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{OpsError, map_sdk_error};

/// One log entry from the most recent stream
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

/// Reads the tail of a log group's most recently active stream
pub struct LogTailer {
    client: Client,
}

impl LogTailer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Return the most recent stream's latest events, oldest first.
    pub async fn latest_events(&self, group: &str, limit: i32) -> Result<Vec<LogEvent>, OpsError> {
        debug!(%group, "Looking up most recent log stream");
        let streams = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .order_by(OrderBy::LastEventTime)
            .descending(true)
            .limit(1)
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeLogStreams", e))?;

        let stream_name = streams
            .log_streams()
            .first()
            .and_then(|s| s.log_stream_name())
            .map(String::from)
            .ok_or_else(|| OpsError::NotFound(format!("log group {group} has no streams")))?;

        info!(%group, stream = %stream_name, "Reading latest log stream");
        let output = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(&stream_name)
            .limit(limit)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetLogEvents", e))?;

        Ok(output
            .events()
            .iter()
            .map(|e| LogEvent {
                timestamp: e.timestamp().and_then(DateTime::from_timestamp_millis),
                message: e.message().unwrap_or_default().to_string(),
            })
            .collect())
    }
}
