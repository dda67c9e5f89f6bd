//! Calendar publishing
//!
//! Turns a packed schedule into calendar events, one per study block, via
//! the Google Calendar REST API. Events are created sequentially in block
//! order; a failure partway through is reported with how far publishing
//! got, since the events already created are not rolled back.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CalendarConfig;
use crate::error::{Error, Result};
use crate::schedule::{Schedule, ScheduledBlock};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Outcome of a successful publish
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub created_count: usize,
}

#[derive(Serialize)]
struct EventBody {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: EventTime,
    end: EventTime,
}

#[derive(Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: &'static str,
}

impl EventTime {
    fn at(t: DateTime<Utc>) -> Self {
        Self {
            date_time: t.to_rfc3339(),
            time_zone: "UTC",
        }
    }
}

/// Publishes schedules to a calendar over HTTP
#[derive(Debug, Clone)]
pub struct CalendarPublisher {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    day_start_hour: u32,
}

impl CalendarPublisher {
    pub fn new(config: &CalendarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            day_start_hour: config.day_start_hour,
        })
    }

    /// Create one event per block, in block order.
    ///
    /// An auth rejection before anything was created maps to `AuthRequired`;
    /// any failure after at least one event exists maps to `PartialPublish`
    /// naming the date it stopped at.
    pub async fn publish(&self, schedule: &Schedule, token: &str) -> Result<PublishReport> {
        let mut created_count = 0;

        for block in &schedule.blocks {
            match self.create_event(block, token).await {
                Ok(()) => created_count += 1,
                Err(e) if created_count == 0 => return Err(e),
                Err(e) => {
                    warn!(error = %e, created_count, "Publishing stopped partway");
                    return Err(Error::PartialPublish {
                        created_count,
                        failed_at: block.date.to_string(),
                    });
                }
            }
        }

        info!(created_count, "Schedule published");
        Ok(PublishReport { created_count })
    }

    async fn create_event(&self, block: &ScheduledBlock, token: &str) -> Result<()> {
        let start = event_start(block.date, self.day_start_hour);
        let end = start + Duration::minutes((block.hours * 60.0).round() as i64);
        let body = EventBody {
            summary: block.node_title.clone(),
            description: Some(format!("Study block: {:.1} hours", block.hours)),
            start: EventTime::at(start),
            end: EventTime::at(end),
        };

        let url = format!("{}/calendars/{}/events", self.base_url, self.calendar_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::AuthRequired);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Other(format!(
                "Calendar API returned {}: {}",
                status, text
            )));
        }

        debug!(title = %block.node_title, date = %block.date, "Event created");
        Ok(())
    }
}

fn event_start(date: NaiveDate, day_start_hour: u32) -> DateTime<Utc> {
    // Hour is config-validated; midnight is a safe fallback
    date.and_hms_opt(day_start_hour.min(23), 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schedule(dates: &[&str]) -> Schedule {
        let blocks = dates
            .iter()
            .enumerate()
            .map(|(i, d)| ScheduledBlock {
                date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                node_id: format!("n{}", i),
                node_title: format!("Concept {}", i),
                hours: 2.0,
            })
            .collect::<Vec<_>>();
        Schedule {
            start_date: blocks
                .first()
                .map(|b| b.date)
                .unwrap_or_else(|| NaiveDate::parse_from_str("2026-09-01", "%Y-%m-%d").unwrap()),
            daily_hours: 2.0,
            total_hours: blocks.iter().map(|b| b.hours).sum(),
            total_days: blocks.len() as u32,
            blocks,
            cycle: None,
        }
    }

    /// Loopback server answering each request with the next scripted status
    fn mock_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind mock server");
        let port = server.server_addr().to_ip().expect("ip addr").port();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_inner = hits.clone();

        std::thread::spawn(move || {
            for (i, request) in server.incoming_requests().enumerate() {
                hits_inner.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(i).copied().unwrap_or(500);
                let response = tiny_http::Response::from_string("{}")
                    .with_status_code(tiny_http::StatusCode(status));
                let _ = request.respond(response);
                if i + 1 >= statuses.len() {
                    break;
                }
            }
        });

        (format!("http://127.0.0.1:{}", port), hits)
    }

    fn publisher(base_url: String) -> CalendarPublisher {
        CalendarPublisher::new(&CalendarConfig {
            base_url,
            calendar_id: "primary".into(),
            day_start_hour: 9,
        })
        .expect("publisher")
    }

    #[test]
    fn test_event_start_time() {
        let date = NaiveDate::parse_from_str("2026-09-01", "%Y-%m-%d").unwrap();
        let start = event_start(date, 9);
        assert_eq!(start.to_rfc3339(), "2026-09-01T09:00:00+00:00");
    }

    #[tokio::test]
    async fn test_publish_all_blocks() {
        let (url, hits) = mock_server(vec![200, 200, 200]);
        let publisher = publisher(url);

        let report = publisher
            .publish(&schedule(&["2026-09-01", "2026-09-01", "2026-09-02"]), "token")
            .await
            .unwrap();

        assert_eq!(report.created_count, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_rejection_before_any_event() {
        let (url, _) = mock_server(vec![401]);
        let publisher = publisher(url);

        let result = publisher.publish(&schedule(&["2026-09-01"]), "bad").await;
        assert!(matches!(result, Err(Error::AuthRequired)));
    }

    #[tokio::test]
    async fn test_failure_partway_reports_progress() {
        let (url, _) = mock_server(vec![200, 200, 500]);
        let publisher = publisher(url);

        let result = publisher
            .publish(&schedule(&["2026-09-01", "2026-09-02", "2026-09-03"]), "token")
            .await;

        match result {
            Err(Error::PartialPublish {
                created_count,
                failed_at,
            }) => {
                assert_eq!(created_count, 2);
                assert_eq!(failed_at, "2026-09-03");
            }
            other => panic!("expected PartialPublish, got {:?}", other.map(|r| r.created_count)),
        }
    }

    #[tokio::test]
    async fn test_empty_schedule_publishes_nothing() {
        // No requests should be made, so no server is needed
        let publisher = publisher("http://127.0.0.1:1".into());
        let report = publisher.publish(&schedule(&[]), "token").await.unwrap();
        assert_eq!(report.created_count, 0);
    }
}
