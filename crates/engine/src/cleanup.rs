//! Cleanup sweep — drops appointment rows outside the booking window.
//!
//! Only today's and tomorrow's appointments are kept; everything else
//! (yesterday's history, far-future junk rows) is deleted. Runs once at
//! process start and every interval tick thereafter, plus on demand over
//! HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use tokio::time::MissedTickBehavior;

use barbe_common::error::AppError;
use barbe_store::StoreClient;

/// A row is stale when its calendar date is neither today nor tomorrow.
pub fn is_stale(date: NaiveDate, today: NaiveDate) -> bool {
    let tomorrow = today + Days::new(1);
    date != today && date != tomorrow
}

pub struct CleanupSweep {
    store: StoreClient,
}

impl CleanupSweep {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Delete stale rows as of the current day. Returns how many went.
    pub async fn run_once(&self) -> Result<u64, AppError> {
        self.run_once_at(Utc::now().date_naive()).await
    }

    /// Same, with an injectable "today".
    pub async fn run_once_at(&self, today: NaiveDate) -> Result<u64, AppError> {
        let rows = self.store.list_appointments(None).await?;
        let mut deleted = 0u64;
        let mut last_error = None;

        for appointment in rows {
            if !is_stale(appointment.date, today) {
                continue;
            }
            match self.store.delete_appointment(appointment.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::error!(
                        appointment_id = appointment.id,
                        error = %e,
                        "stale appointment delete failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        if deleted > 0 {
            tracing::info!(deleted, "cleanup sweep removed stale appointments");
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(deleted),
        }
    }

    /// Timer loop: the first tick fires immediately (run at process start),
    /// then every interval. Errors here are logged and swallowed; the
    /// on-demand HTTP trigger is the path that surfaces them.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "cleanup sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_and_tomorrow_are_retained() {
        let today: NaiveDate = "2024-06-10".parse().unwrap();
        assert!(!is_stale("2024-06-10".parse().unwrap(), today));
        assert!(!is_stale("2024-06-11".parse().unwrap(), today));
    }

    #[test]
    fn test_yesterday_is_stale() {
        let today: NaiveDate = "2024-06-10".parse().unwrap();
        assert!(is_stale("2024-06-09".parse().unwrap(), today));
    }

    #[test]
    fn test_far_future_is_stale() {
        let today: NaiveDate = "2024-06-10".parse().unwrap();
        assert!(is_stale("2024-06-12".parse().unwrap(), today));
        assert!(is_stale("2025-01-01".parse().unwrap(), today));
    }

    #[test]
    fn test_month_boundary() {
        let today: NaiveDate = "2024-06-30".parse().unwrap();
        assert!(!is_stale("2024-07-01".parse().unwrap(), today));
        assert!(is_stale("2024-07-02".parse().unwrap(), today));
    }
}
