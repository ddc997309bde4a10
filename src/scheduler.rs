// Daily Scheduler - optional in-process trigger for the daily billing run.
//
// Fires once per day at the configured UTC hour. The HTTP cron endpoint stays
// the primary trigger; enable this only where no external scheduler exists.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::orchestrator::{DailyJobOrchestrator, DailyRunResults};

pub struct DailyScheduler {
    execution_hour: u32,
    orchestrator: Arc<DailyJobOrchestrator>,
}

impl DailyScheduler {
    pub fn new(execution_hour: u32, orchestrator: Arc<DailyJobOrchestrator>) -> Self {
        Self {
            execution_hour,
            orchestrator,
        }
    }

    /// Start the scheduler (runs in background)
    pub fn start(&self) -> JoinHandle<()> {
        let execution_hour = self.execution_hour;
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            let mut last_run: Option<NaiveDate> = None;

            loop {
                let now = Utc::now();
                let next_execution = Self::next_execution(now, execution_hour, last_run);

                info!(
                    "⏰ Next billing run scheduled for: {} UTC",
                    next_execution.format("%Y-%m-%d %H:%M:%S")
                );

                // A negative wait means the slot is already here
                if let Ok(wait) = next_execution.signed_duration_since(now).to_std() {
                    tokio::time::sleep(wait).await;
                }

                // Each run completes before the next sleep, so runs never overlap
                let date = next_execution.date_naive();
                last_run = Some(date);
                Self::run_once(&orchestrator, date).await;
            }
        })
    }

    /// One scheduled run. A panic is logged and swallowed so the loop keeps going.
    async fn run_once(
        orchestrator: &DailyJobOrchestrator,
        date: NaiveDate,
    ) -> Option<DailyRunResults> {
        match AssertUnwindSafe(orchestrator.run(date)).catch_unwind().await {
            Ok(results) => {
                info!(
                    "✓ Scheduled billing run for {} completed: {} settled, {} settlement errors",
                    date,
                    results.settlement.processed,
                    results.settlement.errors.len()
                );
                Some(results)
            }
            Err(_) => {
                error!("❌ Scheduled billing run for {} aborted", date);
                None
            }
        }
    }

    /// First slot at `execution_hour` UTC that is still ahead of `now` and
    /// falls on a date after `last_run`.
    fn next_execution(
        now: DateTime<Utc>,
        execution_hour: u32,
        last_run: Option<NaiveDate>,
    ) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(execution_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut date = now.date_naive();

        loop {
            let slot = Utc.from_utc_datetime(&date.and_time(at));
            let already_ran = matches!(last_run, Some(last) if date <= last);
            if slot > now && !already_ran {
                return slot;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => return slot,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, Timelike};

    use super::*;
    use crate::billing::memory::{BrokenMailer, MemoryStore, RecordingMailer};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_slot_is_today_or_tomorrow() {
        let morning = Utc.with_ymd_and_hms(2025, 1, 15, 1, 0, 0).unwrap();
        let next = DailyScheduler::next_execution(morning, 2, None);
        assert_eq!((next.day(), next.hour()), (15, 2));

        // Exactly on the slot counts as passed
        let on_slot = Utc.with_ymd_and_hms(2025, 1, 15, 2, 0, 0).unwrap();
        let next = DailyScheduler::next_execution(on_slot, 2, None);
        assert_eq!((next.day(), next.hour()), (16, 2));
    }

    #[test]
    fn test_early_wakeup_does_not_repeat_the_same_date() {
        // The run for the 15th finished a fraction before 02:00 UTC
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 1, 59, 59).unwrap() + Duration::milliseconds(400);

        let next = DailyScheduler::next_execution(now, 2, Some(date(2025, 1, 15)));

        assert_eq!(next.date_naive(), date(2025, 1, 16));
        assert_eq!(next.hour(), 2);
    }

    #[test]
    fn test_next_execution_rolls_over_month() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 3, 0, 0).unwrap();
        let next = DailyScheduler::next_execution(now, 2, Some(date(2025, 1, 31)));
        assert_eq!((next.month(), next.day(), next.hour()), (2, 1, 2));
    }

    #[tokio::test]
    async fn test_run_once_returns_results() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new(true));
        store.add_family("Smith", 15).await;
        let orchestrator = DailyJobOrchestrator::new(
            MemoryStore::context(store.clone(), mailer),
            "https://app.example.com".into(),
        );

        let results = DailyScheduler::run_once(&orchestrator, date(2025, 1, 15)).await;

        assert_eq!(results.map(|r| r.settlement.processed), Some(1));
    }

    #[tokio::test]
    async fn test_aborted_run_is_contained() {
        let store = Arc::new(MemoryStore::new());
        store.add_family("Smith", 15).await;
        let orchestrator = DailyJobOrchestrator::new(
            MemoryStore::context_with_email(store.clone(), Arc::new(BrokenMailer)),
            "https://app.example.com".into(),
        );

        // Settlement runs, then the report job panics; the caller only sees None
        let results = DailyScheduler::run_once(&orchestrator, date(2025, 1, 15)).await;

        assert!(results.is_none());
        assert_eq!(store.procedure_calls().await.len(), 1);
    }
}
