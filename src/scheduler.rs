//! Daily refresh timer
use crate::keeper::KeeperHandle;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveTime, TimeZone};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

/// The first occurrence of `at` strictly after `now`, in `now`'s time zone.
///
/// Days on which `at` does not exist locally (DST gaps) are skipped. At the
/// end of the representable calendar `now` itself is returned.
pub fn next_refresh<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest()
            && candidate > *now
        {
            return candidate;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => {
                return now
                    .clone()
                    .checked_add_signed(chrono::Duration::days(1))
                    .unwrap_or_else(|| now.clone());
            }
        }
    }
}

pub fn duration_until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Duration {
    (target.clone() - now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Starts the refresh loop on its own task.
///
/// Each cycle computes the next wake time, refreshes immediately and then
/// sleeps. The outcome of the first cycle is sent on `first_cycle`; later
/// failures are logged and the loop carries on.
pub fn spawn(
    keeper: KeeperHandle,
    at: NaiveTime,
    first_cycle: oneshot::Sender<Result<usize>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(%at, "Timer started");
        let mut first_cycle = Some(first_cycle);
        let mut cycle = 0u64;

        loop {
            cycle += 1;
            let now = Local::now();
            let wake_at = next_refresh(&now, at);
            let wait = duration_until(&now, &wake_at);

            let outcome = keeper.refresh().await;
            match &outcome {
                Ok(pairs) => info!(cycle, pairs, "Refresh cycle completed"),
                Err(e) => error!(cycle, error = %e, "Refresh cycle failed"),
            }
            if let Some(tx) = first_cycle.take() {
                let _ = tx.send(outcome);
            }

            info!(cycle, wake_at = %wake_at, "Sleeping until next refresh");
            sleep(wait).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::RateKeeper;
    use crate::keeper::tests::{StubProvider, archive_in, default_plan};
    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Timelike, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 2, 28)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_before_refresh_time_wakes_today() {
        let now = utc(9, 30, 0);
        let next = next_refresh(&now, noon());
        assert_eq!(next, utc(12, 0, 0));
        assert_eq!(duration_until(&now, &next), Duration::from_secs(9000));
    }

    #[test]
    fn test_after_refresh_time_wakes_tomorrow() {
        let now = utc(18, 0, 0);
        let next = next_refresh(&now, noon());
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(next.hour(), 12);
    }

    #[test]
    fn test_exactly_at_refresh_time_wakes_tomorrow() {
        let now = utc(12, 0, 0);
        let next = next_refresh(&now, noon());
        assert!(next > now);
        assert_eq!(duration_until(&now, &next), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_wake_time_is_always_in_the_future() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        for minute in (0..24 * 60).step_by(7) {
            let local = day
                .and_hms_opt(minute / 60, minute % 60, 59)
                .unwrap();
            let now = tz.from_local_datetime(&local).unwrap();

            let next = next_refresh(&now, noon());

            assert!(next > now, "{next} is not after {now}");
            assert!(next - now <= chrono::Duration::days(1));
            assert_eq!(next.time(), noon());
        }
    }

    /// UTC+1 until 2024-03-31 01:00 UTC, UTC+2 after. Local 02:00-03:00 that day does not exist.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }

        fn local(day: u32, h: u32, m: u32) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < Self::local(31, 2, 0) {
                LocalResult::Single(Self::winter())
            } else if *local < Self::local(31, 3, 0) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::local(31, 1, 0) {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    #[test]
    fn test_refresh_time_inside_dst_gap_skips_the_day() {
        let now = SpringForward
            .from_local_datetime(&SpringForward::local(30, 12, 0))
            .unwrap();
        let at = NaiveTime::from_hms_opt(2, 30, 0).unwrap();

        let next = next_refresh(&now, at);

        assert!(
            SpringForward
                .from_local_datetime(&SpringForward::local(31, 2, 30))
                .earliest()
                .is_none()
        );
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(next.time(), at);
        assert_eq!(next.offset(), &SpringForward::summer());
    }

    #[test]
    fn test_refresh_time_after_dst_gap_stays_on_the_day() {
        let now = SpringForward
            .from_local_datetime(&SpringForward::local(30, 12, 0))
            .unwrap();
        let at = NaiveTime::from_hms_opt(3, 30, 0).unwrap();

        let next = next_refresh(&now, at);

        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(next.time(), at);
        assert_eq!(duration_until(&now, &next), Duration::from_secs(14 * 3600 + 1800));
    }

    #[test]
    fn test_end_of_calendar_does_not_panic() {
        let now = NaiveDate::MAX.and_hms_opt(23, 0, 0).unwrap().and_utc();

        let next = next_refresh(&now, noon());

        assert_eq!(next, now);
        assert_eq!(duration_until(&now, &next), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_timer_refreshes_immediately() -> Result<()> {
        let dir = TempDir::new()?;
        let archive = archive_in(&dir);
        let keeper =
            RateKeeper::new(Arc::new(StubProvider::new()), archive.clone(), default_plan())
                .spawn();
        let (tx, rx) = oneshot::channel();

        let timer = spawn(keeper.clone(), noon(), tx);
        let pairs = rx.await??;
        timer.abort();

        assert_eq!(pairs, 5);
        assert!(archive.all_path().exists());
        assert_eq!(keeper.snapshot().await?.len(), 5);
        Ok(())
    }
}
