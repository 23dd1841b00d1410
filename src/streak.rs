use chrono::{DateTime, NaiveDate, Utc};

/// Current streak for `dates` as of now: consecutive UTC days with at least
/// one activity, counted back from today, or from yesterday when nothing
/// happened today yet. Input order does not matter and duplicates on the same
/// day count once.
pub fn calculate_streak(dates: &[DateTime<Utc>]) -> u32 {
    calculate_streak_at(dates, Utc::now())
}

pub fn calculate_streak_at(dates: &[DateTime<Utc>], now: DateTime<Utc>) -> u32 {
    if dates.is_empty() {
        return 0;
    }

    let mut days: Vec<NaiveDate> = dates.iter().map(|d| d.date_naive()).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let today = now.date_naive();
    let most_recent = days[0];

    let days_diff = (today - most_recent).num_days();
    if days_diff > 1 {
        return 0;
    }

    let anchor = if days_diff == 0 { today } else { most_recent };
    count_consecutive_days(&days, anchor)
}

// `sorted_days` must be most-recent first.
fn count_consecutive_days(sorted_days: &[NaiveDate], anchor: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut sought = anchor;

    for &day in sorted_days {
        if day == sought {
            streak += 1;
            sought = match sought.pred_opt() {
                Some(prev) => prev,
                None => break,
            };
        } else if day < sought {
            continue;
        } else {
            break;
        }
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap()
    }

    fn days_ago(n: i64) -> DateTime<Utc> {
        now() - Duration::days(n)
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(calculate_streak_at(&[], now()), 0);
    }

    #[test]
    fn today_only() {
        assert_eq!(calculate_streak_at(&[days_ago(0)], now()), 1);
    }

    #[test]
    fn same_day_counts_once() {
        let dates = [days_ago(0), days_ago(0)];
        assert_eq!(calculate_streak_at(&dates, now()), 1);
    }

    #[test]
    fn same_day_duplicates_do_not_break_the_chain() {
        let early = Utc.with_ymd_and_hms(2026, 3, 15, 1, 0, 0).unwrap();
        let dates = [days_ago(0), early, days_ago(1), days_ago(1)];
        assert_eq!(calculate_streak_at(&dates, now()), 2);
    }

    #[test]
    fn three_consecutive_days() {
        let dates = [days_ago(0), days_ago(1), days_ago(2)];
        assert_eq!(calculate_streak_at(&dates, now()), 3);
    }

    #[test]
    fn unordered_input() {
        let dates = [days_ago(2), days_ago(0), days_ago(1)];
        assert_eq!(calculate_streak_at(&dates, now()), 3);
    }

    #[test]
    fn gap_stops_after_today() {
        let dates = [days_ago(0), days_ago(2)];
        assert_eq!(calculate_streak_at(&dates, now()), 1);
    }

    #[test]
    fn three_days_ago_is_broken() {
        assert_eq!(calculate_streak_at(&[days_ago(3)], now()), 0);
    }

    #[test]
    fn two_days_ago_is_broken() {
        assert_eq!(calculate_streak_at(&[days_ago(2)], now()), 0);
    }

    #[test]
    fn yesterday_anchors_the_streak() {
        assert_eq!(calculate_streak_at(&[days_ago(1)], now()), 1);

        let dates = [days_ago(1), days_ago(2), days_ago(3), days_ago(5)];
        assert_eq!(calculate_streak_at(&dates, now()), 3);
    }

    #[test]
    fn uses_utc_day_boundaries() {
        // 23:59 yesterday and 00:01 today are different days
        let late = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 3, 15, 0, 1, 0).unwrap();
        assert_eq!(calculate_streak_at(&[late, early], now()), 2);
    }

    #[test]
    fn long_streak() {
        let dates: Vec<_> = (0..30).map(days_ago).collect();
        assert_eq!(calculate_streak_at(&dates, now()), 30);
    }
}
