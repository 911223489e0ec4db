use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeZone};

use crate::api::Time;

const DATE_FORMAT: &str = "%d.%m.%Y";

/// How urgent a deadline looks, from most to least
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Urgency {
    Overdue,
    Today,
    ThisWeek,
    Later,
}

impl Urgency {
    pub fn color(&self) -> &'static str {
        match self {
            Urgency::Overdue => "red",
            Urgency::Today => "orange",
            Urgency::ThisWeek => "yellow",
            Urgency::Later => "gray",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeadlineLabel {
    Overdue,
    Today(NaiveTime),
    InDays(i64),
    On(NaiveDate),
}

impl DeadlineLabel {
    /// Overdue is decided on the exact instant; everything else on calendar
    /// days in `tz`, so a deadline tomorrow at 08:00 reads "in 1 days" even
    /// when it is less than a day away.
    pub fn new<Tz: TimeZone>(deadline: Time, now: Time, tz: &Tz) -> DeadlineLabel {
        if deadline < now {
            return DeadlineLabel::Overdue;
        }
        let local = deadline.with_timezone(tz);
        let today = now.with_timezone(tz).date_naive();
        let days = (local.date_naive() - today).num_days();
        match days {
            0 => DeadlineLabel::Today(local.time()),
            1..=6 => DeadlineLabel::InDays(days),
            _ => DeadlineLabel::On(local.date_naive()),
        }
    }

    pub fn urgency(&self) -> Urgency {
        match self {
            DeadlineLabel::Overdue => Urgency::Overdue,
            DeadlineLabel::Today(_) => Urgency::Today,
            DeadlineLabel::InDays(_) => Urgency::ThisWeek,
            DeadlineLabel::On(_) => Urgency::Later,
        }
    }
}

impl fmt::Display for DeadlineLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineLabel::Overdue => f.write_str("overdue"),
            DeadlineLabel::Today(t) => write!(f, "today at {}", t.format("%H:%M")),
            DeadlineLabel::InDays(n) => write!(f, "in {n} days"),
            DeadlineLabel::On(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

/// Age of a post or comment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeAgo {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    On(NaiveDate),
}

impl TimeAgo {
    pub fn new<Tz: TimeZone>(then: Time, now: Time, tz: &Tz) -> TimeAgo {
        let age = now - then;
        if age.num_minutes() < 1 {
            TimeAgo::JustNow
        } else if age.num_minutes() < 60 {
            TimeAgo::Minutes(age.num_minutes())
        } else if age.num_hours() < 24 {
            TimeAgo::Hours(age.num_hours())
        } else if age.num_days() < 7 {
            TimeAgo::Days(age.num_days())
        } else {
            TimeAgo::On(then.with_timezone(tz).date_naive())
        }
    }
}

impl fmt::Display for TimeAgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeAgo::JustNow => f.write_str("just now"),
            TimeAgo::Minutes(n) => write!(f, "{n} min ago"),
            TimeAgo::Hours(n) => write!(f, "{n} h ago"),
            TimeAgo::Days(n) => write!(f, "{n} d ago"),
            TimeAgo::On(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use chrono_tz::Europe::Helsinki;

    use super::*;

    fn at(s: &str) -> Time {
        s.parse().unwrap()
    }

    #[test]
    fn overdue_uses_the_exact_instant() {
        let now = at("2024-05-10T12:00:00Z");
        assert_eq!(
            DeadlineLabel::new(now - Duration::minutes(1), now, &Utc),
            DeadlineLabel::Overdue
        );
        assert_eq!(
            DeadlineLabel::new(now - Duration::hours(23), now, &Utc),
            DeadlineLabel::Overdue
        );
        assert_eq!(DeadlineLabel::Overdue.to_string(), "overdue");
        assert_eq!(DeadlineLabel::Overdue.urgency().color(), "red");
    }

    #[test]
    fn same_calendar_day_is_today() {
        let now = at("2024-05-10T08:00:00Z");
        let label = DeadlineLabel::new(at("2024-05-10T21:30:00Z"), now, &Utc);
        assert_eq!(label.to_string(), "today at 21:30");
        assert_eq!(label.urgency(), Urgency::Today);
    }

    #[test]
    fn days_follow_the_calendar_not_the_clock() {
        // 9 hours away but on the next day
        let now = at("2024-05-10T23:00:00Z");
        let label = DeadlineLabel::new(at("2024-05-11T08:00:00Z"), now, &Utc);
        assert_eq!(label, DeadlineLabel::InDays(1));
        assert_eq!(label.to_string(), "in 1 days");

        let label = DeadlineLabel::new(at("2024-05-16T23:59:00Z"), now, &Utc);
        assert_eq!(label, DeadlineLabel::InDays(6));

        let label = DeadlineLabel::new(at("2024-05-17T00:00:00Z"), now, &Utc);
        assert_eq!(label.to_string(), "17.05.2024");
        assert_eq!(label.urgency(), Urgency::Later);
    }

    #[test]
    fn calendar_days_are_local() {
        // 22:30 UTC on the 10th is already the 11th in Helsinki (UTC+3 in May)
        let now = at("2024-05-10T20:00:00Z");
        let deadline = at("2024-05-10T22:30:00Z");
        assert_eq!(
            DeadlineLabel::new(deadline, now, &Utc).to_string(),
            "today at 22:30"
        );
        assert_eq!(
            DeadlineLabel::new(deadline, now, &Helsinki),
            DeadlineLabel::InDays(1)
        );
    }

    #[test]
    fn time_ago_buckets() {
        let now = at("2024-05-10T12:00:00Z");
        let ago = |d: Duration| TimeAgo::new(now - d, now, &Utc).to_string();
        assert_eq!(ago(Duration::seconds(30)), "just now");
        assert_eq!(ago(Duration::seconds(-30)), "just now");
        assert_eq!(ago(Duration::minutes(59)), "59 min ago");
        assert_eq!(ago(Duration::minutes(60)), "1 h ago");
        assert_eq!(ago(Duration::hours(30)), "1 d ago");
        assert_eq!(ago(Duration::days(8)), "02.05.2024");
    }
}
