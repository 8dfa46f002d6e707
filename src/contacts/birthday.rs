use time::{Date, Duration, OffsetDateTime};

/// Lookahead window for the upcoming-birthdays query. Matching ignores the
/// birth year and compares (month, day) only, so a window ending in the next
/// month or the next year still works.
///
/// Known limitation: the check only looks at the start month and the end
/// month. A window long enough to skip over a whole month (more than one
/// month boundary) misses birthdays in the skipped month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthdayWindow {
    pub start: Date,
    pub end: Date,
}

impl BirthdayWindow {
    pub fn new(today: Date, days: u32) -> Self {
        Self {
            start: today,
            end: today + Duration::days(days as i64),
        }
    }

    pub fn upcoming(days: u32) -> Self {
        Self::new(OffsetDateTime::now_utc().date(), days)
    }

    pub fn start_month(&self) -> u8 {
        u8::from(self.start.month())
    }

    pub fn start_day(&self) -> u8 {
        self.start.day()
    }

    pub fn end_month(&self) -> u8 {
        u8::from(self.end.month())
    }

    pub fn end_day(&self) -> u8 {
        self.end.day()
    }

    pub fn crosses_month(&self) -> bool {
        self.start_month() != self.end_month()
    }

    /// Whether a birthday with the given (month, day) falls inside the
    /// window. One boolean per contact, so a contact can never be counted
    /// twice even when both OR clauses would apply.
    pub fn matches(&self, month: u8, day: u8) -> bool {
        if self.crosses_month() {
            (month == self.start_month() && day >= self.start_day())
                || (month == self.end_month() && day <= self.end_day())
        } else {
            // same-month window: the two clauses collapse to a day range
            month == self.start_month() && day >= self.start_day() && day <= self.end_day()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn date(year: i32, month: u8, day: u8) -> Date {
        Date::from_calendar_date(year, Month::try_from(month).unwrap(), day).unwrap()
    }

    #[test]
    fn zero_days_matches_only_today() {
        let w = BirthdayWindow::new(date(2024, 6, 15), 0);
        assert!(w.matches(6, 15));
        assert!(!w.matches(6, 14));
        assert!(!w.matches(6, 16));
        assert!(!w.matches(7, 15));
    }

    #[test]
    fn window_crossing_a_month_boundary() {
        // 2024-06-28 + 7 days = 2024-07-05
        let w = BirthdayWindow::new(date(2024, 6, 28), 7);
        assert_eq!(w.end, date(2024, 7, 5));
        assert!(w.matches(6, 30), "start-month clause");
        assert!(w.matches(7, 3), "end-month clause");
        assert!(!w.matches(8, 1));
        assert!(!w.matches(6, 27));
        assert!(!w.matches(7, 6));
    }

    #[test]
    fn window_crossing_a_year_boundary() {
        let w = BirthdayWindow::new(date(2024, 12, 29), 7);
        assert_eq!(w.end, date(2025, 1, 5));
        assert!(w.matches(12, 31));
        assert!(w.matches(1, 3));
        assert!(!w.matches(1, 6));
        assert!(!w.matches(12, 28));
    }

    #[test]
    fn same_month_window_does_not_wrap_within_the_month() {
        // naive OR of the two clauses would also admit days before the start
        let w = BirthdayWindow::new(date(2024, 6, 10), 5);
        assert!(!w.crosses_month());
        assert!(w.matches(6, 10));
        assert!(w.matches(6, 15));
        assert!(!w.matches(6, 9));
        assert!(!w.matches(6, 16));
    }

    #[test]
    fn overlapping_clauses_count_a_contact_once() {
        // days = 0: start and end clause describe the same day
        let w = BirthdayWindow::new(date(2024, 6, 15), 0);
        let contacts = [(1u32, 6u8, 15u8), (2, 6, 14), (3, 7, 15)];
        let hits: Vec<u32> = contacts
            .iter()
            .filter(|(_, m, d)| w.matches(*m, *d))
            .map(|(id, _, _)| *id)
            .collect();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn rollover_handles_month_lengths() {
        // 2024-01-31 + 1 day lands on 2024-02-01, not an invalid date
        let w = BirthdayWindow::new(date(2024, 1, 31), 1);
        assert_eq!(w.end, date(2024, 2, 1));
        assert!(w.matches(1, 31));
        assert!(w.matches(2, 1));
        assert!(!w.matches(2, 2));
    }
}
