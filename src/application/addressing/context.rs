use chrono::{DateTime, Datelike, Local, Timelike, Utc};

use crate::domain::models::Priority;

/// Immutable snapshot the selection expressions run against. Built once per
/// addressing run, so every configuration of every recipient sees the same
/// instant.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub priority: Priority,
    /// Evaluation instant in local time; expressions reason about wall-clock
    /// hours ("page me only during the day").
    pub current_time: DateTime<Local>,
    /// Message body length in bytes.
    pub content_length: usize,
}

impl EvaluationContext {
    pub fn new(priority: Priority, now: DateTime<Utc>, content_length: usize) -> Self {
        Self {
            priority,
            current_time: now.with_timezone(&Local),
            content_length,
        }
    }

    pub fn priority_value(&self) -> i32 {
        self.priority.value()
    }

    pub fn hour(&self) -> u32 {
        self.current_time.hour()
    }

    /// ISO day of week, 1 = Monday through 7 = Sunday.
    pub fn day_of_week(&self) -> u32 {
        self.current_time.weekday().number_from_monday()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn decomposes_the_instant_in_local_time() {
        let local = Local.with_ymd_and_hms(2025, 3, 5, 14, 30, 0).unwrap();
        let context =
            EvaluationContext::new(Priority::Default, local.with_timezone(&Utc), 42);

        assert_eq!(context.hour(), 14);
        // 2025-03-05 is a Wednesday.
        assert_eq!(context.day_of_week(), 3);
        assert_eq!(context.content_length, 42);
        assert_eq!(context.priority_value(), 20);
    }
}
