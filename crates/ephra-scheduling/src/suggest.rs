//! Free-range suggestions offered alongside scheduling conflicts.

use ephra_core::TimeRange;
use time::{Duration, OffsetDateTime};

use crate::models::Appointment;

/// Free gaps within `day` between the active appointments.
///
/// The walk starts at `max(now + lead, day.start)`. Overlapping
/// appointments are merged, and the result is ordered and never contains
/// an empty range.
pub fn free_ranges(
    appointments: &[Appointment],
    day: &TimeRange,
    now: OffsetDateTime,
    lead: Duration,
) -> Vec<TimeRange> {
    let mut busy: Vec<TimeRange> = appointments
        .iter()
        .filter(|a| a.is_active() && a.time_range.overlaps(day))
        .map(|a| a.time_range)
        .collect();
    busy.sort_by_key(TimeRange::start);

    let mut cursor = (now + lead).max(day.start());
    let mut gaps = Vec::new();

    for range in busy {
        let gap_end = range.start().min(day.end());
        if let Ok(gap) = TimeRange::new(cursor, gap_end) {
            gaps.push(gap);
        }
        cursor = cursor.max(range.end());
    }

    if let Ok(tail) = TimeRange::new(cursor, day.end()) {
        gaps.push(tail);
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, ReminderTracking};
    use time::macros::datetime;
    use uuid::Uuid;

    fn appt(start: OffsetDateTime, end: OffsetDateTime, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            care_provider_id: "prov-1".into(),
            time_range: TimeRange::new(start, end).unwrap(),
            status,
            reminder_minutes: 15,
            meeting_link: None,
            notes: None,
            reminder: ReminderTracking::default(),
            created_at: start,
            updated_at: start,
        }
    }

    fn day() -> TimeRange {
        TimeRange::utc_day_of(datetime!(2030-05-01 12:00 UTC))
    }

    #[test]
    fn test_gaps_around_appointments() {
        let booked = vec![
            appt(datetime!(2030-05-01 13:00 UTC), datetime!(2030-05-01 14:00 UTC), AppointmentStatus::Confirmed),
            appt(datetime!(2030-05-01 10:00 UTC), datetime!(2030-05-01 11:00 UTC), AppointmentStatus::Pending),
        ];
        let gaps = free_ranges(&booked, &day(), datetime!(2030-05-01 08:00 UTC), Duration::minutes(20));

        let expected = [
            (datetime!(2030-05-01 08:20 UTC), datetime!(2030-05-01 10:00 UTC)),
            (datetime!(2030-05-01 11:00 UTC), datetime!(2030-05-01 13:00 UTC)),
            (datetime!(2030-05-01 14:00 UTC), datetime!(2030-05-02 00:00 UTC)),
        ];
        assert_eq!(gaps.len(), expected.len());
        for (gap, (start, end)) in gaps.iter().zip(expected) {
            assert_eq!((gap.start(), gap.end()), (start, end));
        }
    }

    #[test]
    fn test_cancelled_appointments_are_free() {
        let booked = vec![appt(
            datetime!(2030-05-01 10:00 UTC),
            datetime!(2030-05-01 11:00 UTC),
            AppointmentStatus::Cancelled,
        )];
        let gaps = free_ranges(&booked, &day(), datetime!(2030-04-30 08:00 UTC), Duration::minutes(20));
        assert_eq!(gaps, vec![day()]);
    }

    #[test]
    fn test_overlapping_and_passed_appointments() {
        let booked = vec![
            appt(datetime!(2030-05-01 09:00 UTC), datetime!(2030-05-01 11:00 UTC), AppointmentStatus::Pending),
            appt(datetime!(2030-05-01 10:00 UTC), datetime!(2030-05-01 12:00 UTC), AppointmentStatus::Pending),
        ];
        // Lead time lands inside the busy block: no gap before it.
        let gaps = free_ranges(&booked, &day(), datetime!(2030-05-01 09:30 UTC), Duration::minutes(20));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start(), datetime!(2030-05-01 12:00 UTC));
    }

    #[test]
    fn test_day_fully_passed() {
        let gaps = free_ranges(&[], &day(), datetime!(2030-05-01 23:50 UTC), Duration::minutes(20));
        assert!(gaps.is_empty());
    }
}
