use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::models::{AvailabilityRecord, BookedTime, Booking, BookingStatus};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// ── Availability ──

pub fn get_availability(
    conn: &Connection,
    provider_id: &str,
) -> anyhow::Result<Option<AvailabilityRecord>> {
    let result = conn.query_row(
        "SELECT provider_id, weekly_template, slot_duration_minutes, custom_days_off, created_at, updated_at
         FROM availability WHERE provider_id = ?1",
        params![provider_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        },
    );

    match result {
        Ok((provider_id, template_json, slot_duration_minutes, days_off_json, created_at, updated_at)) => {
            Ok(Some(AvailabilityRecord {
                weekly_template: serde_json::from_str(&template_json)
                    .with_context(|| format!("corrupt weekly template for {provider_id}"))?,
                custom_days_off: serde_json::from_str(&days_off_json)
                    .with_context(|| format!("corrupt days off for {provider_id}"))?,
                slot_duration_minutes,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
                provider_id,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_availability(conn: &Connection, record: &AvailabilityRecord) -> anyhow::Result<()> {
    let template_json = serde_json::to_string(&record.weekly_template)?;
    let days_off_json = serde_json::to_string(&record.custom_days_off)?;
    let created_at = record.created_at.format(TIMESTAMP_FORMAT).to_string();
    let updated_at = record.updated_at.format(TIMESTAMP_FORMAT).to_string();

    // created_at is never overwritten once the row exists
    conn.execute(
        "INSERT INTO availability (provider_id, weekly_template, slot_duration_minutes, custom_days_off, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(provider_id) DO UPDATE SET
           weekly_template = excluded.weekly_template,
           slot_duration_minutes = excluded.slot_duration_minutes,
           custom_days_off = excluded.custom_days_off,
           updated_at = excluded.updated_at",
        params![
            record.provider_id,
            template_json,
            record.slot_duration_minutes,
            days_off_json,
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, provider_id, customer_id, scheduled_date, scheduled_time, duration_minutes, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.provider_id,
            booking.customer_id,
            booking.scheduled_date.format(DATE_FORMAT).to_string(),
            booking.scheduled_time.format(TIME_FORMAT).to_string(),
            booking.duration_minutes,
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Inserts `booking` only if no slot-blocking booking of the same provider
/// overlaps it. Check and insert share one immediate transaction.
pub fn insert_booking_if_free(
    conn: &mut Connection,
    booking: &Booking,
    default_duration: u32,
) -> anyhow::Result<bool> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = get_bookings_for_provider_on_date(&tx, &booking.provider_id, booking.scheduled_date)?;
    let (start, end) = BookedTime::from(booking).occupied_minutes(default_duration);

    let conflict = existing
        .iter()
        .filter(|b| b.status.blocks_slot())
        .map(|b| BookedTime::from(b).occupied_minutes(default_duration))
        .any(|(b_start, b_end)| start < b_end && end > b_start);

    if conflict {
        return Ok(false);
    }

    create_booking(&tx, booking)?;
    tx.commit()?;
    Ok(true)
}

pub fn get_bookings_for_provider_on_date(
    conn: &Connection,
    provider_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, provider_id, customer_id, scheduled_date, scheduled_time, duration_minutes, status, notes, created_at, updated_at
         FROM bookings WHERE provider_id = ?1 AND scheduled_date = ?2 ORDER BY scheduled_time ASC",
    )?;

    let rows = stmt.query_map(
        params![provider_id, date.format(DATE_FORMAT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, provider_id, customer_id, scheduled_date, scheduled_time, duration_minutes, status, notes, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), updated_at.format(TIMESTAMP_FORMAT).to_string(), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let provider_id: String = row.get(1)?;
    let customer_id: String = row.get(2)?;
    let scheduled_date_str: String = row.get(3)?;
    let scheduled_time_str: String = row.get(4)?;
    let duration_minutes: Option<u32> = row.get(5)?;
    let status_str: String = row.get(6)?;
    let notes: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let scheduled_date = NaiveDate::parse_from_str(&scheduled_date_str, DATE_FORMAT)
        .with_context(|| format!("bad scheduled_date on booking {id}"))?;
    let scheduled_time = NaiveTime::parse_from_str(&scheduled_time_str, TIME_FORMAT)
        .with_context(|| format!("bad scheduled_time on booking {id}"))?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown status {status_str:?} on booking {id}"))?;

    Ok(Booking {
        scheduled_date,
        scheduled_time,
        status,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
        id,
        provider_id,
        customer_id,
        duration_minutes,
        notes,
    })
}

fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).with_context(|| format!("bad timestamp: {s}"))
}

// ── Device Tokens ──

/// Token registration belongs to the client apps. This only seeds fixtures
/// and local databases; no route calls it.
pub fn add_device_token(conn: &Connection, user_id: &str, token: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO device_tokens (user_id, token) VALUES (?1, ?2)
         ON CONFLICT(user_id, token) DO NOTHING",
        params![user_id, token],
    )?;
    Ok(())
}

pub fn get_device_tokens(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT token FROM device_tokens WHERE user_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

    let mut tokens = vec![];
    for row in rows {
        tokens.push(row?);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking(id: &str, time: &str, status: BookingStatus) -> Booking {
        let now = dt("2025-06-10 12:00");
        Booking {
            id: id.to_string(),
            provider_id: "p1".to_string(),
            customer_id: "c1".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            scheduled_time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            duration_minutes: Some(60),
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_availability_round_trip() {
        let conn = setup_db();
        assert!(get_availability(&conn, "p1").unwrap().is_none());

        let mut record = AvailabilityRecord::with_defaults("p1", dt("2025-06-01 08:00"));
        record
            .custom_days_off
            .insert(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
        save_availability(&conn, &record).unwrap();

        let loaded = get_availability(&conn, "p1").unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_availability_keeps_created_at() {
        let conn = setup_db();
        let mut record = AvailabilityRecord::with_defaults("p1", dt("2025-06-01 08:00"));
        save_availability(&conn, &record).unwrap();

        record.created_at = dt("2030-01-01 00:00");
        record.updated_at = dt("2025-06-02 09:00");
        record.slot_duration_minutes = 30;
        save_availability(&conn, &record).unwrap();

        let loaded = get_availability(&conn, "p1").unwrap().unwrap();
        assert_eq!(loaded.created_at, dt("2025-06-01 08:00"));
        assert_eq!(loaded.updated_at, dt("2025-06-02 09:00"));
        assert_eq!(loaded.slot_duration_minutes, 30);
    }

    #[test]
    fn test_bookings_for_date_are_ordered() {
        let conn = setup_db();
        create_booking(&conn, &booking("b2", "14:00", BookingStatus::Pending)).unwrap();
        create_booking(&conn, &booking("b1", "09:00", BookingStatus::Cancelled)).unwrap();

        let found = get_bookings_for_provider_on_date(
            &conn,
            "p1",
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
        )
        .unwrap();
        let ids: Vec<_> = found.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
        assert_eq!(found[0].status, BookingStatus::Cancelled);

        let other_day = get_bookings_for_provider_on_date(
            &conn,
            "p1",
            NaiveDate::from_ymd_opt(2025, 6, 17).unwrap(),
        )
        .unwrap();
        assert!(other_day.is_empty());
    }

    #[test]
    fn test_insert_booking_if_free_rejects_overlap() {
        let mut conn = setup_db();
        assert!(insert_booking_if_free(&mut conn, &booking("b1", "10:00", BookingStatus::Pending), 60).unwrap());
        assert!(!insert_booking_if_free(&mut conn, &booking("b2", "10:30", BookingStatus::Pending), 60).unwrap());
        // adjacent is fine
        assert!(insert_booking_if_free(&mut conn, &booking("b3", "11:00", BookingStatus::Pending), 60).unwrap());
        assert!(get_booking_by_id(&conn, "b2").unwrap().is_none());
    }

    #[test]
    fn test_insert_booking_if_free_ignores_cancelled() {
        let mut conn = setup_db();
        create_booking(&conn, &booking("b1", "10:00", BookingStatus::Cancelled)).unwrap();
        assert!(insert_booking_if_free(&mut conn, &booking("b2", "10:00", BookingStatus::Pending), 60).unwrap());
    }

    #[test]
    fn test_update_booking_status() {
        let conn = setup_db();
        create_booking(&conn, &booking("b1", "10:00", BookingStatus::Pending)).unwrap();

        let at = dt("2025-06-11 07:45");
        assert!(update_booking_status(&conn, "b1", BookingStatus::OnTheWay, at).unwrap());
        assert!(!update_booking_status(&conn, "missing", BookingStatus::OnTheWay, at).unwrap());

        let b = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::OnTheWay);
        assert_eq!(b.updated_at, at);
    }

    #[test]
    fn test_device_tokens_are_unique_per_user() {
        let conn = setup_db();
        add_device_token(&conn, "u1", "tok-a").unwrap();
        add_device_token(&conn, "u1", "tok-a").unwrap();
        add_device_token(&conn, "u1", "tok-b").unwrap();
        add_device_token(&conn, "u2", "tok-c").unwrap();

        let mut tokens = get_device_tokens(&conn, "u1").unwrap();
        tokens.sort();
        assert_eq!(tokens, vec!["tok-a".to_string(), "tok-b".to_string()]);
    }
}
