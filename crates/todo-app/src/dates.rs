// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::OnceLock;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::ValidationError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Resolves and caches the local UTC offset.
///
/// The offset can only be read reliably while the process is single
/// threaded, so binaries call this before spawning any thread. Falls back
/// to UTC when the platform refuses.
pub fn init_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

pub fn local_offset() -> UtcOffset {
    init_local_offset()
}

pub fn to_local(value: OffsetDateTime) -> OffsetDateTime {
    value.to_offset(local_offset())
}

pub fn local_today() -> Date {
    to_local(OffsetDateTime::now_utc()).date()
}

/// Start of `date` in the local offset; the instant stored for a due date.
pub fn local_midnight(date: Date) -> OffsetDateTime {
    PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(local_offset())
}

pub fn format_date(value: Date) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    let trimmed = input.trim();
    Date::parse(trimmed, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_owned()))
}

/// Parses a due date and rejects anything before `today`. Today itself is accepted.
pub fn validate_due_date(input: &str, today: Date) -> Result<Date, ValidationError> {
    let date = parse_date(input)?;
    if date < today {
        return Err(ValidationError::PastDate(format_date(date)));
    }
    Ok(date)
}

pub fn validate_title(input: &str) -> Result<&str, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed)
}
