//! `Date` constructor and prototype. The internal slot is milliseconds
//! since the Unix epoch (`NaN` marks an invalid date); all field accessors
//! use UTC so results do not depend on the host's timezone database.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{InternalData, Value};

use super::{constructing, register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.date_proto.clone();
    let ctor = register_constructor(interp, "Date", date_constructor, 7, &proto);

    register_method(interp, &ctor, "now", date_now, 0);
    register_method(interp, &ctor, "parse", date_parse, 1);
    register_method(interp, &ctor, "UTC", date_utc, 7);

    register_method(interp, &proto, "getTime", date_get_time, 0);
    register_method(interp, &proto, "valueOf", date_get_time, 0);
    register_method(interp, &proto, "getFullYear", date_get_full_year, 0);
    register_method(interp, &proto, "getUTCFullYear", date_get_full_year, 0);
    register_method(interp, &proto, "getMonth", date_get_month, 0);
    register_method(interp, &proto, "getUTCMonth", date_get_month, 0);
    register_method(interp, &proto, "getDate", date_get_date, 0);
    register_method(interp, &proto, "getUTCDate", date_get_date, 0);
    register_method(interp, &proto, "getDay", date_get_day, 0);
    register_method(interp, &proto, "getUTCDay", date_get_day, 0);
    register_method(interp, &proto, "getHours", date_get_hours, 0);
    register_method(interp, &proto, "getUTCHours", date_get_hours, 0);
    register_method(interp, &proto, "getMinutes", date_get_minutes, 0);
    register_method(interp, &proto, "getUTCMinutes", date_get_minutes, 0);
    register_method(interp, &proto, "getSeconds", date_get_seconds, 0);
    register_method(interp, &proto, "getUTCSeconds", date_get_seconds, 0);
    register_method(interp, &proto, "getMilliseconds", date_get_milliseconds, 0);
    register_method(interp, &proto, "getUTCMilliseconds", date_get_milliseconds, 0);
    register_method(interp, &proto, "getTimezoneOffset", date_get_timezone_offset, 0);
    register_method(interp, &proto, "setTime", date_set_time, 1);
    register_method(interp, &proto, "setFullYear", date_set_full_year, 3);
    register_method(interp, &proto, "setMonth", date_set_month, 2);
    register_method(interp, &proto, "setDate", date_set_date, 1);
    register_method(interp, &proto, "setHours", date_set_hours, 4);
    register_method(interp, &proto, "setMinutes", date_set_minutes, 3);
    register_method(interp, &proto, "setSeconds", date_set_seconds, 2);
    register_method(interp, &proto, "setMilliseconds", date_set_milliseconds, 1);
    register_method(interp, &proto, "toString", date_to_string, 0);
    register_method(interp, &proto, "toUTCString", date_to_string, 0);
    register_method(interp, &proto, "toISOString", date_to_iso_string, 0);
    register_method(interp, &proto, "toJSON", date_to_iso_string, 0);
}

/// Human-readable date form, shared with the value model's string
/// conversion.
pub fn format_date(timestamp: f64) -> String {
    match datetime(timestamp) {
        Some(dt) => dt
            .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
            .to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// ISO 8601 form used by `toISOString` and `toJSON`.
pub(crate) fn iso_string(timestamp: f64) -> String {
    match datetime(timestamp) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "Invalid Date".to_string(),
    }
}

fn datetime(timestamp: f64) -> Option<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(timestamp as i64)
}

fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

fn parse_date(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(text, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
            }
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
        }
    }
    f64::NAN
}

/// Timestamp from (year, month, day, h, m, s, ms) arguments.
fn fields_to_timestamp(args: &[Value]) -> f64 {
    let field = |i: usize, default: f64| args.get(i).map(|v| v.to_number()).unwrap_or(default);
    let year = field(0, f64::NAN);
    let month = field(1, 0.0);
    let day = field(2, 1.0);
    let hours = field(3, 0.0);
    let minutes = field(4, 0.0);
    let seconds = field(5, 0.0);
    let millis = field(6, 0.0);
    if [year, month, day, hours, minutes, seconds, millis]
        .iter()
        .any(|n| n.is_nan())
    {
        return f64::NAN;
    }
    let base = match Utc
        .with_ymd_and_hms(year as i32, 1, 1, 0, 0, 0)
        .single()
    {
        Some(dt) => dt.timestamp_millis() as f64,
        None => return f64::NAN,
    };
    // Out-of-range months and days roll over arithmetically.
    let month_days = {
        let mut total = 0.0;
        let mut y = year as i32;
        let mut m = 0i32;
        let target = month as i32;
        while m < target {
            total += days_in_month(y, m % 12) as f64;
            m += 1;
            if m % 12 == 0 {
                y += 1;
            }
        }
        total
    };
    base + (month_days + (day - 1.0)) * 86_400_000.0
        + hours * 3_600_000.0
        + minutes * 60_000.0
        + seconds * 1_000.0
        + millis
}

fn days_in_month(year: i32, month: i32) -> u32 {
    match month {
        0 => 31,
        1 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        2 => 31,
        3 => 30,
        4 => 31,
        5 => 30,
        6 => 31,
        7 => 31,
        8 => 30,
        9 => 31,
        10 => 30,
        _ => 31,
    }
}

fn date_constructor(interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let timestamp = match args {
        [] => now_millis(),
        [single] => match single {
            Value::String(s) => parse_date(s.as_str()),
            other => other.to_number(),
        },
        _ => fields_to_timestamp(args),
    };
    let date_proto = interp.date_proto.clone();
    if let Some(instance) = constructing(&this, &date_proto) {
        let mut borrowed = instance.borrow_mut();
        borrowed.class = "Date";
        borrowed.data = Some(InternalData::Date(timestamp));
        drop(borrowed);
        return Ok(Value::Object(instance));
    }
    // Called without `new`, Date returns the current time as a string.
    Ok(Value::from(format_date(now_millis())))
}

fn this_timestamp(this: &Value, who: &str) -> Result<f64, Raise> {
    match this.as_object().and_then(|obj| match &obj.borrow().data {
        Some(InternalData::Date(t)) => Some(*t),
        _ => None,
    }) {
        Some(t) => Ok(t),
        None => Err(Raise::type_error(format!("{who} requires a Date"))),
    }
}

fn set_this_timestamp(this: &Value, timestamp: f64) {
    if let Some(obj) = this.as_object() {
        obj.borrow_mut().data = Some(InternalData::Date(timestamp));
    }
}

fn date_now(_interp: &mut Interpreter, _this: Value, _args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(now_millis()))
}

fn date_parse(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    Ok(Value::Number(parse_date(&text)))
}

fn date_utc(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(fields_to_timestamp(args)))
}

macro_rules! date_getter {
    ($name:ident, $who:expr, $field:ident) => {
        fn $name(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
            let timestamp = this_timestamp(&this, $who)?;
            let value = match datetime(timestamp) {
                Some(dt) => field_of(&dt, FieldKind::$field),
                None => f64::NAN,
            };
            Ok(Value::Number(value))
        }
    };
}

enum FieldKind {
    Year,
    Month,
    Day,
    Weekday,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

fn field_of(dt: &DateTime<Utc>, field: FieldKind) -> f64 {
    match field {
        FieldKind::Year => dt.year() as f64,
        FieldKind::Month => dt.month0() as f64,
        FieldKind::Day => dt.day() as f64,
        FieldKind::Weekday => dt.weekday().num_days_from_sunday() as f64,
        FieldKind::Hours => dt.hour() as f64,
        FieldKind::Minutes => dt.minute() as f64,
        FieldKind::Seconds => dt.second() as f64,
        FieldKind::Milliseconds => dt.timestamp_subsec_millis() as f64,
    }
}

date_getter!(date_get_full_year, "getFullYear", Year);
date_getter!(date_get_month, "getMonth", Month);
date_getter!(date_get_date, "getDate", Day);
date_getter!(date_get_day, "getDay", Weekday);
date_getter!(date_get_hours, "getHours", Hours);
date_getter!(date_get_minutes, "getMinutes", Minutes);
date_getter!(date_get_seconds, "getSeconds", Seconds);
date_getter!(date_get_milliseconds, "getMilliseconds", Milliseconds);

fn date_get_time(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(this_timestamp(&this, "getTime")?))
}

fn date_get_timezone_offset(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    this_timestamp(&this, "getTimezoneOffset")?;
    Ok(Value::Number(0.0))
}

fn date_set_time(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    this_timestamp(&this, "setTime")?;
    let timestamp = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
    set_this_timestamp(&this, timestamp);
    Ok(Value::Number(timestamp))
}

/// Rebuild the timestamp with some calendar fields replaced.
fn set_fields(
    this: &Value,
    who: &str,
    args: &[Value],
    first_field: usize,
) -> Result<Value, Raise> {
    let timestamp = this_timestamp(this, who)?;
    let Some(dt) = datetime(timestamp) else {
        return Ok(Value::Number(f64::NAN));
    };
    // Current fields in (year, month, day, h, m, s, ms) order.
    let mut fields = [
        dt.year() as f64,
        dt.month0() as f64,
        dt.day() as f64,
        dt.hour() as f64,
        dt.minute() as f64,
        dt.second() as f64,
        dt.timestamp_subsec_millis() as f64,
    ];
    for (offset, arg) in args.iter().enumerate() {
        let index = first_field + offset;
        if index >= fields.len() {
            break;
        }
        fields[index] = arg.to_number();
    }
    let values: Vec<Value> = fields.iter().map(|n| Value::Number(*n)).collect();
    let timestamp = fields_to_timestamp(&values);
    set_this_timestamp(this, timestamp);
    Ok(Value::Number(timestamp))
}

fn date_set_full_year(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setFullYear", args, 0)
}

fn date_set_month(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setMonth", args, 1)
}

fn date_set_date(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setDate", args, 2)
}

fn date_set_hours(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setHours", args, 3)
}

fn date_set_minutes(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setMinutes", args, 4)
}

fn date_set_seconds(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    set_fields(&this, "setSeconds", args, 5)
}

fn date_set_milliseconds(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    set_fields(&this, "setMilliseconds", args, 6)
}

fn date_to_string(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let timestamp = this_timestamp(&this, "toString")?;
    Ok(Value::from(format_date(timestamp)))
}

fn date_to_iso_string(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    let timestamp = this_timestamp(&this, "toISOString")?;
    if !timestamp.is_finite() {
        return Err(Raise::range_error("Invalid time value"));
    }
    Ok(Value::from(iso_string(timestamp)))
}
