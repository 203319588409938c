use std::error::Error;

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, FromSql, Format, IsNull, Kind, ToSql, Type};

use crate::types::SqlValue;

type BoxError = Box<dyn Error + Sync + Send>;

/// Days between 1970-01-01 and the PostgreSQL epoch, 2000-01-01.
const PG_EPOCH_DAYS: i64 = 10_957;
const USECS_PER_DAY: i64 = 86_400_000_000;

/// A column value decoded from the binary wire format.
///
/// Accepts every column type. Types without a dedicated decoder are
/// rendered the way the server prints them where that is cheap (dates,
/// times, numerics, uuids, json) and as `\x`-prefixed hex otherwise.
#[derive(Debug)]
pub(crate) struct WireValue(pub SqlValue);

impl<'a> FromSql<'a> for WireValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = if *ty == Type::BOOL {
            SqlValue::Bool(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            SqlValue::Int32(i32::from(i16::from_sql(ty, raw)?))
        } else if *ty == Type::INT4 {
            SqlValue::Int32(i32::from_sql(ty, raw)?)
        } else if *ty == Type::INT8 {
            SqlValue::Int64(i64::from_sql(ty, raw)?)
        } else if *ty == Type::OID {
            SqlValue::Int64(i64::from(u32::from_sql(ty, raw)?))
        } else if *ty == Type::FLOAT4 {
            SqlValue::Double(f64::from(f32::from_sql(ty, raw)?))
        } else if *ty == Type::FLOAT8 {
            SqlValue::Double(f64::from_sql(ty, raw)?)
        } else if *ty == Type::NUMERIC {
            SqlValue::Text(numeric_to_string(raw)?)
        } else if *ty == Type::DATE {
            SqlValue::Text(date_to_string(read_i32(raw)?))
        } else if *ty == Type::TIME {
            SqlValue::Text(time_to_string(read_i64(raw)?))
        } else if *ty == Type::TIMESTAMP {
            SqlValue::Text(timestamp_to_string(read_i64(raw)?))
        } else if *ty == Type::TIMESTAMPTZ {
            let micros = read_i64(raw)?;
            let rendered = timestamp_to_string(micros);
            if micros == i64::MAX || micros == i64::MIN {
                SqlValue::Text(rendered)
            } else {
                SqlValue::Text(format!("{}+00", rendered))
            }
        } else if *ty == Type::UUID {
            SqlValue::Text(uuid_to_string(raw)?)
        } else if *ty == Type::JSONB {
            // Version byte, then the JSON text
            match raw.split_first() {
                Some((&1, json)) => SqlValue::Text(std::str::from_utf8(json)?.to_string()),
                _ => return Err("unsupported jsonb version".into()),
            }
        } else if *ty == Type::BYTEA {
            SqlValue::Text(hex(raw))
        } else if matches!(ty.kind(), Kind::Enum(_))
            || <&str as FromSql>::accepts(ty)
            || *ty == Type::JSON
            || *ty == Type::XML
        {
            SqlValue::Text(std::str::from_utf8(raw)?.to_string())
        } else {
            SqlValue::Text(hex(raw))
        };
        Ok(WireValue(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(WireValue(SqlValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// A parameter sent in text format, parsed by the server into whatever
/// type the parameter was declared as.
#[derive(Debug)]
pub(crate) struct TextParam(pub Option<String>);

impl ToSql for TextParam {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

fn read_i32(raw: &[u8]) -> Result<i32, BoxError> {
    let bytes: [u8; 4] = raw.try_into().map_err(|_| "invalid buffer size")?;
    Ok(i32::from_be_bytes(bytes))
}

fn read_i64(raw: &[u8]) -> Result<i64, BoxError> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| "invalid buffer size")?;
    Ok(i64::from_be_bytes(bytes))
}

fn read_u16_at(raw: &[u8], offset: usize) -> Result<u16, BoxError> {
    raw.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "truncated numeric".into())
}

fn hex(raw: &[u8]) -> String {
    let mut out = String::with_capacity(2 + raw.len() * 2);
    out.push_str("\\x");
    for byte in raw {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Year, month and day for a count of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn date_to_string(days: i32) -> String {
    match days {
        i32::MAX => "infinity".to_string(),
        i32::MIN => "-infinity".to_string(),
        _ => {
            let (year, month, day) = civil_from_days(i64::from(days) + PG_EPOCH_DAYS);
            format!("{:04}-{:02}-{:02}", year, month, day)
        }
    }
}

/// `HH:MM:SS` with trailing fractional zeros dropped.
fn time_to_string(micros: i64) -> String {
    let secs = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let mut out = format!("{:02}:{:02}:{:02}", secs / 3_600, secs / 60 % 60, secs % 60);
    if fraction > 0 {
        let digits = format!("{:06}", fraction);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn timestamp_to_string(micros: i64) -> String {
    match micros {
        i64::MAX => "infinity".to_string(),
        i64::MIN => "-infinity".to_string(),
        _ => {
            let days = micros.div_euclid(USECS_PER_DAY);
            let time = micros.rem_euclid(USECS_PER_DAY);
            let (year, month, day) = civil_from_days(days + PG_EPOCH_DAYS);
            format!(
                "{:04}-{:02}-{:02} {}",
                year,
                month,
                day,
                time_to_string(time)
            )
        }
    }
}

fn uuid_to_string(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err("invalid buffer size".into());
    }
    let digits: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &digits[0..8],
        &digits[8..12],
        &digits[12..16],
        &digits[16..20],
        &digits[20..32]
    ))
}

/// Render a binary NUMERIC: a header of digit count, weight, sign and
/// display scale, followed by base-10000 digits.
fn numeric_to_string(raw: &[u8]) -> Result<String, BoxError> {
    let ndigits = usize::from(read_u16_at(raw, 0)?);
    let weight = read_u16_at(raw, 2)? as i16;
    let sign = read_u16_at(raw, 4)?;
    let dscale = usize::from(read_u16_at(raw, 6)?);

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => return Err("invalid numeric sign".into()),
    }

    let digits = (0..ndigits)
        .map(|i| read_u16_at(raw, 8 + i * 2))
        .collect::<Result<Vec<_>, _>>()?;
    let digit = |index: i32| -> u16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit(0).to_string());
        for index in 1..=i32::from(weight) {
            out.push_str(&format!("{:04}", digit(index)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut index = i32::from(weight) + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(index)));
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}
