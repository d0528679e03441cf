/* src/settings/duration.rs */

//! `ReloadAfter` values: either a number of seconds or a `[d.]hh:mm:ss[.fff]` time span.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
	Seconds(u64),
	Text(String),
}

/// Parses `[d.]hh:mm:ss[.fraction]`.
pub fn parse_time_span(text: &str) -> Option<Duration> {
	let text = text.trim();
	let (days, clock) = match text.split_once('.') {
		Some((days, rest)) if rest.contains(':') && !days.contains(':') => {
			(days.parse::<u64>().ok()?, rest)
		}
		_ => (0, text),
	};

	let mut parts = clock.split(':');
	let hours = parts.next()?.parse::<u64>().ok()?;
	let minutes = parts.next()?.parse::<u64>().ok()?;
	let seconds = parts.next().unwrap_or("0");
	if parts.next().is_some() || hours > 23 || minutes > 59 {
		return None;
	}

	let seconds = seconds.parse::<f64>().ok()?;
	if !(0.0..60.0).contains(&seconds) {
		return None;
	}

	let whole = days
		.checked_mul(86_400)?
		.checked_add(hours * 3_600 + minutes * 60)?;
	Duration::from_secs(whole).checked_add(Duration::from_secs_f64(seconds))
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Raw>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Raw::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
		Some(Raw::Text(text)) => parse_time_span(&text).map(Some).ok_or_else(|| {
			serde::de::Error::custom(format!("invalid time span '{text}', expected hh:mm:ss"))
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_time_span() {
		assert_eq!(parse_time_span("00:05:00"), Some(Duration::from_secs(300)));
		assert_eq!(parse_time_span("01:00"), Some(Duration::from_secs(3600)));
		assert_eq!(
			parse_time_span("1.02:00:30"),
			Some(Duration::from_secs(86_400 + 7_200 + 30))
		);
		assert_eq!(
			parse_time_span("00:00:01.5"),
			Some(Duration::from_millis(1500))
		);
	}

	#[test]
	fn test_parse_time_span_rejects_garbage() {
		assert_eq!(parse_time_span("five minutes"), None);
		assert_eq!(parse_time_span("24:00:00"), None);
		assert_eq!(parse_time_span("00:61:00"), None);
		assert_eq!(parse_time_span("00:00:00:00"), None);
		assert_eq!(parse_time_span("300"), None);
	}

	#[test]
	fn test_parse_time_span_rejects_overflow() {
		assert_eq!(parse_time_span("999999999999999.00:00:00"), None);
		assert_eq!(parse_time_span("18446744073709551615.23:59:59"), None);
	}
}
