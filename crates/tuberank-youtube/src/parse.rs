//! Pure domain parsing: duration decoding and Shorts classification.

/// Upstream category code reserved for short-form video.
pub const SHORTS_CATEGORY_ID: &str = "23";

/// Duration threshold for the Shorts heuristic, in seconds.
pub const SHORTS_MAX_DURATION_SECS: i64 = 60;

/// Decode an ISO-8601 duration token ("PT1H2M10S") into total seconds.
///
/// Missing components default to zero; malformed input yields zero rather
/// than an error, because upstream occasionally returns odd values for
/// live streams and premieres and a zero duration is harmless downstream.
pub fn parse_duration(value: &str) -> i64 {
    let Some(rest) = value.strip_prefix("PT") else {
        return 0;
    };

    let mut total: i64 = 0;
    let mut number: i64 = 0;
    let mut has_digits = false;

    for c in rest.chars() {
        if let Some(digit) = c.to_digit(10) {
            number = number.saturating_mul(10).saturating_add(digit as i64);
            has_digits = true;
            continue;
        }
        if !has_digits {
            return 0;
        }
        match c {
            'H' => total = total.saturating_add(number.saturating_mul(3600)),
            'M' => total = total.saturating_add(number.saturating_mul(60)),
            'S' => total = total.saturating_add(number),
            _ => return 0,
        }
        number = 0;
        has_digits = false;
    }

    // Trailing digits without a unit designator are malformed.
    if has_digits {
        return 0;
    }

    total
}

/// Classify a video as a Short.
///
/// A video is a Short if ANY of:
/// - duration is at most 60 seconds,
/// - any tag contains the substring "short" case-insensitively,
/// - the category code is the reserved Shorts category.
///
/// This is a heuristic, not the platform's authoritative designation. It
/// is deterministic and recomputed on every fetch, so a later tag or
/// category change self-corrects on the next upsert.
pub fn is_short(duration_seconds: i64, tags: &[String], category_id: Option<&str>) -> bool {
    if duration_seconds <= SHORTS_MAX_DURATION_SECS {
        return true;
    }
    if tags.iter().any(|t| t.to_lowercase().contains("short")) {
        return true;
    }
    category_id == Some(SHORTS_CATEGORY_ID)
}
