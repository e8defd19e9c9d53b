//! Parsing of the HTTP `Range` request header.
//!
//! Only single `bytes` ranges are honoured. Anything the parser does not
//! understand (missing header, other units, multiple ranges, garbage) falls
//! back to serving the whole object, which RFC 7233 permits a server to do.
//! A well-formed range that does not overlap the object is unsatisfiable.

/// Outcome of matching a `Range` header against an object of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable range: serve the whole object with `200 OK`.
    Whole,
    /// Serve the inclusive byte interval `start..=end` with `206`.
    Partial { start: u64, end: u64 },
    /// The requested interval lies outside the object: answer `416`.
    Unsatisfiable,
}

impl RangeOutcome {
    /// Number of body bytes this outcome delivers for an object of `size` bytes.
    pub fn content_length(&self, size: u64) -> u64 {
        match *self {
            RangeOutcome::Whole => size,
            RangeOutcome::Partial { start, end } => end - start + 1,
            RangeOutcome::Unsatisfiable => 0,
        }
    }
}

/// Parse `header` for an object of `size` bytes.
///
/// The returned `Partial` interval always satisfies `start <= end < size`.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeOutcome {
    let Some(raw) = header else {
        return RangeOutcome::Whole;
    };
    let raw = raw.trim();

    let Some(ranges) = strip_bytes_unit(raw) else {
        return RangeOutcome::Whole;
    };
    if ranges.contains(',') {
        return RangeOutcome::Whole;
    }
    let Some((first, last)) = ranges.split_once('-') else {
        return RangeOutcome::Whole;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: `bytes=-N` asks for the final N bytes.
        let Some(suffix) = parse_offset(last) else {
            return RangeOutcome::Whole;
        };
        if suffix == 0 || size == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        return RangeOutcome::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Some(start) = parse_offset(first) else {
        return RangeOutcome::Whole;
    };
    let requested_end = if last.is_empty() {
        None
    } else {
        match parse_offset(last) {
            Some(end) => Some(end),
            None => return RangeOutcome::Whole,
        }
    };

    if let Some(end) = requested_end {
        if start > end {
            return RangeOutcome::Unsatisfiable;
        }
    }
    if start >= size {
        return RangeOutcome::Unsatisfiable;
    }

    let last_byte = size - 1;
    RangeOutcome::Partial {
        start,
        end: requested_end.map_or(last_byte, |end| end.min(last_byte)),
    }
}

/// `Content-Range` value for a satisfied range.
pub fn content_range(start: u64, end: u64, size: u64) -> String {
    format!("bytes {}-{}/{}", start, end, size)
}

/// `Content-Range` value accompanying a `416` response.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{}", size)
}

fn strip_bytes_unit(raw: &str) -> Option<&str> {
    let (unit, ranges) = raw.split_once('=')?;
    if unit.trim().eq_ignore_ascii_case("bytes") {
        Some(ranges.trim())
    } else {
        None
    }
}

/// Decimal offsets only; `u64::from_str` would also accept a leading `+`.
/// Offsets too large for `u64` saturate, so they clamp or fail like any
/// other offset past the object.
fn parse_offset(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(value.parse().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u64 = 1_000_000;

    fn partial(start: u64, end: u64) -> RangeOutcome {
        RangeOutcome::Partial { start, end }
    }

    #[test]
    fn absent_header_is_whole() {
        assert_eq!(parse_range(None, SIZE), RangeOutcome::Whole);
    }

    #[test]
    fn closed_range() {
        assert_eq!(parse_range(Some("bytes=0-999"), SIZE), partial(0, 999));
        assert_eq!(parse_range(Some("bytes=10-10"), SIZE), partial(10, 10));
    }

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        assert_eq!(
            parse_range(Some("bytes=500000-"), SIZE),
            partial(500_000, SIZE - 1)
        );
    }

    #[test]
    fn end_past_object_is_clamped() {
        assert_eq!(
            parse_range(Some("bytes=999990-2000000"), SIZE),
            partial(999_990, SIZE - 1)
        );
    }

    #[test]
    fn oversized_offsets_saturate() {
        assert_eq!(
            parse_range(Some("bytes=0-99999999999999999999"), SIZE),
            partial(0, SIZE - 1)
        );
        assert_eq!(
            parse_range(Some("bytes=99999999999999999999-"), SIZE),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=-99999999999999999999"), SIZE),
            partial(0, SIZE - 1)
        );
    }

    #[test]
    fn suffix_range() {
        assert_eq!(parse_range(Some("bytes=-10"), SIZE), partial(SIZE - 10, SIZE - 1));
        // Suffix longer than the object selects all of it.
        assert_eq!(parse_range(Some("bytes=-50"), 20), partial(0, 19));
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(
            parse_range(Some("bytes=2000000-2000010"), SIZE),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=1000000-"), SIZE),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(parse_range(Some("bytes=20-10"), SIZE), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=-0"), SIZE), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=0-"), 0), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=-5"), 0), RangeOutcome::Unsatisfiable);
    }

    #[test]
    fn malformed_headers_fall_back_to_whole() {
        for header in [
            "",
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=abc-def",
            "bytes=+5-10",
            "bytes=5-+10",
            "bytes=-5-10",
            "items=0-10",
            "0-10",
        ] {
            assert_eq!(parse_range(Some(header), SIZE), RangeOutcome::Whole, "{header}");
        }
    }

    #[test]
    fn multi_range_is_served_whole() {
        assert_eq!(
            parse_range(Some("bytes=0-10,20-30"), SIZE),
            RangeOutcome::Whole
        );
    }

    #[test]
    fn unit_and_whitespace_are_lenient() {
        assert_eq!(parse_range(Some(" Bytes = 0 - 9 "), SIZE), partial(0, 9));
    }

    #[test]
    fn content_length_per_outcome() {
        assert_eq!(RangeOutcome::Whole.content_length(SIZE), SIZE);
        assert_eq!(partial(0, 999).content_length(SIZE), 1000);
        assert_eq!(RangeOutcome::Unsatisfiable.content_length(SIZE), 0);
    }

    #[test]
    fn header_values() {
        assert_eq!(content_range(0, 999, SIZE), "bytes 0-999/1000000");
        assert_eq!(unsatisfied_content_range(SIZE), "bytes */1000000");
    }
}
