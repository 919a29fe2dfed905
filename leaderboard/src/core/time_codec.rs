use helpers::general::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// (s) Added to the pass clock of a just reached timing point to estimate when its reading has
/// settled in the feed.
pub const SETTLE_BUFFER_SECS: i64 = 5;

static CLOCK_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2}):([0-9]{2})$").expect("valid clock regex"));

// groups: 1 = h or m, 2 = m or s, 3 = s (three-part form only), 4 = fraction
static ELAPSED_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2}):([0-9]{2})(?::([0-9]{2}))?(?:\.([0-9]{1,3}))?$")
        .expect("valid elapsed regex")
});

fn group_u32(caps: &regex::Captures, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// parse_clock converts a clock of day (`H:MM:SS` or `HH:MM:SS`) into seconds since midnight.
/// Returns None for anything else, including out-of-range fields and blank input.
pub fn parse_clock(s: &str) -> Option<u32> {
    let s = clean_text(s);
    let caps = CLOCK_RX.captures(&s)?;
    let h = group_u32(&caps, 1)?;
    let m = group_u32(&caps, 2)?;
    let sec = group_u32(&caps, 3)?;

    if h > 23 || m > 59 || sec > 59 {
        return None;
    }
    Some(h * 3600 + m * 60 + sec)
}

/// parse_elapsed converts an elapsed duration (`H:MM:SS`, `HH:MM:SS` or `MM:SS`) into seconds.
/// Fractional seconds (up to three digits) are rounded half to even. Returns None on any other
/// shape.
pub fn parse_elapsed(s: &str) -> Option<u32> {
    let s = clean_text(s);
    let caps = ELAPSED_RX.captures(&s)?;
    let first = group_u32(&caps, 1)?;
    let second = group_u32(&caps, 2)?;

    let whole = match group_u32(&caps, 3) {
        Some(sec) => {
            if second > 59 || sec > 59 {
                return None;
            }
            first * 3600 + second * 60 + sec
        }
        None => {
            if second > 59 {
                return None;
            }
            first * 60 + second
        }
    };

    let round_up = caps
        .get(4)
        .map_or(false, |frac| rounds_up(frac.as_str(), whole));

    Some(whole + round_up as u32)
}

/// Round half to even on the decimal digits of the fraction, an exact half only rounds up an
/// odd whole second.
fn rounds_up(frac: &str, whole: u32) -> bool {
    let mut digits = frac.chars();
    match digits.next() {
        Some(d) if d > '5' => true,
        Some('5') => digits.any(|d| d != '0') || whole % 2 == 1,
        _ => false,
    }
}

/// add_seconds shifts a clock of day by delta seconds, wrapping around midnight.
pub fn add_seconds(clock_secs: u32, delta: i64) -> u32 {
    let day = SECONDS_PER_DAY as i64;
    (clock_secs as i64 % day + delta.rem_euclid(day)).rem_euclid(day) as u32
}

/// format_clock renders seconds since midnight as zero padded `HH:MM:SS`.
pub fn format_clock(secs: u32) -> String {
    let secs = secs % SECONDS_PER_DAY;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// format_elapsed renders a duration as `H:MM:SS`, or as `MM:SS` below one hour.
pub fn format_elapsed(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// shift_clock parses a clock string, shifts it by delta seconds and formats it again.
pub fn shift_clock(clock: &str, delta: i64) -> Option<String> {
    parse_clock(clock).map(|secs| format_clock(add_seconds(secs, delta)))
}

/// settle_clock estimates when the reading of a just passed timing point has settled.
pub fn settle_clock(pass_clock: &str) -> Option<String> {
    shift_clock(pass_clock, SETTLE_BUFFER_SECS)
}
