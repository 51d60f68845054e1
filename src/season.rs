use chrono::{Datelike, NaiveDate};

/// Label for a season spanning `start`..`end`.
///
/// Different calendar years give `"2023/24"`, a single year gives `"2023"`.
/// With only one bound the label is that bound's year; with neither it is
/// empty and the caller supplies a fallback.
pub fn season_label(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => label_for_years(start.year(), end.year()),
        (Some(only), None) | (None, Some(only)) => only.year().to_string(),
        (None, None) => String::new(),
    }
}

/// Normalizes a free-form season field (`"2023-2024"`, `"2023/24"`,
/// `"2023"`) with the same rule as [`season_label`]. Unrecognized input gives
/// an empty label.
pub fn label_from_season_field(raw: &str) -> String {
    let years = raw
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    match years.as_slice() {
        [start] if start.len() == 4 => (*start).to_string(),
        [start, end] if start.len() == 4 => {
            let Ok(start_year) = start.parse::<i32>() else {
                return String::new();
            };
            let end_year = match end.len() {
                4 => end.parse::<i32>().ok(),
                2 => end
                    .parse::<i32>()
                    .ok()
                    .map(|yy| start_year - start_year % 100 + yy)
                    .map(|y| if y < start_year { y + 100 } else { y }),
                _ => None,
            };
            match end_year {
                Some(end_year) => label_for_years(start_year, end_year),
                None => String::new(),
            }
        }
        _ => String::new(),
    }
}

/// Season in progress on `today`. Seasons roll over on 1 August.
pub fn current_season(today: NaiveDate) -> String {
    let year = today.year();
    if today.month() >= 8 {
        label_for_years(year, year + 1)
    } else {
        label_for_years(year - 1, year)
    }
}

/// Default bounds for a label when the provider sent none:
/// `"2023/24"` spans 1 Aug 2023 to 31 May 2024, `"2023"` the calendar year.
pub fn default_bounds(label: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (start, rest) = match label.split_once('/') {
        Some((start, rest)) => (start, Some(rest)),
        None => (label, None),
    };
    let year = start.trim().parse::<i32>().ok()?;
    if rest.is_some() {
        Some((
            NaiveDate::from_ymd_opt(year, 8, 1)?,
            NaiveDate::from_ymd_opt(year + 1, 5, 31)?,
        ))
    } else {
        Some((
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ))
    }
}

fn label_for_years(start_year: i32, end_year: i32) -> String {
    if start_year == end_year {
        start_year.to_string()
    } else {
        format!("{start_year}/{:02}", end_year.rem_euclid(100))
    }
}
