//! Parser for today's per-period attendance.
//!
//! Two table layouts are recognized:
//! - vertical: a header with a status column and one row per period
//! - horizontal: period labels across the header and one row per day; the
//!   row dated today is read, or the last row when the register is undated

use super::error::AttendanceError;
use super::table::tables;
use super::types::{PeriodEntry, PeriodStatus, TodaysAttendance};
use chrono::{Local, NaiveDate};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::{debug, error, info};

static PERIOD_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:p|period|hour|hr|h|session|slot)?\s*[-.#]?\s*(\d{1,2})$").unwrap()
});

const NOT_MARKED_KEYWORDS: &[&str] = &["not marked", "unmarked", "not posted", "not taken", "pending"];
const NOT_MARKED_TOKENS: &[&str] = &["-", "--", "nm", "n/a", "na"];
const ABSENT_TOKENS: &[&str] = &["a", "ab", "abs"];
const ABSENT_KEYWORDS: &[&str] = &["absent", "not present", "not attended", "not attend"];
const PRESENT_TOKENS: &[&str] = &["p", "pr"];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%d-%b-%Y", "%d %b %Y", "%d/%m/%y", "%d-%m-%y",
];

/// Maps a status cell to a period status. Case-insensitive; unrecognized
/// text becomes `Unknown`.
pub fn map_status(text: &str) -> PeriodStatus {
    let text = text.trim().to_lowercase();
    if text.is_empty()
        || NOT_MARKED_TOKENS.contains(&text.as_str())
        || NOT_MARKED_KEYWORDS.iter().any(|k| text.contains(k))
    {
        PeriodStatus::NotMarked
    } else if ABSENT_TOKENS.contains(&text.as_str())
        || ABSENT_KEYWORDS.iter().any(|k| text.contains(k))
    {
        PeriodStatus::Absent
    } else if PRESENT_TOKENS.contains(&text.as_str()) || text.contains("present") {
        PeriodStatus::Present
    } else {
        PeriodStatus::Unknown
    }
}

/// Parses today's attendance page against the local calendar date.
pub fn parse_today(html: &str) -> Result<TodaysAttendance, AttendanceError> {
    parse_today_on(html, Local::now().date_naive())
}

/// Parses today's attendance page, taking `today` as the current date.
///
/// In a dated day-wise register with no row for `today`, every period is
/// reported as not marked.
pub fn parse_today_on(html: &str, today: NaiveDate) -> Result<TodaysAttendance, AttendanceError> {
    let document = Html::parse_document(html);

    for rows in tables(&document) {
        let Some((header, data)) = rows.split_first() else {
            continue;
        };

        let (date, periods) = if let Some(status_col) = status_column(header) {
            (None, parse_vertical(header, data, status_col))
        } else {
            let period_cols = period_columns(header);
            if period_cols.is_empty() {
                continue;
            }
            parse_horizontal(header, data, &period_cols, today)
        };

        if periods.is_empty() {
            debug!(header = ?header, "Today table matched but held no periods");
            continue;
        }

        info!(periods = periods.len(), "Parsed today's attendance");
        return Ok(TodaysAttendance { date, periods });
    }

    error!("No today's attendance table found");
    Err(AttendanceError::parse("no period/status table found on today's page"))
}

fn status_column(header: &[String]) -> Option<usize> {
    header.iter().position(|cell| {
        let cell = cell.to_lowercase();
        cell.contains("status") || cell == "attendance"
    })
}

fn period_columns(header: &[String]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .filter(|(_, cell)| PERIOD_LABEL_REGEX.is_match(cell))
        .map(|(idx, _)| idx)
        .collect()
}

fn parse_vertical(header: &[String], data: &[Vec<String>], status_col: usize) -> Vec<PeriodEntry> {
    let label_col = header
        .iter()
        .position(|cell| {
            let cell = cell.to_lowercase();
            ["period", "hour", "session", "slot"]
                .iter()
                .any(|k| cell.contains(k))
        })
        .unwrap_or(if status_col == 0 { 1 } else { 0 });

    data.iter()
        .filter(|row| !row.iter().all(|cell| cell.is_empty()))
        .filter_map(|row| {
            let period = row.get(label_col)?.clone();
            let status = row.get(status_col).map(|s| map_status(s)).unwrap_or(PeriodStatus::Unknown);
            Some(PeriodEntry { period, status })
        })
        .collect()
}

fn parse_horizontal(
    header: &[String],
    data: &[Vec<String>],
    period_cols: &[usize],
    today: NaiveDate,
) -> (Option<NaiveDate>, Vec<PeriodEntry>) {
    let rows: Vec<&Vec<String>> = data
        .iter()
        .filter(|row| period_cols.iter().any(|&idx| idx < row.len()))
        .collect();
    let dated: Vec<(NaiveDate, &Vec<String>)> = match date_column(header) {
        Some(col) => rows
            .iter()
            .filter_map(|row| Some((parse_register_date(row.get(col)?)?, *row)))
            .collect(),
        None => Vec::new(),
    };

    if dated.is_empty() {
        let Some(row) = rows.last() else {
            return (None, Vec::new());
        };
        return (None, row_statuses(header, row, period_cols));
    }

    match dated.iter().find(|(date, _)| *date == today) {
        Some((date, row)) => (Some(*date), row_statuses(header, row, period_cols)),
        None => {
            let latest = dated.iter().map(|(date, _)| *date).max();
            info!(today = %today, latest = ?latest, "Register has no row for today yet");
            let periods = period_cols
                .iter()
                .map(|&idx| PeriodEntry {
                    period: header[idx].clone(),
                    status: PeriodStatus::NotMarked,
                })
                .collect();
            (Some(today), periods)
        }
    }
}

fn row_statuses(header: &[String], row: &[String], period_cols: &[usize]) -> Vec<PeriodEntry> {
    period_cols
        .iter()
        .map(|&idx| PeriodEntry {
            period: header[idx].clone(),
            status: row.get(idx).map(|s| map_status(s)).unwrap_or(PeriodStatus::Unknown),
        })
        .collect()
}

fn date_column(header: &[String]) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.to_lowercase().contains("date"))
}

fn parse_register_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status_case_insensitive() {
        assert_eq!(map_status("PRESENT"), PeriodStatus::Present);
        assert_eq!(map_status(" p "), PeriodStatus::Present);
        assert_eq!(map_status("Absent"), PeriodStatus::Absent);
        assert_eq!(map_status("a"), PeriodStatus::Absent);
        assert_eq!(map_status("Not Present"), PeriodStatus::Absent);
        assert_eq!(map_status("NOT ATTENDED"), PeriodStatus::Absent);
        assert_eq!(map_status("Did not attend"), PeriodStatus::Absent);
        assert_eq!(map_status("Not Marked"), PeriodStatus::NotMarked);
        assert_eq!(map_status(""), PeriodStatus::NotMarked);
        assert_eq!(map_status("-"), PeriodStatus::NotMarked);
        assert_eq!(map_status("On Duty"), PeriodStatus::Unknown);
        assert_eq!(map_status("??"), PeriodStatus::Unknown);
    }

    #[test]
    fn test_period_labels() {
        for label in ["1", "P1", "Period 2", "Hour-3", "H 4", "session#5"] {
            assert!(PERIOD_LABEL_REGEX.is_match(label), "{label}");
        }
        for label in ["Date", "Subject", "123", "Total"] {
            assert!(!PERIOD_LABEL_REGEX.is_match(label), "{label}");
        }
    }

    #[test]
    fn test_vertical_layout() {
        let html = r#"<table>
            <tr><th>Period</th><th>Subject</th><th>Status</th></tr>
            <tr><td>1</td><td>Maths</td><td>Present</td></tr>
            <tr><td>2</td><td>Physics</td><td>ABSENT</td></tr>
            <tr><td>3</td><td>Lab</td><td>Not Marked</td></tr>
            <tr><td>4</td><td>Sports</td><td>OD</td></tr>
        </table>"#;
        let today = parse_today(html).unwrap();
        let got: Vec<_> = today
            .periods
            .iter()
            .map(|p| (p.period.as_str(), p.status))
            .collect();
        assert_eq!(
            got,
            vec![
                ("1", PeriodStatus::Present),
                ("2", PeriodStatus::Absent),
                ("3", PeriodStatus::NotMarked),
                ("4", PeriodStatus::Unknown),
            ]
        );
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn statuses(today: &TodaysAttendance) -> Vec<(&str, PeriodStatus)> {
        today
            .periods
            .iter()
            .map(|p| (p.period.as_str(), p.status))
            .collect()
    }

    #[test]
    fn test_horizontal_layout_reads_todays_row() {
        let html = r#"<table>
            <tr><th>Date</th><th>1</th><th>2</th><th>3</th></tr>
            <tr><td>18/10/2026</td><td>P</td><td>a</td><td></td></tr>
            <tr><td>17/10/2026</td><td>A</td><td>A</td><td>A</td></tr>
        </table>"#;
        let today = parse_today_on(html, day(18)).unwrap();
        assert_eq!(today.date, Some(day(18)));
        assert_eq!(
            statuses(&today),
            vec![
                ("1", PeriodStatus::Present),
                ("2", PeriodStatus::Absent),
                ("3", PeriodStatus::NotMarked),
            ]
        );
    }

    #[test]
    fn test_past_rows_only_are_not_marked_today() {
        let html = r#"<table>
            <tr><th>Date</th><th>1</th><th>2</th></tr>
            <tr><td>17/10/2026</td><td>P</td><td>P</td></tr>
        </table>"#;
        let today = parse_today_on(html, day(18)).unwrap();
        assert_eq!(today.date, Some(day(18)));
        assert_eq!(
            statuses(&today),
            vec![("1", PeriodStatus::NotMarked), ("2", PeriodStatus::NotMarked)]
        );
    }

    #[test]
    fn test_undated_register_reads_last_row() {
        let html = r#"<table>
            <tr><th>Day</th><th>P1</th><th>P2</th></tr>
            <tr><td>Friday</td><td>A</td><td>A</td></tr>
            <tr><td>Saturday</td><td>P</td><td>-</td></tr>
        </table>"#;
        let today = parse_today_on(html, day(18)).unwrap();
        assert_eq!(today.date, None);
        assert_eq!(
            statuses(&today),
            vec![("P1", PeriodStatus::Present), ("P2", PeriodStatus::NotMarked)]
        );
    }

    #[test]
    fn test_register_date_formats() {
        for cell in ["18/10/2026", "18-10-2026", "2026-10-18", "18-Oct-2026", " 18.10.2026 "] {
            assert_eq!(parse_register_date(cell), Some(day(18)), "{cell}");
        }
        assert_eq!(parse_register_date("Saturday"), None);
    }

    #[test]
    fn test_no_table_is_failure() {
        assert!(matches!(
            parse_today("<p>No classes today</p>"),
            Err(AttendanceError::Parse { .. })
        ));
    }

    #[test]
    fn test_header_only_is_failure() {
        let html = "<table><tr><th>Period</th><th>Status</th></tr></table>";
        assert!(parse_today(html).is_err());
    }
}
