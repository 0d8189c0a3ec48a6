//! Parser for the cumulative (subject-wise) attendance page.

use super::error::AttendanceError;
use super::table::{parse_count, parse_percentage, tables};
use super::types::{percentage_of, AttendanceRecord, AttendanceTotal, SubjectAttendance, TotalSource};
use scraper::Html;
use tracing::{debug, error, info, warn};

/// Subject-cell labels that mark the aggregate row.
pub const TOTAL_LABELS: &[&str] = &[
    "total",
    "grand total",
    "overall",
    "overall total",
    "aggregate",
    "total attendance",
];

/// Allowed gap between a portal percentage and `attended / held * 100`.
const PERCENTAGE_TOLERANCE: f64 = 1.0;

/// Column positions found in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    subject: usize,
    held: usize,
    attended: usize,
    percentage: Option<usize>,
}

impl Columns {
    /// Maps header text to columns. Needs at least subject, held and attended.
    ///
    /// Among several subject columns, a name column wins over a plain one,
    /// and a plain one over a code column.
    fn detect(header: &[String]) -> Option<Self> {
        let mut subject: Option<(u8, usize)> = None;
        let mut held = None;
        let mut attended = None;
        let mut percentage = None;

        for (idx, cell) in header.iter().enumerate() {
            let cell = cell.to_lowercase();
            if cell.contains('%') || cell.contains("percent") {
                percentage.get_or_insert(idx);
            } else if cell.contains("subject") || cell.contains("course") {
                let rank = if cell.contains("name") || cell.contains("title") {
                    0
                } else if cell.contains("code") {
                    2
                } else {
                    1
                };
                if subject.map_or(true, |(best, _)| rank < best) {
                    subject = Some((rank, idx));
                }
            } else if cell.contains("held") || cell.contains("conducted") {
                held.get_or_insert(idx);
            } else if cell.contains("attend") || cell.contains("present") {
                attended.get_or_insert(idx);
            }
        }

        Some(Self {
            subject: subject?.1,
            held: held?,
            attended: attended?,
            percentage,
        })
    }
}

/// Returns true if a subject cell denotes the aggregate row: empty, without
/// any letter, or a known total label (case and trailing punctuation ignored).
pub fn is_aggregate_label(subject: &str) -> bool {
    let trimmed = subject.trim();
    if trimmed.is_empty() || !trimmed.chars().any(char::is_alphabetic) {
        return true;
    }
    let label = trimmed
        .trim_end_matches(|c: char| c == ':' || c == '.' || c == '-')
        .trim()
        .to_lowercase();
    TOTAL_LABELS.contains(&label.as_str())
}

/// Parses the cumulative attendance page.
///
/// The first table whose header names subject, held and attended columns is
/// used. Rows that fail to parse are skipped; no table or no subject rows at
/// all is a parse failure.
pub fn parse_attendance(html: &str) -> Result<AttendanceRecord, AttendanceError> {
    let document = Html::parse_document(html);

    for rows in tables(&document) {
        let Some((header_idx, columns)) = rows
            .iter()
            .enumerate()
            .find_map(|(idx, row)| Columns::detect(row).map(|c| (idx, c)))
        else {
            continue;
        };
        debug!(columns = ?columns, "Found attendance table");
        return parse_rows(&rows[header_idx + 1..], columns);
    }

    error!("No attendance table found in cumulative page");
    Err(AttendanceError::parse(
        "no table with subject/held/attended columns found",
    ))
}

fn parse_rows(rows: &[Vec<String>], columns: Columns) -> Result<AttendanceRecord, AttendanceError> {
    let mut subjects = Vec::new();
    let mut portal_total = None;
    let mut skipped = 0usize;

    for row in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let subject = row.get(columns.subject).map(String::as_str).unwrap_or("");

        if is_aggregate_label(subject) {
            match parse_counts(row, columns) {
                Ok((held, attended, percentage)) => {
                    portal_total = Some(AttendanceTotal {
                        held,
                        attended,
                        percentage,
                        source: TotalSource::Portal,
                    });
                }
                Err(reason) => debug!(row = ?row, reason = %reason, "Ignoring aggregate-like row"),
            }
            continue;
        }

        match parse_counts(row, columns) {
            Ok((held, attended, percentage)) => subjects.push(SubjectAttendance {
                subject: subject.to_string(),
                held,
                attended,
                percentage,
            }),
            Err(reason) => {
                skipped += 1;
                debug!(subject = %subject, reason = %reason, "Skipping attendance row");
            }
        }
    }

    if subjects.is_empty() {
        error!(skipped = skipped, "Attendance table has no subject rows");
        return Err(AttendanceError::parse(format!(
            "attendance table has no subject rows ({skipped} skipped)"
        )));
    }

    let Some(summed) = AttendanceTotal::from_subjects(&subjects) else {
        error!(subjects = subjects.len(), "Subject counts overflow when summed");
        return Err(AttendanceError::parse(
            "attendance counts are too large to total",
        ));
    };
    let total = match portal_total {
        Some(total) => {
            if total.held != summed.held || total.attended != summed.attended {
                warn!(
                    portal_held = total.held,
                    portal_attended = total.attended,
                    summed_held = summed.held,
                    summed_attended = summed.attended,
                    "Portal total differs from the sum of subject rows"
                );
            }
            total
        }
        None => summed,
    };

    info!(
        subjects = subjects.len(),
        skipped = skipped,
        total_source = ?total.source,
        "Parsed cumulative attendance"
    );

    Ok(AttendanceRecord { subjects, total })
}

/// Reads held, attended and percentage from a row.
fn parse_counts(row: &[String], columns: Columns) -> Result<(u32, u32, f64), String> {
    let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

    let held = parse_count(cell(columns.held))
        .ok_or_else(|| format!("held {:?} is not a count", cell(columns.held)))?;
    let attended = parse_count(cell(columns.attended))
        .ok_or_else(|| format!("attended {:?} is not a count", cell(columns.attended)))?;
    if attended > held {
        return Err(format!("attended {attended} exceeds held {held}"));
    }

    let computed = percentage_of(attended, held);
    let percentage = match columns.percentage {
        Some(idx) => {
            let pct = parse_percentage(cell(idx))
                .ok_or_else(|| format!("percentage {:?} is not a number", cell(idx)))?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(format!("percentage {pct} out of range"));
            }
            if (pct - computed).abs() > PERCENTAGE_TOLERANCE {
                warn!(
                    portal = pct,
                    computed = computed,
                    "Portal percentage disagrees with counts"
                );
            }
            pct
        }
        None => computed,
    };

    Ok((held, attended, percentage))
}
