//! Plain-text rendering of an attendance report.

use super::types::{AttendanceRecord, PeriodStatus, TodaysAttendance};
use std::fmt::Write;

/// Attendance percentage students are expected to keep.
pub const TARGET_PERCENTAGE: f64 = 75.0;

/// Widest subject name shown before truncation.
const SUBJECT_WIDTH: usize = 28;

/// Renders the record and today's statuses as one message.
///
/// Pure: the same inputs always produce the same string. A missing `today`
/// renders as an explicit "not available" line.
pub fn format_summary(
    record: &AttendanceRecord,
    identifier: &str,
    today: Option<&TodaysAttendance>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "📊 Attendance for {identifier}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<width$} {:>5} {:>5} {:>7}",
        "Subject",
        "Held",
        "Att.",
        "%",
        width = SUBJECT_WIDTH
    );
    for subject in &record.subjects {
        let _ = writeln!(
            out,
            "{:<width$} {:>5} {:>5} {:>6.2}%",
            fit(&subject.subject, SUBJECT_WIDTH),
            subject.held,
            subject.attended,
            subject.percentage,
            width = SUBJECT_WIDTH
        );
    }

    let total = &record.total;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Overall: {}/{} ({:.2}%)",
        total.attended, total.held, total.percentage
    );
    match total.classes_needed(TARGET_PERCENTAGE) {
        Some(0) => {
            let skippable = total.classes_skippable(TARGET_PERCENTAGE);
            let _ = writeln!(
                out,
                "🎯 You can skip {skippable} class{} and stay at or above {TARGET_PERCENTAGE:.0}%",
                plural(skippable)
            );
        }
        Some(needed) => {
            let _ = writeln!(
                out,
                "⚠️ Attend {needed} more class{} in a row to reach {TARGET_PERCENTAGE:.0}%",
                plural(needed)
            );
        }
        None => {
            let _ = writeln!(out, "⚠️ {TARGET_PERCENTAGE:.0}% is no longer reachable");
        }
    }

    let _ = writeln!(out);
    match today {
        Some(today) => {
            let heading = match today.date {
                Some(date) => format!("Today ({})", date.format("%d/%m/%Y")),
                None => "Today".to_string(),
            };
            let _ = writeln!(
                out,
                "📅 {heading}: {} present, {} absent, {} not marked",
                today.count(PeriodStatus::Present),
                today.count(PeriodStatus::Absent),
                today.count(PeriodStatus::NotMarked)
            );
            for entry in &today.periods {
                let _ = writeln!(
                    out,
                    "  {}: {} {}",
                    entry.period,
                    entry.status.icon(),
                    entry.status.label()
                );
            }
        }
        None => {
            let _ = writeln!(out, "📅 Today's attendance: not available");
        }
    }

    out.trim_end().to_string()
}

fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "es"
    }
}
