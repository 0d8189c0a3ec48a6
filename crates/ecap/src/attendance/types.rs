/// Types for attendance data
use super::error::LoginFailure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    pub success: bool,
    /// Diagnostic text; never empty when `success` is false
    pub message: String,
    pub failure: Option<LoginFailure>,
}

impl LoginResult {
    pub(crate) fn succeeded() -> Self {
        Self {
            success: true,
            message: "Login successful".to_string(),
            failure: None,
        }
    }

    pub(crate) fn failed(failure: LoginFailure, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            match failure {
                LoginFailure::BadCredentials => "Invalid credentials".to_string(),
                LoginFailure::UnexpectedResponse => "Unexpected response from portal".to_string(),
            }
        } else {
            message
        };
        Self {
            success: false,
            message,
            failure: Some(failure),
        }
    }
}

/// Attendance for one subject, as shown on the cumulative page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAttendance {
    pub subject: String,
    pub held: u32,
    pub attended: u32,
    pub percentage: f64,
}

/// Where an overall total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalSource {
    /// Read from the portal's own total row
    Portal,
    /// Summed from the subject rows because the portal had no total row
    Computed,
}

/// Aggregate attendance across all subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceTotal {
    pub held: u32,
    pub attended: u32,
    pub percentage: f64,
    pub source: TotalSource,
}

impl AttendanceTotal {
    /// Sums the subject rows. `None` if either sum overflows.
    pub fn from_subjects(subjects: &[SubjectAttendance]) -> Option<Self> {
        let (held, attended) = subjects.iter().try_fold((0u32, 0u32), |(held, attended), s| {
            Some((held.checked_add(s.held)?, attended.checked_add(s.attended)?))
        })?;
        Some(Self {
            held,
            attended,
            percentage: percentage_of(attended, held),
            source: TotalSource::Computed,
        })
    }

    /// Number of consecutive classes that must be attended to reach `target` percent.
    ///
    /// Returns 0 when already at or above the target, and `None` for a target
    /// of 100% or more that can never be reached after an absence.
    pub fn classes_needed(&self, target: f64) -> Option<u32> {
        let held = f64::from(self.held);
        let attended = f64::from(self.attended);
        if attended >= held * target / 100.0 {
            return Some(0);
        }
        if target >= 100.0 {
            return None;
        }
        // (attended + n) / (held + n) >= target / 100
        let n = (target * held - 100.0 * attended) / (100.0 - target);
        Some((n - 1e-9).ceil().max(0.0) as u32)
    }

    /// Number of classes that can be skipped while staying at or above `target` percent.
    pub fn classes_skippable(&self, target: f64) -> u32 {
        if target <= 0.0 {
            return u32::MAX;
        }
        // attended / (held + n) >= target / 100
        let n = 100.0 * f64::from(self.attended) / target - f64::from(self.held);
        (n + 1e-9).floor().max(0.0) as u32
    }
}

/// Normalized content of the cumulative attendance page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub subjects: Vec<SubjectAttendance>,
    pub total: AttendanceTotal,
}

/// Status of one period in today's attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    Present,
    Absent,
    NotMarked,
    Unknown,
}

impl PeriodStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PeriodStatus::Present => "Present",
            PeriodStatus::Absent => "Absent",
            PeriodStatus::NotMarked => "Not marked",
            PeriodStatus::Unknown => "Unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PeriodStatus::Present => "✅",
            PeriodStatus::Absent => "❌",
            PeriodStatus::NotMarked => "⏳",
            PeriodStatus::Unknown => "❔",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub period: String,
    pub status: PeriodStatus,
}

/// Per-period statuses for the current day, in portal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaysAttendance {
    /// Register date the statuses belong to, when the page shows one
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub periods: Vec<PeriodEntry>,
}

impl TodaysAttendance {
    pub fn count(&self, status: PeriodStatus) -> usize {
        self.periods.iter().filter(|p| p.status == status).count()
    }
}

/// `attended / held * 100`, or 0 when nothing was held.
pub fn percentage_of(attended: u32, held: u32) -> f64 {
    if held == 0 {
        0.0
    } else {
        f64::from(attended) / f64::from(held) * 100.0
    }
}
