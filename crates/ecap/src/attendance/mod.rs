//! Attendance scraping for the ECAP portal.
//!
//! The core is a sequential pipeline over one cookie-bearing session:
//! [`login`] establishes the session, [`fetch`] retrieves the two
//! attendance pages, [`cumulative`] and [`today`] turn their markup into
//! [`AttendanceRecord`] and [`TodaysAttendance`], and [`format`] renders
//! the result. [`client`] ties the steps together for front-ends.

pub mod client;
pub mod config;
pub mod credentials;
pub mod cumulative;
pub mod error;
pub mod fetch;
pub mod format;
pub mod login;
pub mod session;
mod table;
pub mod today;
mod types;

pub use client::{refresh, run_pipeline, AttendanceClient, AttendanceReport};
pub use config::{FormFields, PortalConfig};
pub use credentials::{CredentialStore, Credentials};
pub use cumulative::parse_attendance;
pub use error::{AttendanceError, LoginFailure};
pub use format::format_summary;
pub use session::{PortalResponse, Session};
pub use today::{parse_today, parse_today_on};
pub use types::*;
