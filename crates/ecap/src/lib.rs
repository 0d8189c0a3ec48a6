//! Scraper for the Vignan ECAP attendance portal.

pub mod attendance;
