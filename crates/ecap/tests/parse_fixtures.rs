use chrono::NaiveDate;
use ecap::attendance::{
    format_summary, parse_attendance, parse_today_on, AttendanceError, PeriodStatus, TotalSource,
};

const CUMULATIVE: &str = include_str!("fixtures/cumulative.html");
const TODAY: &str = include_str!("fixtures/today.html");

fn register_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

#[test]
fn cumulative_fixture_yields_six_subjects_and_portal_total() {
    let record = parse_attendance(CUMULATIVE).unwrap();

    let expected = [
        ("Engineering Mathematics-III", 42, 38, 90.48),
        ("Data Structures", 45, 40, 88.89),
        ("Digital Logic Design", 38, 30, 78.95),
        ("Operating Systems", 40, 28, 70.00),
        ("Database Management Systems", 36, 33, 91.67),
        ("Data Structures Lab", 24, 21, 87.50),
    ];
    assert_eq!(record.subjects.len(), expected.len());
    for (subject, (name, held, attended, pct)) in record.subjects.iter().zip(expected) {
        assert_eq!(subject.subject, name);
        assert_eq!(subject.held, held);
        assert_eq!(subject.attended, attended);
        assert_eq!(subject.percentage, pct);
    }

    assert_eq!(record.total.source, TotalSource::Portal);
    assert_eq!(record.total.held, 225);
    assert_eq!(record.total.attended, 190);
    assert_eq!(record.total.percentage, 84.44);
}

#[test]
fn cumulative_subjects_are_internally_consistent() {
    let record = parse_attendance(CUMULATIVE).unwrap();
    for subject in &record.subjects {
        assert!(subject.attended <= subject.held, "{}", subject.subject);
        let computed = f64::from(subject.attended) / f64::from(subject.held) * 100.0;
        assert!(
            (subject.percentage - computed).abs() < 0.01,
            "{}: {} vs {}",
            subject.subject,
            subject.percentage,
            computed
        );
    }
    let held: u32 = record.subjects.iter().map(|s| s.held).sum();
    let attended: u32 = record.subjects.iter().map(|s| s.attended).sum();
    assert_eq!((held, attended), (record.total.held, record.total.attended));
}

#[test]
fn generated_tables_parse_exactly_n_rows() {
    for n in 1..=12u32 {
        let rows: String = (1..=n)
            .map(|i| {
                let held = 10 + i * 3;
                let attended = held - (i % 4);
                format!(
                    "<tr><td>{i}</td><td>Subject {i}</td><td>{held}</td><td>{attended}</td><td>{:.2}</td></tr>",
                    f64::from(attended) / f64::from(held) * 100.0
                )
            })
            .collect();
        let html = format!(
            "<table><tr><th>Sl.No</th><th>Subject</th><th>Held</th><th>Attend</th><th>%</th></tr>{rows}</table>"
        );

        let record = parse_attendance(&html).unwrap();
        assert_eq!(record.subjects.len(), n as usize);
        assert_eq!(record.total.source, TotalSource::Computed);
        assert!(record.subjects.iter().all(|s| s.attended <= s.held));
    }
}

#[test]
fn page_without_rows_is_a_parse_failure() {
    let html = CUMULATIVE
        .split("<tr>\n          <td class=\"cellBorder\" align=\"center\">1</td>")
        .next()
        .unwrap()
        .to_string()
        + "</table></td></tr></table></form></body></html>";
    assert!(matches!(
        parse_attendance(&html),
        Err(AttendanceError::Parse { .. })
    ));
    assert!(matches!(
        parse_attendance("<html><body>Maintenance in progress</body></html>"),
        Err(AttendanceError::Parse { .. })
    ));
}

#[test]
fn today_fixture_reads_latest_day_in_period_order() {
    let today = parse_today_on(TODAY, register_day(18)).unwrap();
    assert_eq!(today.date, Some(register_day(18)));
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
            ("3", PeriodStatus::Present),
            ("4", PeriodStatus::NotMarked),
            ("5", PeriodStatus::NotMarked),
            ("6", PeriodStatus::Unknown),
            ("7", PeriodStatus::Absent),
        ]
    );
}

#[test]
fn today_fixture_without_a_row_for_today_is_not_marked() {
    let html = TODAY.replacen("18/10/2026", "16/10/2026", 1);
    let today = parse_today_on(&html, register_day(18)).unwrap();
    assert_eq!(today.date, Some(register_day(18)));
    assert_eq!(today.periods.len(), 7);
    assert!(today
        .periods
        .iter()
        .all(|p| p.status == PeriodStatus::NotMarked));
}

#[test]
fn fixtures_render_deterministically() {
    let record = parse_attendance(CUMULATIVE).unwrap();
    let today = parse_today_on(TODAY, register_day(18)).unwrap();

    let first = format_summary(&record, "23L31A4391", Some(&today));
    let second = format_summary(&record, "23L31A4391", Some(&today));
    assert_eq!(first, second);
    assert!(first.contains("Overall: 190/225 (84.44%)"));
    assert!(first.contains("📅 Today (18/10/2026): 2 present, 2 absent, 2 not marked"));
}
