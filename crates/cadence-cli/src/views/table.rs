use cadence_core::models::{EventReport, Occurrence};
use cadence_core::recovery::RecoveryReport;
use chrono::{Duration, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};

use crate::timezone::format_in_zone;

/// Length of the ID column; unique prefixes of this length are accepted as IDs.
pub const SHORT_ID_LEN: usize = 8;

pub fn display_occurrences(occurrences: &[Occurrence], tz: Tz) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Start", "End", "Duration", "When"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(&occurrence.id.to_string()[..SHORT_ID_LEN]));

        let mut name_cell = Cell::new(&occurrence.name);
        let mut when_cell = Cell::new(occurrence.start_time.humanize());
        if occurrence.end_time <= now {
            name_cell = name_cell.fg(Color::DarkGrey);
            when_cell = when_cell.fg(Color::DarkGrey);
        } else if occurrence.start_time <= now {
            // running right now
            name_cell = name_cell.fg(Color::Green).add_attribute(Attribute::Bold);
            when_cell = when_cell.fg(Color::Green);
        } else if occurrence.start_time - now < Duration::hours(24) {
            when_cell = when_cell.fg(Color::Yellow);
        }
        row.add_cell(name_cell);

        row.add_cell(Cell::new(format_in_zone(occurrence.start_time, tz)));
        row.add_cell(Cell::new(format_in_zone(occurrence.end_time, tz)));
        row.add_cell(Cell::new(format!("{} min", occurrence.duration_minutes)));
        row.add_cell(when_cell);
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_reports(reports: &[EventReport]) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Time (UTC)", "Message"]);

    for report in reports {
        let mut message = Cell::new(&report.message);
        if report.message.ends_with("started") {
            message = message.fg(Color::Cyan);
        }
        table.add_row(vec![Cell::new(&report.time), message]);
    }

    println!("{table}");
}

pub fn display_recovery_report(report: &RecoveryReport) {
    let mut table = Table::new();
    table.set_header(vec!["Examined", "Rescheduled", "Recreated", "Skipped", "Failed"]);

    let failed = if report.failed > 0 {
        Cell::new(report.failed).fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        Cell::new(report.failed)
    };
    table.add_row(vec![
        Cell::new(report.examined),
        Cell::new(report.rescheduled),
        Cell::new(report.recreated),
        Cell::new(report.skipped),
        failed,
    ]);

    println!("{table}");
}
