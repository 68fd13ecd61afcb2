//! Plain-text audit of process label normalization.

use std::io::{self, Write};

use crate::models::InvoiceRecord;

const HEADER: &str = "Process Diagnostics Report";

/// Write one line per record, sorted by normalized key and direction.
///
/// Ties keep the input order.
pub fn write_diagnostics<W: Write>(records: &[InvoiceRecord], sink: &mut W) -> io::Result<()> {
    let mut sorted: Vec<&InvoiceRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.process_key.as_str(), a.direction_label()).cmp(&(b.process_key.as_str(), b.direction_label()))
    });

    writeln!(sink, "{HEADER}")?;
    writeln!(sink, "{}", "=".repeat(40))?;
    writeln!(sink)?;

    for record in sorted {
        writeln!(
            sink,
            "File: {:<50} | Direction: {:<8} | Original Process: \"{}\" | Normalized Process: \"{}\"",
            record.source_name,
            record.direction_label(),
            record.process_label,
            record.process_key
        )?;
    }
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn record(name: &str, direction: Option<Direction>, label: &str, key: &str) -> InvoiceRecord {
        let mut r = InvoiceRecord::empty(name);
        r.direction = direction;
        r.process_label = label.to_string();
        r.process_key = key.to_string();
        r
    }

    fn render(records: &[InvoiceRecord]) -> String {
        let mut out = Vec::new();
        write_diagnostics(records, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_sorted_by_key_then_direction() {
        let records = vec![
            record("c.xml", Some(Direction::Outbound), "B-2", "B2"),
            record("b.xml", Some(Direction::Outbound), "a.1", "A1"),
            record("a.xml", Some(Direction::Inbound), "A 1", "A1"),
        ];
        let text = render(&records);
        let names: Vec<_> = text
            .lines()
            .skip(3)
            .map(|line| line.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(names, ["a.xml", "b.xml", "c.xml"]);
    }

    #[test]
    fn test_line_format() {
        let text = render(&[record("nota.xml", None, "N/A", "N/A")]);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Process Diagnostics Report"));
        assert_eq!(lines.next(), Some("=".repeat(40).as_str()));
        assert_eq!(lines.next(), Some(""));
        let line = lines.next().unwrap();
        assert!(line.starts_with(&format!("File: {:<50} |", "nota.xml")));
        assert!(line.ends_with("| Direction: N/A      | Original Process: \"N/A\" | Normalized Process: \"N/A\""));
    }

    #[test]
    fn test_empty_batch_has_header_only() {
        assert_eq!(render(&[]).lines().count(), 3);
    }
}
