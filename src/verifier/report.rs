use colored::Colorize;

use super::comparison::Comparison;

pub fn print_comparison(comparison: &Comparison, verbose: bool) {
    println!(
        "{} notifications, {} expected",
        comparison.notification_count(),
        comparison.expected_count()
    );
    if !verbose {
        return;
    }

    for line in listing(comparison) {
        println!("{line}");
    }
}

fn listing(comparison: &Comparison) -> Vec<String> {
    let width = comparison.notified.iter().map(String::len).max().unwrap_or(0);

    let mut lines = Vec::new();
    for (notification, expected) in comparison.notified.iter().zip(&comparison.expected) {
        let row = format!("{notification:<width$} - {expected}");
        if notification == expected {
            lines.push(row);
        } else {
            lines.push(row.red().to_string());
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::state::DirectorySet;

    #[test]
    fn test_listing_pairs_rows() {
        colored::control::set_override(false);
        let expected = DirectorySet::from([PathBuf::from("/w/a"), PathBuf::from("/w/b")]);
        let actual = DirectorySet::from([PathBuf::from("/w/b")]);

        let lines = listing(&Comparison::new(&expected, &actual));

        assert_eq!(lines, vec!["b      - a", "*none* - b"]);
    }
}
