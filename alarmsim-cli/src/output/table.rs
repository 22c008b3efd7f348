//! Aligned datapoint table

use alarmsim_core::{AnnotatedSample, ReportLine};
use unicode_width::UnicodeWidthStr;

use super::style::{streak_glyphs, Palette};
use super::{format_timestamp, PRECISION};

const TIMESTAMP_WIDTH: usize = 30;
const COUNTER_WIDTH: usize = 6;
/// Width of the "Streak" title
const STREAK_TITLE_WIDTH: usize = 6;

const HEADERS: [&str; 7] = ["Timestamp", " Value", " Diff", " CH", " TC", " LS", " Streak"];

/// Column widths, measured over all rows before anything is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub timestamp: usize,
    pub value: usize,
    pub diff: usize,
    pub counter: usize,
    pub streak: usize,
}

impl ColumnWidths {
    pub fn measure(lines: &[ReportLine]) -> Self {
        let mut widest_value = 0;
        let mut widest_diff = 0;
        let mut widest_streak = STREAK_TITLE_WIDTH;

        for sample in samples(lines) {
            widest_value = widest_value.max(fixed(sample.value).width());
            widest_diff = widest_diff.max(fixed(sample.diff).width());
            widest_streak = widest_streak.max(streak_glyphs(&sample.streak).width());
        }

        Self {
            timestamp: TIMESTAMP_WIDTH,
            value: widest_value + 2,
            diff: widest_diff + 2,
            counter: COUNTER_WIDTH,
            streak: widest_streak + 2,
        }
    }

    fn columns(&self) -> [usize; 7] {
        [
            self.timestamp,
            self.value,
            self.diff,
            self.counter,
            self.counter,
            self.counter,
            self.streak,
        ]
    }
}

/// Render header, rows, streak separators and the closing rule, one string per line
pub fn render(lines: &[ReportLine], palette: &Palette, utc: bool) -> Vec<String> {
    let widths = ColumnWidths::measure(lines);
    let mut out = Vec::with_capacity(lines.len() + 2);

    out.push(row(&HEADERS.map(String::from), None, &widths));
    for line in lines {
        match line {
            ReportLine::Separator => out.push(rule(&widths, '┼')),
            ReportLine::Sample(sample) => {
                let cells = [
                    format_timestamp(sample.timestamp, utc),
                    format!(" {}", fixed(sample.value)),
                    format!(" {}", fixed(sample.diff)),
                    format!(" {}", sample.consecutive_hits),
                    format!(" {}", sample.triggers),
                    format!(" {}", sample.longest_streak),
                    String::new(),
                ];
                let streak = palette.streak(&streak_glyphs(&sample.streak), sample.streak.level);
                out.push(row(&cells, Some(streak.as_str()), &widths));
            }
        }
    }
    out.push(rule(&widths, '┴'));
    out
}

fn samples(lines: &[ReportLine]) -> impl Iterator<Item = &AnnotatedSample> {
    lines.iter().filter_map(|line| match line {
        ReportLine::Sample(sample) => Some(sample),
        ReportLine::Separator => None,
    })
}

fn fixed(value: f64) -> String {
    format!("{:.*}", PRECISION, value)
}

/// Left-align `text` in `width` terminal columns
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Join padded cells with `│`
///
/// The last cell is not padded; when `styled_last` is given it replaces the
/// last cell so escape sequences never count towards a width.
fn row(cells: &[String; 7], styled_last: Option<&str>, widths: &ColumnWidths) -> String {
    let columns = widths.columns();
    let mut parts: Vec<String> =
        cells[..6].iter().zip(columns).map(|(cell, width)| pad(cell, width)).collect();
    match styled_last {
        Some(styled) => parts.push(format!(" {}", styled)),
        None => parts.push(cells[6].clone()),
    }
    parts.join("│")
}

fn rule(widths: &ColumnWidths, joint: char) -> String {
    let segments: Vec<String> = widths.columns().iter().map(|&width| "─".repeat(width)).collect();
    segments.join(&joint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarmsim_core::{simulate, MetricSample, TriggerRule};
    use chrono::{Duration, TimeZone, Utc};

    fn lines(values: &[f64], threshold: f64, required: usize) -> Vec<ReportLine> {
        let start = Utc.with_ymd_and_hms(2021, 2, 20, 0, 0, 0).unwrap();
        let samples: Vec<MetricSample> = values
            .iter()
            .enumerate()
            .map(|(i, &value)| MetricSample::new(start + Duration::minutes(i as i64), value))
            .collect();
        simulate(&samples, &TriggerRule::new(threshold, required).unwrap()).lines
    }

    #[test]
    fn test_measure_empty() {
        let widths = ColumnWidths::measure(&[]);
        assert_eq!(
            widths,
            ColumnWidths { timestamp: 30, value: 2, diff: 2, counter: 6, streak: 8 }
        );
    }

    #[test]
    fn test_measure_widest_cells() {
        let widths = ColumnWidths::measure(&lines(&[85.0, 1234.5, 80.0], 80.0, 2));
        // "1234.50" and "1154.50"
        assert_eq!(widths.value, 9);
        assert_eq!(widths.diff, 9);
        assert_eq!(widths.streak, 8);
    }

    #[test]
    fn test_measure_long_streak_column() {
        let widths = ColumnWidths::measure(&lines(&[90.0; 9], 80.0, 8));
        assert_eq!(widths.streak, "◼◼◼◼◼◼◼◼+".width() + 2);
    }

    #[test]
    fn test_render_plain_table() {
        let rendered = render(&lines(&[85.0, 90.0], 80.0, 2), &Palette::plain(), true);

        let header = format!(
            "{:<30}│{:<7}│{:<7}│{:<6}│{:<6}│{:<6}│ Streak",
            "Timestamp", " Value", " Diff", " CH", " TC", " LS"
        );
        let separator: Vec<String> =
            [30, 7, 7, 6, 6, 6, 8].iter().map(|&width| "─".repeat(width)).collect();

        assert_eq!(rendered.len(), 5);
        assert_eq!(rendered[0], header);
        assert_eq!(rendered[1], separator.join("┼"));
        assert_eq!(
            rendered[2],
            format!(
                "{:<30}│{:<7}│{:<7}│{:<6}│{:<6}│{:<6}│ ◼",
                "2021-02-20 00:00:00 +0000", " 85.00", " 5.00", " 1", " 0", " 1"
            )
        );
        assert_eq!(
            rendered[3],
            format!(
                "{:<30}│{:<7}│{:<7}│{:<6}│{:<6}│{:<6}│ ◼◼",
                "2021-02-20 00:01:00 +0000", " 90.00", " 10.00", " 2", " 1", " 2"
            )
        );
        assert_eq!(rendered[4], separator.join("┴"));
    }

    #[test]
    fn test_render_separator_per_streak() {
        let table = render(&lines(&[90.0, 10.0, 90.0], 80.0, 3), &Palette::plain(), true);
        assert_eq!(table.iter().filter(|line| line.contains('┼')).count(), 2);
        assert_eq!(table.iter().filter(|line| line.contains('┴')).count(), 1);
    }

    #[test]
    fn test_render_overflow_marker() {
        let table = render(&lines(&[90.0; 4], 80.0, 2), &Palette::plain(), true);
        assert!(table[5].ends_with("│ ◼◼+"));
    }
}
