use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_due;
use crate::stats::Stats;
use crate::task::{Priority, Task};

const BAR_WIDTH: usize = 30;

/// A task as it appears in a listing: its 1-based store position plus
/// the record itself.
pub type Row<'a> = (usize, &'a Task);

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, rows, today))]
    pub fn print_task_table(&mut self, rows: &[Row<'_>], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if rows.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let headers = ["#", "ID", "Done", "Due", "Pri", "Category", "Title"]
            .map(str::to_string)
            .to_vec();

        let mut table = Vec::with_capacity(rows.len());
        for (position, task) in rows {
            let due = match task.due {
                Some(date) if date == today => self.paint(&format_due(date), "1"),
                Some(date) if date < today && !task.completed => {
                    self.paint(&format_due(date), "31")
                }
                Some(date) => format_due(date),
                None => String::new(),
            };
            let title = if task.completed {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };

            table.push(vec![
                self.paint(&position.to_string(), "33"),
                task.short_id(),
                if task.completed { "[x]" } else { "[ ]" }.to_string(),
                due,
                self.paint_priority(task.priority),
                task.category.clone(),
                title,
            ]);
        }

        write_table(&mut out, headers, table)?;
        writeln!(out)?;
        writeln!(out, "{} task(s)", rows.len())?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, position: usize, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "position  {position}")?;
        writeln!(out, "uuid      {}", task.uuid)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(
            out,
            "status    {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        writeln!(out, "category  {}", task.category)?;
        writeln!(out, "priority  {}", task.priority)?;
        if let Some(due) = task.due {
            writeln!(out, "due       {} ({})", due.format("%Y-%m-%d"), format_due(due))?;
        }
        writeln!(out, "created   {}", task.created_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        if !task.notes.is_empty() {
            writeln!(out, "notes")?;
            for line in task.notes.lines() {
                writeln!(out, "  {line}")?;
            }
        }

        Ok(())
    }

    pub fn print_categories(&mut self, entries: &[(String, usize)]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let headers = vec!["Category".to_string(), "Tasks".to_string()];
        let rows = entries
            .iter()
            .map(|(name, count)| vec![name.clone(), count.to_string()])
            .collect();
        write_table(&mut out, headers, rows)
    }

    /// Text stand-in for the completion pie chart.
    pub fn print_stats(&mut self, label: &str, stats: Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{label}")?;

        let Some(percent) = stats.completed_percent() else {
            writeln!(out, "  no matching tasks")?;
            return Ok(());
        };

        let filled = (BAR_WIDTH * usize::from(percent) + 50) / 100;
        let bar = format!(
            "{}{}",
            self.paint(&"#".repeat(filled), "32"),
            ".".repeat(BAR_WIDTH - filled)
        );
        writeln!(out, "  [{bar}] {percent}%")?;
        writeln!(out, "  completed {}", stats.completed)?;
        writeln!(out, "  pending   {}", stats.pending)?;
        writeln!(out, "  {} / {}", stats.completed, stats.total())?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{strip_ansi, write_table};

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["#".to_string(), "Title".to_string()],
            vec![
                vec!["\x1b[33m1\x1b[0m".to_string(), "Café".to_string()],
                vec!["12".to_string(), "Call mom".to_string()],
            ],
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#  Title    ");
        assert_eq!(lines[1], "-- -------- ");
        assert_eq!(strip_ansi(lines[2]), "1  Café     ");
        assert_eq!(lines[3], "12 Call mom ");
    }
}
