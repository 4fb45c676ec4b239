//! Full-screen terminal view of the current readings and window statistics

use std::io::Write;
use std::time::Duration;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::reading::Pollutant;
use crate::tracker::TrackerReport;
use crate::window::WindowStats;

/// Build the dashboard text for one frame
pub fn render_lines(report: &TrackerReport, uptime: Duration) -> Vec<String> {
    let mut lines = vec![
        "PMS5003 particulate monitor (Ctrl+C to exit)".to_string(),
        format!(
            "Uptime: {}",
            humantime::format_duration(Duration::from_secs(uptime.as_secs()))
        ),
        String::new(),
    ];

    match &report.latest {
        Some(reading) => {
            lines.push(format!("Current ({}):", reading.local_time()));
            for pollutant in Pollutant::ALL {
                lines.push(format!(
                    "  {:<6} {:>8.2} µg/m³",
                    pollutant.label(),
                    reading.value(pollutant)
                ));
            }
        }
        None => lines.push("Current: waiting for first reading".to_string()),
    }

    for window in &report.windows {
        lines.push(String::new());
        lines.push(format!(
            "Last {} ({}):",
            window.name,
            humantime::format_duration(window.duration)
        ));
        lines.extend(window_lines(window.stats.as_ref()));
    }

    lines
}

fn window_lines(stats: Option<&WindowStats>) -> Vec<String> {
    match stats {
        Some(stats) => Pollutant::ALL
            .iter()
            .map(|&pollutant| {
                let field = stats.field(pollutant);
                format!(
                    "  {:<6} mean {:>8.2}  max {:>8.2}",
                    pollutant.label(),
                    field.mean,
                    field.max
                )
            })
            .collect(),
        None => vec!["  no data".to_string()],
    }
}

/// Consumer of one report per acquisition cycle
pub trait ReportView: Send {
    fn show(&mut self, report: &TrackerReport, uptime: Duration) -> std::io::Result<()>;
}

/// Repaints the whole terminal on every draw
pub struct Dashboard<W: Write> {
    out: W,
}

impl<W: Write> Dashboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Clear the screen and draw the report
    pub fn draw(&mut self, report: &TrackerReport, uptime: Duration) -> std::io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        for line in render_lines(report, uptime) {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportView for Dashboard<W> {
    fn show(&mut self, report: &TrackerReport, uptime: Duration) -> std::io::Result<()> {
        self.draw(report, uptime)
    }
}
