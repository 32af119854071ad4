//! Weekday × hour activity heatmaps
//!
//! Rows are ordered Sunday first, columns are hours 0–23 in the offset the
//! corpus table was written with.

use chrono::Weekday;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::corpus::{weekday_index, weekday_name, CorpusRow, WEEKDAY_ORDER};
use crate::error::CadenceError;

const HOURS: usize = 24;

/// Shades from lightest to darkest for non-empty cells
const SHADES: [char; 4] = ['░', '▒', '▓', '█'];

/// Which posts a heatmap counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeatmapKind {
    #[default]
    All,
    Original,
    Retweets,
}

impl HeatmapKind {
    pub fn includes(&self, row: &CorpusRow) -> bool {
        match self {
            HeatmapKind::All => true,
            HeatmapKind::Original => !row.is_retweet,
            HeatmapKind::Retweets => row.is_retweet,
        }
    }
}

impl FromStr for HeatmapKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(HeatmapKind::All),
            "original" | "originals" => Ok(HeatmapKind::Original),
            "retweets" | "retweet" => Ok(HeatmapKind::Retweets),
            _ => Err(CadenceError::InvalidInput(format!(
                "Unknown heatmap kind '{}'. Valid options: all, original, retweets",
                s
            ))),
        }
    }
}

impl std::fmt::Display for HeatmapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HeatmapKind::All => "all",
            HeatmapKind::Original => "original",
            HeatmapKind::Retweets => "retweets",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    kind: HeatmapKind,
    cells: [[usize; HOURS]; 7],
}

impl Heatmap {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CorpusRow>, kind: HeatmapKind) -> Self {
        let mut cells = [[0; HOURS]; 7];
        for row in rows.into_iter().filter(|r| kind.includes(r)) {
            if let Some(cell) = cells[weekday_index(row.weekday)].get_mut(row.hour as usize) {
                *cell += 1;
            }
        }
        Self { kind, cells }
    }

    pub fn kind(&self) -> HeatmapKind {
        self.kind
    }

    pub fn count(&self, weekday: Weekday, hour: u32) -> usize {
        self.cells[weekday_index(weekday)]
            .get(hour as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    pub fn max(&self) -> usize {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Busiest cell, earliest in the week on ties; `None` for an empty map
    pub fn busiest(&self) -> Option<(Weekday, u32, usize)> {
        let mut best: Option<(Weekday, u32, usize)> = None;
        for (day, row) in WEEKDAY_ORDER.iter().zip(self.cells.iter()) {
            for (hour, &count) in row.iter().enumerate() {
                if count > 0 && best.map_or(true, |(_, _, c)| count > c) {
                    best = Some((*day, hour as u32, count));
                }
            }
        }
        best
    }

    fn shade(&self, count: usize) -> char {
        let max = self.max();
        if count == 0 || max == 0 {
            return ' ';
        }
        let level = (count * SHADES.len()).div_ceil(max).clamp(1, SHADES.len());
        SHADES[level - 1]
    }

    /// Shaded 7 × 24 grid with hour header, legend and busiest slot
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        out.push_str("    ");
        for hour in 0..HOURS {
            let _ = write!(out, " {:02}", hour);
        }
        out.push('\n');

        for (day, row) in WEEKDAY_ORDER.iter().zip(self.cells.iter()) {
            out.push_str(&weekday_name(*day)[..3]);
            out.push(' ');
            for &count in row {
                let shade = self.shade(count);
                out.push(' ');
                out.push(shade);
                out.push(shade);
            }
            out.push('\n');
        }

        out.push('\n');
        let max = self.max();
        let _ = writeln!(
            out,
            "Legend: {} ≤25%  {} ≤50%  {} ≤75%  {} ≤100% of max ({})",
            SHADES[0], SHADES[1], SHADES[2], SHADES[3], max
        );
        match self.busiest() {
            Some((day, hour, count)) => {
                let _ = writeln!(
                    out,
                    "{} posts ({}), busiest: {} {:02}:00 with {}",
                    self.total(),
                    self.kind,
                    weekday_name(day),
                    hour,
                    count
                );
            }
            None => {
                let _ = writeln!(out, "0 posts ({})", self.kind);
            }
        }
        out
    }

    /// Count matrix as CSV with a `weekday,0,…,23` header
    pub fn render_csv(&self) -> String {
        let mut out = String::from("weekday");
        for hour in 0..HOURS {
            let _ = write!(out, ",{}", hour);
        }
        out.push('\n');

        for (day, row) in WEEKDAY_ORDER.iter().zip(self.cells.iter()) {
            out.push_str(weekday_name(*day));
            for count in row {
                let _ = write!(out, ",{}", count);
            }
            out.push('\n');
        }
        out
    }
}
