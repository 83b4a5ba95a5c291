use super::{Category, NpsScore, NpsStats};
use serde::Serialize;
use std::fmt::Write;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Alert,
    Warning,
    Success,
}

impl Tone {
    pub fn for_nps(nps: NpsScore) -> Self {
        match nps {
            NpsScore::NoData => Tone::Neutral,
            NpsScore::Score(value) if value < 0 => Tone::Alert,
            NpsScore::Score(value) if value < 50 => Tone::Warning,
            NpsScore::Score(_) => Tone::Success,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tone::Neutral => "#64748b",
            Tone::Alert => "#f97373",
            Tone::Warning => "#facc15",
            Tone::Success => "#22c55e",
        }
    }
}

/// Position of an NPS on the fixed -100..=100 gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gauge {
    pub progress: f64,
    pub tone: Tone,
}

impl Gauge {
    pub fn from_stats(stats: &NpsStats) -> Self {
        // no data parks the needle in the middle, like a score of 0
        let nps = stats.nps.value().unwrap_or(0);
        let progress = ((f64::from(nps) + 100.0) / 200.0).clamp(0.0, 1.0);
        Self {
            progress,
            tone: Tone::for_nps(stats.nps),
        }
    }

    /// Stroke offset that leaves `progress` of an arc of this length drawn.
    pub fn arc_offset(&self, circumference: f64) -> f64 {
        circumference * (1.0 - self.progress)
    }

    pub fn bar(&self, width: usize) -> String {
        let filled = (self.progress * width as f64).round() as usize;
        let filled = filled.min(width);
        let mut bar = String::with_capacity(width + 2);
        bar.push('[');
        bar.extend(std::iter::repeat('#').take(filled));
        bar.extend(std::iter::repeat('-').take(width - filled));
        bar.push(']');
        bar
    }
}

/// Text rendering of the display screen for one snapshot.
pub fn render(session: &str, stats: &NpsStats, gauge: &Gauge) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session {session}: {} vote(s)", stats.total);
    let _ = writeln!(
        out,
        "NPS {:>4}  {}  {:?} {}",
        stats.nps.to_string(),
        gauge.bar(BAR_WIDTH),
        gauge.tone,
        gauge.tone.color()
    );
    let breakdown: Vec<String> = [Category::Detractor, Category::Passive, Category::Promoter]
        .into_iter()
        .map(|category| match stats.share(category) {
            Some(share) => format!("{} {} ({share}%)", category.label(), stats.count(category)),
            None => format!("{} 0", category.label()),
        })
        .collect();
    let _ = writeln!(out, "{}", breakdown.join(" | "));
    out
}
