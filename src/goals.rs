// =============================================================================
// Goals Board — KPI progress and checklist completion
// =============================================================================
//
// KPI progress is `value / target * 100`, undefined when the target is zero.
// Status bands:
//
//   progress >= 100  =>  🟢 On target
//   progress >=  80  =>  🟡 At risk
//   otherwise        =>  🔴 Critical
//   no target        =>  ⚪ No target
//
// Checklist progress counts ticked tasks per section and overall. A search
// query narrows the counted tasks to those whose section or title contains
// it, case-insensitively.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Progress at or above this is on target.
pub const ON_TARGET_PCT: f64 = 100.0;
/// Progress at or above this (but below target) is at risk.
pub const AT_RISK_PCT: f64 = 80.0;

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiStatus {
    NoTarget,
    OnTarget,
    AtRisk,
    Critical,
}

impl std::fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTarget => write!(f, "⚪ No target"),
            Self::OnTarget => write!(f, "🟢 On target"),
            Self::AtRisk => write!(f, "🟡 At risk"),
            Self::Critical => write!(f, "🔴 Critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiProgress {
    pub name: String,
    pub value: f64,
    pub target: f64,
    pub progress_pct: Option<f64>,
    pub status: KpiStatus,
}

/// `value / target * 100`. `None` for a zero target or a non-finite result.
pub fn progress_pct(value: f64, target: f64) -> Option<f64> {
    if target == 0.0 {
        return None;
    }
    let pct = value / target * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn kpi_status(progress: Option<f64>) -> KpiStatus {
    match progress {
        None => KpiStatus::NoTarget,
        Some(p) if p >= ON_TARGET_PCT => KpiStatus::OnTarget,
        Some(p) if p >= AT_RISK_PCT => KpiStatus::AtRisk,
        Some(_) => KpiStatus::Critical,
    }
}

impl Kpi {
    pub fn progress(&self) -> KpiProgress {
        let progress_pct = progress_pct(self.value, self.target);
        KpiProgress {
            name: self.name.clone(),
            value: self.value,
            target: self.target,
            progress_pct,
            status: kpi_status(progress_pct),
        }
    }
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSection {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub name: String,
    pub done: usize,
    pub total: usize,
}

impl SectionProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallProgress {
    pub done: usize,
    pub total: usize,
}

impl OverallProgress {
    /// Completed share in `[0, 1]`; `None` with nothing to count.
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| self.done as f64 / self.total as f64)
    }
}

fn matches_query(section: &str, task: &str, query: &str) -> bool {
    query.is_empty()
        || section.to_lowercase().contains(query)
        || task.to_lowercase().contains(query)
}

/// Ticked vs counted tasks of one section under `query`.
pub fn section_progress(section: &ChecklistSection, query: &str) -> SectionProgress {
    let query = query.trim().to_lowercase();
    let (done, total) = section
        .tasks
        .iter()
        .filter(|t| matches_query(&section.name, &t.title, &query))
        .fold((0, 0), |(done, total), t| (done + usize::from(t.done), total + 1));

    SectionProgress {
        name: section.name.clone(),
        done,
        total,
    }
}

pub fn overall_progress(sections: &[SectionProgress]) -> OverallProgress {
    sections.iter().fold(OverallProgress::default(), |acc, s| OverallProgress {
        done: acc.done + s.done,
        total: acc.total + s.total,
    })
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// KPIs and checklist sections as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalsBoard {
    #[serde(default)]
    pub kpis: Vec<Kpi>,
    #[serde(default)]
    pub sections: Vec<ChecklistSection>,
}

impl GoalsBoard {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read goals board from {}", path.display()))?;
        let board: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse goals board from {}", path.display()))?;

        info!(
            path = %path.display(),
            kpis = board.kpis.len(),
            sections = board.sections.len(),
            "goals board loaded"
        );
        Ok(board)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsReport {
    pub kpis: Vec<KpiProgress>,
    /// Sections shown; completed ones are left out with `pending_only`.
    pub sections: Vec<SectionProgress>,
    /// Counts every section matching the query, shown or not.
    pub overall: OverallProgress,
}

pub fn build_report(board: &GoalsBoard, query: &str, pending_only: bool) -> GoalsReport {
    let all: Vec<SectionProgress> = board
        .sections
        .iter()
        .map(|s| section_progress(s, query))
        .collect();
    let overall = overall_progress(&all);

    let sections = all
        .into_iter()
        .filter(|s| !(pending_only && s.is_complete()))
        .collect();

    GoalsReport {
        kpis: board.kpis.iter().map(Kpi::progress).collect(),
        sections,
        overall,
    }
}

impl std::fmt::Display for GoalsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "KPIs:")?;
        for k in &self.kpis {
            let pct = k
                .progress_pct
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"));
            writeln!(f, " - {}: {} / {} ({pct}) {}", k.name, k.value, k.target, k.status)?;
        }
        writeln!(f)?;
        write!(f, "Overall progress: {} / {}", self.overall.done, self.overall.total)?;
        if let Some(fraction) = self.overall.fraction() {
            write!(f, " ({:.0}%)", fraction * 100.0)?;
        }
        for s in &self.sections {
            write!(f, "\n - {}: {}/{}", s.name, s.done, s.total)?;
        }
        Ok(())
    }
}
