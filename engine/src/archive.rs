//! Season archives - end-of-year summaries of activities and reports.
//!
//! A season is a school year running from 1 September to 31 August. The
//! archive is a regular record in `season-archives` and goes through the
//! same save path as everything else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{from_record, to_payload, Activity, ActivityKind, ActivityReport};
use crate::{error::Result, CollectionKey, Error, RecordId, SyncCoordinator, SyncRecord};

/// Month the school year starts in.
const SEASON_START_MONTH: u32 = 9;

/// A school year, written `2025-2026`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The season a date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= SEASON_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, SEASON_START_MONTH, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year + 1, SEASON_START_MONTH, 1)?.pred_opt()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.start_year + 1)
    }
}

impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidSeason(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.trim().parse().map_err(|_| invalid())?;
        let end: i32 = end.trim().parse().map_err(|_| invalid())?;
        if end != start + 1 {
            return Err(invalid());
        }
        Ok(Self::new(start))
    }
}

impl TryFrom<String> for Season {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.to_string()
    }
}

/// An activity as stored in an archive, with its record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedActivity {
    pub record_id: RecordId,
    #[serde(flatten)]
    pub activity: Activity,
}

/// A report as stored in an archive, with its record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedReport {
    pub record_id: RecordId,
    #[serde(flatten)]
    pub report: ActivityReport,
}

/// Derived totals for a season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSummary {
    pub activity_count: usize,
    pub report_count: usize,
    /// Sum of expected participants over activities
    pub planned_participants: u64,
    /// Sum of attendance over reports
    pub actual_participants: u64,
    pub first_activity: Option<NaiveDate>,
    pub last_activity: Option<NaiveDate>,
    pub activities_by_kind: BTreeMap<ActivityKind, usize>,
}

/// The archived season document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonArchive {
    pub season: Season,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub summary: SeasonSummary,
    pub activities: Vec<ArchivedActivity>,
    pub reports: Vec<ArchivedReport>,
}

/// Collects the activities and reports of one season into an archive.
///
/// Records outside the season are ignored; records whose payload cannot be
/// decoded are skipped with a warning and counted.
#[derive(Debug)]
pub struct ArchiveBuilder {
    season: Season,
    title: Option<String>,
    activities: Vec<ArchivedActivity>,
    reports: Vec<ArchivedReport>,
    skipped: usize,
}

impl ArchiveBuilder {
    pub fn new(season: Season) -> Self {
        Self {
            season,
            title: None,
            activities: Vec::new(),
            reports: Vec::new(),
            skipped: 0,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add activity records.
    pub fn activities(mut self, records: &[SyncRecord]) -> Self {
        for record in records {
            match from_record::<Activity>(record) {
                Ok(activity) if self.season.contains(activity.date) => {
                    self.activities.push(ArchivedActivity {
                        record_id: record.id.clone(),
                        activity,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable activity");
                    self.skipped += 1;
                }
            }
        }
        self
    }

    /// Add report records.
    pub fn reports(mut self, records: &[SyncRecord]) -> Self {
        for record in records {
            match from_record::<ActivityReport>(record) {
                Ok(report) if self.season.contains(report.date) => {
                    self.reports.push(ArchivedReport {
                        record_id: record.id.clone(),
                        report,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable report");
                    self.skipped += 1;
                }
            }
        }
        self
    }

    /// Records skipped so far because they could not be decoded.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn build(mut self, created_at: DateTime<Utc>) -> SeasonArchive {
        self.activities
            .sort_by(|a, b| a.activity.date.cmp(&b.activity.date));
        self.reports.sort_by(|a, b| a.report.date.cmp(&b.report.date));

        let mut summary = SeasonSummary {
            activity_count: self.activities.len(),
            report_count: self.reports.len(),
            first_activity: self.activities.first().map(|a| a.activity.date),
            last_activity: self.activities.last().map(|a| a.activity.date),
            ..SeasonSummary::default()
        };
        for archived in &self.activities {
            summary.planned_participants += u64::from(archived.activity.participants);
            *summary
                .activities_by_kind
                .entry(archived.activity.kind)
                .or_default() += 1;
        }
        summary.actual_participants = self
            .reports
            .iter()
            .map(|r| u64::from(r.report.participants))
            .sum();

        SeasonArchive {
            title: self
                .title
                .unwrap_or_else(|| format!("Season {}", self.season)),
            season: self.season,
            created_at,
            summary,
            activities: self.activities,
            reports: self.reports,
        }
    }
}

/// Build the archive for `season` from the locally held activities and
/// reports and save it to `season-archives`.
pub async fn archive_season(coordinator: &SyncCoordinator, season: Season) -> Result<RecordId> {
    let activities = coordinator.records(CollectionKey::Activities.as_str())?;
    let reports = coordinator.records(CollectionKey::ActivityReports.as_str())?;

    let builder = ArchiveBuilder::new(season)
        .activities(&activities)
        .reports(&reports);
    let skipped = builder.skipped();
    let archive = builder.build(Utc::now());

    tracing::info!(
        season = %season,
        activities = archive.summary.activity_count,
        reports = archive.summary.report_count,
        skipped,
        "Archiving season"
    );

    coordinator
        .save(CollectionKey::SeasonArchives.as_str(), to_payload(&archive)?)
        .await
}
