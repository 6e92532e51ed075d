// SPDX-License-Identifier: MPL-2.0

//! Client-side statistics: per-pack series, weekly plays and summary cards.

use crate::backend::{DataStore, Pack, PlayEvent, Plan};
use crate::config::{CHART_LABEL_MAX, PLAY_WINDOW_DAYS};
use crate::profile::Entitlements;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Locale for day/month chart labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    const ES_MONTHS: [&'static str; 12] = [
        "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
    ];
    const EN_MONTHS: [&'static str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    pub fn day_month(self, date: NaiveDate) -> String {
        let month = date.month0() as usize;
        match self {
            Locale::Es => format!("{} {}", date.day(), Self::ES_MONTHS[month]),
            Locale::En => format!("{} {}", Self::EN_MONTHS[month], date.day()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPoint {
    pub label: String,
    pub sales: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekPoint {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub label: String,
    pub plays: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub packs: usize,
    pub sales: i64,
    pub likes: i64,
    /// Plays inside the trailing window.
    pub plays: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charts {
    pub packs: Vec<PackPoint>,
    /// Ascending by week start.
    pub weekly_plays: Vec<WeekPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub summary: Summary,
    /// Only computed when the plan unlocks interactive graphs.
    pub charts: Option<Charts>,
}

/// Monday of the week containing `at`; Sunday belongs to the week before.
pub fn week_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    let offset = u64::from(date.weekday().num_days_from_monday());
    date - Days::new(offset)
}

pub fn chart_label(title: &str) -> String {
    let mut graphemes = title.graphemes(true);
    let head: String = graphemes.by_ref().take(CHART_LABEL_MAX).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn pack_series(packs: &[Pack]) -> Vec<PackPoint> {
    packs
        .iter()
        .map(|p| PackPoint {
            label: chart_label(&p.title),
            sales: p.downloads_count,
            likes: p.likes_count,
        })
        .collect()
}

pub fn weekly_plays(plays: &[PlayEvent], locale: Locale) -> Vec<WeekPoint> {
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for play in plays {
        *buckets.entry(week_start(play.played_at)).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|(week_start, plays)| WeekPoint {
            week_start,
            label: locale.day_month(week_start),
            plays,
        })
        .collect()
}

pub fn aggregate(packs: &[Pack], plays: &[PlayEvent], plan: Plan, locale: Locale) -> Statistics {
    let summary = Summary {
        packs: packs.len(),
        sales: packs.iter().map(|p| p.downloads_count).sum(),
        likes: packs.iter().map(|p| p.likes_count).sum(),
        plays: plays.len(),
    };

    let charts = Entitlements::for_plan(plan)
        .interactive_graphs
        .then(|| Charts {
            packs: pack_series(packs),
            weekly_plays: weekly_plays(plays, locale),
        });

    Statistics { summary, charts }
}

/// Fetch the play window for `packs` and aggregate. Read failures degrade
/// to an empty play list.
pub async fn load_statistics(
    data: &dyn DataStore,
    packs: &[Pack],
    plan: Plan,
    locale: Locale,
    now: DateTime<Utc>,
) -> Statistics {
    let pack_ids: Vec<String> = packs.iter().map(|p| p.id.clone()).collect();
    let since = now - Duration::days(PLAY_WINDOW_DAYS);

    let plays = if pack_ids.is_empty() {
        Vec::new()
    } else {
        match data.plays_since(&pack_ids, since).await {
            Ok(plays) => plays,
            Err(e) => {
                warn!(target: "arsound::stats", error = %e, "failed to load plays");
                Vec::new()
            }
        }
    };

    aggregate(packs, &plays, plan, locale)
}
