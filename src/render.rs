// SPDX-License-Identifier: MPL-2.0

//! Markdown rendering of the dashboard for the terminal.

use crate::backend::Pack;
use crate::profile::{
    Availability, DashboardSnapshot, Entitlements, LikedPacksView, LimitsCard, Notice,
    OwnedPacksView, QuotaStatus, Statistics,
};
use std::fmt::Write;

pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# {}", snapshot.display_name());
    if let Some(profile) = snapshot.loaded_profile() {
        let _ = writeln!(md, "@{} · {}", profile.username, profile.plan);
    }
    if !snapshot.bio().is_empty() {
        let _ = writeln!(md, "\n{}", snapshot.bio());
    }

    md.push_str("\n## Statistics\n");
    match snapshot.statistics.ready() {
        Some(stats) => render_statistics(&mut md, stats, snapshot.entitlements()),
        None if snapshot.statistics.is_loading() => md.push_str("Loading...\n"),
        None => {}
    }

    md.push_str("\n## My packs\n");
    match snapshot.owned_view() {
        OwnedPacksView::Loading => md.push_str("Loading...\n"),
        OwnedPacksView::Empty => {
            let _ = writeln!(md, "{}", OwnedPacksView::empty_message());
        }
        OwnedPacksView::Grid(packs) => render_packs(&mut md, &packs),
    }

    md.push_str("\n## Liked packs\n");
    let liked = snapshot.liked_view();
    match &liked {
        LikedPacksView::Loading => md.push_str("Loading...\n"),
        LikedPacksView::Grid(packs) => render_packs(&mut md, packs),
        LikedPacksView::AllRemoved | LikedPacksView::NoLikes => {
            if let Some(message) = liked.message() {
                let _ = writeln!(md, "{message}");
            }
        }
    }

    if let Some(card) = snapshot.limits.ready() {
        md.push('\n');
        md.push_str(&render_limits(card));
    }

    md
}

fn render_statistics(md: &mut String, stats: &Statistics, entitlements: Entitlements) {
    let summary = &stats.summary;
    let _ = writeln!(md, "- Packs: {}", summary.packs);
    let _ = writeln!(md, "- Sales: {}", summary.sales);
    let _ = writeln!(md, "- Likes: {}", summary.likes);
    if entitlements.four_card_stats {
        let _ = writeln!(md, "- Plays (30 days): {}", summary.plays);
    }

    let Some(charts) = &stats.charts else {
        if entitlements.upgrade_cta {
            md.push_str("\n> Charts are part of the Pro plan; upgrade to see sales, likes and weekly plays.\n");
        }
        return;
    };

    if !charts.packs.is_empty() {
        md.push_str("\n| Pack | Sales | Likes |\n|---|---|---|\n");
        for point in &charts.packs {
            let _ = writeln!(md, "| {} | {} | {} |", point.label, point.sales, point.likes);
        }
    }

    if !charts.weekly_plays.is_empty() {
        md.push_str("\n| Week | Plays |\n|---|---|\n");
        for week in &charts.weekly_plays {
            let _ = writeln!(md, "| {} | {} |", week.label, week.plays);
        }
    }
}

fn render_packs(md: &mut String, packs: &[Pack]) {
    for pack in packs {
        let price = if pack.is_free() {
            "free".to_string()
        } else {
            pack.price.to_string()
        };
        let _ = writeln!(
            md,
            "- **{}** ({price}) · {} downloads · {} likes",
            pack.title, pack.downloads_count, pack.likes_count
        );
    }
}

pub fn render_limits(card: &LimitsCard) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "## Limits ({})", card.plan);
    let _ = writeln!(md, "- Downloads this month: {}", quota_line(&card.downloads));
    let _ = writeln!(md, "- Uploads this month: {}", quota_line(&card.uploads));
    if card.show_upgrade() {
        md.push_str("\n> You reached your monthly limit. Upgrade your plan for more.\n");
    }
    md
}

fn quota_line(status: &QuotaStatus) -> String {
    match (status.quota.is_limited(), status.remaining) {
        (true, Some(remaining)) => format!("{remaining} of {} left", status.quota),
        (true, None) => format!("? of {} left", status.quota),
        (false, _) => status.quota.to_string(),
    }
}

pub fn render_availability(candidate: &str, availability: Availability) -> String {
    match availability {
        Availability::Available => format!("@{candidate} is available"),
        Availability::Unavailable => format!("@{candidate} is not available"),
        Availability::Checking => format!("checking @{candidate}..."),
        Availability::Unknown => format!("@{candidate}: unknown"),
    }
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Success(message) => message.clone(),
        Notice::Error(message) => format!("error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Plan, Profile};
    use crate::profile::stats::{Locale, aggregate};
    use crate::profile::{Loadable, Quota};

    fn profile(plan: Plan) -> Profile {
        Profile {
            id: "u1".to_string(),
            username: "maker".to_string(),
            bio: None,
            avatar_url: None,
            plan,
            packs_count: 0,
            followers_count: 0,
            total_likes_received: 0,
            total_sales: 0,
            total_plays_count: 0,
            created_at: None,
        }
    }

    #[test]
    fn test_empty_dashboard_messages() {
        let snapshot = DashboardSnapshot {
            profile: Loadable::Ready(Some(profile(Plan::Free))),
            owned_packs: Loadable::Ready(Vec::new()),
            liked_packs: Loadable::Ready(Vec::new()),
            ..Default::default()
        };
        let md = render_dashboard(&snapshot);
        assert!(md.starts_with("# maker\n@maker · free"));
        assert!(md.contains("Upload your first pack"));
        assert!(md.contains("No liked packs yet"));
    }

    #[test]
    fn test_missing_profile_uses_fallback_name() {
        let snapshot = DashboardSnapshot {
            profile: Loadable::Ready(None),
            ..Default::default()
        };
        assert!(render_dashboard(&snapshot).starts_with("# Usuario\n"));
    }

    fn with_statistics(plan: Plan) -> String {
        let snapshot = DashboardSnapshot {
            profile: Loadable::Ready(Some(profile(plan))),
            statistics: Loadable::Ready(aggregate(&[], &[], plan, Locale::Es)),
            ..Default::default()
        };
        render_dashboard(&snapshot)
    }

    #[test]
    fn test_lower_plans_see_upgrade_instead_of_charts() {
        for plan in [Plan::Free, Plan::Plus] {
            let md = with_statistics(plan);
            assert!(md.contains("upgrade to see sales"), "no prompt for {plan}");
            assert!(!md.contains("| Week |"));
        }

        let md = with_statistics(Plan::Pro);
        assert!(!md.contains("upgrade"));
        assert!(md.contains("- Plays (30 days): 0"));
    }

    #[test]
    fn test_limits_card_upgrade_prompt() {
        let card = LimitsCard {
            plan: Plan::Free,
            downloads: QuotaStatus {
                quota: Quota::Limited(10),
                remaining: Some(0),
            },
            uploads: QuotaStatus {
                quota: Quota::Limited(2),
                remaining: None,
            },
        };
        let md = render_limits(&card);
        assert!(md.contains("Downloads this month: 0 of 10 left"));
        assert!(md.contains("Uploads this month: ? of 2 left"));
        assert!(md.contains("Upgrade your plan"));
    }

    #[test]
    fn test_unlimited_quota_line() {
        let card = LimitsCard {
            plan: Plan::Pro,
            downloads: QuotaStatus {
                quota: Quota::Unlimited,
                remaining: None,
            },
            uploads: QuotaStatus {
                quota: Quota::Unlimited,
                remaining: None,
            },
        };
        let md = render_limits(&card);
        assert!(md.contains("Downloads this month: unlimited"));
        assert!(!md.contains("Upgrade"));
    }
}
