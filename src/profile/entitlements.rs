// SPDX-License-Identifier: MPL-2.0

//! Feature visibility and quotas derived purely from the plan.

use crate::backend::Plan;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    pub fn is_limited(self) -> bool {
        matches!(self, Quota::Limited(_))
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quota::Limited(n) => write!(f, "{n}"),
            Quota::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlements {
    pub interactive_graphs: bool,
    pub four_card_stats: bool,
    pub upgrade_cta: bool,
    /// Per calendar month.
    pub downloads: Quota,
    /// Per calendar month.
    pub uploads: Quota,
}

impl Entitlements {
    pub const fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => Self {
                interactive_graphs: false,
                four_card_stats: false,
                upgrade_cta: true,
                downloads: Quota::Limited(10),
                uploads: Quota::Limited(2),
            },
            Plan::Plus => Self {
                interactive_graphs: false,
                four_card_stats: true,
                upgrade_cta: true,
                downloads: Quota::Limited(50),
                uploads: Quota::Limited(15),
            },
            Plan::Pro => Self {
                interactive_graphs: true,
                four_card_stats: true,
                upgrade_cta: false,
                downloads: Quota::Unlimited,
                uploads: Quota::Unlimited,
            },
        }
    }
}
