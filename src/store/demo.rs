// SPDX-License-Identifier: MPL-2.0

use crate::backend::Plan;
use crate::store::{Db, NewPack, NewProfile, PackTable, ProfileTable, StoreError};
use chrono::{Duration, Utc};
use tracing::info;

pub const DEMO_USER_ID: &str = "00000000-0000-4000-8000-000000000001";
const DEMO_SELLER_ID: &str = "00000000-0000-4000-8000-000000000002";

/// Populate the database with a demo creator and some activity.
/// Returns the demo identity id. Does nothing if the demo user exists.
pub fn seed_demo(db: &Db) -> Result<String, StoreError> {
    let profiles = ProfileTable::new(db);
    if profiles.get(DEMO_USER_ID).is_ok() {
        return Ok(DEMO_USER_ID.to_string());
    }

    profiles.insert(
        &NewProfile::new(DEMO_USER_ID, "demo_beats")
            .with_email("demo@arsound.local")
            .with_plan(Plan::Pro),
    )?;
    profiles.insert(&NewProfile::new(DEMO_SELLER_ID, "lofi_lab"))?;

    let packs = PackTable::new(db);
    let now = Utc::now();

    let owned = [
        ("demo-pack-1", "Dusty Vinyl Drums", 0, 42, 17),
        ("demo-pack-2", "Analog Synth Textures Vol. 2", 9, 18, 9),
        ("demo-pack-3", "Trap 808 Essentials", 14, 77, 31),
    ];
    for (i, (id, title, price, downloads, likes)) in owned.iter().enumerate() {
        packs.insert(
            &NewPack::new(id, DEMO_USER_ID, title)
                .with_price(*price)
                .with_counts(*downloads, *likes)
                .created_at(now - Duration::days(60 - 10 * i as i64)),
        )?;
    }

    packs.insert(&NewPack::new("demo-pack-4", DEMO_SELLER_ID, "Rainy Day Keys"))?;
    packs.insert(&NewPack::new("demo-pack-5", DEMO_SELLER_ID, "Retired Loops"))?;
    packs.soft_delete("demo-pack-5")?;
    packs.like(DEMO_USER_ID, "demo-pack-4", now - Duration::days(3))?;
    packs.like(DEMO_USER_ID, "demo-pack-5", now - Duration::days(2))?;

    for day in 0..28 {
        let plays = (day % 5) + 1;
        for n in 0..plays {
            let pack = owned[(day + n) as usize % owned.len()].0;
            packs.record_play(pack, now - Duration::days(day) - Duration::minutes(n * 7))?;
        }
    }

    info!(user = DEMO_USER_ID, "seeded demo data");
    Ok(DEMO_USER_ID.to_string())
}
