//! Random test data on a 0.1° grid.

use chrono::{Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use spaces_core::GeoPoint;
use spaces_db::NewMessage;

pub const DEFAULT_SEED_COUNT: usize = 499;

/// `count` messages at random 0.1° grid positions, created one day apart with
/// the last one created now.
pub(crate) fn random_messages(count: usize, rng_seed: Option<u64>) -> Vec<NewMessage> {
    let mut rng = match rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    generate(&mut rng, count)
}

fn generate<R: Rng>(rng: &mut R, count: usize) -> Vec<NewMessage> {
    let now = Utc::now();
    (0..count)
        .filter_map(|i| {
            let latitude = f64::from(rng.random_range(-900..=900)) / 10.0;
            let longitude = f64::from(rng.random_range(-1800..=1800)) / 10.0;
            let location = GeoPoint::new(latitude, longitude).ok()?;
            let age_days = i64::try_from(count - i).unwrap_or(i64::MAX);
            Some(NewMessage {
                content: format!("I am message {i}"),
                location,
                created_at: Some(now - Duration::days(age_days - 1)),
            })
        })
        .collect()
}
