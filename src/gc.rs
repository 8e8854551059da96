use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::ops;
use crate::registry::{HubState, Registry};

/// Spawns a background task that periodically reaps idle connections.
///
/// A reaped connection goes through the normal disconnect path, so part
/// presence is emitted and channels left empty are dropped unless
/// salvageable. Users keep their state ("remembered") with zero connections.
pub fn spawn_gc_task(registry: Registry, interval_secs: u64, idle_after_secs: i64) {
    rocket::tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval_secs.max(1));
        loop {
            rocket::tokio::time::sleep(interval).await;
            let reaped = {
                let mut st = registry.lock();
                run_sweep(&mut st, Utc::now(), Duration::seconds(idle_after_secs))
            };
            if reaped > 0 {
                println!("🧹 GC: dropped {reaped} idle connection(s)");
            }
        }
    });
}

/// Execute one sweep: disconnect every connection whose last activity is
/// older than `idle_after` as of `now`. Returns how many were dropped.
pub fn run_sweep(st: &mut HubState, now: DateTime<Utc>, idle_after: Duration) -> usize {
    let expired: Vec<Uuid> = st
        .connections
        .values()
        .filter(|conn| now - conn.last_active() > idle_after)
        .map(|conn| conn.id)
        .collect();
    for id in &expired {
        ops::disconnect(st, *id);
    }
    expired.len()
}
