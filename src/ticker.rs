//! Periodic refresh loops
//!
//! The participant screen refreshes once a second and the admin screen
//! every few seconds. Each refresh re-reads the clock; for participants it
//! is also what auto-submits an attempt whose time ran out.

use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};

use crate::{
    coordinator::SessionCoordinator,
    leaderboard::LeaderboardEntry,
    participant::SharedParticipant,
    timer::{AdminTimer, ParticipantTimer},
};

/// Refreshes a participant until their attempt ends
///
/// `render` receives the countdown on every tick. The loop returns the
/// entry it auto-submitted when time ran out, or `None` once the attempt
/// ended some other way (manual submit, or never joined).
pub async fn drive_participant<F>(
    session: SharedParticipant,
    period: Duration,
    mut render: F,
) -> Option<LeaderboardEntry>
where
    F: FnMut(ParticipantTimer),
{
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;
        let tick = session.lock().tick();
        render(tick.timer);

        if tick.auto_submitted.is_some() {
            return tick.auto_submitted;
        }
        if !matches!(tick.timer, ParticipantTimer::Remaining(_)) {
            return None;
        }
    }
}

/// Refreshes the admin clock while a session is running
///
/// `render` receives the elapsed clock on every tick, including a final
/// [`AdminTimer::Inactive`] once the session stops.
pub async fn drive_admin<F>(coordinator: Arc<SessionCoordinator>, period: Duration, mut render: F)
where
    F: FnMut(AdminTimer),
{
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;
        let timer = coordinator.admin_timer();
        render(timer);
        if timer == AdminTimer::Inactive {
            tracing::debug!("admin ticker stopped");
            return;
        }
    }
}
