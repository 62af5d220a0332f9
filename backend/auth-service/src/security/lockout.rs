/// Account lockout state machine
///
/// Pure transitions over [`AccountSecurityState`]; persistence of the
/// mutated user aggregate is the caller's job. Login flows must consult
/// [`LockoutPolicy::is_locked`] before comparing passwords, so a locked
/// account never leaks whether the password was otherwise correct.
use chrono::{DateTime, Duration, Utc};

use crate::models::AccountSecurityState;

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lock_duration: Duration,
}

/// Outcome of a failed-login transition, so the caller can choose which
/// error to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutTransition {
    BecameLocked { until: DateTime<Utc> },
    StillUnlocked { attempts: u32 },
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, lock_duration_secs: i64) -> Self {
        Self {
            max_failed_attempts,
            lock_duration: Duration::seconds(lock_duration_secs),
        }
    }

    pub fn is_locked(&self, state: &AccountSecurityState, now: DateTime<Utc>) -> bool {
        state.is_locked(now)
    }

    /// Increment the failed-attempt counter; lock the account once the
    /// threshold is reached.
    pub fn handle_failed_login(
        &self,
        state: &mut AccountSecurityState,
        now: DateTime<Utc>,
    ) -> LockoutTransition {
        state.failed_login_attempts += 1;
        if state.failed_login_attempts as u32 >= self.max_failed_attempts {
            let until = now + self.lock_duration;
            state.locked_until = Some(until);
            LockoutTransition::BecameLocked { until }
        } else {
            LockoutTransition::StillUnlocked {
                attempts: state.failed_login_attempts as u32,
            }
        }
    }

    /// A successful login resets the counter and clears any lock.
    pub fn handle_successful_login(&self, state: &mut AccountSecurityState) {
        state.failed_login_attempts = 0;
        state.locked_until = None;
    }
}
