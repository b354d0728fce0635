//! Turn-based combat between two taskogotchis
//!
//! A `Fight` is built from a pending challenge's stat snapshots and lives in
//! memory while the two players trade attacks. Time is always passed in
//! explicitly so the rules can be evaluated deterministically.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use taskogotchi_common::{Error, Result};

use crate::domain::entities::{FightChallenge, FightStatus, ProfileDetails};

/// Fraction of the attacker's strength removed from the target's health
pub const STRENGTH_COEFFICIENT: f64 = 0.1;

/// Length of the fighting phase
pub const FIGHT_DURATION_SECS: i64 = 30;

/// Countdown before the first attack is allowed
pub const FIGHT_COUNTDOWN_SECS: i64 = 3;

/// Countdown followed by a fixed fighting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightTimer {
    pub start_time: DateTime<Utc>,
    pub duration_secs: i64,
    pub countdown_secs: i64,
}

impl FightTimer {
    pub fn new(
        start_time: DateTime<Utc>,
        duration_secs: i64,
        countdown_secs: i64,
    ) -> Result<Self> {
        if duration_secs < 0 || countdown_secs < 0 {
            return Err(Error::Validation(
                "Fight duration and countdown must not be negative".to_string(),
            ));
        }
        Ok(Self {
            start_time,
            duration_secs,
            countdown_secs,
        })
    }

    /// Timer with the standard countdown and duration
    pub fn standard(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            duration_secs: FIGHT_DURATION_SECS,
            countdown_secs: FIGHT_COUNTDOWN_SECS,
        }
    }

    /// `start_time` shifted by `secs`, clamped to the representable range
    fn offset(&self, secs: i64) -> DateTime<Utc> {
        Duration::try_seconds(secs)
            .and_then(|d| self.start_time.checked_add_signed(d))
            .unwrap_or(if secs < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.offset(self.countdown_secs.saturating_add(self.duration_secs))
    }

    /// Remaining time, zero once the fight has timed out
    pub fn time_left(&self, now: DateTime<Utc>) -> Duration {
        (self.end_time() - now).max(Duration::zero())
    }

    pub fn is_countdown(&self, now: DateTime<Utc>) -> bool {
        now < self.offset(self.countdown_secs)
    }

    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time()
    }
}

/// One side of a fight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightPlayer {
    pub account_id: String,
    pub name: Option<String>,
    pub health: f64,
    pub strength: i32,
}

impl FightPlayer {
    pub fn new(account_id: String, name: Option<String>, health: i32, strength: i32) -> Self {
        Self {
            account_id,
            name,
            health: f64::from(health),
            strength,
        }
    }

    /// Damage dealt by one attack
    pub fn damage(&self) -> f64 {
        f64::from(self.strength) * STRENGTH_COEFFICIENT
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }
}

/// How a finished fight ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CombatOutcome {
    Winner { account_id: String },
    Draw,
}

impl CombatOutcome {
    /// Winner account id in the form the `complete` action expects
    pub fn winner_account_id(&self) -> Option<&str> {
        match self {
            CombatOutcome::Winner { account_id } => Some(account_id),
            CombatOutcome::Draw => None,
        }
    }
}

/// An in-progress fight between the two sides of a challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fight {
    pub challenge_id: uuid::Uuid,
    pub initiator: FightPlayer,
    pub opponent: FightPlayer,
    pub timer: FightTimer,
    ended: bool,
}

impl Fight {
    pub fn new(
        challenge_id: uuid::Uuid,
        initiator: FightPlayer,
        opponent: FightPlayer,
        timer: FightTimer,
    ) -> Self {
        Self {
            challenge_id,
            initiator,
            opponent,
            timer,
            ended: false,
        }
    }

    /// Build a fight from a pending challenge and its two profiles
    pub fn from_challenge(
        challenge: &FightChallenge,
        initiator: &ProfileDetails,
        opponent: &ProfileDetails,
        start_time: DateTime<Utc>,
    ) -> Result<Self> {
        if challenge.status != FightStatus::Pending {
            return Err(Error::Validation(format!(
                "Fight can only be started from a pending challenge, not '{}'",
                challenge.status
            )));
        }
        if challenge.initiator_id != initiator.id || challenge.opponent_id != opponent.id {
            return Err(Error::Validation(
                "Profiles do not match the challenge combatants".to_string(),
            ));
        }

        Ok(Self::new(
            challenge.id,
            FightPlayer::new(
                initiator.account_id.clone(),
                initiator.player_name.clone(),
                challenge.initiator_health,
                challenge.initiator_strength,
            ),
            FightPlayer::new(
                opponent.account_id.clone(),
                opponent.player_name.clone(),
                challenge.opponent_health,
                challenge.opponent_strength,
            ),
            FightTimer::standard(start_time),
        ))
    }

    /// A side died, time ran out, or the fight was ended early
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.ended
            || self.initiator.is_dead()
            || self.opponent.is_dead()
            || self.timer.is_timed_out(now)
    }

    /// End the fight before anyone dies or time runs out
    pub fn end_fight(&mut self) {
        self.ended = true;
    }

    /// `attacker_account_id` hits the other side
    pub fn attack(&mut self, attacker_account_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.is_ended(now) {
            return Err(Error::Validation("Fight is already ended".to_string()));
        }
        if self.timer.is_countdown(now) {
            return Err(Error::Validation(
                "Fight has not started yet, countdown in progress".to_string(),
            ));
        }

        let (attacker, target) = if attacker_account_id == self.initiator.account_id {
            (&self.initiator, &mut self.opponent)
        } else if attacker_account_id == self.opponent.account_id {
            (&self.opponent, &mut self.initiator)
        } else {
            return Err(Error::Validation(format!(
                "Account {} is not part of this fight",
                attacker_account_id
            )));
        };

        target.health = (target.health - attacker.damage()).max(0.0);
        Ok(())
    }

    /// Ended with both sides still standing. A side that died before the
    /// timeout still loses.
    pub fn is_draw(&self, now: DateTime<Utc>) -> bool {
        self.is_ended(now) && self.initiator.is_alive() && self.opponent.is_alive()
    }

    /// The surviving side, once the fight has ended with a death
    pub fn winner(&self, now: DateTime<Utc>) -> Option<&FightPlayer> {
        if !self.is_ended(now) || self.is_draw(now) {
            return None;
        }
        if self.initiator.is_dead() {
            Some(&self.opponent)
        } else {
            Some(&self.initiator)
        }
    }

    /// Result of the fight, `None` while it is still running
    pub fn outcome(&self, now: DateTime<Utc>) -> Option<CombatOutcome> {
        if !self.is_ended(now) {
            return None;
        }
        Some(match self.winner(now) {
            Some(player) => CombatOutcome::Winner {
                account_id: player.account_id.clone(),
            },
            None => CombatOutcome::Draw,
        })
    }
}
