//! Match runtime - drives bots and timers for live matches
//!
//! One watcher task per match follows the change feed. After every committed
//! change it cancels the pending bot or turn-timer task and schedules whatever
//! the new state calls for. Every scheduled task re-reads the store and goes
//! through the same conditional write as a human request, so a task that lost
//! a race simply finds nothing to do.

use std::sync::Arc;
use std::time::Duration;

use async_broadcast::{Receiver, RecvError};
use tokio::task::JoinHandle;

use crate::application::game::{
    now_millis, AdvanceClock, AdvanceClockInput, SubmitAction, SubmitActionInput,
};
use crate::domain::repositories::{MatchRepository, RepositoryError, StateChange};
use crate::domain::services::is_timer_current;
use crate::domain::value_objects::{GameState, Phase};
use crate::infrastructure::agents::agent_for;

/// Scheduler for bot moves and timer deadlines
#[derive(Clone)]
pub struct MatchRuntime {
    repo: Arc<dyn MatchRepository>,
}

impl MatchRuntime {
    pub fn new(repo: Arc<dyn MatchRepository>) -> Self {
        Self { repo }
    }

    /// Start driving a match until it finishes
    pub async fn watch(&self, match_id: &str) -> Result<JoinHandle<()>, RepositoryError> {
        // Subscribe before the first read so no commit falls in between
        let receiver = self.repo.subscribe(match_id).await?;
        let repo = self.repo.clone();
        let match_id = match_id.to_string();

        Ok(tokio::spawn(async move {
            run(repo, match_id, receiver).await;
        }))
    }

    /// Watch every unfinished match in the store; returns how many were picked up
    pub async fn resume_active(&self) -> Result<usize, RepositoryError> {
        let active = self.repo.list_active().await?;

        let mut resumed = 0;
        for match_id in &active {
            match self.watch(match_id).await {
                Ok(_) => resumed += 1,
                Err(e) => tracing::warn!("Could not resume match {}: {}", match_id, e),
            }
        }

        if resumed > 0 {
            tracing::info!("Resumed {} unfinished matches", resumed);
        }
        Ok(resumed)
    }
}

async fn run(repo: Arc<dyn MatchRepository>, match_id: String, mut receiver: Receiver<StateChange>) {
    let mut scheduled = Scheduled::default();

    let (state, mut last_seen) = match repo.read_state(&match_id).await {
        Ok(read) => read,
        Err(e) => {
            tracing::error!("Runtime could not read match {}: {}", match_id, e);
            return;
        }
    };
    scheduled.reschedule(&repo, &match_id, &state);
    if state.is_finished() {
        return;
    }

    tracing::info!("Runtime watching match {}", match_id);

    loop {
        let state = match receiver.recv().await {
            Ok(change) => {
                if change.version <= last_seen {
                    continue;
                }
                last_seen = change.version;
                change.state
            }
            Err(RecvError::Overflowed(missed)) => {
                tracing::warn!("Runtime for match {} missed {} changes, re-reading", match_id, missed);
                match repo.read_state(&match_id).await {
                    Ok((state, version)) => {
                        last_seen = version;
                        Arc::new(state)
                    }
                    Err(e) => {
                        tracing::error!("Runtime could not re-read match {}: {}", match_id, e);
                        break;
                    }
                }
            }
            Err(RecvError::Closed) => break,
        };

        scheduled.reschedule(&repo, &match_id, &state);
        if state.is_finished() {
            tracing::info!(
                "Match {} finished, winner {:?}",
                match_id,
                state.winner_id
            );
            break;
        }
    }

    scheduled.cancel_all();
}

/// Outstanding tasks of one match
#[derive(Default)]
struct Scheduled {
    // Bot move or human turn timer for the current turn
    turn: Option<JoinHandle<()>>,
    // Match expiry with the deadline it was armed for
    match_expiry: Option<(i64, JoinHandle<()>)>,
}

impl Scheduled {
    fn reschedule(&mut self, repo: &Arc<dyn MatchRepository>, match_id: &str, state: &GameState) {
        if let Some(task) = self.turn.take() {
            task.abort();
        }

        if state.is_finished() {
            self.cancel_all();
            return;
        }

        self.schedule_match_expiry(repo, match_id, state);

        let seat = match state.phase {
            Phase::AwaitingColorChoice => state.pending_wild.map(|p| p.player_index),
            _ => Some(state.current_player_index),
        };
        let Some(seat) = seat else {
            return;
        };

        let agent = agent_for(&state.players[seat]);
        if agent.is_bot() {
            self.turn = Some(spawn_bot_move(
                repo.clone(),
                match_id.to_string(),
                seat,
                state.turn_generation,
                state.settings.bot_think_ms,
            ));
        } else if let Some(deadline) = state.turn_deadline {
            self.turn = Some(spawn_turn_timer(
                repo.clone(),
                match_id.to_string(),
                deadline,
                state.turn_generation,
            ));
        }
    }

    fn schedule_match_expiry(&mut self, repo: &Arc<dyn MatchRepository>, match_id: &str, state: &GameState) {
        let Some(deadline) = state.match_deadline else {
            return;
        };
        if matches!(&self.match_expiry, Some((armed, _)) if *armed == deadline) {
            return;
        }
        if let Some((_, task)) = self.match_expiry.take() {
            task.abort();
        }

        let repo = repo.clone();
        let match_id = match_id.to_string();
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            let use_case = AdvanceClock::new(repo);
            let result = use_case
                .execute(AdvanceClockInput {
                    match_id: match_id.clone(),
                    now: now_millis().max(deadline),
                    expected_generation: None,
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Match timer failed for {}: {}", match_id, e);
            }
        });
        self.match_expiry = Some((deadline, task));
    }

    fn cancel_all(&mut self) {
        if let Some(task) = self.turn.take() {
            task.abort();
        }
        if let Some((_, task)) = self.match_expiry.take() {
            task.abort();
        }
    }
}

fn spawn_bot_move(
    repo: Arc<dyn MatchRepository>,
    match_id: String,
    seat: usize,
    generation: u64,
    think_ms: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(think_ms)).await;

        let state = match repo.read_state(&match_id).await {
            Ok((state, _)) => state,
            Err(e) => {
                tracing::error!("Bot could not read match {}: {}", match_id, e);
                return;
            }
        };
        if !is_timer_current(&state, generation) {
            return;
        }

        let player = &state.players[seat];
        let Some(action) = agent_for(player).decide(&state, seat) else {
            return;
        };

        tracing::debug!("Bot {} chose {}", player.display_name, action.as_str());
        let use_case = SubmitAction::new(repo.clone());
        let result = use_case
            .execute(SubmitActionInput {
                match_id: match_id.clone(),
                player_id: player.id.clone(),
                action,
                now: now_millis(),
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("Bot move rejected in match {}: {}", match_id, e);
        }
    })
}

fn spawn_turn_timer(
    repo: Arc<dyn MatchRepository>,
    match_id: String,
    deadline: i64,
    generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep_until(deadline).await;

        let use_case = AdvanceClock::new(repo);
        let result = use_case
            .execute(AdvanceClockInput {
                match_id: match_id.clone(),
                now: now_millis().max(deadline),
                expected_generation: Some(generation),
            })
            .await;
        if let Err(e) = result {
            tracing::error!("Turn timer failed for {}: {}", match_id, e);
        }
    })
}

async fn sleep_until(deadline: i64) {
    let remaining = (deadline - now_millis()).max(0) as u64;
    tokio::time::sleep(Duration::from_millis(remaining)).await;
}
