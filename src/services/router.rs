//! Realtime event router: bridges inbound hub notifications to the session
//! store and the sequence controllers, and gates outbound invocations on
//! local sequencing state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::dto::commands::{AutoPlaySettings, CreateGamePayload, HubCommand, PlayerCommand};
use crate::dto::game::{AutoPlayOptions, format_amount};
use crate::dto::hub::HubEvent;
use crate::error::{SequenceError, SessionFatal};
use crate::sequence::coordinator::AnimationCoordinator;
use crate::sequence::formula::tokenize;
use crate::sequence::{SequenceName, Sequences};
use crate::services::hub::HubHandle;
use crate::state::round::{RoundEvent, RoundPhase, RoundTracker};
use crate::state::store::{Action, GameSessionState, RoundTimings};

enum Flow {
    Continue,
    Fatal,
}

/// Shared handle to the router context, cloned into sequence chains.
pub type SharedRouter = Arc<RouterContext>;

/// Shared router state reachable from spawned sequence chains.
pub struct RouterContext {
    store: Mutex<GameSessionState>,
    round: Mutex<RoundTracker>,
    sequences: Sequences,
    coordinator: Arc<AnimationCoordinator>,
    hub: HubHandle,
    config: Arc<AppConfig>,
    notice: watch::Sender<Option<SessionFatal>>,
    loading: watch::Sender<bool>,
    pending_ack: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Drives the session: one loop consuming hub events and player commands.
pub struct EventRouter {
    ctx: Arc<RouterContext>,
}

impl EventRouter {
    /// Wire the router over the shared sequencing stack and hub handle.
    ///
    /// Returns the router plus watch receivers for the fatal notice and the
    /// slow-call loading indicator.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player_id: u64,
        provider_id: u64,
        sequences: Sequences,
        coordinator: Arc<AnimationCoordinator>,
        hub: HubHandle,
        config: Arc<AppConfig>,
    ) -> (
        Self,
        watch::Receiver<Option<SessionFatal>>,
        watch::Receiver<bool>,
    ) {
        let (notice_tx, notice_rx) = watch::channel(None);
        let (loading_tx, loading_rx) = watch::channel(false);
        let store = GameSessionState::new(
            player_id,
            provider_id,
            config.default_bet_amount,
            config.bet_amounts.clone(),
            RoundTimings {
                open: config.open_duration,
                win: config.win_duration,
                burn: config.burn_duration,
            },
        );
        let ctx = Arc::new(RouterContext {
            store: Mutex::new(store),
            round: Mutex::new(RoundTracker::new()),
            sequences,
            coordinator,
            hub,
            config,
            notice: notice_tx,
            loading: loading_tx,
            pending_ack: Mutex::new(None),
        });
        (Self { ctx }, notice_rx, loading_rx)
    }

    /// Shared context handle, mainly for inspection by the UI shell.
    pub fn context(&self) -> SharedRouter {
        self.ctx.clone()
    }

    /// Consume events and commands until the session dies.
    ///
    /// The events channel closing means the hub supervisor exhausted its
    /// reconnect schedule, which is an unrecoverable close.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<HubEvent>,
        mut commands: mpsc::Receiver<PlayerCommand>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Flow::Fatal = handle_event(&self.ctx, event) {
                            break;
                        }
                    }
                    None => {
                        self.ctx.raise_fatal(SessionFatal::ConnectionLost);
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => handle_command(&self.ctx, command),
                    None => {
                        info!("command channel closed; shutting the router down");
                        break;
                    }
                },
            }
        }
    }
}

impl RouterContext {
    /// Clone of the current session state.
    pub fn store_snapshot(&self) -> GameSessionState {
        self.lock_store().clone()
    }

    /// Current phase of the round tracker.
    pub fn round_phase(&self) -> RoundPhase {
        self.lock_round().phase()
    }

    /// Turn the page, then reveal the formula and potential win.
    async fn run_turn_reveal(&self, formula: String, amount: String) -> Result<(), SequenceError> {
        self.round_apply(RoundEvent::TurnPage);
        self.sequences.turn.show(self.config.turn_duration).await?;
        self.round_apply(RoundEvent::Reveal);
        let win_duration = self.lock_store().timings.win;
        self.sequences
            .win
            .show(win_duration, &tokenize(&formula), amount)
            .await
    }

    /// First round opens the book; later rounds go straight to the turn.
    async fn run_new_game(
        &self,
        first_of_session: bool,
        formula: String,
        amount: String,
    ) -> Result<(), SequenceError> {
        if first_of_session {
            self.round_apply(RoundEvent::OpenBook);
            let open_duration = self.lock_store().timings.open;
            self.sequences.open.show(open_duration).await?;
        }
        self.run_turn_reveal(formula, amount).await
    }

    /// Burned round: reveal the losing page with a zero amount, burn it,
    /// then prompt for the next bet.
    async fn run_burn(&self, formula: String) -> Result<(), SequenceError> {
        self.round_apply(RoundEvent::TurnPage);
        self.sequences.turn.show(self.config.turn_duration).await?;
        self.round_apply(RoundEvent::Reveal);
        let timings = self.lock_store().timings;
        self.sequences
            .win
            .show(timings.win, &tokenize(&formula), format_amount(0.0))
            .await?;
        self.round_apply(RoundEvent::Burn);
        self.sequences.burn.show(timings.burn).await?;
        self.run_settle().await
    }

    /// Prompt for the next bet and refresh balance plus leaderboard.
    async fn run_settle(&self) -> Result<(), SequenceError> {
        self.round_apply(RoundEvent::PromptNextBet);
        self.sequences
            .place_next_bet
            .show(self.config.place_next_bet_duration)
            .await?;
        self.hub.invoke(HubCommand::UpdateBalance);
        self.hub.invoke(HubCommand::GetLeaderboard);
        Ok(())
    }

    /// Jackpot celebration, a fixed pause, then the next-bet prompt.
    async fn run_jackpot(&self, amount: String) -> Result<(), SequenceError> {
        self.sequences.jackpot.show(amount).await?;
        tokio::time::sleep(Duration::from_millis(self.config.jackpot_pause_ms)).await;
        self.run_settle().await
    }

    /// Drop every in-flight sequence and fall back to the idle book.
    fn resynchronize(&self) {
        self.coordinator.stop_terminal();
        self.coordinator.stop(SequenceName::Turn);
        self.lock_round().force_reset();
        self.sequences.open.show_idle();
    }

    fn raise_fatal(&self, fatal: SessionFatal) {
        warn!(error = %fatal, "fatal session condition");
        self.coordinator.stop_terminal();
        let _ = self.notice.send(Some(fatal));
    }

    /// Arm the slow-call loader: the indicator appears only if no
    /// acknowledgment clears it within the configured delay.
    fn start_pending_ack(&self) {
        let mut pending = self.lock_pending();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let loading = self.loading.clone();
        let delay = Duration::from_millis(self.config.loader_delay_ms);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = loading.send(true);
        }));
    }

    fn clear_pending_ack(&self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
        let _ = self.loading.send(false);
    }

    fn apply(&self, action: Action) {
        self.lock_store().apply(action);
    }

    fn round_apply(&self, event: RoundEvent) {
        let mut round = self.lock_round();
        match round.apply(event) {
            Ok(phase) => debug!(?phase, "round phase advanced"),
            Err(err) => warn!(error = %err, "round tracker rejected a transition"),
        }
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, GameSessionState> {
        self.store.lock().expect("session store poisoned")
    }

    fn lock_round(&self) -> std::sync::MutexGuard<'_, RoundTracker> {
        self.round.lock().expect("round tracker poisoned")
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<tokio::task::JoinHandle<()>>> {
        self.pending_ack.lock().expect("pending ack poisoned")
    }
}

fn handle_event(ctx: &SharedRouter, event: HubEvent) -> Flow {
    match event {
        HubEvent::UserNotFound => {
            ctx.raise_fatal(SessionFatal::UserNotFound);
            return Flow::Fatal;
        }
        HubEvent::NewSession => {
            ctx.raise_fatal(SessionFatal::SessionSuperseded);
            return Flow::Fatal;
        }
        HubEvent::UserConnected => {
            debug!("hub acknowledged the session");
        }
        HubEvent::GameData(payload) => {
            ctx.apply(Action::SetUser(payload.user));
            match payload.game {
                None => {
                    ctx.sequences.open.show_idle();
                }
                Some(game) => {
                    let formula = game.formula.clone();
                    let amount = game.potential_win_display();
                    ctx.apply(Action::SetGame(Some(game)));
                    let chain = ctx.clone();
                    spawn_chain(ctx, "resume-round", async move {
                        chain.run_turn_reveal(formula, amount).await
                    });
                }
            }
        }
        HubEvent::UpdateBalance(payload) => {
            ctx.apply(Action::UpdateBalance(payload.balance));
        }
        HubEvent::Leaderboard(entries) => {
            ctx.apply(Action::SetLeaderboard(entries));
        }
        HubEvent::MultiplierUpdate(payload) => {
            ctx.clear_pending_ack();
            let formula = payload.formula.clone();
            let amount = format_amount(payload.potential_win);
            ctx.apply(Action::UpdateMultiplier {
                multiplier: payload.multiplier,
                next_multiplier: payload.next_multiplier,
                turn: payload.turn,
                formula: payload.formula,
                potential_win: payload.potential_win,
            });
            let chain = ctx.clone();
            spawn_chain(ctx, "turn-reveal", async move {
                chain.run_turn_reveal(formula, amount).await
            });
        }
        HubEvent::Burn(payload) => {
            ctx.clear_pending_ack();
            ctx.apply(Action::SetGame(None));
            let chain = ctx.clone();
            spawn_chain(ctx, "burn", async move { chain.run_burn(payload.formula).await });
        }
        HubEvent::Win(payload) => {
            ctx.clear_pending_ack();
            debug!(amount = payload.win_amount, "round settled by cash-out");
            ctx.coordinator.stop_terminal();
            ctx.apply(Action::SetGame(None));
            ctx.round_apply(RoundEvent::CashOut);
            let chain = ctx.clone();
            spawn_chain(ctx, "settle", async move { chain.run_settle().await });
        }
        HubEvent::NewGame(game) => {
            ctx.clear_pending_ack();
            ctx.coordinator.stop_terminal();
            let formula = game.formula.clone();
            let amount = game.potential_win_display();
            ctx.apply(Action::SetGame(Some(game)));
            ctx.apply(Action::IncrementGamesPlayed);
            let first_of_session = ctx.lock_store().games_played == 1;
            let chain = ctx.clone();
            spawn_chain(ctx, "new-game", async move {
                chain.run_new_game(first_of_session, formula, amount).await
            });
        }
        HubEvent::JackpotWin(payload) => {
            ctx.clear_pending_ack();
            ctx.apply(Action::SetGame(None));
            ctx.round_apply(RoundEvent::JackpotHit);
            let amount = format_amount(payload.amount);
            let chain = ctx.clone();
            spawn_chain(ctx, "jackpot", async move { chain.run_jackpot(amount).await });
        }
        HubEvent::AutoplayStartInfo(payload) => {
            let armed = ctx.lock_store().auto_play.is_some();
            if armed {
                ctx.apply(Action::UpdateAutoPlayProgress {
                    current_game: 0,
                    total_games: payload.total_games,
                });
            } else {
                ctx.apply(Action::SetAutoPlay(Some(AutoPlayOptions {
                    total_games: payload.total_games,
                    current_game: 0,
                    auto_cashout: None,
                })));
            }
        }
        HubEvent::AutoPlayInfoUpdate(payload) => {
            ctx.apply(Action::UpdateAutoPlayProgress {
                current_game: payload.current_game,
                total_games: payload.total_games,
            });
        }
        HubEvent::AutoplayStopInfo | HubEvent::AutoplayFinished => {
            ctx.apply(Action::SetAutoPlay(None));
        }
        HubEvent::Unknown => {
            debug!("ignoring unrecognized hub event");
        }
    }
    Flow::Continue
}

fn handle_command(ctx: &SharedRouter, command: PlayerCommand) {
    match command {
        PlayerCommand::PlaceBet => {
            let (bet_amount, auto_play) = {
                let store = ctx.lock_store();
                (store.bet_amount, store.auto_play.clone())
            };
            let payload = CreateGamePayload {
                bet_amount: (bet_amount * 100.0).round() as u64,
                auto_play_settings: auto_play.map(|options| AutoPlaySettings {
                    total_games: options.total_games,
                    auto_cashout: options.auto_cashout,
                }),
            };
            ctx.start_pending_ack();
            ctx.hub.invoke(HubCommand::CreateGame(payload));
        }
        PlayerCommand::TurnPage => {
            // a running win reveal swallows the flip and fast-forwards
            if ctx.coordinator.is_active(SequenceName::Win) {
                let coordinator = ctx.coordinator.clone();
                tokio::spawn(async move { coordinator.finish(SequenceName::Win).await });
                return;
            }
            let game_id = ctx.lock_store().game.as_ref().map(|game| game.id);
            if let Some(game_id) = game_id {
                ctx.start_pending_ack();
                ctx.hub.invoke(HubCommand::TurnThePage { game_id });
            } else {
                debug!("flip ignored: no round in flight");
            }
        }
        PlayerCommand::Cashout => {
            let game_id = ctx.lock_store().game.as_ref().map(|game| game.id);
            if let Some(game_id) = game_id {
                ctx.hub.invoke(HubCommand::Cashout { game_id });
            }
        }
        PlayerCommand::SetBetAmount { amount } => {
            ctx.apply(Action::SetBetAmount(amount));
        }
        PlayerCommand::SetAutoPlay {
            total_games,
            auto_cashout,
        } => {
            ctx.apply(Action::SetAutoPlay(Some(AutoPlayOptions {
                total_games,
                current_game: 0,
                auto_cashout,
            })));
        }
        PlayerCommand::CancelAutoPlay => {
            ctx.apply(Action::SetAutoPlay(None));
            ctx.hub.invoke(HubCommand::CancelAutoplay);
        }
    }
}

/// Spawn a sequence chain with its rejection handler attached.
///
/// Cancellation is the expected outcome of being superseded and is swallowed
/// here; contract violations mean local sequencing state has diverged and
/// trigger a resynchronization.
fn spawn_chain<F>(ctx: &SharedRouter, label: &'static str, chain: F)
where
    F: Future<Output = Result<(), SequenceError>> + Send + 'static,
{
    let ctx = ctx.clone();
    tokio::spawn(async move {
        match chain.await {
            Ok(()) => debug!(chain = label, "sequence chain completed"),
            Err(err) if err.is_cancelled() => {
                debug!(chain = label, "sequence chain superseded");
            }
            Err(err) => {
                error!(
                    chain = label,
                    error = %err,
                    "sequence chain violated its contract; resynchronizing"
                );
                ctx.resynchronize();
            }
        }
    });
}
