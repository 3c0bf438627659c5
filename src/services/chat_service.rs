use std::collections::HashMap;

use futures::{Stream, StreamExt};
use tokio::{
    sync::{
        mpsc::{self, error::SendError},
        watch,
    },
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
    services::{
        intent::Intent,
        notification::Audience,
        texts,
    },
    state::{
        SharedState,
        confirmation::PromptState,
        roster::{Player, RosterError},
    },
    transport::{ChatId, IncomingMessage},
};

/// Consume inbound messages until the stream ends or shutdown is requested.
///
/// Messages from different senders are handled concurrently, but each sender
/// has one lane that processes their messages strictly in arrival order. On exit
/// the lanes are closed and drained so no queued message or roster write is cut
/// short.
pub async fn dispatch<S>(state: SharedState, mut updates: S, mut shutdown: watch::Receiver<bool>)
where
    S: Stream<Item = IncomingMessage> + Unpin,
{
    let mut lanes = HashMap::new();
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            next = updates.next() => match next {
                Some(message) => route(&state, &mut lanes, &mut workers, message),
                None => {
                    info!("inbound message stream ended");
                    break;
                }
            },
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(err) = joined {
                    warn!(error = %err, "message lane failed");
                }
            }
            _ = shutdown.changed() => {
                info!("dispatcher stopping");
                break;
            }
        }
    }

    drop(lanes);
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "message lane failed during shutdown");
        }
    }
}

type Lane = mpsc::UnboundedSender<IncomingMessage>;

/// Queue `message` on its sender's lane, starting a lane if none is running.
fn route(
    state: &SharedState,
    lanes: &mut HashMap<ChatId, Lane>,
    workers: &mut JoinSet<()>,
    message: IncomingMessage,
) {
    let sender = message.sender.id;
    let message = match lanes.get(&sender) {
        Some(lane) => match lane.send(message) {
            Ok(()) => return,
            // The lane's task died; start over with a fresh one.
            Err(SendError(message)) => message,
        },
        None => message,
    };

    let (lane, queue) = mpsc::unbounded_channel();
    lanes.insert(sender, lane);
    workers.spawn(run_lane(state.clone(), message, queue));
}

async fn run_lane(
    state: SharedState,
    first: IncomingMessage,
    mut queue: mpsc::UnboundedReceiver<IncomingMessage>,
) {
    handle_message(&state, first).await;
    while let Some(message) = queue.recv().await {
        handle_message(&state, message).await;
    }
}

/// Route one inbound message through the confirmation flow and roster.
pub async fn handle_message(state: &SharedState, message: IncomingMessage) {
    let chat_id = message.chat_id;
    let intent = Intent::parse(&message.text);
    debug!(chat_id, sender = message.sender.id, ?intent, "inbound message");

    if intent == Intent::Start {
        let prompt = state.prompt_for(message.sender.id).await;
        state
            .notifier()
            .reply(
                chat_id,
                texts::greeting(message.sender.first_name.as_deref()),
                prompt,
            )
            .await;
        return;
    }

    let Some(player) = message.sender.to_player() else {
        state
            .notifier()
            .reply(chat_id, texts::MISSING_FIRST_NAME, PromptState::None)
            .await;
        return;
    };

    let (text, prompt) = match intent {
        Intent::Register => on_register_intent(state, &player).await,
        Intent::Unregister => on_unregister_intent(state, &player).await,
        Intent::List => (texts::roster_listing(&state.list().await), PromptState::None),
        Intent::ConfirmYes | Intent::ConfirmNo => {
            let yes = intent == Intent::ConfirmYes;
            if state.config().is_organizer(player.id) && state.organizer_armed().await {
                on_organizer_answer(state, yes).await
            } else if yes {
                on_confirm_yes(state, player).await
            } else {
                on_confirm_no(state, &player).await
            }
        }
        Intent::Start | Intent::Unrecognized => {
            let prompt = state.prompt_for(player.id).await;
            (texts::UNRECOGNIZED.to_string(), prompt)
        }
    };

    state.notifier().reply(chat_id, text, prompt).await;
}

async fn on_register_intent(state: &SharedState, player: &Player) -> (String, PromptState) {
    match state.request_registration(player).await {
        Ok(()) => (
            texts::confirm_prompt(&state.config().game_day),
            PromptState::AwaitingRegistrationConfirmation,
        ),
        Err(err) => {
            debug!(player_id = player.id, reason = %err, "registration intent rejected");
            (texts::rejection(&err), state.prompt_for(player.id).await)
        }
    }
}

async fn on_unregister_intent(state: &SharedState, player: &Player) -> (String, PromptState) {
    match state.unregister(player.id).await {
        Ok(removed) => {
            let remaining = state.list().await;
            state
                .notifier()
                .announce(
                    &[Audience::Roster(&remaining), Audience::Admin],
                    &texts::spot_freed(&removed),
                )
                .await;
            (texts::UNREGISTERED.to_string(), PromptState::None)
        }
        Err(err) => (texts::rejection(&err), state.prompt_for(player.id).await),
    }
}

async fn on_confirm_yes(state: &SharedState, player: Player) -> (String, PromptState) {
    let announced = player.clone();
    match state.confirm_registration(player).await {
        Ok(()) => {
            state
                .notifier()
                .announce(&[Audience::Admin], &texts::admin_registered(&announced))
                .await;
            (
                texts::registered(&state.config().game_day),
                PromptState::None,
            )
        }
        Err(RosterError::NothingPending) => (texts::nothing_to_confirm(), PromptState::None),
        Err(err) => {
            info!(player_id = announced.id, reason = %err, "confirmed registration failed");
            (texts::rejection(&err), PromptState::None)
        }
    }
}

async fn on_confirm_no(state: &SharedState, player: &Player) -> (String, PromptState) {
    match state.cancel_registration(player.id).await {
        Ok(()) => (texts::REGISTRATION_CANCELLED.to_string(), PromptState::None),
        Err(_) => (texts::nothing_to_cancel(), PromptState::None),
    }
}

async fn on_organizer_answer(state: &SharedState, yes: bool) -> (String, PromptState) {
    match state.resolve_organizer().await {
        Ok(()) => {}
        // Another answer consumed the question first.
        Err(RosterError::NothingPending) => return (texts::nothing_to_confirm(), PromptState::None),
        Err(err) => {
            warn!(error = %err, "recording the organizer answer failed");
            return (
                texts::TRY_AGAIN_LATER.to_string(),
                PromptState::AwaitingOrganizerConfirmation,
            );
        }
    }

    if yes {
        let reminder = texts::payment_reminder(state.config().payment_info.as_deref());
        state
            .notifier()
            .announce(&[Audience::Group], &reminder)
            .await;
        info!("organizer confirmed the game; payment reminder sent");
        (texts::ORGANIZER_THANKS.to_string(), PromptState::None)
    } else {
        state
            .notifier()
            .announce(&[Audience::Admin], texts::ADMIN_GAME_CANCELLED)
            .await;
        info!("organizer reported the game did not take place");
        (texts::ORGANIZER_NOTED.to_string(), PromptState::None)
    }
}
