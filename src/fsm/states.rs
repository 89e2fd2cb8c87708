//! Pairing controller state handlers and table builder.
//!
//! ```text
//!              [BothHeldReached]
//!              publish request
//!                 ┌──────┐
//!                 ▼      │
//!  boot ──▶  UNPAIRED ───┘ ──[response ok]──▶ PAIRED ──┐ [lone press]
//!                 ▲   [response not ok]          │  ▲   │ publish score
//!                 │                              │  └───┘
//!                 └────────[BothHeldLong]────────┘
//!
//!  A stored record with is_paired at boot starts directly in PAIRED.
//! ```

use super::context::{Action, PairingContext};
use super::{StateDescriptor, StateId};
use crate::app::events::AppEvent;
use crate::app::messages::PairingResponse;
use crate::app::persistence::PairingRecord;
use crate::drivers::button::ButtonEvent;
use crate::error::{Error, MessageError};
use log::{debug, info, warn};

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Unpaired,
            name: "Unpaired",
            on_enter: Some(unpaired_enter),
            on_exit: None,
            on_update: unpaired_update,
        },
        StateDescriptor {
            id: StateId::Paired,
            name: "Paired",
            on_enter: Some(paired_enter),
            on_exit: Some(paired_exit),
            on_update: paired_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNPAIRED
// ═══════════════════════════════════════════════════════════════════════════

fn unpaired_enter(ctx: &mut PairingContext) {
    info!("Unpaired: hold + and - together to pair");
    ctx.push(Action::Listen(true));
}

fn unpaired_update(ctx: &mut PairingContext) -> Option<StateId> {
    if let Some(response) = ctx.response.take() {
        return handle_response(ctx, response);
    }

    if ctx.has_event(ButtonEvent::BothHeldReached) {
        info!("Unpaired: combined hold reached, requesting pairing");
        ctx.push(Action::PublishPairingRequest);
    }
    None
}

fn handle_response(ctx: &mut PairingContext, response: PairingResponse) -> Option<StateId> {
    match response {
        PairingResponse::Accepted {
            topic,
            team,
            session_id,
        } => {
            let Some(record) = PairingRecord::paired(topic, team) else {
                ctx.push(Action::Notify(AppEvent::Fault(Error::MalformedMessage(
                    MessageError::InvalidField("topic"),
                ))));
                return None;
            };
            info!(
                "Unpaired: accepted (topic='{}', team={}, session={})",
                record.session_topic,
                team,
                session_id.as_deref().unwrap_or("-")
            );
            ctx.record = record;
            ctx.push(Action::SaveRecord);
            ctx.push(Action::Notify(AppEvent::Paired { team }));
            Some(StateId::Paired)
        }
        PairingResponse::Rejected { status, message } => {
            warn!(
                "Unpaired: pairing rejected (status='{}', message='{}')",
                status,
                message.as_deref().unwrap_or("")
            );
            ctx.push(Action::Notify(AppEvent::PairingRejected));
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAIRED
// ═══════════════════════════════════════════════════════════════════════════

fn paired_enter(ctx: &mut PairingContext) {
    info!(
        "Paired: team {} on '{}'",
        ctx.record.team_number, ctx.record.session_topic
    );
    ctx.push(Action::Listen(false));
}

fn paired_exit(ctx: &mut PairingContext) {
    ctx.record.clear();
}

fn paired_update(ctx: &mut PairingContext) -> Option<StateId> {
    if ctx.response.take().is_some() {
        debug!("Paired: ignoring late pairing response");
    }

    if ctx.has_event(ButtonEvent::BothHeldLong) {
        info!("Paired: reset gesture, clearing pairing");
        ctx.push(Action::ClearRecord);
        ctx.push(Action::Notify(AppEvent::Unpaired));
        return Some(StateId::Unpaired);
    }

    if !ctx.record.is_paired {
        return None;
    }

    if let Some(action) = ctx.single_lone_press() {
        ctx.push(Action::PublishScore(action));
    }
    None
}
