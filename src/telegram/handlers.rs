//! Dispatcher schema for teloxide
//!
//! Every message update is converted to an [`InboundMessage`] and handed to
//! the [`TaskDispatcher`]. Failures are logged; the update loop keeps going.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::telegram::bot::inbound_from;
use crate::telegram::dispatcher::TaskDispatcher;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub dispatcher: Arc<TaskDispatcher>,
}

impl HandlerDeps {
    pub fn new(dispatcher: Arc<TaskDispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Creates the handler tree used by the teloxide `Dispatcher`
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(message_handler(deps))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |msg: Message| {
        let deps = deps.clone();
        async move {
            let inbound = inbound_from(&msg);
            match deps.dispatcher.dispatch(inbound).await {
                Ok(outcome) => log::debug!("Message {} in chat {}: {:?}", msg.id.0, msg.chat.id.0, outcome),
                Err(e) => log::error!("Failed to handle message {} in chat {}: {}", msg.id.0, msg.chat.id.0, e),
            }
            Ok(())
        }
    })
}
