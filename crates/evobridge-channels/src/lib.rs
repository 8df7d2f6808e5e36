pub mod traits;
pub mod whatsapp;

pub use traits::Channel;
pub use whatsapp::{
    DispatchError, EvolutionClient, GatewayReply, InboundEvent, MessageData, MessageKey,
    OutboundMessage, SendOptions, WEBHOOK_EVENTS,
};
