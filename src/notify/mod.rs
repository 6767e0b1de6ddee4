// Next-approver notification: outbox-style dispatch, idempotent per
// (request, stage) pair, decoupled from the approval transaction.

pub mod dispatcher;
pub mod retry;
pub mod worker;

pub use dispatcher::{
    compose_message, DispatchError, DispatchOutcome, NotificationDispatcher, NotificationIntent,
};
pub use retry::RetryConfig;
pub use worker::{intent_queue, NotificationWorker, DEFAULT_QUEUE_CAPACITY};
