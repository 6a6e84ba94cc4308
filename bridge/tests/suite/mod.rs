use std::sync::Mutex;

use async_trait::async_trait;
use epm_bridge::{ActionExtra, AutomationAction, AutomationRunner, BridgeError, BridgeResult};
use serde_json::Value;

mod end_to_end;
mod server;

/// Runner double that records every call and answers from `respond`.
pub(crate) struct RecordingRunner<F>
where
    F: Fn(AutomationAction, &ActionExtra) -> BridgeResult<Value> + Send + Sync,
{
    pub calls: Mutex<Vec<(AutomationAction, ActionExtra)>>,
    respond: F,
}

impl<F> RecordingRunner<F>
where
    F: Fn(AutomationAction, &ActionExtra) -> BridgeResult<Value> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond,
        }
    }

    pub fn calls(&self) -> Vec<(AutomationAction, ActionExtra)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> AutomationRunner for RecordingRunner<F>
where
    F: Fn(AutomationAction, &ActionExtra) -> BridgeResult<Value> + Send + Sync,
{
    async fn run(&self, action: AutomationAction, extra: ActionExtra) -> BridgeResult<Value> {
        let result = (self.respond)(action, &extra);
        self.calls.lock().unwrap().push((action, extra));
        result
    }
}

pub(crate) fn protocol_error(message: &str) -> BridgeError {
    BridgeError::Protocol(message.to_string())
}
