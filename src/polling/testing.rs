//! Scripted in-memory `UpdateSource` for exercising the polling code.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::UpdateSource;
use crate::error::{Error, Result};
use crate::telegram::Update;

/// What a fetch does once the scripted batches run out.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WhenDrained {
    Empty,
    Fail,
    Hang,
}

pub(crate) struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<Update>>>,
    when_drained: WhenDrained,
    fail_delete: bool,
    pub calls: Mutex<Vec<(i64, i64, Option<u32>)>>,
    pub deletes: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<Update>>, when_drained: WhenDrained) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            when_drained,
            fail_delete: false,
            calls: Mutex::new(Vec::new()),
            deletes: Mutex::new(0),
        }
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.calls.lock().unwrap().iter().map(|(offset, _, _)| *offset).collect()
    }

    pub fn delete_count(&self) -> usize {
        *self.deletes.lock().unwrap()
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn delete_webhook(&self) -> Result<()> {
        *self.deletes.lock().unwrap() += 1;
        if self.fail_delete {
            return Err(Error::Api {
                method: "deleteWebhook".to_string(),
                description: "Unauthorized".to_string(),
            });
        }
        Ok(())
    }

    async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: Option<u32>) -> Result<Vec<Update>> {
        self.calls.lock().unwrap().push((offset, timeout_secs, limit));

        let next = self.batches.lock().unwrap().pop_front();
        match (next, self.when_drained) {
            (Some(batch), _) => Ok(batch),
            (None, WhenDrained::Empty) => Ok(Vec::new()),
            (None, WhenDrained::Fail) => Err(Error::Api {
                method: "getUpdates".to_string(),
                description: "script exhausted".to_string(),
            }),
            (None, WhenDrained::Hang) => std::future::pending().await,
        }
    }
}

/// Minimal update record with the given id.
pub(crate) fn update(id: i64) -> Update {
    Update::new(id, format!(r#"{{"update_id":{}}}"#, id))
}

pub(crate) fn updates(ids: &[i64]) -> Vec<Update> {
    ids.iter().copied().map(update).collect()
}
