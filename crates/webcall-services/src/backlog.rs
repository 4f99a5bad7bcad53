//! Per-callee caller backlog.
//!
//! Waiting callers are queued until they reach the callee once, then
//! dropped. Missed calls are a short history, re-sent on every connect.
//! Both lists are capped; the oldest entries go first.

use dashmap::DashMap;
use std::sync::Arc;
use webcall_core::CallerInfo;

/// Most waiting callers queued per offline callee.
pub const MAX_WAITING: usize = 20;
/// Most missed calls kept per callee.
pub const MAX_MISSED: usize = 10;

#[derive(Clone, Default)]
pub struct Backlog {
    waiting: Arc<DashMap<String, Vec<CallerInfo>>>,
    missed: Arc<DashMap<String, Vec<CallerInfo>>>,
}

fn trim_front(list: &mut Vec<CallerInfo>, cap: usize) {
    if list.len() > cap {
        let excess = list.len() - cap;
        list.drain(..excess);
    }
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waiting caller until it is delivered.
    pub fn add_waiting(&self, callee_id: &str, caller: CallerInfo) {
        let mut list = self.waiting.entry(callee_id.to_string()).or_default();
        list.push(caller);
        trim_front(&mut list, MAX_WAITING);
    }

    /// Remove and return the callee's queued waiting callers.
    pub fn take_waiting(&self, callee_id: &str) -> Vec<CallerInfo> {
        self.waiting
            .remove(callee_id)
            .map(|(_, list)| list)
            .unwrap_or_default()
    }

    /// Put undelivered callers back in front of anything queued since.
    pub fn requeue_waiting(&self, callee_id: &str, mut callers: Vec<CallerInfo>) {
        if callers.is_empty() {
            return;
        }
        let mut list = self.waiting.entry(callee_id.to_string()).or_default();
        callers.append(&mut *list);
        trim_front(&mut callers, MAX_WAITING);
        *list = callers;
    }

    /// Record a missed call. Returns the callee's missed-call history.
    pub fn add_missed(&self, callee_id: &str, caller: CallerInfo) -> Vec<CallerInfo> {
        let mut list = self.missed.entry(callee_id.to_string()).or_default();
        list.push(caller);
        trim_front(&mut list, MAX_MISSED);
        list.clone()
    }

    pub fn waiting(&self, callee_id: &str) -> Vec<CallerInfo> {
        self.waiting
            .get(callee_id)
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    pub fn missed(&self, callee_id: &str) -> Vec<CallerInfo> {
        self.missed
            .get(callee_id)
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}
