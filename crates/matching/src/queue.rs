// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-`(namespace, task_queue)` priority queue (§4.D).

use chrono::{DateTime, Utc};
use linkflow_core::Task;

/// A queued task plus its lease bookkeeping. `lease_token` is `Some` while a
/// worker holds it; an expired lease is detected lazily on the next poll and
/// the task is treated as pollable again without mutating state up front.
pub(crate) struct QueuedTask {
    pub(crate) task: Task,
    pub(crate) lease_token: Option<String>,
    pub(crate) lease_expires_at: Option<DateTime<Utc>>,
}

impl QueuedTask {
    pub(crate) fn new(task: Task) -> Self {
        Self { task, lease_token: None, lease_expires_at: None }
    }

    pub(crate) fn is_pollable(&self, now: DateTime<Utc>) -> bool {
        if self.task.visible_at > now {
            return false;
        }
        match (&self.lease_token, self.lease_expires_at) {
            (None, _) => true,
            (Some(_), Some(expires)) => expires <= now,
            (Some(_), None) => false,
        }
    }
}

/// A single namespace/task_queue's bounded collection of queued tasks.
///
/// Backed by a plain `Vec` rather than a `BinaryHeap`: tasks must be
/// removable mid-queue by `task_id` on `Complete`/`Fail`, which a heap
/// doesn't support without a parallel index. Capacity is small enough
/// (default 10,000) that a linear scan on poll is not a concern.
#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: Vec<QueuedTask>,
    capacity: usize,
}

impl TaskQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { tasks: Vec::new(), capacity }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn push(&mut self, task: Task) -> bool {
        if self.tasks.len() >= self.capacity {
            return false;
        }
        self.tasks.push(QueuedTask::new(task));
        true
    }

    /// Highest priority first, ties broken by earliest `scheduled_at` (§4.D, P5).
    pub(crate) fn poll(&mut self, now: DateTime<Utc>) -> Option<&mut QueuedTask> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_pollable(now))
            .max_by(|(_, a), (_, b)| {
                a.task
                    .priority
                    .cmp(&b.task.priority)
                    .then_with(|| b.task.scheduled_at.cmp(&a.task.scheduled_at))
            })
            .map(|(i, _)| i)?;
        Some(&mut self.tasks[index])
    }

    pub(crate) fn find_mut(&mut self, task_id: &str) -> Option<&mut QueuedTask> {
        self.tasks.iter_mut().find(|t| t.task.task_id == task_id)
    }

    pub(crate) fn remove(&mut self, task_id: &str) -> Option<QueuedTask> {
        let index = self.tasks.iter().position(|t| t.task.task_id == task_id)?;
        Some(self.tasks.remove(index))
    }
}
