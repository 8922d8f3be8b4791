use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::UserId;

/// Errors that can occur when dispatching a task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task queue is closed")]
    QueueClosed,

    #[error("Task handler failed: {0}")]
    HandlerFailed(String),
}

/// Review written on a completed exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub exchange_id: i64,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub rating: u8,
}

/// Fire-and-forget work performed after a request has been answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Recompute a user's aggregated rating from their reviews
    RecomputeRating { user_id: UserId },
    /// Tell the reviewee about a new review
    ReviewNotification { review: ReviewEvent },
}

/// Performs dispatched tasks; implemented by the host application
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: Task) -> Result<(), TaskError>;
}

/// Sending half of the side-effect queue
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a task without waiting for it to run
    pub fn dispatch(&self, task: Task) -> Result<(), TaskError> {
        tracing::debug!("Dispatching task: {:?}", task);
        self.sender.send(task).map_err(|_| TaskError::QueueClosed)
    }
}

/// Drain the queue on a background task until every sender is dropped
///
/// Handler failures are logged and the worker moves on to the next task.
pub fn spawn_worker(
    mut receiver: mpsc::UnboundedReceiver<Task>,
    handler: Arc<dyn TaskHandler>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut handled = 0;
        while let Some(task) = receiver.recv().await {
            match handler.handle(task.clone()).await {
                Ok(()) => handled += 1,
                Err(e) => tracing::warn!("Task {:?} failed: {}", task, e),
            }
        }
        tracing::debug!("Task worker stopped after {} tasks", handled);
        handled
    })
}

/// Aggregated rating data recomputed from a user's reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: usize,
    /// Number of 1..=5 star reviews, index 0 holding 1-star reviews
    pub histogram: [usize; 5],
}

impl RatingSummary {
    /// Summarize 1-5 star ratings; `None` when there are no valid ratings
    pub fn from_ratings(ratings: &[u8]) -> Option<Self> {
        let mut histogram = [0usize; 5];
        let mut sum = 0u64;
        let mut total = 0usize;

        for &rating in ratings.iter().filter(|r| (1..=5).contains(*r)) {
            histogram[(rating - 1) as usize] += 1;
            sum += rating as u64;
            total += 1;
        }

        if total == 0 {
            return None;
        }

        Some(Self {
            average_rating: sum as f64 / total as f64,
            total_reviews: total,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<Task>>,
    }

    #[async_trait]
    impl TaskHandler for RecordingHandler {
        async fn handle(&self, task: Task) -> Result<(), TaskError> {
            if let Task::RecomputeRating { user_id } = &task {
                if *user_id < 0 {
                    return Err(TaskError::HandlerFailed("invalid user".into()));
                }
            }
            self.seen.lock().await.push(task);
            Ok(())
        }
    }

    #[test]
    fn test_rating_summary() {
        let summary = RatingSummary::from_ratings(&[5, 4, 4, 1]).unwrap();

        assert_eq!(summary.total_reviews, 4);
        assert!((summary.average_rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(summary.histogram, [1, 0, 0, 2, 1]);
    }

    #[test]
    fn test_rating_summary_ignores_out_of_range() {
        assert_eq!(RatingSummary::from_ratings(&[]), None);
        assert_eq!(RatingSummary::from_ratings(&[0, 6]), None);

        let summary = RatingSummary::from_ratings(&[0, 3]).unwrap();
        assert_eq!(summary.total_reviews, 1);
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let handler = Arc::new(RecordingHandler::default());
        let (queue, receiver) = TaskQueue::new();
        let worker = spawn_worker(receiver, handler.clone());

        queue.dispatch(Task::RecomputeRating { user_id: 4 }).unwrap();
        queue.dispatch(Task::RecomputeRating { user_id: -1 }).unwrap();
        queue
            .dispatch(Task::ReviewNotification {
                review: ReviewEvent { exchange_id: 1, reviewer_id: 2, reviewee_id: 4, rating: 5 },
            })
            .unwrap();
        drop(queue);

        let handled = worker.await.unwrap();
        assert_eq!(handled, 2);
        assert_eq!(handler.seen.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_after_worker_gone_fails() {
        let (queue, receiver) = TaskQueue::new();
        drop(receiver);

        let result = queue.dispatch(Task::RecomputeRating { user_id: 1 });
        assert!(matches!(result, Err(TaskError::QueueClosed)));
    }
}
