use crate::api::ApiError;
use std::future::Future;
use tokio::sync::mpsc;

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Nothing submitted, or reset since the last result
  Idle,
  /// Request in flight
  Pending,
  /// Last submission succeeded
  Success(T),
  /// Last submission failed
  Error(ApiError),
}

/// A single write operation with its result, polled from the event loop.
///
/// Cache side effects of a successful write (invalidation, direct writes)
/// belong inside the submitted future so they happen as soon as the server
/// answers; view-local effects (clearing a form) happen when `poll` reports
/// the result.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn data(&self) -> Option<&T> {
    match &self.state {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// True when a result or error is being shown
  pub fn is_settled(&self) -> bool {
    matches!(
      self.state,
      MutationState::Success(_) | MutationState::Error(_)
    )
  }

  /// Submit a write. Ignored while a previous submission is still pending.
  ///
  /// Returns whether the write was started.
  pub fn mutate<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the mutation may have been reset
      let _ = tx.send(result);
    });
    true
  }

  /// Poll for the result of a pending write.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.state = match result {
          Ok(data) => MutationState::Success(data),
          Err(error) => MutationState::Error(error),
        };
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error(ApiError::Transport("request was dropped".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  /// Forget the last result or error. A pending write keeps running but its
  /// result is discarded.
  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }
}
