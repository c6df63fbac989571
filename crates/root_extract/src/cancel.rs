//! Cooperative cancellation shared between a caller and a running extraction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag.
///
/// Long-running stages check it at phase boundaries, and the path search
/// polls it periodically. Cancelling is sticky until [`CancelToken::reset`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Request cancellation. Every clone observes it.
  pub fn cancel(&self) {
    self.flag.store(true, Ordering::Release);
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::Acquire)
  }

  /// Clear the flag so the token can drive another run.
  pub fn reset(&self) {
    self.flag.store(false, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clones_share_state() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(!other.is_cancelled());
    token.cancel();
    assert!(other.is_cancelled());
    other.reset();
    assert!(!token.is_cancelled());
  }

  #[test]
  fn test_cancel_across_threads() {
    let token = CancelToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();
    assert!(token.is_cancelled());
  }
}
