//! Reflect phase
//!
//! Decides whether another iteration should be attempted. The verdict is
//! always `Continue` until the iteration cap is reached. Along the way the
//! reflector watches for a stalled engine (identical notes repeated, or a
//! run of error-marked iterations) and reports it in the logs.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

/// Maximum number of recent note hashes to keep for repeat detection
const REPEAT_HISTORY_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
pub struct Reflector {
    /// Rolling window of recent note hashes
    recent_note_hashes: VecDeque<u64>,
    consecutive_errors: u32,
}

impl Reflector {
    pub fn new() -> Self {
        Self {
            recent_note_hashes: VecDeque::with_capacity(REPEAT_HISTORY_SIZE),
            consecutive_errors: 0,
        }
    }

    pub fn reflect(
        &mut self,
        step: &str,
        note: &str,
        succeeded: bool,
        iteration: u32,
        max_iterations: u32,
    ) -> Verdict {
        if succeeded {
            self.consecutive_errors = 0;
        } else {
            self.consecutive_errors += 1;
            if self.consecutive_errors > 1 {
                tracing::warn!(
                    "Step {} has failed {} iterations in a row",
                    step,
                    self.consecutive_errors
                );
            }
        }

        if self.detect_repeat(note) {
            tracing::warn!(
                "Step {} iteration {} repeated an earlier response without progress",
                step,
                iteration
            );
        }

        if iteration >= max_iterations {
            Verdict::Stop
        } else {
            Verdict::Continue
        }
    }

    fn detect_repeat(&mut self, note: &str) -> bool {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        note.hash(&mut hasher);
        let hash = hasher.finish();

        let is_repeat = self.recent_note_hashes.contains(&hash);

        if self.recent_note_hashes.len() >= REPEAT_HISTORY_SIZE {
            self.recent_note_hashes.pop_front();
        }
        self.recent_note_hashes.push_back(hash);

        is_repeat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_until_cap() {
        let mut reflector = Reflector::new();
        assert_eq!(reflector.reflect("s", "a", true, 1, 3), Verdict::Continue);
        assert_eq!(reflector.reflect("s", "b", true, 2, 3), Verdict::Continue);
        assert_eq!(reflector.reflect("s", "c", true, 3, 3), Verdict::Stop);
    }

    #[test]
    fn test_failures_do_not_stop_early() {
        let mut reflector = Reflector::new();
        assert_eq!(reflector.reflect("s", "bad", false, 1, 5), Verdict::Continue);
        assert_eq!(reflector.reflect("s", "bad", false, 2, 5), Verdict::Continue);
        assert_eq!(reflector.consecutive_errors, 2);

        reflector.reflect("s", "good", true, 3, 5);
        assert_eq!(reflector.consecutive_errors, 0);
    }

    #[test]
    fn test_detect_repeat() {
        let mut reflector = Reflector::new();
        assert!(!reflector.detect_repeat("same"));
        assert!(reflector.detect_repeat("same"));
        assert!(!reflector.detect_repeat("different"));
    }

    #[test]
    fn test_repeat_window_is_bounded() {
        let mut reflector = Reflector::new();
        reflector.detect_repeat("old");
        for i in 0..REPEAT_HISTORY_SIZE {
            reflector.detect_repeat(&format!("note {}", i));
        }
        assert!(!reflector.detect_repeat("old"));
        assert_eq!(reflector.recent_note_hashes.len(), REPEAT_HISTORY_SIZE);
    }
}
