//! Output buffering: queued tokens and resumable token sequences

use std::collections::VecDeque;
use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};
use crate::token::Token;

/// Lazy source of output tokens
pub type TokenSource = Box<dyn Iterator<Item = Result<Token>> + Send>;

/// Resumable sequence of output tokens
///
/// Once `Exhausted` the sequence never yields again; it has to be rebuilt
/// from its source to restart. A failing item ends the sequence.
pub enum TokenSequence {
    /// Still able to yield
    Active(TokenSource),
    /// Terminal state
    Exhausted,
}

impl TokenSequence {
    /// Wrap a lazy token source
    pub fn new(source: TokenSource) -> Self {
        TokenSequence::Active(source)
    }

    /// Build a sequence from any sendable iterator
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<Token>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(Box::new(items.into_iter()))
    }

    /// Whether the sequence reached its terminal state
    pub fn is_exhausted(&self) -> bool {
        matches!(self, TokenSequence::Exhausted)
    }

    /// Drop the source and move to `Exhausted`
    pub fn close(&mut self) {
        *self = TokenSequence::Exhausted;
    }
}

impl Iterator for TokenSequence {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self {
            TokenSequence::Active(source) => source.next(),
            TokenSequence::Exhausted => return None,
        };

        match item {
            Some(Ok(token)) => Some(Ok(token)),
            other => {
                self.close();
                other
            }
        }
    }
}

impl fmt::Debug for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSequence::Active(_) => f.write_str("TokenSequence::Active"),
            TokenSequence::Exhausted => f.write_str("TokenSequence::Exhausted"),
        }
    }
}

/// Output side of an actor
///
/// Buffered tokens are handed out first, then the pending sequence. One item
/// of the sequence is prefetched so that [`OutputQueue::has_output`] never
/// promises a token that does not exist. An error coming out of the sequence
/// ends it and is kept until taken with [`OutputQueue::take_error`].
#[derive(Default)]
pub struct OutputQueue {
    tokens: VecDeque<Token>,
    sequence: Option<TokenSequence>,
    error: Option<Error>,
}

impl OutputQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a token
    pub fn push(&mut self, token: Token) {
        self.tokens.push_back(token);
    }

    /// Attach a sequence; it is drained after the buffered tokens
    pub fn set_sequence(&mut self, sequence: TokenSequence) {
        if let Some(mut previous) = self.sequence.replace(sequence) {
            previous.close();
        }
    }

    /// Whether a sequence is still attached
    pub fn has_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    /// Number of tokens ready without touching the sequence
    pub fn buffered(&self) -> usize {
        self.tokens.len()
    }

    /// Whether another token is available
    pub fn has_output(&mut self) -> bool {
        if !self.tokens.is_empty() {
            return true;
        }

        let Some(sequence) = self.sequence.as_mut() else {
            return false;
        };

        match sequence.next() {
            Some(Ok(token)) => {
                self.tokens.push_back(token);
                true
            }
            Some(Err(e)) => {
                warn!(error = %e, "token sequence ended with an error");
                self.error = Some(e);
                self.sequence = None;
                false
            }
            None => {
                self.sequence = None;
                false
            }
        }
    }

    /// Next token, if any
    pub fn pop(&mut self) -> Option<Token> {
        if self.has_output() {
            self.tokens.pop_front()
        } else {
            None
        }
    }

    /// Error that ended the last sequence, if any
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Drop buffered tokens, the pending error, and close the sequence
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.error = None;
        if let Some(mut sequence) = self.sequence.take() {
            sequence.close();
        }
    }
}

impl fmt::Debug for OutputQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputQueue")
            .field("buffered", &self.tokens.len())
            .field("sequence", &self.sequence)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: i64) -> TokenSequence {
        TokenSequence::from_items((0..n).map(|i| Ok(Token::new(i))))
    }

    #[test]
    fn test_sequence_exhausts() {
        let mut seq = numbers(2);
        assert!(seq.next().is_some());
        assert!(seq.next().is_some());
        assert!(seq.next().is_none());
        assert!(seq.is_exhausted());
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_queue_drains_buffer_before_sequence() {
        let mut queue = OutputQueue::new();
        queue.push(Token::new("first"));
        queue.set_sequence(numbers(2));

        assert_eq!(queue.pop().unwrap().payload().as_text(), Some("first"));
        assert_eq!(queue.pop().unwrap().payload().as_i64(), Some(0));
        assert!(queue.has_output());
        assert_eq!(queue.pop().unwrap().payload().as_i64(), Some(1));
        assert!(!queue.has_output());
        assert!(!queue.has_sequence());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_has_output_is_idempotent() {
        let mut queue = OutputQueue::new();
        queue.set_sequence(numbers(1));
        assert!(queue.has_output());
        assert!(queue.has_output());
        assert_eq!(queue.buffered(), 1);
    }

    #[test]
    fn test_sequence_error_is_kept() {
        let mut queue = OutputQueue::new();
        queue.set_sequence(TokenSequence::from_items(vec![
            Ok(Token::new(1_i64)),
            Err(Error::Dataset("broken row".into())),
            Ok(Token::new(2_i64)),
        ]));

        assert!(queue.pop().is_some());
        assert!(!queue.has_output());
        assert!(matches!(queue.take_error(), Some(Error::Dataset(_))));
        assert!(queue.take_error().is_none());
    }

    #[test]
    fn test_clear_closes_sequence() {
        let mut queue = OutputQueue::new();
        queue.push(Token::new(true));
        queue.set_sequence(numbers(100));
        queue.clear();
        assert!(!queue.has_output());
        queue.clear();
    }

    #[test]
    fn test_clear_drops_sequence_error() {
        let mut queue = OutputQueue::new();
        queue.set_sequence(TokenSequence::from_items(vec![Err(Error::Dataset("broken row".into()))]));
        assert!(!queue.has_output());
        queue.clear();
        assert!(queue.take_error().is_none());
    }
}
