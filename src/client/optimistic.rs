//! Optimistic local state with explicit server reconciliation.
//!
//! A value is changed locally right away and marked pending; the server's
//! answer either confirms it (adopting the server's copy) or rejects it, in
//! which case the last confirmed value comes back.

use std::{fmt::Display, future::Future};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Confirmed,
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    confirmed: T,
    current: T,
    state: Confirmation,
}

impl<T: Clone> Optimistic<T> {
    /// Start from a value known to match the server.
    pub fn new(value: T) -> Self {
        Self {
            current: value.clone(),
            confirmed: value,
            state: Confirmation::Confirmed,
        }
    }

    /// What the UI should show right now.
    pub fn value(&self) -> &T {
        &self.current
    }

    pub fn confirmed_value(&self) -> &T {
        &self.confirmed
    }

    pub fn state(&self) -> &Confirmation {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == Confirmation::Pending
    }

    pub fn propose(&mut self, value: T) {
        self.current = value;
        self.state = Confirmation::Pending;
    }

    pub fn confirm(&mut self, server_value: T) {
        self.confirmed = server_value.clone();
        self.current = server_value;
        self.state = Confirmation::Confirmed;
    }

    pub fn reject(&mut self, reason: impl Into<String>) {
        self.current = self.confirmed.clone();
        self.state = Confirmation::Rejected(reason.into());
    }

    /// Propose `value`, run `call`, then confirm with its result or roll back.
    pub async fn apply<F, Fut, E>(&mut self, value: T, call: F) -> Result<&T, E>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.propose(value.clone());
        match call(value).await {
            Ok(server_value) => {
                self.confirm(server_value);
                Ok(&self.current)
            }
            Err(err) => {
                self.reject(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn confirm_adopts_server_value() {
        let mut flag = Optimistic::new(false);
        let result = flag.apply(true, |v| async move { Ok::<_, String>(v) }).await;
        assert_eq!(result, Ok(&true));
        assert_eq!(flag.state(), &Confirmation::Confirmed);
        assert!(*flag.confirmed_value());
    }

    #[tokio::test]
    async fn rejection_rolls_back() {
        let mut flag = Optimistic::new(true);
        let err = flag
            .apply(false, |_| async { Err::<bool, _>("server said no".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "server said no");
        assert!(*flag.value());
        assert_eq!(flag.state(), &Confirmation::Rejected("server said no".into()));
    }

    #[test]
    fn propose_marks_pending() {
        let mut count = Optimistic::new(1);
        count.propose(2);
        assert!(count.is_pending());
        assert_eq!(*count.value(), 2);
        assert_eq!(*count.confirmed_value(), 1);
    }
}
