use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// The bearer token currently used to sign outgoing requests.
///
/// Clones share the same slot. The session coordinator writes it, the API
/// client reads it for every request (and clears it when the base URL turns
/// out to be unusable). Writes replace the whole value under the lock, so a
/// reader sees either the old token or the new one.
#[derive(Clone, Default)]
pub struct ActiveToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl ActiveToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for ActiveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_active() { "<redacted>" } else { "<none>" };
        f.debug_struct("ActiveToken").field("token", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = ActiveToken::new();
        let reader = token.clone();
        assert!(!reader.is_active());

        token.set("abc");
        assert_eq!(reader.get().as_deref(), Some("abc"));

        reader.clear();
        assert_eq!(token.get(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = ActiveToken::new();
        token.set("super-secret");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_concurrent_readers_see_whole_tokens() {
        let token = ActiveToken::new();
        let writer = token.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                if i % 2 == 0 {
                    writer.set("token-aaaaaaaa");
                } else {
                    writer.set("token-bbbbbbbb");
                }
            }
        });
        for _ in 0..1000 {
            if let Some(seen) = token.get() {
                assert!(seen == "token-aaaaaaaa" || seen == "token-bbbbbbbb");
            }
        }
        handle.join().unwrap();
    }
}
