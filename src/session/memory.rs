use super::{SessionStore, StoredCredential};

#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    credential: StoredCredential,
}

impl MemorySessionStore {
    pub fn from_credential(credential: StoredCredential) -> Self {
        Self { credential }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, token: &str, expiry_ms: i64) {
        self.credential = StoredCredential {
            token: Some(token.to_string()),
            expiry: Some(expiry_ms.to_string()),
        };
    }

    fn read(&self) -> StoredCredential {
        self.credential.clone()
    }

    fn clear(&mut self) {
        self.credential = StoredCredential::default();
    }
}
