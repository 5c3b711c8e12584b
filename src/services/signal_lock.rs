//! services/signal_lock.rs
//! Lock en memoria para que un mismo handler post-guardado no se ejecute
//! dos veces sobre el mismo objeto en la misma ventana de 5 segundos.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Ancho de la ventana con la que se agrupan ejecuciones cercanas.
const BUCKET_SECS: u64 = 5;

#[derive(Clone, Default)]
pub struct SignalLock {
    // clave -> instante de expiración
    locks: Arc<DashMap<String, Instant>>,
}

/// Mientras viva, la clave queda tomada. Al soltarse se libera el lock.
pub struct SignalGuard {
    key: String,
    lock: SignalLock,
}

impl SignalGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.lock.release(&self.key);
    }
}

impl SignalLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `signal_lock_` + hex(BLAKE3("{signal}_{kind}_{id}[_{user}]_{bucket}")).
    pub fn lock_key(
        signal: &str,
        object_kind: &str,
        object_id: i64,
        user_id: Option<i64>,
        unix_secs: u64,
    ) -> String {
        let mut data = format!("{}_{}_{}", signal, object_kind, object_id);
        if let Some(user) = user_id {
            data.push_str(&format!("_{}", user));
        }
        let bucket = unix_secs / BUCKET_SECS * BUCKET_SECS;
        data.push_str(&format!("_{}", bucket));

        format!("signal_lock_{}", blake3::hash(data.as_bytes()).to_hex())
    }

    /// Add-if-absent atómico. Una entrada vencida cuenta como ausente.
    pub fn acquire(&self, key: &str, ttl: Duration) -> Option<SignalGuard> {
        let now = Instant::now();
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() > now {
                    log::debug!("(acquire) Lock ya existe: {}", key);
                    return None;
                }
                occupied.insert(now + ttl);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now + ttl);
            }
        }
        log::debug!("(acquire) Lock adquirido: {}", key);

        Some(SignalGuard {
            key: key.to_string(),
            lock: self.clone(),
        })
    }

    pub fn release(&self, key: &str) {
        if self.locks.remove(key).is_some() {
            log::debug!("(release) Lock liberado: {}", key);
        }
    }

    /// Calcula la clave con la hora actual e intenta tomarla.
    pub fn guard(
        &self,
        signal: &str,
        object_kind: &str,
        object_id: i64,
        user_id: Option<i64>,
        ttl: Duration,
    ) -> Option<SignalGuard> {
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let key = Self::lock_key(signal, object_kind, object_id, user_id, unix_secs);
        match self.acquire(&key, ttl) {
            Some(guard) => {
                log::debug!("(guard) {} tomado como {}", signal, guard.key());
                Some(guard)
            }
            None => {
                log::warn!(
                    "Signal {} ya en ejecución para {}:{}, saltando...",
                    signal,
                    object_kind,
                    object_id
                );
                None
            }
        }
    }
}
