//! `domains:queue` — the FIFO of domain identifiers eligible for fetching,
//! paired with the `domains:in_queue` set used to avoid enqueuing a domain
//! twice.
//!
//! Both operations below are single `EVAL`s so the set-membership check and
//! the list push/pop stay atomic against concurrent fetch workers.

use redis::aio::ConnectionManager;
use redis::RedisError;
use thiserror::Error;

const QUEUE_KEY: &str = "domains:queue";
const IN_QUEUE_KEY: &str = "domains:in_queue";

#[derive(Debug, Error)]
pub enum ReadyQueueError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

#[derive(Clone)]
pub struct ReadyQueue {
    redis: ConnectionManager,
}

impl ReadyQueue {
    pub fn new(redis: ConnectionManager) -> Self {
        ReadyQueue { redis }
    }

    /// Push `domain` to the tail iff it is not already queued. Returns true
    /// if this call enqueued it.
    pub async fn push_if_absent(&self, domain: &str) -> Result<bool, ReadyQueueError> {
        static SCRIPT: once_script::OnceScript = once_script::OnceScript::new(
            r#"
            local added = redis.call('SADD', KEYS[2], ARGV[1])
            if added == 1 then
                redis.call('RPUSH', KEYS[1], ARGV[1])
            end
            return added
            "#,
        );
        let mut conn = self.redis.clone();
        let added: i64 = SCRIPT
            .get()
            .key(QUEUE_KEY)
            .key(IN_QUEUE_KEY)
            .arg(domain)
            .invoke_async(&mut conn)
            .await?;
        Ok(added == 1)
    }

    /// Atomically pop the head of the queue and drop it from the membership
    /// set (the domain is now "claimed", not merely queued).
    pub async fn pop(&self) -> Result<Option<String>, ReadyQueueError> {
        static SCRIPT: once_script::OnceScript = once_script::OnceScript::new(
            r#"
            local d = redis.call('LPOP', KEYS[1])
            if d then
                redis.call('SREM', KEYS[2], d)
            end
            return d
            "#,
        );
        let mut conn = self.redis.clone();
        let domain: Option<String> = SCRIPT
            .get()
            .key(QUEUE_KEY)
            .key(IN_QUEUE_KEY)
            .invoke_async(&mut conn)
            .await?;
        Ok(domain)
    }
}

/// Lazily-built `redis::Script`, avoiding recompiling the Lua source on every
/// call while keeping the script text colocated with the method that uses it.
mod once_script {
    use redis::Script;
    use std::sync::OnceLock;

    pub struct OnceScript {
        source: &'static str,
        cell: OnceLock<Script>,
    }

    impl OnceScript {
        pub const fn new(source: &'static str) -> Self {
            OnceScript {
                source,
                cell: OnceLock::new(),
            }
        }

        pub fn get(&self) -> &Script {
            self.cell.get_or_init(|| Script::new(self.source))
        }
    }
}
