use crate::datasources::{GenerationOptions, GenerativeBackend};
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::time::Duration;

/// Consecutive primary failures before requests skip primary entirely.
pub const FAILOVER_THRESHOLD: u32 = 2;

/// Hard deadline for any single backend call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackend {
    Primary,
    Secondary,
}

/// Failover wrapper around two generative backends.
///
/// State machine: requests go to the active backend; a failed primary call
/// falls through to the secondary within the same request, and a successful
/// secondary call promotes it to active for the rest of the process (sticky,
/// never auto-reverted). Once `FAILOVER_THRESHOLD` consecutive failures
/// accumulate while primary is active, primary is skipped pre-emptively.
///
/// `generate` never returns an error; total failure yields an empty string
/// so enrichment stays invisible to the caller's fallback text. The counters
/// are atomic but races between concurrent requests are tolerated; this is a
/// fast-fail heuristic, not a correctness invariant.
pub struct ResilientTextGenerator {
    primary: Box<dyn GenerativeBackend>,
    secondary: Option<Box<dyn GenerativeBackend>>,
    active: AtomicU8,
    consecutive_failures: AtomicU32,
    deadline: Duration,
}

impl ResilientTextGenerator {
    pub fn new(
        primary: Box<dyn GenerativeBackend>,
        secondary: Option<Box<dyn GenerativeBackend>>,
    ) -> Self {
        Self::with_deadline(primary, secondary, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(
        primary: Box<dyn GenerativeBackend>,
        secondary: Option<Box<dyn GenerativeBackend>>,
        deadline: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            active: AtomicU8::new(0),
            consecutive_failures: AtomicU32::new(0),
            deadline,
        }
    }

    pub fn active_backend(&self) -> ActiveBackend {
        if self.active.load(Ordering::Relaxed) == 0 {
            ActiveBackend::Primary
        } else {
            ActiveBackend::Secondary
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Generate text, failing over as needed. Empty string on total failure.
    pub async fn generate(&self, prompt: &str, opts: &GenerationOptions) -> String {
        let active = self.active_backend();

        // Pre-emptive failover: primary has burned its chances, go straight
        // to the secondary. The counter is left untouched either way.
        if active == ActiveBackend::Primary && self.consecutive_failures() >= FAILOVER_THRESHOLD {
            if let Some(secondary) = &self.secondary {
                return match self.call(secondary.as_ref(), prompt, opts).await {
                    Ok(text) => {
                        self.consecutive_failures.store(0, Ordering::Relaxed);
                        self.promote_secondary();
                        text
                    }
                    Err(reason) => {
                        tracing::warn!(backend = secondary.name(), %reason, "secondary failed");
                        String::new()
                    }
                };
            }
        }

        let backend: &dyn GenerativeBackend = match active {
            ActiveBackend::Primary => self.primary.as_ref(),
            ActiveBackend::Secondary => self
                .secondary
                .as_deref()
                .unwrap_or(self.primary.as_ref()),
        };

        match self.call(backend, prompt, opts).await {
            Ok(text) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                text
            }
            Err(reason) => {
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(backend = backend.name(), %reason, "generation failed");

                // Failed primary falls through to secondary within the same
                // request instead of surfacing the error.
                if active == ActiveBackend::Primary {
                    if let Some(secondary) = &self.secondary {
                        match self.call(secondary.as_ref(), prompt, opts).await {
                            Ok(text) => {
                                self.consecutive_failures.store(0, Ordering::Relaxed);
                                self.promote_secondary();
                                return text;
                            }
                            Err(reason) => {
                                tracing::warn!(
                                    backend = secondary.name(),
                                    %reason,
                                    "secondary also failed"
                                );
                            }
                        }
                    }
                }
                String::new()
            }
        }
    }

    async fn call(
        &self,
        backend: &dyn GenerativeBackend,
        prompt: &str,
        opts: &GenerationOptions,
    ) -> std::result::Result<String, String> {
        match tokio::time::timeout(self.deadline, backend.generate(prompt, opts)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("deadline of {:?} exceeded", self.deadline)),
        }
    }

    fn promote_secondary(&self) {
        if self.active.swap(1, Ordering::Relaxed) == 0 {
            tracing::info!("promoted secondary generation backend (sticky)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FarmWatchError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    struct ScriptedBackend {
        name: String,
        reply: String,
        behavior: Arc<Mutex<Behavior>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedBackend {
        fn new(name: &str, reply: &str, behavior: Behavior) -> (Self, Arc<Mutex<Behavior>>, Arc<AtomicUsize>) {
            let behavior = Arc::new(Mutex::new(behavior));
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name: name.to_string(),
                    reply: reply.to_string(),
                    behavior: behavior.clone(),
                    calls: calls.clone(),
                },
                behavior,
                calls,
            )
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(&self, _prompt: &str, _opts: &GenerationOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let behavior = *self.behavior.lock().unwrap();
            match behavior {
                Behavior::Succeed => Ok(self.reply.clone()),
                Behavior::Fail => Err(FarmWatchError::DataSourceUnavailable(
                    "simulated outage".to_string(),
                )),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(self.reply.clone())
                }
            }
        }
    }

    fn opts() -> GenerationOptions {
        GenerationOptions::default()
    }

    #[tokio::test]
    async fn healthy_primary_serves_requests() {
        let (primary, _, primary_calls) = ScriptedBackend::new("p", "from primary", Behavior::Succeed);
        let (secondary, _, secondary_calls) =
            ScriptedBackend::new("s", "from secondary", Behavior::Succeed);
        let client = ResilientTextGenerator::new(Box::new(primary), Some(Box::new(secondary)));

        let text = client.generate("hello", &opts()).await;
        assert_eq!(text, "from primary");
        assert_eq!(client.active_backend(), ActiveBackend::Primary);
        assert_eq!(client.consecutive_failures(), 0);
        assert_eq!(primary_calls.load(Ordering::Relaxed), 1);
        assert_eq!(secondary_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn failed_primary_falls_through_and_promotes_secondary() {
        let (primary, _, primary_calls) = ScriptedBackend::new("p", "", Behavior::Fail);
        let (secondary, _, _) = ScriptedBackend::new("s", "rescued", Behavior::Succeed);
        let client = ResilientTextGenerator::new(Box::new(primary), Some(Box::new(secondary)));

        let text = client.generate("hello", &opts()).await;
        assert_eq!(text, "rescued");
        // Sticky promotion
        assert_eq!(client.active_backend(), ActiveBackend::Secondary);
        assert_eq!(client.consecutive_failures(), 0);

        // Subsequent requests never touch primary again
        let calls_before = primary_calls.load(Ordering::Relaxed);
        let text = client.generate("again", &opts()).await;
        assert_eq!(text, "rescued");
        assert_eq!(primary_calls.load(Ordering::Relaxed), calls_before);
    }

    #[tokio::test]
    async fn preemptive_failover_skips_primary_after_threshold() {
        let (primary, _, primary_calls) = ScriptedBackend::new("p", "", Behavior::Fail);
        let (secondary, secondary_behavior, _) = ScriptedBackend::new("s", "late rescue", Behavior::Fail);
        let client = ResilientTextGenerator::new(Box::new(primary), Some(Box::new(secondary)));

        // Two requests where both backends fail: counter reaches 2, primary
        // stays active because the secondary never succeeded.
        for _ in 0..2 {
            assert_eq!(client.generate("x", &opts()).await, "");
        }
        assert_eq!(client.consecutive_failures(), FAILOVER_THRESHOLD);
        assert_eq!(client.active_backend(), ActiveBackend::Primary);

        // Third request must not attempt primary at all.
        *secondary_behavior.lock().unwrap() = Behavior::Succeed;
        let calls_before = primary_calls.load(Ordering::Relaxed);
        let text = client.generate("x", &opts()).await;
        assert_eq!(text, "late rescue");
        assert_eq!(primary_calls.load(Ordering::Relaxed), calls_before);
        assert_eq!(client.active_backend(), ActiveBackend::Secondary);
        assert_eq!(client.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn total_failure_yields_empty_string() {
        let (primary, _, _) = ScriptedBackend::new("p", "", Behavior::Fail);
        let (secondary, _, _) = ScriptedBackend::new("s", "", Behavior::Fail);
        let client = ResilientTextGenerator::new(Box::new(primary), Some(Box::new(secondary)));

        assert_eq!(client.generate("x", &opts()).await, "");
        assert_eq!(client.consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn no_secondary_configured_fails_soft() {
        let (primary, _, _) = ScriptedBackend::new("p", "", Behavior::Fail);
        let client = ResilientTextGenerator::new(Box::new(primary), None);

        for expected_failures in 1..=3u32 {
            assert_eq!(client.generate("x", &opts()).await, "");
            assert_eq!(client.consecutive_failures(), expected_failures);
        }
        assert_eq!(client.active_backend(), ActiveBackend::Primary);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_hits_deadline_and_fails_over() {
        let (primary, _, _) = ScriptedBackend::new("p", "", Behavior::Hang);
        let (secondary, _, _) = ScriptedBackend::new("s", "rescued", Behavior::Succeed);
        let client = ResilientTextGenerator::with_deadline(
            Box::new(primary),
            Some(Box::new(secondary)),
            Duration::from_secs(30),
        );

        let text = client.generate("x", &opts()).await;
        assert_eq!(text, "rescued");
        assert_eq!(client.active_backend(), ActiveBackend::Secondary);
    }
}
