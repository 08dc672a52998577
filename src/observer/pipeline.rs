// Post-commit observer pipeline
//
// Observers run on spawned tasks once the owning transaction has committed.
// A failing or slow observer is logged and dropped; it can never undo or
// fail the request that triggered it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::observer::event::ProjectEvent;
use crate::observer::traits::PostCommitObserver;

#[derive(Clone, Default)]
pub struct ObserverPipeline {
    observers: Vec<Arc<dyn PostCommitObserver>>,
    timeout_override: Option<Duration>,
    // shared between clones so any copy can drain
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ObserverPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every observer at the given deadline instead of its own default
    pub fn with_timeout(mut self, deadline: Duration) -> Self {
        self.timeout_override = Some(deadline);
        self
    }

    pub fn register(&mut self, observer: Arc<dyn PostCommitObserver>) {
        tracing::debug!("Registered observer '{}' for ring {:?}", observer.name(), observer.ring());
        self.observers.push(observer);
        self.observers.sort_by_key(|o| o.ring());
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Fan the event out to every applicable observer and return how many
    /// were started. The caller never waits on them.
    pub fn dispatch(&self, event: ProjectEvent) -> usize {
        let event = Arc::new(event);
        let kind = event.kind();

        let handles: Vec<JoinHandle<()>> = self
            .observers
            .iter()
            .filter(|o| o.applies_to(kind))
            .map(|observer| {
                let observer = Arc::clone(observer);
                let event = Arc::clone(&event);
                let deadline = self.timeout_override.unwrap_or_else(|| observer.timeout());

                tokio::spawn(async move {
                    let name = observer.name();
                    match timeout(deadline, observer.observe(&event)).await {
                        Ok(Ok(())) => {
                            tracing::debug!(
                                observer = name,
                                project_id = event.project_id(),
                                "observer completed"
                            );
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(
                                observer = name,
                                project_id = event.project_id(),
                                error = %e,
                                "observer failed"
                            );
                        }
                        Err(_) => {
                            tracing::warn!(
                                observer = name,
                                project_id = event.project_id(),
                                timeout_ms = deadline.as_millis() as u64,
                                "observer timed out"
                            );
                        }
                    }
                })
            })
            .collect();

        let started = handles.len();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|h| !h.is_finished());
        in_flight.extend(handles);
        started
    }

    /// Wait for every observer started so far; used on shutdown and by the CLI
    pub async fn drain(&self) {
        let handles = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *in_flight)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "observer task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::error::ObserverError;
    use crate::observer::event::EventKind;
    use crate::observer::traits::ObserverRing;
    use crate::types::ProjectStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        seen: Arc<Mutex<Vec<ProjectEvent>>>,
        only: Option<EventKind>,
    }

    #[async_trait]
    impl PostCommitObserver for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn ring(&self) -> ObserverRing {
            ObserverRing::Notification
        }
        fn applies_to(&self, kind: EventKind) -> bool {
            self.only.map_or(true, |k| k == kind)
        }
        async fn observe(&self, event: &ProjectEvent) -> Result<(), ObserverError> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PostCommitObserver for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn ring(&self) -> ObserverRing {
            ObserverRing::Audit
        }
        fn applies_to(&self, _kind: EventKind) -> bool {
            true
        }
        async fn observe(&self, _event: &ProjectEvent) -> Result<(), ObserverError> {
            Err(ObserverError::System("boom".into()))
        }
    }

    struct Slow;

    #[async_trait]
    impl PostCommitObserver for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn ring(&self) -> ObserverRing {
            ObserverRing::Notification
        }
        fn applies_to(&self, _kind: EventKind) -> bool {
            true
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
        async fn observe(&self, _event: &ProjectEvent) -> Result<(), ObserverError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn reviewed() -> ProjectEvent {
        ProjectEvent::Reviewed {
            project_id: 7,
            title: "Demo".into(),
            owner_id: 1,
            reviewer_id: 2,
            old_status: ProjectStatus::Pending,
            new_status: ProjectStatus::Approved,
            comment: None,
        }
    }

    #[tokio::test]
    async fn failures_and_timeouts_do_not_escape() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ObserverPipeline::new();
        pipeline.register(Arc::new(Failing));
        pipeline.register(Arc::new(Slow));
        pipeline.register(Arc::new(Recording { seen: seen.clone(), only: None }));

        assert_eq!(pipeline.dispatch(reviewed()), 3);
        // every task finishes, including the slow one
        pipeline.drain().await;
        assert_eq!(seen.lock().unwrap().as_slice(), &[reviewed()]);
    }

    #[tokio::test]
    async fn observers_only_receive_matching_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ObserverPipeline::new();
        pipeline.register(Arc::new(Recording {
            seen: seen.clone(),
            only: Some(EventKind::Submitted),
        }));

        assert_eq!(pipeline.dispatch(reviewed()), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn audit_ring_sorts_first() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register(Arc::new(Slow));
        pipeline.register(Arc::new(Failing));
        assert_eq!(pipeline.observers[0].ring(), ObserverRing::Audit);
        assert_eq!(pipeline.len(), 2);
    }
}
