//! Persistence orchestrator: drives one object from the raw zone to its
//! destination bucket.
//!
//! ```text
//! Received → CheckedIdempotency → Read → Transformed → Classified → Routed
//!          → Written → Tagged → (Held) → MarkedProcessed → Done
//! ```
//!
//! Guard errors, read failures and write failures abort the run. Tagging,
//! legal hold and marking are best-effort: a failure is logged and recorded in
//! the outcome, and the run continues. Nothing is rolled back. A redelivered
//! event redoes whatever the processed marker does not cover, so a destination
//! write may repeat (at-least-once).

use crate::storage::{LegalHold, StorageSessions, StoreError};

use super::classify;
use super::error::PipelineError;
use super::idempotency;
use super::routing::BucketRouter;
use super::transform;
use super::types::{
    ClassificationVerdict, Disposition, IngestEvent, PipelineOutcome, PipelineState,
    RoutingDecision, StepFailure,
};

/// Runs the classify/route/tag process for one event.
///
/// Stateless across runs: the store is the system of record.
pub struct PersistenceOrchestrator {
    router: BucketRouter,
}

/// Accumulates the report while a run progresses.
struct RunTracker {
    event: IngestEvent,
    states: Vec<PipelineState>,
    verdict: Option<ClassificationVerdict>,
    routing: Option<RoutingDecision>,
    step_failures: Vec<StepFailure>,
}

impl RunTracker {
    fn new(event: &IngestEvent) -> Self {
        Self {
            event: event.clone(),
            states: vec![PipelineState::Received],
            verdict: None,
            routing: None,
            step_failures: Vec::new(),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::trace!(state = state.as_str(), "Pipeline state");
        self.states.push(state);
    }

    /// Record a best-effort failure and keep going.
    fn step_failed(&mut self, step: PipelineState, bucket: &str, error: StoreError) {
        tracing::error!(
            step = step.as_str(),
            bucket,
            key = %self.event.object_key,
            error = %error,
            "Pipeline step failed, continuing"
        );
        self.step_failures.push(StepFailure { step, error });
    }

    fn finish(self, disposition: Disposition) -> PipelineOutcome {
        let mut states = self.states;
        match disposition {
            Disposition::Aborted(_) => states.push(PipelineState::Aborted),
            Disposition::Routed | Disposition::AlreadyProcessed => {
                states.push(PipelineState::Done)
            }
        }
        PipelineOutcome {
            event: self.event,
            states,
            disposition,
            verdict: self.verdict,
            routing: self.routing,
            step_failures: self.step_failures,
        }
    }

    fn abort(self, at: PipelineState, error: PipelineError) -> PipelineOutcome {
        tracing::error!(
            step = at.as_str(),
            bucket = %self.event.source_bucket,
            key = %self.event.object_key,
            error = %error,
            "Pipeline aborted"
        );
        self.finish(Disposition::Aborted(error))
    }
}

impl PersistenceOrchestrator {
    pub fn new(router: BucketRouter) -> Self {
        Self { router }
    }

    /// Process one event. Never returns an error: storage failures are folded
    /// into the outcome's disposition and step failures.
    pub fn run(&self, event: &IngestEvent, sessions: &StorageSessions) -> PipelineOutcome {
        let bucket = event.source_bucket.as_str();
        let key = event.object_key.as_str();
        let mut run = RunTracker::new(event);

        // 1. Idempotency
        match idempotency::is_processed(sessions.source.as_ref(), bucket, key) {
            Ok(true) => {
                tracing::info!(bucket, key, "Skipping processed object");
                run.enter(PipelineState::CheckedIdempotency);
                return run.finish(Disposition::AlreadyProcessed);
            }
            Ok(false) => run.enter(PipelineState::CheckedIdempotency),
            Err(e) => {
                return run.abort(
                    PipelineState::CheckedIdempotency,
                    PipelineError::IdempotencyCheck(e),
                )
            }
        }

        // 2. Read
        let raw = match sessions.source.get_object(bucket, key) {
            Ok(bytes) => bytes,
            Err(e) => return run.abort(PipelineState::Read, PipelineError::Read(e)),
        };
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                return run.abort(
                    PipelineState::Read,
                    PipelineError::Decode {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        reason: e.utf8_error().to_string(),
                    },
                )
            }
        };
        run.enter(PipelineState::Read);

        // 3. Transform
        let payload = transform::transform(&text, key);
        run.enter(PipelineState::Transformed);

        // 4. Classify the payload that will actually be written
        let verdict = classify::classify(&payload);
        run.verdict = Some(verdict);
        run.enter(PipelineState::Classified);

        // 5. Route
        let decision = self.router.route(&verdict);
        tracing::info!(
            bucket,
            key,
            destination = %decision.destination_bucket,
            classification = decision.classification.as_str(),
            sensitive_kind = verdict.sensitive_kind.map(|k| k.as_str()),
            legal_flag = verdict.has_legal_flag,
            "Routing object"
        );
        run.routing = Some(decision.clone());
        run.enter(PipelineState::Routed);

        // 6. Write, same key, destination credentials
        if let Err(e) = sessions.destination.put_object(
            &decision.destination_bucket,
            key,
            payload.into_bytes(),
        ) {
            return run.abort(PipelineState::Written, PipelineError::Write(e));
        }
        run.enter(PipelineState::Written);

        // 7. Classification tag on the destination object
        let classification = decision.classification.object_tag();
        match sessions.destination.put_tags(
            &decision.destination_bucket,
            key,
            std::slice::from_ref(&classification),
        ) {
            Ok(()) => tracing::info!(
                bucket = %decision.destination_bucket,
                key,
                classification = decision.classification.as_str(),
                "Destination object tagged"
            ),
            Err(e) => run.step_failed(PipelineState::Tagged, &decision.destination_bucket, e),
        }
        run.enter(PipelineState::Tagged);

        // 8. Legal hold on the source, at most once
        if verdict.has_legal_flag {
            self.apply_legal_hold(sessions, &mut run, bucket, key);
            run.enter(PipelineState::Held);
        }

        // 9. Processed marker on the source
        match idempotency::mark_processed(sessions.source.as_ref(), bucket, key) {
            Ok(()) => tracing::info!(bucket, key, "Object tagged as processed"),
            Err(e) => run.step_failed(PipelineState::MarkedProcessed, bucket, e),
        }
        run.enter(PipelineState::MarkedProcessed);

        run.finish(Disposition::Routed)
    }

    fn apply_legal_hold(
        &self,
        sessions: &StorageSessions,
        run: &mut RunTracker,
        bucket: &str,
        key: &str,
    ) {
        match sessions.source.legal_hold(bucket, key) {
            Ok(LegalHold::On) => {
                tracing::debug!(bucket, key, "Legal hold already active");
                return;
            }
            Ok(LegalHold::Off) => {}
            // Setting the hold is idempotent, so an unreadable status falls through.
            Err(e) => tracing::warn!(bucket, key, error = %e, "Cannot read legal hold status"),
        }

        match sessions.source.set_legal_hold(bucket, key, LegalHold::On) {
            Ok(()) => tracing::info!(bucket, key, "Legal hold enabled due to legal flag"),
            Err(e) => run.step_failed(PipelineState::Held, bucket, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketConfig;
    use crate::pipeline::types::ClassificationTag;
    use crate::storage::memory::StoredObject;
    use crate::storage::{MemoryObjectStore, ObjectTag, StoreOperation};

    const RAW: &str = "raw";
    const KEY: &str = "shop2_20240101.csv";

    fn orchestrator() -> PersistenceOrchestrator {
        PersistenceOrchestrator::new(BucketRouter::new(BucketConfig::default()))
    }

    fn sessions(store: &MemoryObjectStore) -> StorageSessions {
        StorageSessions {
            source: Box::new(store.clone()),
            destination: Box::new(store.clone()),
        }
    }

    fn event() -> IngestEvent {
        IngestEvent::new(RAW, KEY)
    }

    fn seeded(body: &str) -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        store.insert(RAW, KEY, body);
        store
    }

    #[test]
    fn clean_file_routes_to_anonymized() {
        let store = seeded("apple,red\r\npear,green\r\n");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.is_complete());
        assert!(outcome.step_failures.is_empty());
        assert_eq!(
            outcome.routing.as_ref().unwrap().classification,
            ClassificationTag::Anonymized
        );

        let written = store.object("anonymized", KEY).unwrap();
        assert_eq!(written.body_text(), "shop2,apple,red\nshop2,pear,green\n");
        assert_eq!(written.tag("DataClassification"), Some("ANONYMIZED"));

        let source = store.object(RAW, KEY).unwrap();
        assert_eq!(source.tags, vec![ObjectTag::processed()]);
        assert_eq!(source.legal_hold, LegalHold::Off);
        assert_eq!(store.count(StoreOperation::PutLegalHold), 0);
        assert!(store.object("confidential", KEY).is_none());
    }

    #[test]
    fn complete_run_visits_every_state_in_order() {
        let store = seeded("apple,legal\n");
        let outcome = orchestrator().run(&event(), &sessions(&store));
        assert_eq!(
            outcome.states,
            vec![
                PipelineState::Received,
                PipelineState::CheckedIdempotency,
                PipelineState::Read,
                PipelineState::Transformed,
                PipelineState::Classified,
                PipelineState::Routed,
                PipelineState::Written,
                PipelineState::Tagged,
                PipelineState::Held,
                PipelineState::MarkedProcessed,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn legal_row_holds_source_exactly_once() {
        let store = seeded("apple,red\npear,legal\n");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.is_complete());
        assert!(outcome.verdict.unwrap().has_legal_flag);
        assert!(store.object("anonymized", KEY).is_some());
        assert_eq!(store.object(RAW, KEY).unwrap().legal_hold, LegalHold::On);

        let holds: Vec<_> = store
            .calls()
            .into_iter()
            .filter(|c| c.operation == StoreOperation::PutLegalHold)
            .collect();
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].bucket, RAW);
    }

    #[test]
    fn sensitive_file_routes_to_confidential_even_with_legal_flag() {
        let store = seeded("Alice,123-45-6789,legal\n");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        let decision = outcome.routing.unwrap();
        assert_eq!(decision.destination_bucket, "confidential");
        assert_eq!(
            store.object("confidential", KEY).unwrap().tag("DataClassification"),
            Some("SENSITIVE")
        );
        assert_eq!(store.object(RAW, KEY).unwrap().legal_hold, LegalHold::On);
    }

    #[test]
    fn classification_uses_transformed_payload() {
        // A three-digit shop id only appears once the provenance prefix is added.
        let store = MemoryObjectStore::new();
        store.insert(RAW, "123_upload.csv", "apple,red\n");
        let outcome = orchestrator().run(&IngestEvent::new(RAW, "123_upload.csv"), &sessions(&store));

        let verdict = outcome.verdict.unwrap();
        assert!(verdict.has_sensitive_data);
        assert_eq!(
            verdict.sensitive_kind,
            Some(classify::SensitiveKind::CardVerificationCode)
        );
        assert_eq!(
            store.object("confidential", "123_upload.csv").unwrap().body_text(),
            "123,apple,red\n"
        );
    }

    #[test]
    fn second_delivery_is_a_no_op() {
        let store = seeded("apple,legal\n");
        let orchestrator = orchestrator();
        orchestrator.run(&event(), &sessions(&store));

        store.clear_calls();
        let outcome = orchestrator.run(&event(), &sessions(&store));

        assert!(matches!(outcome.disposition, Disposition::AlreadyProcessed));
        assert_eq!(outcome.final_state(), PipelineState::Done);
        assert!(store.writes().is_empty());
        assert_eq!(store.calls().len(), 1);
        assert_eq!(store.calls()[0].operation, StoreOperation::GetTags);
    }

    #[test]
    fn already_marked_object_never_read() {
        let store = MemoryObjectStore::new();
        store.insert_object(
            RAW,
            KEY,
            StoredObject {
                body: b"a,b".to_vec(),
                tags: vec![ObjectTag::processed()],
                legal_hold: LegalHold::Off,
            },
        );
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(!outcome.visited(PipelineState::Read));
        assert_eq!(store.count(StoreOperation::GetObject), 0);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn guard_error_skips_without_side_effects() {
        let store = seeded("apple,red\n");
        store.fail(StoreOperation::GetTags, "SlowDown");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(matches!(
            outcome.disposition,
            Disposition::Aborted(PipelineError::IdempotencyCheck(_))
        ));
        assert_eq!(outcome.final_state(), PipelineState::Aborted);
        assert_eq!(store.count(StoreOperation::GetObject), 0);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn missing_source_fails_open_then_aborts_at_read() {
        let store = MemoryObjectStore::new();
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.visited(PipelineState::CheckedIdempotency));
        assert!(matches!(
            outcome.disposition,
            Disposition::Aborted(PipelineError::Read(ref e)) if e.is_no_such_key()
        ));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn read_failure_aborts_before_write() {
        let store = seeded("apple,red\n");
        store.fail(StoreOperation::GetObject, "InternalError");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(matches!(outcome.disposition, Disposition::Aborted(PipelineError::Read(_))));
        assert!(outcome.verdict.is_none());
        assert!(store.writes().is_empty());
    }

    #[test]
    fn invalid_utf8_aborts_as_decode_error() {
        let store = MemoryObjectStore::new();
        store.insert(RAW, KEY, vec![0x66, 0x6f, 0xff, 0xfe]);
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(matches!(
            outcome.disposition,
            Disposition::Aborted(PipelineError::Decode { .. })
        ));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn write_failure_aborts_before_tagging() {
        let store = seeded("apple,legal\n");
        store.fail(StoreOperation::PutObject, "AccessDenied");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(matches!(outcome.disposition, Disposition::Aborted(PipelineError::Write(_))));
        assert!(!outcome.visited(PipelineState::Written));
        assert_eq!(store.count(StoreOperation::PutTags), 0);
        assert_eq!(store.count(StoreOperation::PutLegalHold), 0);
        // Unmarked, so the next delivery will retry.
        assert!(store.object(RAW, KEY).unwrap().tags.is_empty());
    }

    #[test]
    fn destination_tag_failure_still_marks_source() {
        let store = seeded("apple,red\n");
        store.fail_on_bucket(StoreOperation::PutTags, "anonymized", "AccessDenied");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.is_complete());
        assert_eq!(outcome.step_failures.len(), 1);
        assert_eq!(outcome.step_failures[0].step, PipelineState::Tagged);
        assert!(store.object("anonymized", KEY).unwrap().tags.is_empty());
        assert_eq!(store.object(RAW, KEY).unwrap().tags, vec![ObjectTag::processed()]);
    }

    #[test]
    fn mark_failure_leaves_object_eligible_for_redelivery() {
        let store = seeded("apple,red\n");
        store.fail_on_bucket(StoreOperation::PutTags, RAW, "AccessDenied");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.is_complete());
        assert_eq!(outcome.step_failures[0].step, PipelineState::MarkedProcessed);
        assert!(store.object("anonymized", KEY).is_some());

        // Redelivery repeats the write: at-least-once.
        store.clear_calls();
        orchestrator().run(&event(), &sessions(&store));
        assert_eq!(store.count(StoreOperation::PutObject), 1);
    }

    #[test]
    fn hold_not_reapplied_when_already_on() {
        let store = MemoryObjectStore::new();
        store.insert_object(
            RAW,
            KEY,
            StoredObject {
                body: b"apple,legal\n".to_vec(),
                tags: vec![],
                legal_hold: LegalHold::On,
            },
        );
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.visited(PipelineState::Held));
        assert_eq!(store.count(StoreOperation::PutLegalHold), 0);
    }

    #[test]
    fn hold_failure_is_best_effort() {
        let store = seeded("apple,legal\n");
        store.fail(StoreOperation::PutLegalHold, "InvalidRequest");
        let outcome = orchestrator().run(&event(), &sessions(&store));

        assert!(outcome.is_complete());
        assert_eq!(outcome.step_failures[0].step, PipelineState::Held);
        assert_eq!(store.object(RAW, KEY).unwrap().tags, vec![ObjectTag::processed()]);
    }

    #[test]
    fn unreadable_hold_status_still_sets_hold() {
        let store = seeded("apple,legal\n");
        store.fail(StoreOperation::GetLegalHold, "NotImplemented");
        orchestrator().run(&event(), &sessions(&store));
        assert_eq!(store.object(RAW, KEY).unwrap().legal_hold, LegalHold::On);
    }
}
