use super::*;
use crate::testing::{FakeScheduler, Stores, past, seed_measure, stores};

use dqjobs_protocols::{JobDataSegment, NewJobInstance, SessionState, SessionUpdate, TriggerState};

struct Fixture {
    stores: Stores,
    scheduler: Arc<FakeScheduler>,
    manager: JobLifecycleManager,
    measure: Measure,
}

async fn fixture() -> Fixture {
    let stores = stores().await;
    let scheduler = FakeScheduler::new();
    let manager = JobLifecycleManager::new(
        stores.jobs.clone(),
        stores.instances.clone(),
        stores.measures.clone(),
        scheduler.clone(),
        "BA",
    );
    let measure = seed_measure(&stores.measures).await;
    Fixture {
        stores,
        scheduler,
        manager,
        measure,
    }
}

fn request(name: &str, measure_id: i64) -> ScheduleRequest {
    ScheduleRequest::new(name, measure_id, "0 0 * * * ?")
        .with_time_zone("GMT+8")
        .with_segment(JobDataSegment::new("source").as_baseline())
        .with_segment(JobDataSegment::new("target").with_range("-1h", "1h"))
}

impl Fixture {
    async fn add(&self, name: &str) -> Job {
        self.manager.add_job(request(name, self.measure.id)).await.unwrap()
    }

    /// Insert an instance of `job` with a registered predicate trigger.
    async fn instance(&self, job: &Job, tag: &str, expired: bool) -> JobInstance {
        let predicate_key = TriggerKey::new(format!("{}_predicate_{tag}", job.trigger_key.name), "PG");
        let expire_timestamp = if expired {
            past(60)
        } else {
            Utc::now() + chrono::Duration::days(7)
        };
        let instance = self
            .stores
            .instances
            .insert_instance(NewJobInstance {
                job_id: job.id,
                state: SessionState::NotStarted,
                predicate_key: predicate_key.clone(),
                timestamp: past(120),
                expire_timestamp,
            })
            .await
            .unwrap();
        self.scheduler
            .schedule(
                predicate_key.job_key(),
                predicate_key,
                TriggerSpec::Once(Utc::now()),
                FireContext::Predicate {
                    instance_id: instance.id,
                },
            )
            .await
            .unwrap();
        instance
    }

    async fn set_state(&self, instance: &JobInstance, state: SessionState) {
        self.stores
            .instances
            .update_session(instance.id, SessionUpdate::state(state))
            .await
            .unwrap();
    }
}

#[test]
fn test_page_request_clamps() {
    assert_eq!(page_request(0, 0), PageRequest::new(0, DEFAULT_PAGE_SIZE));
    assert_eq!(page_request(2, -4), PageRequest::new(2, DEFAULT_PAGE_SIZE));
    assert_eq!(page_request(0, 5000), PageRequest::new(0, MAX_PAGE_SIZE));
    assert_eq!(page_request(-3, 5), PageRequest::new(0, 5));
    assert_eq!(page_request(1, 1024), PageRequest::new(1, 1024));
}

#[tokio::test]
async fn test_add_job_registers_trigger() {
    let fx = fixture().await;
    let job = fx.add("daily_accuracy").await;

    assert_eq!(job.name, "daily_accuracy");
    assert_eq!(job.trigger_key.group, "BA");
    assert!(job.trigger_key.name.starts_with("daily_accuracy_"));

    let trigger = fx.scheduler.trigger(&job.trigger_key).unwrap();
    assert_eq!(trigger.info.state, TriggerState::Normal);
    match trigger.spec {
        TriggerSpec::Cron(cron) => {
            assert_eq!(cron.expression, "0 0 * * * ?");
            assert_eq!(cron.time_zone, "GMT+8");
        }
        other => panic!("expected cron trigger, got {other:?}"),
    }

    let schedule = fx.stores.jobs.find_schedule_of_job(job.id).await.unwrap().unwrap();
    assert_eq!(
        trigger.context,
        FireContext::Schedule {
            job_id: job.id,
            schedule_id: schedule.id
        }
    );
    assert_eq!(schedule.segments.len(), 2);
}

#[tokio::test]
async fn test_add_job_unknown_measure() {
    let fx = fixture().await;
    let err = fx.manager.add_job(request("orphan", 999)).await.unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));
    assert_eq!(fx.scheduler.trigger_count(), 0);
}

#[tokio::test]
async fn test_add_job_requires_single_baseline() {
    let fx = fixture().await;

    let none = ScheduleRequest::new("no_baseline", fx.measure.id, "0 0 * * * ?")
        .with_segment(JobDataSegment::new("source"));
    let err = fx.manager.add_job(none).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    let two = ScheduleRequest::new("two_baselines", fx.measure.id, "0 0 * * * ?")
        .with_segment(JobDataSegment::new("source").as_baseline())
        .with_segment(JobDataSegment::new("target").as_baseline());
    let err = fx.manager.add_job(two).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    assert!(fx.stores.jobs.find_jobs().await.unwrap().is_empty());
    assert_eq!(fx.scheduler.trigger_count(), 0);
}

#[tokio::test]
async fn test_add_job_rejects_foreign_connector() {
    let fx = fixture().await;
    let req = ScheduleRequest::new("bad_connector", fx.measure.id, "0 0 * * * ?")
        .with_segment(JobDataSegment::new("source").as_baseline())
        .with_segment(JobDataSegment::new("elsewhere"));

    let err = fx.manager.add_job(req).await.unwrap_err();
    match err {
        JobError::Validation(message) => assert!(message.contains("elsewhere")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(fx.stores.jobs.find_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_job_rejects_blank_and_duplicate_names() {
    let fx = fixture().await;
    let err = fx.manager.add_job(request("  ", fx.measure.id)).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    fx.add("nightly").await;
    let err = fx.manager.add_job(request("nightly", fx.measure.id)).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));
    assert_eq!(fx.scheduler.trigger_count(), 1);
}

#[tokio::test]
async fn test_add_job_rolls_back_when_scheduling_fails() {
    let fx = fixture().await;
    fx.scheduler.fail_next_schedule();

    let err = fx.manager.add_job(request("unlucky", fx.measure.id)).await.unwrap_err();
    assert!(matches!(err, JobError::Scheduler(SchedulerError::Unavailable(_))));

    assert!(fx.stores.jobs.find_jobs().await.unwrap().is_empty());
    assert_eq!(fx.stores.jobs.count_jobs_by_name("unlucky").await.unwrap(), 0);
    assert_eq!(fx.scheduler.trigger_count(), 0);

    // The name is free again.
    fx.add("unlucky").await;
}

#[tokio::test]
async fn test_add_job_rejects_taken_trigger_key() {
    let fx = fixture().await;
    fx.scheduler.take_group("BA");

    let err = fx.manager.add_job(request("collides", fx.measure.id)).await.unwrap_err();
    assert!(matches!(err, JobError::Scheduler(SchedulerError::TriggerExists(_))));

    assert_eq!(fx.stores.jobs.count_jobs_by_name("collides").await.unwrap(), 0);
    assert!(fx.stores.jobs.find_jobs().await.unwrap().is_empty());
    assert_eq!(fx.scheduler.trigger_count(), 0);
}

#[tokio::test]
async fn test_delete_job_pauses_triggers_and_flags_rows() {
    let fx = fixture().await;
    let job = fx.add("to_delete").await;
    let instance = fx.instance(&job, "1", false).await;

    fx.manager.delete_job_by_id(job.id).await.unwrap();

    assert_eq!(fx.scheduler.state_of(&job.trigger_key), Some(TriggerState::Paused));
    assert_eq!(
        fx.scheduler.state_of(&instance.predicate_key),
        Some(TriggerState::Paused)
    );
    assert!(fx.stores.jobs.find_job(job.id).await.unwrap().is_none());
    assert!(
        fx.stores
            .jobs
            .find_job_including_deleted(job.id)
            .await
            .unwrap()
            .unwrap()
            .deleted
    );
    assert!(fx.stores.instances.find_instance(instance.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_job_without_registered_trigger() {
    let fx = fixture().await;
    let job = fx.add("restarted").await;
    fx.scheduler.clear();

    fx.manager.delete_job_by_id(job.id).await.unwrap();
    assert!(fx.stores.jobs.find_job(job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_job_unknown() {
    let fx = fixture().await;
    assert!(matches!(
        fx.manager.delete_job_by_id(42).await.unwrap_err(),
        JobError::NotFound(_)
    ));
    assert!(matches!(
        fx.manager.delete_job_by_name("ghost").await.unwrap_err(),
        JobError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_delete_job_keeps_row_when_instance_pause_fails() {
    let fx = fixture().await;
    let job = fx.add("stubborn").await;
    let ok = fx.instance(&job, "ok", false).await;
    let stuck = fx.instance(&job, "stuck", false).await;
    fx.scheduler.fail_pause_of(stuck.predicate_key.job_key());

    let err = fx.manager.delete_job_by_name("stubborn").await.unwrap_err();
    assert!(matches!(err, JobError::Scheduler(_)));

    assert!(fx.stores.jobs.find_job(job.id).await.unwrap().is_some());
    assert!(fx.stores.instances.find_instance(ok.id).await.unwrap().is_none());
    assert!(fx.stores.instances.find_instance(stuck.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_jobs_related_to_measure() {
    let fx = fixture().await;
    assert!(!fx.manager.delete_jobs_related_to_measure(fx.measure.id).await.unwrap());

    fx.add("first").await;
    fx.add("second").await;
    assert!(fx.manager.delete_jobs_related_to_measure(fx.measure.id).await.unwrap());
    assert!(fx.stores.jobs.find_jobs_by_measure(fx.measure.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retire_measure_cascades() {
    let fx = fixture().await;
    let job = fx.add("measured").await;

    fx.manager.retire_measure(fx.measure.id).await.unwrap();

    assert!(fx.stores.jobs.find_job(job.id).await.unwrap().is_none());
    assert!(fx.manager.list_measures().await.unwrap().is_empty());
    assert!(matches!(
        fx.manager.retire_measure(fx.measure.id).await.unwrap_err(),
        JobError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_register_measure_validation() {
    let fx = fixture().await;
    let err = fx.manager.register_measure(NewMeasure::new("")).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    let duplicated = NewMeasure::new("dup")
        .with_source("a", vec![dqjobs_protocols::DataConnector::new("c", "HIVE")])
        .with_source("b", vec![dqjobs_protocols::DataConnector::new("c", "HIVE")]);
    let err = fx.manager.register_measure(duplicated).await.unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    let measure = fx.manager.register_measure(NewMeasure::new("profiling")).await.unwrap();
    assert_eq!(fx.manager.list_measures().await.unwrap().len(), 2);
    assert_eq!(measure.name, "profiling");
}

#[tokio::test]
async fn test_expired_sweep_purges_paused_instances() {
    let fx = fixture().await;
    let job = fx.add("expiring").await;
    let old_a = fx.instance(&job, "a", true).await;
    let old_b = fx.instance(&job, "b", true).await;
    let fresh = fx.instance(&job, "c", false).await;

    let purged = fx.manager.delete_expired_job_instances().await.unwrap();
    assert_eq!(purged, 2);

    assert_eq!(fx.scheduler.state_of(&old_a.predicate_key), Some(TriggerState::Paused));
    assert_eq!(fx.scheduler.state_of(&old_b.predicate_key), Some(TriggerState::Paused));
    assert_eq!(fx.scheduler.state_of(&fresh.predicate_key), Some(TriggerState::Normal));
    assert!(fx.stores.instances.find_instance(fresh.id).await.unwrap().is_some());

    assert_eq!(fx.manager.delete_expired_job_instances().await.unwrap(), 0);
}

#[tokio::test]
async fn test_expired_sweep_aborts_when_pause_fails() {
    let fx = fixture().await;
    let job = fx.add("partial").await;
    let paused = fx.instance(&job, "a", true).await;
    let stuck = fx.instance(&job, "b", true).await;
    fx.scheduler.fail_pause_of(stuck.predicate_key.job_key());

    let err = fx.manager.delete_expired_job_instances().await.unwrap_err();
    assert!(matches!(err, JobError::Scheduler(_)));

    // The un-paused row stays live; the paused one is only flagged.
    assert!(fx.stores.instances.find_instance(stuck.id).await.unwrap().is_some());
    assert!(fx.stores.instances.find_instance(paused.id).await.unwrap().is_none());
    let purged = fx
        .stores
        .instances
        .purge_expired_instances(Utc::now())
        .await
        .unwrap();
    assert_eq!(purged, 1);
}

#[tokio::test]
async fn test_expired_sweep_tolerates_missing_predicate_trigger() {
    let fx = fixture().await;
    let job = fx.add("forgotten").await;
    fx.instance(&job, "a", true).await;
    fx.scheduler.clear();

    assert_eq!(fx.manager.delete_expired_job_instances().await.unwrap(), 1);
}

#[tokio::test]
async fn test_find_instances_of_job_pages_newest_first() {
    let fx = fixture().await;
    let job = fx.add("paged").await;
    for tag in ["1", "2", "3"] {
        fx.instance(&job, tag, false).await;
    }

    let first = fx.manager.find_instances_of_job("BA", "paged", 0, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(first[0].id > first[1].id);

    let second = fx.manager.find_instances_of_job("BA", "paged", 1, 2).await.unwrap();
    assert_eq!(second.len(), 1);

    let defaulted = fx.manager.find_instances_of_job("BA", "paged", 0, 0).await.unwrap();
    assert_eq!(defaulted.len(), 3);

    assert!(fx.manager.find_instances_of_job("PG", "paged", 0, 10).await.unwrap().is_empty());
    assert!(fx.manager.find_instances_of_job("BA", "missing", 0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_alive_jobs_omit_untriggered() {
    let fx = fixture().await;
    let alive = fx.add("alive").await;
    fx.stores
        .jobs
        .create_job(
            NewJob {
                name: "dormant".to_string(),
                measure_id: fx.measure.id,
                trigger_key: TriggerKey::new("dormant_1", "BA"),
            },
            &request("dormant", fx.measure.id),
        )
        .await
        .unwrap();

    let jobs = fx.manager.alive_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    let summary = &jobs[0];
    assert_eq!(summary.job_id, alive.id);
    assert_eq!(summary.group_name, "BA");
    assert_eq!(summary.trigger_state, "NORMAL");
    assert_eq!(summary.cron_expression.as_deref(), Some("0 0 * * * ?"));
    assert_eq!(summary.previous_fire_time, -1);

    let json = serde_json::to_value(summary).unwrap();
    assert_eq!(json["jobName"], "alive");
    assert_eq!(json["triggerState"], "NORMAL");
}

#[tokio::test]
async fn test_health_info_counts_triggered_jobs() {
    let fx = fixture().await;
    let healthy = fx.add("healthy").await;
    let failing = fx.add("failing").await;
    fx.stores
        .jobs
        .create_job(
            NewJob {
                name: "untriggered".to_string(),
                measure_id: fx.measure.id,
                trigger_key: TriggerKey::new("untriggered_1", "BA"),
            },
            &request("untriggered", fx.measure.id),
        )
        .await
        .unwrap();

    let ok = fx.instance(&healthy, "1", false).await;
    fx.set_state(&ok, SessionState::Success).await;
    let bad = fx.instance(&failing, "1", false).await;
    fx.set_state(&bad, SessionState::Dead).await;

    let health = fx.manager.health_info().await.unwrap();
    assert_eq!(
        health,
        HealthInfo {
            job_count: 2,
            healthy_job_count: 1
        }
    );
}

#[tokio::test]
async fn test_restore_triggers_after_restart() {
    let fx = fixture().await;
    let a = fx.add("restore_a").await;
    let b = fx.add("restore_b").await;
    fx.scheduler.clear();

    assert_eq!(fx.manager.restore_triggers().await.unwrap(), 2);
    assert!(fx.scheduler.trigger(&a.trigger_key).is_some());
    assert!(fx.scheduler.trigger(&b.trigger_key).is_some());

    assert_eq!(fx.manager.restore_triggers().await.unwrap(), 0);
}
