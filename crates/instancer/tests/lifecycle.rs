// Lifecycle tests for the instance service, driven against the in-memory
// stores and the mock runtime

use chrono::{Duration as ChronoDuration, Utc};
use ctf_platform_config::InstancerConfig;
use ctf_platform_events::EventHub;
use ctf_platform_instancer::InstanceService;
use ctf_platform_models::*;
use ctf_platform_runtime::{MemoryObjectStore, MockRuntime};
use ctf_platform_storage::{
    CooldownStore, InsertInstanceOutcome, InstanceStore, MemoryChallengeStore, MemoryCooldownStore,
    MemoryInstanceStore,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct TestEnv {
    service: Arc<InstanceService>,
    runtime: Arc<MockRuntime>,
    instances: Arc<MemoryInstanceStore>,
    cooldowns: Arc<MemoryCooldownStore>,
    challenges: Arc<MemoryChallengeStore>,
    objects: Arc<MemoryObjectStore>,
}

fn test_config() -> InstancerConfig {
    InstancerConfig {
        cooldown_secs: 0,
        max_instances_per_user: 10,
        max_instances_per_team: 10,
        instance_timeout_secs: 3600,
        port_range_start: 42000,
        port_range_end: 42999,
        public_host: "challs.test".to_string(),
        sweep_interval_secs: 60,
        teardown_workers: 2,
        teardown_queue: 32,
    }
}

fn build_env(config: InstancerConfig) -> TestEnv {
    let instances = Arc::new(MemoryInstanceStore::new());
    let cooldowns = Arc::new(MemoryCooldownStore::new());
    let challenges = Arc::new(MemoryChallengeStore::new());
    let runtime = Arc::new(MockRuntime::new());
    let objects = Arc::new(MemoryObjectStore::new());
    let events = Arc::new(EventHub::new(16));

    let service = InstanceService::new(
        config,
        "challenge-contexts".to_string(),
        instances.clone(),
        cooldowns.clone(),
        challenges.clone(),
        runtime.clone(),
        objects.clone(),
        events,
    );

    TestEnv {
        service,
        runtime,
        instances,
        cooldowns,
        challenges,
        objects,
    }
}

fn container_challenge(slug: &str, ports: Vec<u16>) -> Challenge {
    Challenge {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: slug.to_string(),
        kind: ChallengeKind::Container,
        base_points: 100,
        flag: "flag{test}".to_string(),
        decay: None,
        declared_ports: ports,
        enable_first_blood: false,
        first_blood_bonuses: vec![],
        first_blood_badges: vec![],
        connection_template: None,
        image: Some(format!("challenge-{}", slug)),
        compose_yaml: None,
        instance_timeout_secs: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Seed a challenge whose image is already built on the runtime
async fn seed_ready_challenge(env: &TestEnv, slug: &str, ports: Vec<u16>) -> Challenge {
    let challenge = container_challenge(slug, ports);
    env.runtime.premark_image(challenge.image.as_ref().unwrap());
    env.challenges.insert(challenge.clone()).await;
    challenge
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Condition not met within 2s");
}

#[tokio::test]
async fn start_provisions_and_persists_instance() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "pwn-heap", vec![31337, 8080]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    let handle = env.service.start(actor, challenge.id).await.unwrap();

    assert_eq!(handle.ports.len(), 2);
    assert!(handle.expires_at > Utc::now());
    assert_eq!(env.runtime.running_count(), 1);

    let row = env
        .instances
        .find_running(actor.team_id, challenge.id)
        .await
        .unwrap()
        .expect("instance row missing");
    assert_eq!(row.assigned_ports, handle.ports);
    assert_eq!(row.user_id, actor.user_id);
}

#[tokio::test]
async fn static_challenges_cannot_start_instances() {
    let env = build_env(test_config());
    let mut challenge = container_challenge("quiz", vec![]);
    challenge.kind = ChallengeKind::Static;
    env.challenges.insert(challenge.clone()).await;

    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());
    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::UnsupportedChallengeType { .. }));
    assert_eq!(env.runtime.running_count(), 0);
}

#[tokio::test]
async fn second_start_for_same_pair_is_rejected() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "web-jwt", vec![8080]).await;
    let team = Uuid::new_v4();

    env.service
        .start(Actor::new(Uuid::new_v4(), team), challenge.id)
        .await
        .unwrap();
    let err = env
        .service
        .start(Actor::new(Uuid::new_v4(), team), challenge.id)
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::InstanceAlreadyRunning));
    assert_eq!(env.runtime.running_count(), 1);
}

#[tokio::test]
async fn concurrent_starts_leave_exactly_one_instance() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "crypto-rsa", vec![31337]).await;
    // Widen the window between checks and the commit-point insert
    env.runtime.set_start_delay(Duration::from_millis(25));

    let team = Uuid::new_v4();
    let actor = Actor::new(Uuid::new_v4(), team);
    let challenge_id = challenge.id;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = env.service.clone();
        tasks.push(tokio::spawn(
            async move { service.start(actor, challenge_id).await },
        ));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(PlatformError::InstanceAlreadyRunning) => {}
            Err(other) => panic!("Unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    let running = env
        .instances
        .count_running_by_team(team)
        .await
        .unwrap();
    assert_eq!(running, 1);
    // Losers that made it past launch must have discarded their containers
    wait_until(|| async { env.runtime.running_count() == 1 }).await;
}

#[tokio::test]
async fn user_capacity_ceiling_is_enforced() {
    let mut config = test_config();
    config.max_instances_per_user = 1;
    let env = build_env(config);

    let first = seed_ready_challenge(&env, "rev-vm", vec![9001]).await;
    let second = seed_ready_challenge(&env, "rev-packer", vec![9002]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.service.start(actor, first.id).await.unwrap();
    let err = env.service.start(actor, second.id).await.unwrap_err();
    assert!(matches!(
        err,
        PlatformError::UserCapacityExceeded { limit: 1 }
    ));
}

#[tokio::test]
async fn team_capacity_ceiling_is_enforced() {
    let mut config = test_config();
    config.max_instances_per_team = 1;
    let env = build_env(config);

    let first = seed_ready_challenge(&env, "misc-jail", vec![9101]).await;
    let second = seed_ready_challenge(&env, "misc-sandbox", vec![9102]).await;
    let team = Uuid::new_v4();

    env.service
        .start(Actor::new(Uuid::new_v4(), team), first.id)
        .await
        .unwrap();
    let err = env
        .service
        .start(Actor::new(Uuid::new_v4(), team), second.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlatformError::TeamCapacityExceeded { limit: 1 }
    ));
}

#[tokio::test]
async fn cooldown_blocks_restart_until_window_elapses() {
    let mut config = test_config();
    config.cooldown_secs = 300;
    let env = build_env(config);

    let challenge = seed_ready_challenge(&env, "pwn-rop", vec![31000]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.service.start(actor, challenge.id).await.unwrap();
    env.service
        .stop(actor, actor.team_id, challenge.id)
        .await
        .unwrap();

    // The cooldown check precedes every other start precondition
    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    match err {
        PlatformError::CooldownActive { remaining_seconds } => {
            assert!(remaining_seconds > 0 && remaining_seconds <= 300);
        }
        other => panic!("Expected CooldownActive, got {other}"),
    }

    // Backdate the stop beyond the window and wait for teardown to clear
    // the row; the next start must go through
    env.cooldowns
        .record(
            actor.team_id,
            challenge.id,
            Utc::now() - ChronoDuration::seconds(301),
        )
        .await
        .unwrap();
    wait_until(|| async {
        env.instances
            .find_running(actor.team_id, challenge.id)
            .await
            .unwrap()
            .is_none()
    })
    .await;

    env.service.start(actor, challenge.id).await.unwrap();
}

#[tokio::test]
async fn stop_deletes_row_and_kill_retains_it() {
    let env = build_env(test_config());
    let stopped = seed_ready_challenge(&env, "web-ssrf", vec![8080]).await;
    let killed = seed_ready_challenge(&env, "web-xxe", vec![8081]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.service.start(actor, stopped.id).await.unwrap();
    env.service.start(actor, killed.id).await.unwrap();

    env.service
        .stop(actor, actor.team_id, stopped.id)
        .await
        .unwrap();
    wait_until(|| async {
        !env.service
            .status(actor.team_id, stopped.id)
            .await
            .unwrap()
            .has_instance
    })
    .await;

    env.service
        .kill(actor, actor.team_id, killed.id)
        .await
        .unwrap();
    let view = env.service.status(actor.team_id, killed.id).await.unwrap();
    assert!(view.has_instance);
    assert_eq!(view.status, Some(InstanceStatus::Stopped));
    assert!(!view.is_expired);
}

#[tokio::test]
async fn kill_requires_admin_or_ownership() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "pwn-kernel", vec![31001]).await;
    let team = Uuid::new_v4();
    let owner = Actor::new(Uuid::new_v4(), team);
    let teammate = Actor::new(Uuid::new_v4(), team);
    let admin = Actor::admin(Uuid::new_v4(), Uuid::new_v4());

    env.service.start(owner, challenge.id).await.unwrap();

    let err = env
        .service
        .kill(teammate, team, challenge.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Forbidden { .. }));

    env.service.kill(admin, team, challenge.id).await.unwrap();
}

#[tokio::test]
async fn stop_rejects_other_teams() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "forensics-pcap", vec![8090]).await;
    let owner = Actor::new(Uuid::new_v4(), Uuid::new_v4());
    let outsider = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.service.start(owner, challenge.id).await.unwrap();

    let err = env
        .service
        .stop(outsider, owner.team_id, challenge.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Forbidden { .. }));

    // The instance survives the rejected stop
    assert!(env
        .instances
        .find_running(owner.team_id, challenge.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn expiry_flips_lazily_on_status_read() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "web-race", vec![8070]).await;
    let team = Uuid::new_v4();

    let overdue = Instance {
        id: Uuid::new_v4(),
        container_ref: "container-000042".to_string(),
        user_id: Uuid::new_v4(),
        team_id: team,
        challenge_id: challenge.id,
        assigned_ports: vec![42100],
        created_at: Utc::now() - ChronoDuration::hours(2),
        expires_at: Utc::now() - ChronoDuration::hours(1),
        status: InstanceStatus::Running,
    };
    assert_eq!(
        env.instances.insert_running(&overdue).await.unwrap(),
        InsertInstanceOutcome::Inserted
    );

    // No read has happened yet, so the row is still running
    let row = env
        .instances
        .find_running(team, challenge.id)
        .await
        .unwrap();
    assert!(row.is_some());

    let view = env.service.status(team, challenge.id).await.unwrap();
    assert!(view.has_instance);
    assert!(view.is_expired);
    assert_eq!(view.status, Some(InstanceStatus::Expired));

    // The flip is persisted, and the row is retained rather than deleted
    let latest = env
        .instances
        .find_latest(team, challenge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.status, InstanceStatus::Expired);
}

#[tokio::test]
async fn sweep_stops_overdue_containers_and_retains_rows() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "pwn-uaf", vec![31010]).await;
    let team = Uuid::new_v4();

    let overdue = Instance {
        id: Uuid::new_v4(),
        container_ref: "container-000077".to_string(),
        user_id: Uuid::new_v4(),
        team_id: team,
        challenge_id: challenge.id,
        assigned_ports: vec![42200],
        created_at: Utc::now() - ChronoDuration::hours(25),
        expires_at: Utc::now() - ChronoDuration::hours(1),
        status: InstanceStatus::Running,
    };
    env.instances.insert_running(&overdue).await.unwrap();

    let flipped = env.service.sweep_expired().await.unwrap();
    assert_eq!(flipped, 1);

    wait_until(|| async {
        env.runtime
            .stopped_refs()
            .contains(&"container-000077".to_string())
    })
    .await;

    let latest = env
        .instances
        .find_latest(team, challenge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.status, InstanceStatus::Expired);
}

#[tokio::test]
async fn runtime_probe_failure_is_reported_distinctly() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "web-graphql", vec![8060]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.runtime.set_disconnected(true);
    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::RuntimeUnavailable { .. }));

    // Reserved ports were released; a retry after recovery goes through
    env.runtime.set_disconnected(false);
    env.service.start(actor, challenge.id).await.unwrap();
}

#[tokio::test]
async fn port_exhaustion_fails_before_container_start() {
    let mut config = test_config();
    config.port_range_start = 43000;
    config.port_range_end = 43000;
    let env = build_env(config);

    let challenge = seed_ready_challenge(&env, "pwn-doubleport", vec![31337, 31338]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::NoFreePorts));
    assert_eq!(env.runtime.running_count(), 0);
}

#[tokio::test]
async fn build_failure_is_fatal_and_retry_rebuilds() {
    let env = build_env(test_config());
    let challenge = container_challenge("rev-obfuscated", vec![9200]);
    env.challenges.insert(challenge.clone()).await;
    env.objects
        .put_object("challenge-contexts", &challenge.slug, b"tar-context".to_vec())
        .await;

    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.runtime.set_fail_build(true);
    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::BuildFailed { .. }));

    env.runtime.set_fail_build(false);
    env.service.start(actor, challenge.id).await.unwrap();
    assert!(env
        .runtime
        .built_tags()
        .contains(challenge.image.as_ref().unwrap()));
}

#[tokio::test]
async fn start_failure_keeps_built_image_for_retry() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "crypto-lattice", vec![9300]).await;
    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());

    env.runtime.set_fail_start(true);
    let err = env.service.start(actor, challenge.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::StartFailed { .. }));

    env.runtime.set_fail_start(false);
    env.service.start(actor, challenge.id).await.unwrap();
}

#[tokio::test]
async fn status_renders_connection_template() {
    let env = build_env(test_config());
    let mut challenge = container_challenge("pwn-notes", vec![31337]);
    challenge.connection_template = Some("nc {host} {port:31337}".to_string());
    env.runtime.premark_image(challenge.image.as_ref().unwrap());
    env.challenges.insert(challenge.clone()).await;

    let actor = Actor::new(Uuid::new_v4(), Uuid::new_v4());
    let handle = env.service.start(actor, challenge.id).await.unwrap();

    let view = env.service.status(actor.team_id, challenge.id).await.unwrap();
    assert_eq!(
        view.connection_info,
        Some(format!("nc challs.test {}", handle.ports[0]))
    );
}

#[tokio::test]
async fn status_reports_absent_without_instance() {
    let env = build_env(test_config());
    let challenge = seed_ready_challenge(&env, "misc-trivia", vec![8050]).await;

    let view = env
        .service
        .status(Uuid::new_v4(), challenge.id)
        .await
        .unwrap();
    assert!(!view.has_instance);
    assert_eq!(view.status, None);
}
