// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::wait_for;
use ens_core::FakeClock;
use ens_provider::FakeProvider;

fn pool_with(
    config: PoolConfig,
) -> (Arc<WarmPool<FakeClock>>, Arc<FakeProvider>, FakeClock) {
    let clock = FakeClock::new();
    let bus = EventBus::new(clock.clone());
    let provider = Arc::new(FakeProvider::new());
    let pool = WarmPool::new(provider.clone(), bus, clock.clone(), config);
    (pool, provider, clock)
}

fn key() -> PoolKey {
    PoolKey::new("org/repo").branch("main")
}

#[tokio::test(start_paused = true)]
async fn miss_triggers_replenishment_to_high_water() {
    let (pool, provider, _clock) = pool_with(PoolConfig::default());

    let outcome = pool.claim(&key(), "proj-1");
    assert!(outcome.sandbox.is_none());
    assert_eq!(outcome.reason, "miss");

    wait_for(|| pool.stats(&key()).available == 2).await;
    assert_eq!(provider.created_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn claim_lifts_one_out_atomically() {
    let (pool, _provider, _clock) = pool_with(PoolConfig::default());
    pool.claim(&key(), "proj-1");
    wait_for(|| pool.stats(&key()).available == 2).await;

    let hit = pool.claim(&key(), "proj-1");
    assert!(hit.sandbox.is_some());
    assert_eq!(hit.reason, "hit");
    // A hit does not replenish on its own; one remains.
    assert_eq!(pool.stats(&key()).available, 1);
}

#[tokio::test(start_paused = true)]
async fn available_plus_warming_never_exceeds_max() {
    let config = PoolConfig { max_per_key: 2, high_water: 5, ..PoolConfig::default() };
    let (pool, _provider, _clock) = pool_with(config);

    pool.claim(&key(), "proj-1");
    let stats = pool.stats(&key());
    assert!(stats.available + stats.warming <= 2, "{stats:?}");

    wait_for(|| pool.stats(&key()).available == 2).await;
    pool.on_typing(&key(), "proj-1");
    let stats = pool.stats(&key());
    assert!(stats.available + stats.warming <= 2, "{stats:?}");
}

#[tokio::test(start_paused = true)]
async fn expired_entries_are_discarded_at_claim_time() {
    let (pool, provider, clock) = pool_with(PoolConfig::default());
    pool.claim(&key(), "proj-1");
    wait_for(|| pool.stats(&key()).available == 2).await;

    // Everything in the pool ages past the TTL.
    clock.advance(PoolConfig::default().ttl);

    let outcome = pool.claim(&key(), "proj-1");
    assert!(outcome.sandbox.is_none());
    wait_for(|| provider.terminated().len() == 2).await;
}

#[tokio::test(start_paused = true)]
async fn typing_is_debounced_per_key() {
    let config = PoolConfig { typing_debounce: Duration::from_secs(10), ..PoolConfig::default() };
    let (pool, provider, clock) = pool_with(config);

    pool.on_typing(&key(), "proj-1");
    wait_for(|| pool.stats(&key()).available == 2).await;
    let after_first = provider.created_count();

    // Drain one so the pool is below high water, then type again within
    // the debounce window: no new warm jobs.
    pool.claim(&key(), "proj-1");
    pool.on_typing(&key(), "proj-1");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.created_count(), after_first);

    // Past the debounce window the pool warms again.
    clock.advance(Duration::from_secs(11));
    pool.on_typing(&key(), "proj-1");
    wait_for(|| provider.created_count() > after_first).await;
}

#[tokio::test(start_paused = true)]
async fn warm_jobs_time_out_and_release_their_slot() {
    let config = PoolConfig {
        warm_timeout: Duration::from_millis(100),
        ..PoolConfig::default()
    };
    let (pool, provider, _clock) = pool_with(config);
    provider.set_create_delay(Duration::from_secs(3_600));

    pool.claim(&key(), "proj-1");
    wait_for(|| {
        let stats = pool.stats(&key());
        stats.warming == 0 && stats.available == 0
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn release_returns_healthy_sandboxes_up_to_cap() {
    let config = PoolConfig { max_per_key: 1, ..PoolConfig::default() };
    let (pool, provider, _clock) = pool_with(config);

    let input = ens_core::CreateSandboxInput::new("proj-1", "org/repo").branch("main");
    let a = provider.create(input.clone()).await.unwrap();
    let b = provider.create(input).await.unwrap();

    pool.release(a);
    assert_eq!(pool.stats(&key()).available, 1);

    // Over the cap: the sandbox is terminated instead of pooled.
    pool.release(b.clone());
    assert_eq!(pool.stats(&key()).available, 1);
    wait_for(|| provider.terminated().contains(&b.id)).await;
}

#[tokio::test(start_paused = true)]
async fn keys_are_independent() {
    let (pool, _provider, _clock) = pool_with(PoolConfig::default());
    let other = PoolKey::new("org/other");

    pool.claim(&key(), "proj-1");
    wait_for(|| pool.stats(&key()).available == 2).await;

    assert_eq!(pool.stats(&other).available, 0);
    let totals = pool.total_stats();
    assert_eq!(totals.available, 2);
}
