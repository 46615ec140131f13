//! Cross-source unification through the orchestrator.

use std::sync::Arc;

use anyhow::Result;
use mediasync_core::model::{
    CanonicalKind, CanonicalMediaId, MediaType, RawMediaMetadata, SourceType,
    SyncStatus,
};
use mediasync_core::model::hints::xtream;
use mediasync_core::{
    CanonicalMediaRepository, ScanRequest, SyncConfig, TELEGRAM_SOURCE,
    XTREAM_SOURCE,
};

#[path = "support/mod.rs"]
mod support;

use support::{Harness, ScriptedPipeline, shared, telegram_movie, xtream_vod};

fn heat_id() -> CanonicalMediaId {
    CanonicalMediaId::new(CanonicalKind::Movie, "heat:1995")
}

#[tokio::test(start_paused = true)]
async fn same_work_from_two_sources_links_to_one_identity() -> Result<()> {
    let telegram = Arc::new(ScriptedPipeline::completing(
        TELEGRAM_SOURCE,
        vec![telegram_movie("tg-9", "Heat.1995.1080p.BluRay", 1995)],
    ));
    let xtream = Arc::new(ScriptedPipeline::completing(
        XTREAM_SOURCE,
        vec![xtream_vod("vod-1", "EN| Heat (1995)", 1995)],
    ));
    let harness = Harness::new(vec![shared(&telegram), shared(&xtream)]);

    let first = harness
        .orchestrator
        .sync_telegram(None, SyncConfig::default())
        .wait()
        .await;
    let second = harness
        .orchestrator
        .sync_xtream(true, false, false, false, SyncConfig::default())
        .wait()
        .await;
    assert!(matches!(first, Some(SyncStatus::Completed { total: 1, .. })));
    assert!(matches!(second, Some(SyncStatus::Completed { total: 1, .. })));

    assert_eq!(harness.canonical.ids().await, vec![heat_id()]);
    let refs = harness.canonical.source_refs(&heat_id()).await?;
    assert_eq!(refs.len(), 2);

    let preferred = harness
        .canonical
        .default_source(&heat_id())
        .await?
        .expect("default source");
    assert_eq!(preferred.source_type, SourceType::Xtream);
    assert_eq!(preferred.source_id, "vod-1");
    assert_eq!(preferred.playback_hints[xtream::CONTAINER_EXTENSION], "mkv");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn tmdb_tagged_and_untagged_items_unify() -> Result<()> {
    let xtream = Arc::new(ScriptedPipeline::completing(
        XTREAM_SOURCE,
        vec![xtream_vod("vod-1", "Heat (1995)", 1995).with_tmdb_id(949)],
    ));
    let telegram = Arc::new(ScriptedPipeline::completing(
        TELEGRAM_SOURCE,
        vec![telegram_movie("tg-9", "Heat.1995.1080p.BluRay", 1995)],
    ));
    let harness = Harness::new(vec![shared(&xtream), shared(&telegram)]);

    harness
        .orchestrator
        .sync_xtream(true, false, false, false, SyncConfig::default())
        .wait()
        .await;
    harness
        .orchestrator
        .sync_telegram(None, SyncConfig::default())
        .wait()
        .await;

    let tmdb_id = CanonicalMediaId::new(CanonicalKind::Movie, "tmdb:949");
    assert_eq!(harness.canonical.ids().await, vec![tmdb_id.clone()]);

    let refs = harness.canonical.source_refs(&tmdb_id).await?;
    let sources: Vec<_> = refs.iter().map(|r| r.source_type).collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.contains(&SourceType::Telegram));
    assert!(sources.contains(&SourceType::Xtream));

    // The title key reaches the same record.
    let by_title = harness.canonical.source_refs(&heat_id()).await?;
    assert_eq!(by_title.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resyncing_a_source_is_idempotent() -> Result<()> {
    let xtream = Arc::new(ScriptedPipeline::completing(
        XTREAM_SOURCE,
        vec![
            xtream_vod("vod-1", "Heat", 1995),
            xtream_vod("vod-2", "Heat", 1986),
        ],
    ));
    let harness = Harness::new(vec![shared(&xtream)]);

    for _ in 0..2 {
        harness
            .orchestrator
            .sync(XTREAM_SOURCE, ScanRequest::all(), SyncConfig::default())
            .wait()
            .await;
    }

    // Different years never merge.
    assert_eq!(harness.canonical.len().await, 2);
    assert_eq!(harness.canonical.source_refs(&heat_id()).await?.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn live_channels_are_never_linked() -> Result<()> {
    let live =
        RawMediaMetadata::new(SourceType::Xtream, "l-1", MediaType::Live, "BBC One")
            .with_hint(xtream::CONTENT_TYPE, xtream::CONTENT_LIVE)
            .with_hint(xtream::STREAM_ID, "1");
    let xtream = Arc::new(ScriptedPipeline::completing(XTREAM_SOURCE, vec![live]));
    let harness = Harness::new(vec![shared(&xtream)]);

    harness
        .orchestrator
        .sync(XTREAM_SOURCE, ScanRequest::all(), SyncConfig::default())
        .wait()
        .await;

    assert!(harness.canonical.is_empty().await);
    let metrics = harness.orchestrator.last_run_metrics().borrow().clone().unwrap();
    assert_eq!(metrics.items_persisted, 1);
    assert_eq!(metrics.items_linked, 0);
    assert_eq!(metrics.hint_warnings, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unidentifiable_episodes_count_as_link_failures() -> Result<()> {
    let episode =
        RawMediaMetadata::new(SourceType::Io, "f-1", MediaType::Episode, "Lost");
    let pipeline = Arc::new(ScriptedPipeline::completing("io", vec![episode]));
    let harness = Harness::new(vec![shared(&pipeline)]);

    let status = harness
        .orchestrator
        .sync("io", ScanRequest::all(), SyncConfig::default())
        .wait()
        .await;

    assert!(matches!(status, Some(SyncStatus::Completed { total: 1, .. })));
    let metrics = harness.orchestrator.last_run_metrics().borrow().clone().unwrap();
    assert_eq!(metrics.link_failures, 1);
    assert!(harness.canonical.is_empty().await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn linking_can_be_disabled_per_run() -> Result<()> {
    let xtream = Arc::new(ScriptedPipeline::completing(
        XTREAM_SOURCE,
        vec![xtream_vod("vod-1", "Heat", 1995)],
    ));
    let harness = Harness::new(vec![shared(&xtream)]);

    harness
        .orchestrator
        .sync(
            XTREAM_SOURCE,
            ScanRequest::all(),
            SyncConfig {
                enable_canonical_linking: false,
                ..SyncConfig::default()
            },
        )
        .wait()
        .await;

    assert!(harness.canonical.is_empty().await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resume_position_survives_relinking() -> Result<()> {
    let xtream = Arc::new(ScriptedPipeline::completing(
        XTREAM_SOURCE,
        vec![xtream_vod("vod-1", "Heat", 1995)],
    ));
    let harness = Harness::new(vec![shared(&xtream)]);
    let sync = || {
        harness
            .orchestrator
            .sync(XTREAM_SOURCE, ScanRequest::all(), SyncConfig::default())
    };

    sync().wait().await;
    harness.canonical.save_resume_position(&heat_id(), 61_000).await?;
    sync().wait().await;

    assert_eq!(harness.canonical.resume_position(&heat_id()).await?, Some(61_000));
    Ok(())
}
