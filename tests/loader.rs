use std::sync::Arc;

use asset_loader::{
    AssetLoader, CacheReporter, CacheStats, ConnectionMonitor, ConnectionType,
    DeviceCapabilityProbe, LoaderConfig,
    LoaderError, OptimizationSettings, QualityTier, Renderer, StaticPlatform, StaticTelemetry,
};
use range_dl::{TransferError, TransferOutcome, TransferStage};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ASSET_LEN: usize = 100;
const CHUNK: usize = 25;

#[derive(Default)]
struct RecordingRenderer {
    assets: Vec<Vec<u8>>,
    settings: Vec<OptimizationSettings>,
}

impl Renderer for RecordingRenderer {
    fn load_asset(&mut self, bytes: &[u8]) {
        self.assets.push(bytes.to_vec());
    }

    fn apply_settings(&mut self, settings: &OptimizationSettings) {
        self.settings.push(*settings);
    }
}

struct FixedCache;

impl CacheReporter for FixedCache {
    fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: 2,
            size_bytes: 512,
            capacity_bytes: 2048,
        }
    }
}

fn asset() -> Vec<u8> {
    (0..ASSET_LEN as u8).collect()
}

/// Serves `asset()` over range requests; chunks listed in `failing` answer 500
async fn serve(failing: &[usize]) -> MockServer {
    let server = MockServer::start().await;
    let data = asset();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("range", "bytes=0-0"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", format!("bytes 0-0/{}", ASSET_LEN).as_str())
                .set_body_bytes(vec![data[0]]),
        )
        .mount(&server)
        .await;
    for (id, start) in (0..ASSET_LEN).step_by(CHUNK).enumerate() {
        let end = start + CHUNK - 1;
        let response = if failing.contains(&id) {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(206).set_body_bytes(data[start..=end].to_vec())
        };
        Mock::given(method("GET"))
            .and(header("range", format!("bytes={}-{}", start, end).as_str()))
            .respond_with(response)
            .mount(&server)
            .await;
    }
    server
}

fn config(json: &str) -> LoaderConfig {
    LoaderConfig::from_json_str(json).unwrap()
}

fn url(server: &MockServer) -> String {
    format!("{}/models/lamp.glb", server.uri())
}

#[tokio::test]
async fn delivers_asset_and_settings_to_renderer() {
    let server = serve(&[]).await;
    let probe = DeviceCapabilityProbe::new(StaticPlatform::desktop());
    let loader = AssetLoader::from_url(
        url(&server),
        &config(r#"{"transfer": {"chunk_size_bytes": 25}}"#),
        Arc::new(ConnectionMonitor::new()),
        probe.subscribe(),
    )
    .unwrap();
    loader.refresh_telemetry(&StaticTelemetry::new().with_connection(ConnectionType::FourG));

    let mut renderer = RecordingRenderer::default();
    let outcome = loader.load(&mut renderer).await.unwrap();

    assert_eq!(outcome, TransferOutcome::Complete(asset()));
    assert_eq!(renderer.assets, vec![asset()]);
    assert_eq!(renderer.settings.len(), 1);
    assert_eq!(renderer.settings[0].quality_tier, QualityTier::High);
    assert!(!renderer.settings[0].manual_override);

    let report = loader.report(Some(&FixedCache));
    assert_eq!(report.progress.stage, TransferStage::Complete);
    assert_eq!(report.progress.percentage, 100.0);
    assert_eq!(report.progress.total_chunks, 4);
    assert_eq!(report.automatic_score, 8);
    assert_eq!(report.connection.connection_effective_type, ConnectionType::FourG);
    assert!(report.connection.estimated_speed_mbps > 0.0);
    assert_eq!(report.cache.map(|c| c.utilization()), Some(0.25));
}

#[tokio::test]
async fn configured_override_wins_over_automatic_tier() {
    let server = serve(&[]).await;
    let probe = DeviceCapabilityProbe::new(StaticPlatform::desktop());
    let loader = AssetLoader::from_url(
        url(&server),
        &config(
            r#"{
                "transfer": {"chunk_size_bytes": 25, "priority_level": "high"},
                "quality": {"manual_override": true, "tier": "low"}
            }"#,
        ),
        Arc::new(ConnectionMonitor::new()),
        probe.subscribe(),
    )
    .unwrap();
    loader.refresh_telemetry(&StaticTelemetry::new().with_connection(ConnectionType::FourG));

    let mut renderer = RecordingRenderer::default();
    loader.load(&mut renderer).await.unwrap();

    let applied = renderer.settings.last().copied().unwrap();
    assert_eq!(applied.quality_tier, QualityTier::Low);
    assert!(applied.manual_override);
    assert_eq!(loader.quality().automatic_tier(), QualityTier::High);

    let cleared = loader.set_manual_override(None);
    assert_eq!(cleared.quality_tier, QualityTier::High);
    assert!(!cleared.manual_override);
}

#[tokio::test]
async fn incomplete_asset_is_never_rendered() {
    let server = serve(&[2]).await;
    let probe = DeviceCapabilityProbe::new(StaticPlatform::phone());
    let loader = AssetLoader::from_url(
        url(&server),
        &config(r#"{"transfer": {"chunk_size_bytes": 25}}"#),
        Arc::new(ConnectionMonitor::new()),
        probe.subscribe(),
    )
    .unwrap();

    let mut renderer = RecordingRenderer::default();
    let err = loader.load(&mut renderer).await.unwrap_err();

    assert!(matches!(
        err,
        LoaderError::Transfer(TransferError::ReassemblyIncomplete {
            loaded_bytes: 75,
            total_bytes: 100
        })
    ));
    assert!(!err.is_cancelled());
    assert!(renderer.assets.is_empty());
    assert!(renderer.settings.is_empty());
    assert_eq!(loader.progress().stage, TransferStage::Error);

    let report = serde_json::to_value(loader.report(None)).unwrap();
    assert_eq!(report["progress"]["stage"], "error");
    assert!(report.get("cache").is_none());
}

#[tokio::test]
async fn pause_is_refused_when_idle() {
    let server = serve(&[]).await;
    let probe = DeviceCapabilityProbe::new(StaticPlatform::desktop());
    let loader = AssetLoader::from_url(
        url(&server),
        &LoaderConfig::default(),
        Arc::new(ConnectionMonitor::new()),
        probe.subscribe(),
    )
    .unwrap();

    assert!(!loader.pause());
    loader.cancel();
    assert_eq!(loader.progress().stage, TransferStage::Idle);
}

#[tokio::test]
async fn loaders_share_one_connection_monitor() {
    let first_server = serve(&[]).await;
    let second_server = serve(&[]).await;
    let probe = DeviceCapabilityProbe::new(StaticPlatform::desktop());
    let monitor = Arc::new(ConnectionMonitor::new());
    let transfer = config(r#"{"transfer": {"chunk_size_bytes": 25}}"#);

    let first = AssetLoader::from_url(
        url(&first_server),
        &transfer,
        monitor.clone(),
        probe.subscribe(),
    )
    .unwrap();
    let second = AssetLoader::from_url(
        url(&second_server),
        &transfer,
        monitor.clone(),
        probe.subscribe(),
    )
    .unwrap();
    assert!(Arc::ptr_eq(first.monitor(), second.monitor()));

    let mut renderer = RecordingRenderer::default();
    first.load(&mut renderer).await.unwrap();
    assert!(monitor.estimated_speed_mbps() > 0.0);

    // Reports on the shared monitor reach every loader
    monitor.set_reported_type(Some(ConnectionType::TwoG));
    assert_eq!(second.report(None).connection.connection_effective_type, ConnectionType::TwoG);
    let settings = second.quality().recompute();
    assert_eq!(settings.quality_tier, QualityTier::Medium);
    assert_eq!(second.quality().automatic_score(), 5);
}
