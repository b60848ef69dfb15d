use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use drishti_core::config::Settings;
use drishti_core::heatmap::{HeatmapData, MicroplasticSample, MicroplasticType};
use drishti_core::identity::{
    dashboard_for, InMemoryProfileStore, LocalIdentityProvider, SessionManager, UserRole,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env();
    info!(
        target: "drishti",
        "drishti-core starting: auth_timeout={:?}, default_role={}",
        settings.auth_timeout,
        settings.default_role.as_str()
    );

    let provider = Arc::new(LocalIdentityProvider::new());
    let profiles = Arc::new(InMemoryProfileStore::new());
    let sessions = Arc::new(SessionManager::new(provider, profiles, settings));

    {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.run_observer().await });
    }

    let user = sessions
        .sign_up("field.agent@gangadrishti.org", "s3cr3t!", "9876543210", UserRole::Researcher)
        .await?;
    info!(
        user_id = %user.id,
        role = user.role.as_str(),
        dashboard = ?dashboard_for(user.role),
        "demo account provisioned"
    );

    let mut heatmap = HeatmapData::new(demo_samples());
    info!(total = heatmap.samples().len(), visible = heatmap.visible().len(), "heatmap loaded");

    heatmap.set_intensity_range(60.0, 100.0)?;
    info!(visible = heatmap.visible().len(), "hotspots only");

    sessions.sign_out().await?;
    Ok(())
}

fn demo_samples() -> Vec<MicroplasticSample> {
    let now = Utc::now();
    vec![
        MicroplasticSample::new(
            28.5095, 77.4510, 98.0,
            MicroplasticType::Polyethylene, 420,
            now - Duration::days(1), "Main Road Intersection", "Field Agent",
        ),
        MicroplasticSample::new(
            28.4186, 77.5232, 8.0,
            MicroplasticType::Polyamide, 60,
            now - Duration::days(3), "Sarovar (Lake)", "Researcher",
        ),
        MicroplasticSample::new(
            28.5118, 77.4513, 82.0,
            MicroplasticType::Polyvinylchloride, 310,
            now - Duration::days(7), "Environmental Lab", "Admin",
        ),
        MicroplasticSample::new(
            28.5102, 77.4493, 5.0,
            MicroplasticType::Polypropylene, 25,
            now - Duration::days(12), "Botanical Garden", "Researcher",
        ),
    ]
}
