use anyhow::Context;
use std::sync::Arc;

use enose::client::HttpPredictionClient;
use enose::config::DashboardConfig;
use enose::engine::{DashboardSession, SessionSnapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var("ENOSE_CONFIG") {
        Ok(path) => DashboardConfig::load(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => DashboardConfig::from_env()?,
    };
    let api_key = std::env::var("ENOSE_API_KEY").context("ENOSE_API_KEY must be set")?;

    let client = HttpPredictionClient::new(&config.backend_url, config.request_timeout())?;
    let session = DashboardSession::new(&config, Arc::new(client), api_key);

    println!("E-Nose Monitor");
    println!("==============");
    println!("Backend:  {}", config.backend_url);
    println!(
        "Cadence:  fetch every {:?}, chart tick every {:?}, {} points per channel\n",
        config.refresh_interval(),
        config.stream_interval(),
        config.buffer_capacity
    );

    session.start_auto_refresh()?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Interrupted, shutting down");
    };
    if let Some(error) = session
        .watch(config.stream_interval(), shutdown, render)
        .await
    {
        eprintln!("Auto-refresh stopped: {}", error);
    }

    session.shutdown();
    println!("\n{}", session.monitor().generate_report());
    Ok(())
}

fn render(snapshot: &SessionSnapshot) {
    let Some(label) = snapshot.chart.labels.last() else {
        return;
    };

    let mut line = format!(
        "[{}] refresh {}, replay {}:",
        label,
        snapshot.loop_state.name(),
        snapshot.stream_state.name()
    );
    for series in &snapshot.chart.series {
        let latest = series.values.last().copied().unwrap_or_default();
        line.push_str(&format!(
            " {}={:.2} (avg {:.2})",
            series.channel, latest, series.average
        ));
    }
    println!("{}", line);

    if let Some(prediction) = &snapshot.prediction {
        if let Some(meta) = &prediction.meta {
            let confidence = meta
                .probability
                .map(|p| format!(" ({:.1}%)", p * 100.0))
                .unwrap_or_default();
            println!("  meta-model: {}{}", meta.class_label, confidence);
        }
        if prediction.agreement().is_none() && !prediction.base_models.is_empty() {
            println!("  base models disagree");
        }
    }
}
