//! Command handlers. Each one bootstraps what it needs from the config; the
//! `cache buckets` and `cache clear` handlers touch storage only and never
//! reach the network.

use std::path::Path;

use chargemap_cache::{CacheStorage, DiskCacheStorage, SeedOutcome};
use chargemap_client::{render_svg, LoadState, MapView, PageContext};
use chargemap_core::{status_text, AppConfig};

use crate::FilterArgs;

pub(crate) fn apply_filters(view: &mut MapView, filters: &FilterArgs) {
    if let Some(search) = &filters.search {
        view.set_search(search);
    }
    if !filters.statuses.is_empty() {
        view.set_status_filters(filters.statuses.iter().flat_map(|s| s.split(',')));
    }
}

async fn load_filtered_view(config: &AppConfig, filters: &FilterArgs) -> anyhow::Result<MapView> {
    let page = PageContext::bootstrap(config).await?;
    let mut view = page.load_view().await;
    page.shutdown().await;

    if let LoadState::Failed(message) = view.load_state() {
        anyhow::bail!("{message}");
    }
    apply_filters(&mut view, filters);
    Ok(view)
}

/// One output line per location: id, name, status, city and pixel position.
pub(crate) fn format_rows(view: &MapView) -> Vec<String> {
    let projection = view.projection();
    view.filtered()
        .into_iter()
        .map(|location| {
            let pixel = projection.project(location.coordinates);
            format!(
                "{id}\t{name}\t{status}\t{zip} {city}\t({x:.1}, {y:.1})",
                id = location.location_id,
                name = location.address.name,
                status = status_text(location.status.as_deref()),
                zip = location.address.zip_code,
                city = location.address.city,
                x = pixel.x,
                y = pixel.y,
            )
        })
        .collect()
}

/// Prints the filtered locations and the result count.
///
/// # Errors
///
/// Returns an error if the page cannot be bootstrapped or the load fails.
pub(crate) async fn run_list(config: &AppConfig, filters: &FilterArgs) -> anyhow::Result<()> {
    let view = load_filtered_view(config, filters).await?;
    for row in format_rows(&view) {
        println!("{row}");
    }
    if view.is_offline() {
        println!("{} (offline)", view.count_text());
    } else {
        println!("{}", view.count_text());
    }
    Ok(())
}

/// Writes the filtered map to `out` as SVG.
///
/// # Errors
///
/// Returns an error if the load fails or the file cannot be written.
pub(crate) async fn run_render(
    config: &AppConfig,
    filters: &FilterArgs,
    out: &Path,
) -> anyhow::Result<()> {
    let view = load_filtered_view(config, filters).await?;
    tokio::fs::write(out, render_svg(&view)).await?;
    println!("{} written to {}", view.count_text(), out.display());
    Ok(())
}

/// Registers the offline worker and prints each seed's outcome.
///
/// # Errors
///
/// Returns an error if the page cannot be bootstrapped or registration
/// failed.
pub(crate) async fn run_cache_install(config: &AppConfig) -> anyhow::Result<()> {
    let page = PageContext::bootstrap(config).await?;
    page.shutdown().await;
    let Some(registration) = page.registration() else {
        anyhow::bail!("offline worker registration failed; see logs for the cause");
    };

    for seed in &registration.install.seeds {
        match seed {
            SeedOutcome::Cached { url } => println!("cached\t{url}"),
            SeedOutcome::Skipped { url, status } => println!("skipped\t{url}\tHTTP {status}"),
            SeedOutcome::Failed { url, reason } => println!("failed\t{url}\t{reason}"),
        }
    }
    for bucket in &registration.activate.evicted {
        println!("evicted\t{bucket}");
    }
    println!("{}", registration.readiness.message());
    Ok(())
}

/// Prints every bucket name under the cache directory.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be read.
pub(crate) async fn run_cache_buckets(config: &AppConfig) -> anyhow::Result<()> {
    let storage = DiskCacheStorage::new(&config.cache_dir);
    for bucket in storage.keys().await? {
        println!("{bucket}");
    }
    Ok(())
}

/// Deletes every bucket and returns how many were removed.
pub(crate) async fn clear_buckets(storage: &dyn CacheStorage) -> anyhow::Result<usize> {
    let mut removed = 0;
    for bucket in storage.keys().await? {
        if storage.delete(&bucket).await? {
            tracing::info!(%bucket, "deleted cache bucket");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Deletes every bucket under the cache directory.
///
/// # Errors
///
/// Returns an error if a bucket cannot be listed or deleted.
pub(crate) async fn run_cache_clear(config: &AppConfig) -> anyhow::Result<()> {
    let storage = DiskCacheStorage::new(&config.cache_dir);
    let removed = clear_buckets(&storage).await?;
    println!("removed {removed} cache buckets");
    Ok(())
}
