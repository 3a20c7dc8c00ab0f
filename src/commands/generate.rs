//! Generate static files

use anyhow::Result;
use std::sync::Arc;

use crate::content::ContentSource;
use crate::generator::{GenerateReport, Generator};
use crate::Spacetraveling;

/// Generate the site from the configured repository
pub async fn run(app: &Spacetraveling) -> Result<()> {
    let source = app.content_source()?;
    run_with_source(app, source).await?;
    Ok(())
}

/// Generate the site from `source`
pub async fn run_with_source(
    app: &Spacetraveling,
    source: Arc<dyn ContentSource>,
) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(app, source)?;
    let report = generator.generate().await?;

    tracing::info!(
        "Listed {} posts on {} pages, pre-rendered {} posts",
        report.listed_posts,
        report.listing_pages,
        report.rendered_posts.len()
    );

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::testing::{doc, MemorySource};

    #[tokio::test]
    async fn test_generate_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = Spacetraveling::with_config(dir.path(), SiteConfig::default());
        let source = MemorySource::with_pages(vec![
            vec![doc("a", "A", Some("2021-03-25T00:00:00Z"))],
            vec![doc("b", "B", Some("2021-03-20T00:00:00Z"))],
        ]);

        let report = run_with_source(&app, Arc::new(source)).await.unwrap();
        assert_eq!(report.listing_pages, 2);
        assert_eq!(report.listed_posts, 2);
        assert_eq!(report.rendered_posts, vec!["a".to_string()]);
        assert!(app.public_dir.join("post/a/index.html").exists());
        assert!(!app.public_dir.join("post/b/index.html").exists());
    }
}
