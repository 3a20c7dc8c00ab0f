//! List the posts in the repository

use anyhow::Result;

use crate::content::ContentSource;
use crate::helpers::DateFormatter;
use crate::listing;
use crate::Spacetraveling;

/// Print every post, following the pagination to the end
pub async fn run(app: &Spacetraveling) -> Result<()> {
    let source = app.content_source()?;
    let dates = DateFormatter::from_config(&app.config)?;
    let lines = post_lines(source.as_ref(), app, &dates).await?;

    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }

    Ok(())
}

async fn post_lines(
    source: &dyn ContentSource,
    app: &Spacetraveling,
    dates: &DateFormatter,
) -> Result<Vec<String>> {
    let state =
        listing::load_pages(source, &app.config.prismic, dates, listing::MAX_PAGES).await?;

    Ok(state
        .posts
        .iter()
        .map(|post| {
            format!(
                "{} - {} [{}]",
                post.display_date,
                post.title,
                post.uid.as_deref().unwrap_or("-")
            )
        })
        .collect())
}
