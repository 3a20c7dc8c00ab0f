//! Generator module - renders the listing and post pages into the public dir
//!
//! Layout of the output:
//!
//! - `index.html`: the first listing page
//! - `page/N/index.html`: the listing after N-1 "load more" merges
//! - `post/<uid>/index.html`: posts of the first listing page (the static paths)
//! - `post/_fallback.html`: the loading placeholder for every other post

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context;

use crate::config::SiteConfig;
use crate::content::{ContentSource, PostDetail, Sanitizer};
use crate::helpers::{self, reading, DateFormatter};
use crate::i18n::I18n;
use crate::listing::{self, ListingState};
use crate::templates::{
    ConfigData, PaginationData, PostCardData, PostPageData, SectionData, TemplateRenderer,
};
use crate::Spacetraveling;

/// File name of the loading placeholder under `post/`
pub const FALLBACK_FILE: &str = "_fallback.html";

/// What the post view shows
#[derive(Debug, Clone)]
pub enum DetailView {
    /// The post is still being resolved
    Loading,
    Ready(Box<PostDetail>),
}

/// Outcome of a full generation
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    /// Listing pages written
    pub listing_pages: usize,
    /// Posts listed across all pages
    pub listed_posts: usize,
    /// Slugs of the pre-rendered posts
    pub rendered_posts: Vec<String>,
}

/// Static site generator backed by a content source
pub struct Generator {
    app: Spacetraveling,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    dates: DateFormatter,
    i18n: I18n,
    sanitizer: Sanitizer,
}

impl Generator {
    /// Create a new generator
    pub fn new(app: &Spacetraveling, source: Arc<dyn ContentSource>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let dates = DateFormatter::from_config(&app.config)?;

        let mut i18n = I18n::with_builtin(&app.config.language)?;
        i18n.load_languages(app.base_dir.join("languages"))?;

        Ok(Self {
            app: app.clone(),
            source,
            renderer,
            dates,
            i18n,
            sanitizer: Sanitizer::new(),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.app.config
    }

    pub fn source(&self) -> &dyn ContentSource {
        self.source.as_ref()
    }

    pub fn dates(&self) -> &DateFormatter {
        &self.dates
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.app.public_dir)?;

        let prismic = &self.app.config.prismic;
        let mut state = listing::first_page(self.source(), prismic, &self.dates).await?;

        // Only the first page is pre-rendered; the rest go through the fallback
        let static_paths: Vec<String> = state.uids().map(str::to_string).collect();

        self.write_listing(&state)?;
        let mut listing_pages = 1;

        while state.cursor.has_next() {
            if listing_pages >= listing::MAX_PAGES {
                tracing::warn!(
                    "Stopped after {} listing pages, the content source keeps paginating",
                    listing_pages
                );
                break;
            }
            state = listing::load_more(self.source(), state, &self.dates).await?;
            self.write_listing(&state)?;
            listing_pages += 1;
        }

        let mut rendered_posts = Vec::new();
        for uid in static_paths {
            if !helpers::is_safe_slug(&uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", uid);
                continue;
            }
            self.generate_post(&uid).await?;
            rendered_posts.push(uid);
        }

        let fallback = self.render_detail(&DetailView::Loading)?;
        write_file(&self.fallback_path(), &fallback)?;

        Ok(GenerateReport {
            listing_pages,
            listed_posts: state.posts.len(),
            rendered_posts,
        })
    }

    /// Fetch one post and write its page
    pub async fn generate_post(&self, uid: &str) -> Result<PathBuf> {
        let path = self.post_output_path(uid)?;
        let doc = self
            .source
            .fetch_by_key(&self.app.config.prismic.content_type, uid)
            .await?;

        let html = self.render_detail(&DetailView::Ready(Box::new(PostDetail::from(doc))))?;
        write_file(&path, &html)?;
        tracing::debug!("Generated post {:?}", path);
        Ok(path)
    }

    /// Where the page of a post is written
    pub fn post_output_path(&self, uid: &str) -> Result<PathBuf> {
        if !helpers::is_safe_slug(uid) {
            bail!("Invalid post uid: {:?}", uid);
        }
        Ok(self.app.public_dir.join("post").join(uid).join("index.html"))
    }

    /// Where the loading placeholder is written
    pub fn fallback_path(&self) -> PathBuf {
        self.app.public_dir.join("post").join(FALLBACK_FILE)
    }

    /// Where the listing for `page` is written
    fn listing_output_path(&self, page: usize) -> PathBuf {
        if page <= 1 {
            self.app.public_dir.join("index.html")
        } else {
            self.app
                .public_dir
                .join("page")
                .join(page.to_string())
                .join("index.html")
        }
    }

    fn write_listing(&self, state: &ListingState) -> Result<()> {
        let html = self.render_listing(state)?;
        write_file(&self.listing_output_path(state.cursor.current_page), &html)
    }

    /// Render the listing view
    pub fn render_listing(&self, state: &ListingState) -> Result<String> {
        let root = &self.app.config.root;

        let posts: Vec<PostCardData> = state
            .posts
            .iter()
            .map(|p| PostCardData {
                title: p.title.clone(),
                subtitle: p.subtitle.clone(),
                author: p.author.clone(),
                date: p.display_date.clone(),
                datetime: p.first_publication_date.clone().unwrap_or_default(),
                href: p.uid.as_deref().map(|uid| helpers::post_path(root, uid)),
            })
            .collect();

        let current = state.cursor.current_page;
        let pagination = PaginationData {
            current,
            next_link: state
                .cursor
                .has_next()
                .then(|| helpers::listing_path(root, current + 1)),
        };

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("pagination", &pagination);
        self.renderer.render("index.html", &context)
    }

    /// Render the post view, or its loading placeholder
    pub fn render_detail(&self, view: &DetailView) -> Result<String> {
        let context = self.base_context();
        match view {
            DetailView::Loading => self.renderer.render("loading.html", &context),
            DetailView::Ready(post) => {
                let mut context = context;
                context.insert("post", &self.post_page_data(post));
                self.renderer.render("post.html", &context)
            }
        }
    }

    /// Render the page shown for unknown posts
    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.render("not_found.html", &self.base_context())
    }

    fn post_page_data(&self, post: &PostDetail) -> PostPageData {
        let minutes = reading::read_time(&post.content, self.app.config.reading.words_per_minute);

        PostPageData {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.dates.format(post.first_publication_date.as_deref()),
            datetime: post.first_publication_date.clone().unwrap_or_default(),
            read_time: self.i18n.get_count("minutes", minutes),
            banner: post
                .banner_url
                .clone()
                .unwrap_or_else(|| self.app.config.banner.clone()),
            sections: post
                .content
                .iter()
                .map(|section| SectionData {
                    heading: section.heading.clone(),
                    html: self.sanitizer.render(&section.body),
                })
                .collect(),
        }
    }

    fn base_context(&self) -> Context {
        let config = &self.app.config;
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: config.title.clone(),
                description: config.description.clone(),
                language: config.language.clone(),
                home: helpers::url_for(&config.root, ""),
                generator: format!("spacetraveling {}", env!("CARGO_PKG_VERSION")),
            },
        );
        context.insert("i18n", &self.i18n.get_all_translations());
        context
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::{doc, MemorySource};
    use crate::content::{ContentSection, RawPage, RichTextBlock};

    fn setup(source: MemorySource) -> (tempfile::TempDir, Generator) {
        let dir = tempfile::tempdir().unwrap();
        let app = Spacetraveling::with_config(dir.path(), SiteConfig::default());
        let generator = Generator::new(&app, Arc::new(source)).unwrap();
        (dir, generator)
    }

    fn three_pages() -> MemorySource {
        MemorySource::with_pages(vec![
            vec![doc("first-post", "First post", Some("2021-03-25T00:00:00Z"))],
            vec![doc("second-post", "Second post", Some("2021-03-20T00:00:00Z"))],
            vec![doc("third-post", "Third post", None)],
        ])
    }

    fn read(dir: &tempfile::TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join("public").join(path)).unwrap()
    }

    #[tokio::test]
    async fn test_generates_listing_pages_and_static_paths() {
        let (dir, generator) = setup(three_pages());
        let report = generator.generate().await.unwrap();

        assert_eq!(report.listing_pages, 3);
        assert_eq!(report.listed_posts, 3);
        assert_eq!(report.rendered_posts, vec!["first-post".to_string()]);

        let index = read(&dir, "index.html");
        assert!(index.contains("First post"));
        assert!(!index.contains("Second post"));
        assert!(index.contains(r#"href="/page/2/""#));
        assert!(index.contains(r#"href="/post/first-post/""#));
        assert!(index.contains("25 Mar 2021"));

        let page2 = read(&dir, "page/2/index.html");
        let first = page2.find("First post").unwrap();
        let second = page2.find("Second post").unwrap();
        assert!(first < second);
        assert!(page2.contains(r#"href="/page/3/""#));

        let page3 = read(&dir, "page/3/index.html");
        assert!(page3.contains("Third post"));
        assert!(page3.contains("Invalid Date"));
        assert!(!page3.contains("load-more"));

        assert!(dir.path().join("public/post/first-post/index.html").exists());
        assert!(!dir.path().join("public/post/second-post/index.html").exists());
        assert!(read(&dir, "post/_fallback.html").contains("Loading..."));
    }

    #[tokio::test]
    async fn test_self_referencing_next_page_terminates() {
        let page = |n: usize, uid: &str| RawPage {
            page: n,
            results_per_page: 1,
            results_size: 1,
            total_results_size: 0,
            total_pages: 0,
            next_page: Some("memory://page/2".to_string()),
            prev_page: None,
            results: vec![doc(uid, uid, None)],
        };
        let source = MemorySource::with_raw_pages(vec![page(1, "a"), page(2, "b")]);
        let (dir, generator) = setup(source);

        let report = generator.generate().await.unwrap();
        assert_eq!(report.listing_pages, 2);
        assert_eq!(report.listed_posts, 2);
        assert!(!read(&dir, "page/2/index.html").contains("load-more"));
    }

    #[tokio::test]
    async fn test_single_page_has_no_load_more() {
        let source = MemorySource::with_pages(vec![vec![doc("only", "Only", None)]]);
        let (dir, generator) = setup(source);
        let report = generator.generate().await.unwrap();

        assert_eq!(report.listing_pages, 1);
        assert!(!read(&dir, "index.html").contains("load-more"));
        assert!(!dir.path().join("public/page").exists());
    }

    #[tokio::test]
    async fn test_generate_post_renders_read_time() {
        let (dir, generator) = setup(three_pages());
        let path = generator.generate_post("second-post").await.unwrap();
        assert_eq!(path, dir.path().join("public/post/second-post/index.html"));

        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("<h1>Second post</h1>"));
        assert!(html.contains("20 Mar 2021"));
        // "First steps" + "Lorem ipsum dolor sit amet" = 7 words
        assert!(html.contains("1 min"));
        assert!(html.contains("<p>Lorem ipsum dolor sit amet</p>"));
        // no banner on the document, so the configured one is used
        assert!(html.contains("banner.png"));
    }

    #[tokio::test]
    async fn test_unknown_post_propagates_not_found() {
        let (_dir, generator) = setup(three_pages());
        let err = generator.generate_post("nope").await.unwrap_err();
        let source_err = err.downcast_ref::<crate::content::SourceError>().unwrap();
        assert!(source_err.is_not_found());
    }

    #[tokio::test]
    async fn test_unsafe_uid_is_rejected_before_fetching() {
        let source = three_pages();
        let (_dir, generator) = setup(source);
        assert!(generator.generate_post("../etc").await.is_err());
    }

    #[test]
    fn test_loading_view_is_not_the_content_view() {
        let (_dir, generator) = setup(three_pages());
        let html = generator.render_detail(&DetailView::Loading).unwrap();
        assert!(html.contains("Loading..."));
        assert!(!html.contains("post-content"));
        assert!(!html.contains("read-time"));
    }

    #[test]
    fn test_body_markup_is_sanitized() {
        let (_dir, generator) = setup(three_pages());
        let post = PostDetail {
            uid: Some("x".to_string()),
            first_publication_date: None,
            title: "X".to_string(),
            subtitle: String::new(),
            author: "Ana".to_string(),
            banner_url: Some("https://images.prismic.io/x.png".to_string()),
            content: vec![ContentSection {
                heading: "H".to_string(),
                body: vec![RichTextBlock {
                    kind: crate::content::richtext::BlockKind::Image,
                    url: Some("javascript:alert(1)".to_string()),
                    ..Default::default()
                }],
            }],
        };

        let html = generator
            .render_detail(&DetailView::Ready(Box::new(post)))
            .unwrap();
        assert!(!html.contains("javascript:"));
        assert!(html.contains("Invalid Date"));
    }
}
