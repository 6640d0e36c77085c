//! HTML and XML rendering for the public site

use askama::Template;
use chrono::{DateTime, Utc};
use serde_json::Value;

use pagehost_core::{Block, BlockKind, NavEntry, RenderedPage};

/// One entry of the site navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: String,
    pub label: String,
    pub active: bool,
}

impl NavLink {
    fn from_entry(entry: &NavEntry, current_path: &str) -> Self {
        let href = entry.href();
        Self {
            active: href == current_path,
            label: entry.nav_label.clone(),
            href,
        }
    }
}

pub fn nav_links(entries: &[NavEntry], current_path: &str) -> Vec<NavLink> {
    entries
        .iter()
        .map(|entry| NavLink::from_entry(entry, current_path))
        .collect()
}

/// Template-ready view of a content block
///
/// Block data is free-form JSON; only string values under the known keys
/// are shown, everything as escaped plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockView {
    pub is_hero: bool,
    pub heading: String,
    pub subheading: String,
    pub paragraphs: Vec<String>,
    pub cta_label: String,
    pub cta_url: String,
    pub image_src: String,
    pub image_alt: String,
    pub caption: String,
}

impl BlockView {
    pub fn from_block(block: &Block) -> Self {
        let data = &block.data;
        match block.kind {
            BlockKind::Hero => Self {
                is_hero: true,
                heading: text(data, &["title", "heading"]),
                subheading: text(data, &["subtitle", "subheading"]),
                paragraphs: paragraphs(&text(data, &["body", "text"])),
                cta_label: text(data, &["cta_label"]),
                cta_url: safe_url(&text(data, &["cta_url"])),
                ..Default::default()
            },
            BlockKind::Image => Self {
                image_src: safe_url(&text(data, &["src", "url"])),
                image_alt: text(data, &["alt"]),
                caption: text(data, &["caption"]),
                ..Default::default()
            },
        }
    }
}

/// First non-empty string found under `keys`
fn text(data: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Split on blank lines
fn paragraphs(body: &str) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep only links a visitor can follow safely; anything else is dropped
fn safe_url(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| lower.starts_with(prefix));
    if allowed && !lower.starts_with("//") {
        raw.to_string()
    } else {
        String::new()
    }
}

#[derive(Template)]
#[template(path = "page_detail.html")]
pub struct PageTemplate {
    pub title: String,
    pub site_name: String,
    pub nav: Vec<NavLink>,
    pub sections: Vec<BlockView>,
    pub preview: bool,
    pub published: bool,
}

impl PageTemplate {
    pub fn new(rendered: &RenderedPage, site_name: &str, preview: bool) -> Self {
        let current_path = rendered.page.path();
        Self {
            title: rendered.page.title.clone(),
            site_name: site_name.to_string(),
            nav: nav_links(&rendered.nav, &current_path),
            sections: rendered.blocks.iter().map(BlockView::from_block).collect(),
            preview,
            published: rendered.page.is_published,
        }
    }
}

#[derive(Template)]
#[template(path = "home_placeholder.html")]
pub struct PlaceholderTemplate {
    pub title: String,
    pub site_name: String,
    pub nav: Vec<NavLink>,
}

impl PlaceholderTemplate {
    pub fn new(site_name: &str) -> Self {
        Self {
            title: "Coming soon".to_string(),
            site_name: site_name.to_string(),
            nav: Vec::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "site_404.html")]
pub struct NotFoundTemplate {
    pub title: String,
    pub site_name: String,
    pub nav: Vec<NavLink>,
    pub path: String,
}

impl NotFoundTemplate {
    pub fn new(site_name: &str, nav: &[NavEntry], path: &str) -> Self {
        Self {
            title: "Page not found".to_string(),
            site_name: site_name.to_string(),
            nav: nav_links(nav, path),
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: String,
}

impl SitemapUrl {
    pub fn new(base_url: &str, path: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            loc: format!("{}{}", base_url.trim_end_matches('/'), path),
            lastmod: updated_at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "sitemap.xml")]
pub struct SitemapTemplate {
    pub urls: Vec<SitemapUrl>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pagehost_core::{Page, TenantId};
    use serde_json::json;

    fn block(kind: BlockKind, data: Value) -> Block {
        Block {
            id: 1,
            page_id: 1,
            kind,
            order: 0,
            data,
        }
    }

    fn nav_entry(slug: &str, label: &str, is_home: bool) -> NavEntry {
        NavEntry {
            slug: slug.to_string(),
            nav_label: label.to_string(),
            is_home,
            title: label.to_string(),
        }
    }

    #[test]
    fn test_hero_block_view() {
        let view = BlockView::from_block(&block(
            BlockKind::Hero,
            json!({
                "heading": "Welcome",
                "subtitle": "to Acme",
                "body": "First.\n\n\nSecond.",
                "cta_label": "Shop",
                "cta_url": "/shop/"
            }),
        ));
        assert!(view.is_hero);
        assert_eq!(view.heading, "Welcome");
        assert_eq!(view.subheading, "to Acme");
        assert_eq!(view.paragraphs, vec!["First.", "Second."]);
        assert_eq!(view.cta_url, "/shop/");
    }

    #[test]
    fn test_image_block_view() {
        let view = BlockView::from_block(&block(
            BlockKind::Image,
            json!({ "url": "https://cdn.test/a.png", "alt": "A", "caption": 7 }),
        ));
        assert!(!view.is_hero);
        assert_eq!(view.image_src, "https://cdn.test/a.png");
        assert_eq!(view.image_alt, "A");
        // Non-string values are ignored
        assert_eq!(view.caption, "");
    }

    #[test]
    fn test_unsafe_urls_dropped() {
        assert_eq!(safe_url("javascript:alert(1)"), "");
        assert_eq!(safe_url("//evil.test/x"), "");
        assert_eq!(safe_url("data:text/html,hi"), "");
        assert_eq!(safe_url("HTTPS://ok.test"), "HTTPS://ok.test");
        assert_eq!(safe_url("#top"), "#top");
    }

    #[test]
    fn test_nav_links_mark_active() {
        let links = nav_links(
            &[nav_entry("home", "Home", true), nav_entry("about", "About", false)],
            "/about/",
        );
        assert_eq!(links[0].href, "/");
        assert!(!links[0].active);
        assert_eq!(links[1].href, "/about/");
        assert!(links[1].active);
    }

    #[test]
    fn test_page_template_escapes_content() {
        let now = Utc::now();
        let rendered = RenderedPage {
            page: Page {
                id: 1,
                tenant_id: TenantId::new(),
                slug: "about".to_string(),
                title: "About".to_string(),
                is_published: false,
                published_at: None,
                is_home: false,
                nav_label: "About".to_string(),
                nav_order: 0,
                created_at: now,
                updated_at: now,
            },
            blocks: vec![block(
                BlockKind::Hero,
                json!({ "title": "<script>alert(1)</script>" }),
            )],
            nav: vec![],
        };

        let html = PageTemplate::new(&rendered, "Acme", true).render().unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("Preview (not published)"));
        assert!(html.contains("About | Acme"));
    }

    #[test]
    fn test_not_found_template() {
        let html = NotFoundTemplate::new("Acme", &[nav_entry("home", "Home", true)], "/missing/")
            .render()
            .unwrap();
        assert!(html.contains("/missing/"));
        assert!(html.contains("href=\"/\""));
    }

    #[test]
    fn test_sitemap_template() {
        let updated = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let xml = SitemapTemplate {
            urls: vec![
                SitemapUrl::new("https://acme.test/", "/", updated),
                SitemapUrl::new("https://acme.test", "/about/", updated),
            ],
        }
        .render()
        .unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://acme.test/</loc>"));
        assert!(xml.contains("<loc>https://acme.test/about/</loc>"));
        assert!(xml.contains("<lastmod>2024-03-09</lastmod>"));
    }
}
