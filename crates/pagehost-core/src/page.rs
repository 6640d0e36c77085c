//! Pages, content blocks and the save rules that keep a tenant's page set consistent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::slug::{PAGE_SLUG_MAX, slugify, validate_slug};
use crate::tenant::TenantId;
use crate::{Error, Result};

pub type PageId = i64;
pub type BlockId = i64;

/// Maximum page title length
pub const PAGE_TITLE_MAX: usize = 200;

/// Maximum navigation label length
pub const NAV_LABEL_MAX: usize = 80;

/// A tenant page. Content lives in its blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub tenant_id: TenantId,
    pub slug: String,
    pub title: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_home: bool,
    pub nav_label: String,
    pub nav_order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Public path of the page on its tenant's site
    pub fn path(&self) -> String {
        page_path(self.is_home, &self.slug)
    }
}

fn page_path(is_home: bool, slug: &str) -> String {
    if is_home {
        "/".to_string()
    } else {
        format!("/{}/", slug)
    }
}

/// Editable page fields, as submitted by the admin surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInput {
    pub tenant_id: TenantId,
    pub title: String,
    /// Derived from the title when left empty
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_home: bool,
    /// Falls back to the title when left empty
    #[serde(default)]
    pub nav_label: String,
    #[serde(default)]
    pub nav_order: u32,
}

/// A validated page row ready to be written.
///
/// Produced by [`PageInput::prepare`]; the store still has to clear the home
/// flag on the tenant's other pages when `is_home` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPage {
    pub tenant_id: TenantId,
    pub slug: String,
    pub title: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_home: bool,
    pub nav_label: String,
    pub nav_order: u32,
}

impl PageInput {
    /// Validate the input and apply the save rules.
    ///
    /// `previous_published_at` is the stored value when editing an existing
    /// page; it survives unpublishing so the first publication date is kept.
    pub fn prepare(
        self,
        previous_published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<PreparedPage> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
        if title.chars().count() > PAGE_TITLE_MAX {
            return Err(Error::Validation(format!(
                "title must be at most {} characters",
                PAGE_TITLE_MAX
            )));
        }

        let slug = match self.slug.trim() {
            "" => slugify(&title, PAGE_SLUG_MAX),
            given => given.to_string(),
        };
        validate_slug("slug", &slug, PAGE_SLUG_MAX)?;

        let nav_label = match self.nav_label.trim() {
            "" => title.chars().take(NAV_LABEL_MAX).collect(),
            given => given.to_string(),
        };
        if nav_label.chars().count() > NAV_LABEL_MAX {
            return Err(Error::Validation(format!(
                "nav_label must be at most {} characters",
                NAV_LABEL_MAX
            )));
        }

        let published_at = match previous_published_at {
            Some(at) => Some(at),
            None if self.is_published => Some(now),
            None => None,
        };

        Ok(PreparedPage {
            tenant_id: self.tenant_id,
            slug,
            title,
            is_published: self.is_published,
            published_at,
            is_home: self.is_home,
            nav_label,
            nav_order: self.nav_order,
        })
    }
}

/// Admin listing filter for pages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFilter {
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub is_home: Option<bool>,
    /// Case-insensitive match against title, slug and nav label
    #[serde(default)]
    pub search: Option<String>,
}

/// The slice of a published page needed to draw site navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub slug: String,
    pub nav_label: String,
    pub is_home: bool,
    pub title: String,
}

impl NavEntry {
    pub fn href(&self) -> String {
        page_path(self.is_home, &self.slug)
    }
}

impl From<&Page> for NavEntry {
    fn from(page: &Page) -> Self {
        Self {
            slug: page.slug.clone(),
            nav_label: page.nav_label.clone(),
            is_home: page.is_home,
            title: page.title.clone(),
        }
    }
}

/// Content block flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Hero,
    Image,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Hero => "hero",
            BlockKind::Image => "image",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hero" => Ok(BlockKind::Hero),
            "image" => Ok(BlockKind::Image),
            other => Err(Error::Validation(format!("Unknown block kind: {}", other))),
        }
    }
}

/// One ordered piece of page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub page_id: PageId,
    pub kind: BlockKind,
    pub order: u32,
    /// Free-form JSON object interpreted per kind
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInput {
    pub kind: BlockKind,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl BlockInput {
    pub fn validate(&self) -> Result<()> {
        if !self.data.is_object() {
            return Err(Error::Validation(
                "block data must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bulk actions offered on a page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    Publish,
    Unpublish,
    MakeHome,
}

impl PageAction {
    /// Operator-facing summary of an applied action
    pub fn message(&self, count: u64) -> String {
        match self {
            PageAction::Publish => format!("Published {} page(s).", count),
            PageAction::Unpublish => format!("Unpublished {} page(s).", count),
            PageAction::MakeHome => format!("Set {} page(s) as home.", count),
        }
    }
}
