use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of note categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    Work,
    Idea,
    Todo,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Work,
        Category::Idea,
        Category::Todo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Idea => "idea",
            Category::Todo => "todo",
        }
    }

    /// Next category in display order, used by the UI to cycle the filter.
    pub fn next(&self) -> Category {
        match self {
            Category::Personal => Category::Work,
            Category::Work => Category::Idea,
            Category::Idea => Category::Todo,
            Category::Todo => Category::Personal,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single note. Field names on the wire are camelCase and timestamps are
/// integer milliseconds since epoch, matching the `data.json` export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields that may change on update. `None` leaves the stored value alone;
/// `id` and `created_at` are never touched.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
}
