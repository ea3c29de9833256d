use crate::storage::note::{Category, Note};

/// Filter the sorted view down to what should be displayed: an optional
/// category match AND a case-insensitive substring search over title and
/// content. Both inputs empty means pass-through. Stateless; callers
/// re-invoke whenever the view, query, or filter changes.
pub fn filter_notes(notes: &[Note], category: Option<Category>, query: &str) -> Vec<Note> {
    let query = query.to_lowercase();
    notes
        .iter()
        .filter(|note| category.is_none_or(|c| note.category == c))
        .filter(|note| {
            query.is_empty()
                || note.title.to_lowercase().contains(&query)
                || note.content.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, title: &str, content: &str, category: Category) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn fixture() -> Vec<Note> {
        vec![
            note("1", "Standup notes", "talk about the Rollout", Category::Work),
            note("2", "Groceries", "milk and bread", Category::Todo),
            note("3", "App idea", "notes app with rollout plan", Category::Idea),
        ]
    }

    #[test]
    fn no_filters_is_identity() {
        let notes = fixture();
        assert_eq!(filter_notes(&notes, None, ""), notes);
    }

    #[test]
    fn category_filter_keeps_only_that_category() {
        let result = filter_notes(&fixture(), Some(Category::Work), "");
        assert_eq!(result.len(), 1);
        assert!(result.iter().all(|n| n.category == Category::Work));
    }

    #[test]
    fn query_matches_title_or_content_case_insensitively() {
        let result = filter_notes(&fixture(), None, "ROLLOUT");
        let ids: Vec<_> = result.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn category_and_query_compose_with_and_semantics() {
        let result = filter_notes(&fixture(), Some(Category::Idea), "rollout");
        let ids: Vec<_> = result.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["3"]);

        // A note matched by neither predicate never leaks through.
        assert!(filter_notes(&fixture(), Some(Category::Todo), "rollout").is_empty());
    }

    #[test]
    fn query_without_any_match_yields_nothing() {
        assert!(filter_notes(&fixture(), None, "zebra").is_empty());
    }

    #[test]
    fn input_order_is_preserved() {
        let result = filter_notes(&fixture(), None, "notes");
        let ids: Vec<_> = result.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }
}
