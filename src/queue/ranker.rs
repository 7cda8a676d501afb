use std::cmp::Ordering;

use crate::models::Item;

/// Queue order: more upvotes first, then earlier submissions, then item id.
///
/// Downvotes are tracked on the item but do not lower its position.
pub fn compare(a: &Item, b: &Item) -> Ordering {
    b.upvotes
        .cmp(&a.upvotes)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by(compare);
    items
}
