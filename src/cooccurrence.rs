//! Co-occurrence ranking against a fixed anchor tag.

use crate::month::BucketedRecord;
use std::collections::HashMap;

/// Anchor tag whose companions are ranked.
pub const ANCHOR_TAG: &str = "python";

/// Number of companion tags returned.
pub const COOCCURRENCE_TOP_N: usize = 10;

/// Group tags by question id, keeping record order within a group. Groups are
/// ordered by id: numeric ids numerically, then any other ids as text.
/// Records without an id belong to no group.
pub fn question_groups(records: &[BucketedRecord]) -> Vec<Vec<&str>> {
    let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();
    for bucketed in records {
        let Some(id) = bucketed.record.question_id.as_deref() else {
            continue;
        };
        groups.entry(id).or_default().push(bucketed.record.tag.as_str());
    }

    let mut ordered: Vec<(&str, Vec<&str>)> = groups.into_iter().collect();
    ordered.sort_by(|a, b| id_sort_key(a.0).cmp(&id_sort_key(b.0)));
    ordered.into_iter().map(|(_, tags)| tags).collect()
}

fn id_sort_key(id: &str) -> (bool, i64, &str) {
    match id.trim().parse::<i64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

/// Rank the tags that share a question with `anchor`.
///
/// Every occurrence in a matching group is tallied. Highest count first, ties
/// in first-encountered order, at most `top_n` entries. No matching group
/// yields an empty list.
pub fn co_occurring_tags(records: &[BucketedRecord], anchor: &str, top_n: usize) -> Vec<(String, u64)> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut tally: Vec<(&str, u64)> = Vec::new();

    for group in question_groups(records) {
        if !group.contains(&anchor) {
            continue;
        }
        for tag in group {
            if tag == anchor {
                continue;
            }
            match position.get(tag) {
                Some(&i) => tally[i].1 += 1,
                None => {
                    position.insert(tag, tally.len());
                    tally.push((tag, 1));
                }
            }
        }
    }

    // stable sort keeps first-encountered order for ties
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
        .into_iter()
        .take(top_n)
        .map(|(tag, count)| (tag.to_string(), count))
        .collect()
}
