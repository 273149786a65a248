//! Property-based test generators using proptest.

use proptest::prelude::*;

/// Strategy for generating post text from a small vocabulary, so that
/// queries actually hit.
pub fn post_text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "flask", "rust", "help", "search", "index", "team", "post", "commit",
        ]),
        1..8,
    )
    .prop_map(|words| words.join(" "))
}

/// One step of a random post workload.
#[derive(Debug, Clone)]
pub enum PostOp {
    /// Insert a post with this title and description.
    Insert(String, String),
    /// Update the n-th live post (modulo the live count).
    Update(usize, String),
    /// Delete the n-th live post (modulo the live count).
    Delete(usize),
}

/// Strategy for one workload step.
pub fn post_op_strategy() -> impl Strategy<Value = PostOp> {
    prop_oneof![
        3 => (post_text_strategy(), post_text_strategy())
            .prop_map(|(title, description)| PostOp::Insert(title, description)),
        1 => (any::<usize>(), post_text_strategy())
            .prop_map(|(n, description)| PostOp::Update(n, description)),
        1 => any::<usize>().prop_map(PostOp::Delete),
    ]
}

/// Strategy for a workload of transactions, each a list of steps.
pub fn workload_strategy() -> impl Strategy<Value = Vec<Vec<PostOp>>> {
    prop::collection::vec(prop::collection::vec(post_op_strategy(), 1..5), 1..10)
}
