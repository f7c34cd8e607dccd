//! Announcement text and the tag-number contract
//!
//! The status template always places the tag number as the first run of
//! digits in the post. [`announced_tag_number`] relies on that to recover the
//! last announced tag from the account's own timeline, so the two must change
//! together.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::TagSnapshot;

static RE_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|&#?[A-Za-z0-9]+;").unwrap());
static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Status text announcing a tag
pub fn status_text(tag: &TagSnapshot) -> String {
    format!(
        "Seattle BikeTag!\n\n\
         This is bike tag number {} by {}.\n\
         Find this mystery location and move the tag to your favorite spot. \
         The latest tag, instructions, and a hint are at https://seattle.biketag.org\n\
         \n\
         #SeattleBikeTag #SeaBikes #BikeSeattle",
        tag.number, tag.credit
    )
}

/// Alt text attached to the uploaded tag image
pub fn alt_text(tag: &TagSnapshot) -> String {
    format!(
        "{}'s bike at SeattleBikeTag mystery location #{}.",
        tag.credit, tag.number
    )
}

/// Tag number announced by a post, read as its first run of digits
///
/// HTML markup and character entities are ignored so that rendered statuses
/// parse the same as the plain text that was posted. Posts without digits
/// (or unrelated to the game) count as tag 0.
pub fn announced_tag_number(post_text: &str) -> u64 {
    let plain = RE_MARKUP.replace_all(post_text, " ");
    RE_DIGITS
        .find(&plain)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
