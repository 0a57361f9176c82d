//! Output naming: which files a post turns into.
//!
//! Pure functions; the same post always yields the same units in the same order.

use crate::domain::Post;

/// Media basenames are cut to this many characters.
const MEDIA_ID_WIDTH: usize = 16;

/// One captioned output for a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    /// Per-author directory under the output root.
    pub dir_name: String,
    /// Downloaded source media file; empty for non-media units.
    pub raw_file_name: String,
    pub captioned_file_name: String,
    pub is_media: bool,
    pub media_url: Option<String>,
}

/// `{author_id}_{screen_name}`
pub fn author_dir_name(post: &Post) -> String {
    format!("{}_{}", post.author.id, post.author.screen_name)
}

/// One unit per attached media item, or a single non-media unit.
///
/// The quoted post does not change file names; it only contributes caption text.
pub fn plan_units(post: &Post, _quoted: Option<&Post>) -> Vec<OutputUnit> {
    let dir_name = author_dir_name(post);

    if post.media.is_empty() {
        return vec![OutputUnit {
            captioned_file_name: format!("{dir_name}_{}_caption.png", post.id),
            dir_name,
            raw_file_name: String::new(),
            is_media: false,
            media_url: None,
        }];
    }

    post.media
        .iter()
        .map(|media| {
            let media_name = media_name(&media.url);
            OutputUnit {
                raw_file_name: format!("{dir_name}_{}_{media_name}.png", post.id),
                captioned_file_name: format!("{dir_name}_{}_{media_name}_caption.png", post.id),
                dir_name: dir_name.clone(),
                is_media: true,
                media_url: Some(media.url.clone()),
            }
        })
        .collect()
}

/// Name of the redirect page written next to the captioned files.
pub fn redirect_file_name(post: &Post) -> String {
    format!("{}_{}.html", author_dir_name(post), post.id)
}

fn media_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let base = path.rsplit('/').next().unwrap_or(path);
    base.chars().take(MEDIA_ID_WIDTH).collect()
}
