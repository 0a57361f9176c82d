//! Caption text for a post, in rendering order.

use crate::domain::{BotIdentity, Post};

/// Ordered caption lines: what was said, where it came from, known
/// limitations, and who generated the image.
pub fn caption_lines(post: &Post, quoted: Option<&Post>, bot: &BotIdentity) -> Vec<String> {
    let signature = bot.signature();
    let mut lines = vec![format!("{} tweeted: {}", post.id, post.text)];

    if let Some(quoted) = quoted {
        lines.push(format!(
            "Quoting {} by @{}: {}",
            quoted.id, quoted.author.screen_name, quoted.text
        ));
    }

    lines.push(format!(
        "Tweet published at {} *** Tweet ID: {} *** User ID: {}",
        post.created_at.format("%a %b %d %H:%M:%S %z %Y"),
        post.id,
        post.author.id
    ));

    if post.contains_video() {
        lines.push(format!(
            "{signature} cannot properly captionize video tweets for now."
        ));
    }
    if post.contains_gif() {
        lines.push(format!(
            "{signature} cannot properly captionize tweets with GIF images for now."
        ));
    }

    lines.push(format!(
        "Generated by {signature}. The bot is currently at its early beta stage. \
         Use at your own risk! Feedbacks are appreciated 😇"
    ));
    lines
}
