//! Human-readable text rendering of users, posts, and comments.
//!
//! The output is stable plain text for terminals and logs. It is not a
//! canonical format; only the JSON wire format is normative.

use crate::graph::Relationship;
use crate::types::{Comment, Post, ProfileView, User};

/// Render a full user record.
///
/// ```text
/// Ada Lovelace <ada@example.com>
/// Analytical engines, mostly.
///
/// Location: London
/// Friends: 2  Pending requests: 1
///
/// id: 019526b2-f68a-7c3e-a0b4-1d2e3f4a5b6e  joined: 2026-02-18T12:02:00Z
/// ```
pub fn render_user(user: &User) -> String {
    let mut out = format!("{} <{}>\n", user.name, user.email);

    if let Some(bio) = &user.bio {
        out.push_str(&wrap(bio, 80));
        out.push('\n');
    }

    out.push('\n');
    if let Some(location) = &user.location {
        out.push_str(&format!("Location: {location}\n"));
    }
    out.push_str(&format!(
        "Friends: {}  Pending requests: {}\n",
        user.friends.len(),
        user.friend_requests.len()
    ));

    out.push('\n');
    out.push_str(&format!("id: {}  joined: {}\n", user.id, user.created_at));
    out
}

/// Render a list of profile views, one per line, under `title`.
pub fn render_profiles(title: &str, profiles: &[ProfileView]) -> String {
    let mut out = format!("{title} ({})\n", profiles.len());
    if profiles.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for p in profiles {
        out.push_str(&format!("  {}  {} <{}>\n", p.id, p.name, p.email));
    }
    out
}

pub fn render_relationship(other: &str, rel: Relationship) -> String {
    let label = match rel {
        Relationship::Myself => "this is you",
        Relationship::None => "not connected",
        Relationship::Friends => "friends",
        Relationship::RequestSent => "request sent, awaiting response",
        Relationship::RequestReceived => "request received, awaiting your response",
    };
    format!("{other}: {label}\n")
}

/// Render a post with its like count, followed by `comments` if any.
///
/// ```text
/// [019526b2-…] by 019526b2-…  ♥ 3
/// "Hello from the other side."
///
///   └ 019526b2-…: "nice"
/// ```
pub fn render_post(post: &Post, comments: &[Comment]) -> String {
    let mut out = format!(
        "[{}] by {}  \u{2665} {}\n",
        post.id,
        post.author,
        post.likes.len()
    );
    out.push_str(&wrap(&format!("\"{}\"", post.text), 80));
    out.push('\n');
    if let Some(image) = &post.image {
        out.push_str(&format!("Image: {image}\n"));
    }
    if !comments.is_empty() {
        out.push('\n');
        for c in comments {
            out.push_str(&format!("  \u{2514} {}: \"{}\"\n", c.author, c.text));
        }
    }
    out
}

/// Render a post list, newest first as returned by the server.
pub fn render_posts(posts: &[Post]) -> String {
    if posts.is_empty() {
        return "(no posts)\n".into();
    }
    posts
        .iter()
        .map(|p| render_post(p, &[]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap; continuation lines are indented by one space.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let indent = usize::from(!lines.is_empty());
        if !current.is_empty() && indent + current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| if i == 0 { l.clone() } else { format!(" {l}") })
        .collect::<Vec<_>>()
        .join("\n")
}
