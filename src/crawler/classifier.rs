//! Crawler detection.
//!
//! # Responsibilities
//! - Decide from the `User-Agent` and the request path whether a request
//!   should be served by the render service
//! - Hold the compiled user-agent and exclude patterns
//!
//! # Design Decisions
//! - Patterns compiled once at startup, immutable at runtime
//! - Case-sensitive matching, same as the catalog spelling
//! - The exclude subject is configurable, see [`ExcludeMatch`]

use regex::Regex;

use crate::config::validation::ValidationError;
use crate::config::ExcludeMatch;

/// User agents of search engines and link-preview services that cannot
/// execute client side scripts.
pub const BOT_USER_AGENTS: [&str; 16] = [
    "Baiduspider",
    "bingbot",
    "Embedly",
    "facebookexternalhit",
    "LinkedInBot",
    "outbrain",
    "pinterest",
    "quora link preview",
    "rogerbot",
    "showyoubot",
    "Slackbot",
    "TelegramBot",
    "Twitterbot",
    "vkShare",
    "W3C_Validator",
    "WhatsApp",
];

pub const STATIC_FILE_EXTENSIONS: [&str; 40] = [
    "ai", "avi", "css", "dat", "dmg", "doc", "exe", "flv", "gif", "ico", "iso", "jpeg", "jpg",
    "js", "less", "m4a", "m4v", "mov", "mp3", "mp4", "mpeg", "mpg", "pdf", "png", "ppt", "psd",
    "rar", "rss", "svg", "swf", "tif", "torrent", "ttf", "txt", "wav", "wmv", "woff", "xls",
    "xml", "zip",
];

/// Alternation of the escaped bot catalog.
pub fn default_user_agent_pattern() -> String {
    BOT_USER_AGENTS
        .iter()
        .map(|ua| regex::escape(ua))
        .collect::<Vec<_>>()
        .join("|")
}

/// Suffix match on any static file extension.
pub fn default_exclude_url_pattern() -> String {
    format!(r"\.({})$", STATIC_FILE_EXTENSIONS.join("|"))
}

/// Compiled classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    user_agent_pattern: Regex,
    exclude_pattern: Regex,
    exclude_match: ExcludeMatch,
}

impl Classifier {
    /// Compile the classifier, falling back to the built-in patterns.
    pub fn new(
        user_agent_pattern: Option<&str>,
        exclude_pattern: Option<&str>,
        exclude_match: ExcludeMatch,
    ) -> Result<Self, ValidationError> {
        let user_agent_pattern = match user_agent_pattern {
            Some(p) => compile("user agent pattern", p)?,
            None => compile("user agent pattern", &default_user_agent_pattern())?,
        };
        let exclude_pattern = match exclude_pattern {
            Some(p) => compile("exclude pattern", p)?,
            None => compile("exclude pattern", &default_exclude_url_pattern())?,
        };

        Ok(Self {
            user_agent_pattern,
            exclude_pattern,
            exclude_match,
        })
    }

    /// Returns true if the request should be rendered.
    pub fn should_render(&self, user_agent: &str, path: &str) -> bool {
        if user_agent.is_empty() || !self.user_agent_pattern.is_match(user_agent) {
            return false;
        }

        let subject = match self.exclude_match {
            ExcludeMatch::UserAgent => user_agent,
            ExcludeMatch::Path => path,
        };
        !self.exclude_pattern.is_match(subject)
    }

    pub fn exclude_match(&self) -> ExcludeMatch {
        self.exclude_match
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ValidationError> {
    Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern { field, source })
}
