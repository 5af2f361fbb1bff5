//! Robots.txt parser implementation
//!
//! Two precedence modes are supported. The default walks the matching groups in
//! file order and lets the last applicable `Allow`/`Disallow` line decide; the
//! longest-match mode defers to the robotstxt crate's standard matcher.

use crate::config::RobotsPrecedence;
use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    directive: Directive,
    pattern: String,
}

/// Parsed robots.txt rules for one user agent
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw body, kept for longest-match evaluation
    content: String,
    user_agent: String,
    precedence: RobotsPrecedence,
    rules: Vec<Rule>,
    crawl_delay: Option<Duration>,
    sitemaps: Vec<String>,
}

impl ParsedRobots {
    /// Parses a robots.txt body for the given agent token
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `user_agent` - Agent token matched against `User-agent:` lines
    /// * `precedence` - How conflicting Allow/Disallow lines are resolved
    pub fn parse(content: &str, user_agent: &str, precedence: RobotsPrecedence) -> Self {
        let agent = product_token(user_agent);
        let mut rules = Vec::new();
        let mut crawl_delay = None;
        let mut sitemaps = Vec::new();

        // Consecutive User-agent lines form one group
        let mut group_matches = false;
        let mut in_agent_lines = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_matches = false;
                    }
                    in_agent_lines = true;
                    if value == "*" || value.eq_ignore_ascii_case(&agent) {
                        group_matches = true;
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        sitemaps.push(value.to_string());
                    }
                }
                "allow" | "disallow" => {
                    in_agent_lines = false;
                    // An empty Disallow allows everything and adds no rule
                    if group_matches && !value.is_empty() {
                        rules.push(Rule {
                            directive: if key == "allow" {
                                Directive::Allow
                            } else {
                                Directive::Disallow
                            },
                            pattern: value.to_string(),
                        });
                    }
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    if group_matches {
                        if let Some(secs) = value
                            .parse::<f64>()
                            .ok()
                            .filter(|s| s.is_finite() && *s >= 0.0)
                        {
                            crawl_delay = Some(Duration::from_secs_f64(secs));
                        }
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        Self {
            content: content.to_string(),
            user_agent: agent,
            precedence,
            rules,
            crawl_delay,
            sitemaps,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used whenever robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            user_agent: "*".to_string(),
            precedence: RobotsPrecedence::LastDirective,
            rules: Vec::new(),
            crawl_delay: None,
            sitemaps: Vec::new(),
        }
    }

    /// Checks if a URL is allowed
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        match self.precedence {
            RobotsPrecedence::LastDirective => {
                let path = path_and_query(url);
                self.rules
                    .iter()
                    .filter(|rule| path_matches(&path, &rule.pattern))
                    .last()
                    .map(|rule| rule.directive == Directive::Allow)
                    .unwrap_or(true)
            }
            RobotsPrecedence::LongestMatch => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(&self.content, &self.user_agent, url.as_str())
            }
        }
    }

    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }

    /// All `Sitemap:` URLs, regardless of group
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

/// `LadderCrawl/1.0 (+https://...)` matches groups named `laddercrawl`
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or(user_agent)
        .to_string()
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Prefix match with `*` wildcards and a trailing `$` anchor
fn path_matches(path: &str, pattern: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    if !pattern.contains('*') {
        return if anchored {
            path == pattern
        } else {
            path.starts_with(pattern)
        };
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if anchored && i > 0 && i == parts.len() - 1 {
            return path[pos..].ends_with(part);
        }
        match path[pos..].find(part) {
            Some(found) if i > 0 || found == 0 => pos += found + part.len(),
            _ => return false,
        }
    }

    !anchored || pos == path.len() || pattern.ends_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    fn last(content: &str, agent: &str) -> ParsedRobots {
        ParsedRobots::parse(content, agent, RobotsPrecedence::LastDirective)
    }

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed(&url("/any/path")));
        assert!(robots.crawl_delay().is_none());
        assert!(robots.sitemaps().is_empty());
    }

    #[test]
    fn test_disallow_root_for_wildcard() {
        let robots = last("User-agent: *\nDisallow: /\n", "LadderCrawl");
        assert!(!robots.is_allowed(&url("/")));
        assert!(!robots.is_allowed(&url("/page")));
    }

    #[test]
    fn test_later_allow_wins() {
        let robots = last("User-agent: *\nDisallow: /\nAllow: /\n", "LadderCrawl");
        assert!(robots.is_allowed(&url("/page")));
    }

    #[test]
    fn test_last_directive_beats_longer_match() {
        let content = "User-agent: *\nAllow: /public/page\nDisallow: /public\n";

        let robots = last(content, "LadderCrawl");
        assert!(!robots.is_allowed(&url("/public/page")));

        let robots = ParsedRobots::parse(content, "LadderCrawl", RobotsPrecedence::LongestMatch);
        assert!(robots.is_allowed(&url("/public/page")));
        assert!(!robots.is_allowed(&url("/public/other")));
    }

    #[test]
    fn test_non_matching_group_ignored() {
        let content = "User-agent: OtherBot\nDisallow: /\n\nUser-agent: *\nDisallow: /private\n";
        let robots = last(content, "LadderCrawl");
        assert!(robots.is_allowed(&url("/")));
        assert!(!robots.is_allowed(&url("/private/x")));
    }

    #[test]
    fn test_exact_agent_case_insensitive() {
        let content = "User-agent: laddercrawl\nDisallow: /\n";
        let robots = last(content, "LadderCrawl/1.0");
        assert!(!robots.is_allowed(&url("/")));
    }

    #[test]
    fn test_consecutive_agents_form_one_group() {
        let content = "User-agent: OtherBot\nUser-agent: LadderCrawl\nDisallow: /x\n";
        let robots = last(content, "LadderCrawl");
        assert!(!robots.is_allowed(&url("/x")));
    }

    #[test]
    fn test_crawl_delay_for_matching_group() {
        let content = "User-agent: OtherBot\nCrawl-delay: 30\n\nUser-agent: *\nCrawl-delay: 2.5\n";
        let robots = last(content, "LadderCrawl");
        assert_eq!(robots.crawl_delay(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_invalid_crawl_delay_ignored() {
        let robots = last("User-agent: *\nCrawl-delay: soon\n", "LadderCrawl");
        assert!(robots.crawl_delay().is_none());
    }

    #[test]
    fn test_sitemaps_collected_anywhere() {
        let content = "Sitemap: https://example.com/a.xml\nUser-agent: OtherBot\nSitemap: https://example.com/b.xml\nDisallow: /\n";
        let robots = last(content, "LadderCrawl");
        assert_eq!(
            robots.sitemaps(),
            &["https://example.com/a.xml", "https://example.com/b.xml"]
        );
    }

    #[test]
    fn test_empty_disallow_allows() {
        let robots = last("User-agent: *\nDisallow:\n", "LadderCrawl");
        assert!(robots.is_allowed(&url("/anything")));
    }

    #[test]
    fn test_comments_stripped() {
        let robots = last("User-agent: * # everyone\nDisallow: /tmp # scratch\n", "LadderCrawl");
        assert!(!robots.is_allowed(&url("/tmp/file")));
        assert!(robots.is_allowed(&url("/other")));
    }

    #[test]
    fn test_wildcard_patterns() {
        assert!(path_matches("/a/b.pdf", "/*.pdf$"));
        assert!(path_matches("/a.pdf.pdf", "/*.pdf$"));
        assert!(!path_matches("/a/b.pdf?x=1", "/*.pdf$"));
        assert!(path_matches("/search?q=1", "/search*"));
        assert!(path_matches("/page", "/page$"));
        assert!(!path_matches("/page2", "/page$"));
        assert!(!path_matches("/x/admin", "/admin*"));
    }
}
