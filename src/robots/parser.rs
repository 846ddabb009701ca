//! Robots.txt rules
//!
//! Allow/disallow matching is delegated to the robotstxt crate. Crawl-delay
//! is not part of that matcher and is read from the groups directly.

use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// Product token of a user agent string, e.g. `SumiLens` for
/// `SumiLens/1.0 (Web Crawler)`
pub fn agent_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or(user_agent)
}

/// Rules of one robots.txt file
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw file body; `None` allows everything
    body: Option<String>,
}

impl RobotsRules {
    /// Wraps a fetched robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            body: Some(content.to_string()),
        }
    }

    /// Rules that allow every URL, used when no robots.txt could be read
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.as_deref().map_or(true, |body| body.trim().is_empty())
    }

    /// Checks whether `user_agent` may fetch `url`
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent_token(user_agent), url.as_str())
            }
            _ => true,
        }
    }

    /// Crawl-delay for `user_agent`
    ///
    /// A group naming the agent wins over the `*` group. Groups are runs of
    /// consecutive `User-agent` lines followed by their directives.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let body = self.body.as_deref()?;
        let token = agent_token(user_agent).to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_directives = false;
        let mut specific: Option<f64> = None;
        let mut wildcard: Option<f64> = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if in_directives {
                    group.clear();
                    in_directives = false;
                }
                group.push(value.to_lowercase());
                continue;
            }

            in_directives = true;
            if key != "crawl-delay" {
                continue;
            }
            let Ok(seconds) = value.parse::<f64>() else {
                continue;
            };
            if !seconds.is_finite() || seconds < 0.0 {
                continue;
            }

            if group.iter().any(|agent| *agent == token) {
                specific.get_or_insert(seconds);
            } else if group.iter().any(|agent| agent == "*") {
                wildcard.get_or_insert(seconds);
            }
        }

        specific.or(wildcard).map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "TestBot/1.0 (Web Crawler)";

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_agent_token() {
        assert_eq!(agent_token("SumiLens/1.0 (Web Crawler)"), "SumiLens");
        assert_eq!(agent_token("TestBot"), "TestBot");
    }

    #[test]
    fn test_allow_all() {
        let robots = RobotsRules::allow_all();
        assert!(robots.is_allow_all());
        assert!(robots.is_allowed(&url("/any/path"), AGENT));
        assert!(robots.is_allowed(&url("/admin"), AGENT));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed(&url("/"), AGENT));
        assert!(!robots.is_allowed(&url("/page"), AGENT));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed(&url("/"), AGENT));
        assert!(robots.is_allowed(&url("/page"), AGENT));
        assert!(!robots.is_allowed(&url("/admin"), AGENT));
        assert!(!robots.is_allowed(&url("/admin/users"), AGENT));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let robots =
            RobotsRules::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(!robots.is_allowed(&url("/private"), AGENT));
        assert!(robots.is_allowed(&url("/private/public"), AGENT));
    }

    #[test]
    fn test_parse_specific_user_agent() {
        let robots = RobotsRules::from_content(
            "User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
        );
        assert!(!robots.is_allowed(&url("/page"), AGENT));
        assert!(robots.is_allowed(&url("/page"), "GoodBot/2.0"));
    }

    #[test]
    fn test_invalid_and_empty_content_allow() {
        let robots = RobotsRules::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed(&url("/any/path"), AGENT));
        let robots = RobotsRules::from_content("");
        assert!(robots.is_allow_all());
        assert!(robots.is_allowed(&url("/any/path"), AGENT));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = RobotsRules::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let robots = RobotsRules::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: testbot\nCrawl-delay: 5",
        );
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_secs(5)));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_group_of_agents() {
        let robots = RobotsRules::from_content(
            "User-agent: BotA\nUser-agent: BotB\nDisallow: /x\nCrawl-delay: 3 # slow down",
        );
        assert_eq!(robots.crawl_delay("BotB"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_decimal_and_invalid() {
        let robots = RobotsRules::from_content("User-agent: *\nCrawl-delay: 2.5");
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_millis(2500)));

        let robots = RobotsRules::from_content("User-agent: *\nCrawl-delay: soon");
        assert_eq!(robots.crawl_delay(AGENT), None);
        assert_eq!(RobotsRules::allow_all().crawl_delay(AGENT), None);
    }
}
