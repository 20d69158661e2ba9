use url::Url;

use crate::models::ItemCategory;

const HOST_RULES: &[(&str, ItemCategory)] = &[
    ("github.com", ItemCategory::Development),
    ("gitlab.com", ItemCategory::Development),
    ("bitbucket.org", ItemCategory::Development),
    ("stackoverflow.com", ItemCategory::Development),
    ("crates.io", ItemCategory::Development),
    ("npmjs.com", ItemCategory::Development),
    ("localhost", ItemCategory::Development),
    ("127.0.0.1", ItemCategory::Development),
    ("docs.rs", ItemCategory::Documentation),
    ("developer.mozilla.org", ItemCategory::Documentation),
    ("readthedocs.io", ItemCategory::Documentation),
    ("slack.com", ItemCategory::Communication),
    ("mail.google.com", ItemCategory::Communication),
    ("outlook.office.com", ItemCategory::Communication),
    ("zoom.us", ItemCategory::Communication),
    ("teams.microsoft.com", ItemCategory::Communication),
    ("discord.com", ItemCategory::Communication),
    ("docs.google.com", ItemCategory::Productivity),
    ("calendar.google.com", ItemCategory::Productivity),
    ("notion.so", ItemCategory::Productivity),
    ("figma.com", ItemCategory::Productivity),
    ("linear.app", ItemCategory::Productivity),
    ("atlassian.net", ItemCategory::Productivity),
    ("trello.com", ItemCategory::Productivity),
    ("wikipedia.org", ItemCategory::Research),
    ("arxiv.org", ItemCategory::Research),
    ("scholar.google.com", ItemCategory::Research),
    ("twitter.com", ItemCategory::Social),
    ("x.com", ItemCategory::Social),
    ("reddit.com", ItemCategory::Social),
    ("facebook.com", ItemCategory::Social),
    ("instagram.com", ItemCategory::Social),
    ("linkedin.com", ItemCategory::Social),
    ("tiktok.com", ItemCategory::Social),
    ("youtube.com", ItemCategory::Entertainment),
    ("netflix.com", ItemCategory::Entertainment),
    ("twitch.tv", ItemCategory::Entertainment),
    ("spotify.com", ItemCategory::Entertainment),
    ("amazon.com", ItemCategory::Shopping),
    ("ebay.com", ItemCategory::Shopping),
    ("news.ycombinator.com", ItemCategory::News),
    ("nytimes.com", ItemCategory::News),
    ("bbc.com", ItemCategory::News),
    ("theguardian.com", ItemCategory::News),
];

const APP_RULES: &[(&str, ItemCategory)] = &[
    ("code", ItemCategory::Development),
    ("xcode", ItemCategory::Development),
    ("intellij", ItemCategory::Development),
    ("rustrover", ItemCategory::Development),
    ("terminal", ItemCategory::Development),
    ("iterm2", ItemCategory::Development),
    ("warp", ItemCategory::Development),
    ("zed", ItemCategory::Development),
    ("vim", ItemCategory::Development),
    ("slack", ItemCategory::Communication),
    ("mail", ItemCategory::Communication),
    ("messages", ItemCategory::Communication),
    ("zoom", ItemCategory::Communication),
    ("discord", ItemCategory::Communication),
    ("notion", ItemCategory::Productivity),
    ("figma", ItemCategory::Productivity),
    ("obsidian", ItemCategory::Productivity),
    ("calendar", ItemCategory::Productivity),
    ("pages", ItemCategory::Productivity),
    ("word", ItemCategory::Productivity),
    ("excel", ItemCategory::Productivity),
    ("preview", ItemCategory::Documentation),
    ("spotify", ItemCategory::Entertainment),
    ("music", ItemCategory::Entertainment),
    ("finder", ItemCategory::System),
    ("system settings", ItemCategory::System),
    ("dock", ItemCategory::System),
];

/// Categorise a tab by its URL host. Unparseable URLs fall into `Other`.
pub fn classify_url(raw: &str) -> ItemCategory {
    let Ok(parsed) = Url::parse(raw) else {
        return ItemCategory::Other;
    };
    let Some(host) = parsed.host_str() else {
        return ItemCategory::Other;
    };
    let host = host.trim_start_matches("www.");

    HOST_RULES
        .iter()
        .find(|(rule, _)| host == *rule || host.ends_with(&format!(".{rule}")))
        .map(|(_, category)| *category)
        .unwrap_or(ItemCategory::Other)
}

/// Categorise a window by its owning application name.
pub fn classify_app(app_name: &str) -> ItemCategory {
    let name = app_name.to_ascii_lowercase();
    let words: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    APP_RULES
        .iter()
        .find(|(rule, _)| {
            if rule.contains(' ') {
                name.contains(*rule)
            } else {
                words.contains(rule)
            }
        })
        .map(|(_, category)| *category)
        .unwrap_or(ItemCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_map_to_categories() {
        assert_eq!(classify_url("https://github.com/acme/app"), ItemCategory::Development);
        assert_eq!(classify_url("https://www.youtube.com/watch?v=1"), ItemCategory::Entertainment);
        assert_eq!(classify_url("https://en.wikipedia.org/wiki/Rust"), ItemCategory::Research);
        assert_eq!(
            classify_url("https://tokio.readthedocs.io/en/latest"),
            ItemCategory::Documentation
        );
        assert_eq!(classify_url("http://localhost:3000/"), ItemCategory::Development);
    }

    #[test]
    fn lookalike_hosts_are_not_matched() {
        assert_eq!(classify_url("https://notgithub.com/"), ItemCategory::Other);
        assert_eq!(classify_url("https://box.com/"), ItemCategory::Other);
    }

    #[test]
    fn garbage_urls_are_other() {
        assert_eq!(classify_url("not a url"), ItemCategory::Other);
        assert_eq!(classify_url("about:blank"), ItemCategory::Other);
    }

    #[test]
    fn apps_map_to_categories() {
        assert_eq!(classify_app("Code"), ItemCategory::Development);
        assert_eq!(classify_app("iTerm2"), ItemCategory::Development);
        assert_eq!(classify_app("Slack"), ItemCategory::Communication);
        assert_eq!(classify_app("System Settings"), ItemCategory::System);
        assert_eq!(classify_app("Unknown Thing"), ItemCategory::Other);
        assert!(classify_app("Visual Studio Code").is_work_related());
    }
}
