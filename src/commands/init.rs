//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: en
locale: en_US
timezone: UTC

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public

# Date format (date-fns tokens)
date_format: dd MMM yyyy

# Shown on posts without a banner of their own
banner: /banner.png

# Content repository
# PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override these when set
prismic:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  access_token:
  content_type: spacetraveling
  page_size: 1

reading:
  words_per_minute: 200
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("languages"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        tracing::warn!("{:?} already exists, leaving it untouched", config_path);
    } else {
        fs::write(&config_path, DEFAULT_CONFIG)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();

        assert!(dir.path().join("languages").is_dir());
        let config = SiteConfig::load(dir.path().join("_config.yml")).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.prismic.endpoint, defaults.prismic.endpoint);
        assert_eq!(config.prismic.access_token, None);
        assert_eq!(config.prismic.page_size, 1);
        assert_eq!(config.date_format, "dd MMM yyyy");
        assert_eq!(config.reading.words_per_minute, 200);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Mine\n").unwrap();
        init_site(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("_config.yml")).unwrap();
        assert_eq!(content, "title: Mine\n");
    }
}
