use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Parses repeated `KEY=VALUE` arguments. The value may itself contain `=`;
/// a later duplicate key wins.
pub fn parse_tag_pairs(args: &[String]) -> Result<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("invalid tag format '{}': must be KEY=VALUE", arg);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid tag format '{}': key is empty", arg);
        }
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}
