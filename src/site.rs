use regex::Regex;
use std::path::PathBuf;

use crate::config::{Settings, UploadsLayout};
use crate::database::TableSelection;
use crate::error::Error;

/// The site a sweep works for. Passed around explicitly instead of switching a
/// global "current blog".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    pub blog_id: u64,
    pub table_prefix: String,
    pub uploads_root: PathBuf,
}

impl SiteContext {
    pub fn network_site(blog_id: u64, settings: &Settings) -> Self {
        let (table_prefix, uploads_root) = if blog_id <= 1 {
            (settings.table_prefix.clone(), settings.uploads_dir.clone())
        } else {
            let prefix = format!("{}{}_", settings.table_prefix, blog_id);
            let root = match settings.uploads_layout {
                UploadsLayout::PerSite => settings
                    .uploads_dir
                    .join("sites")
                    .join(blog_id.to_string()),
                UploadsLayout::Shared => settings.uploads_dir.clone(),
            };
            (prefix, root)
        };

        Self {
            blog_id,
            table_prefix,
            uploads_root,
        }
    }

    /// `^<prefix>\D`: the main site's `wp_` must not pick up `wp_2_posts`.
    pub fn table_pattern(&self) -> Result<Regex, Error> {
        Ok(Regex::new(&format!(
            r"^{}\D",
            regex::escape(&self.table_prefix)
        ))?)
    }
}

/// One dump-walk-prune cycle.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub label: String,
    pub uploads_root: PathBuf,
    /// Sites whose tables make up the dump. Empty means the whole database.
    pub sites: Vec<SiteContext>,
    /// Subtrees owned by other plans; never walked or pruned.
    pub excluded_dirs: Vec<PathBuf>,
}

impl SweepPlan {
    pub fn single_site(settings: &Settings) -> Self {
        Self {
            label: "site".to_string(),
            uploads_root: settings.uploads_dir.clone(),
            sites: Vec::new(),
            excluded_dirs: Vec::new(),
        }
    }

    /// Tables to dump, picked from a "show tables" listing in listing order.
    pub fn select_tables(&self, all_tables: &[String]) -> Result<TableSelection, Error> {
        if self.sites.is_empty() {
            return Ok(TableSelection::All);
        }

        let patterns = self
            .sites
            .iter()
            .map(SiteContext::table_pattern)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TableSelection::Only(
            all_tables
                .iter()
                .filter(|table| patterns.iter().any(|p| p.is_match(table)))
                .cloned()
                .collect(),
        ))
    }
}

/// Build one plan per distinct uploads root. Sites sharing a root are swept
/// together against a dump of all of their tables, so a reference from any of
/// them keeps the file.
pub fn plan_network(settings: &Settings, blog_ids: &[u64]) -> Vec<SweepPlan> {
    let mut plans: Vec<SweepPlan> = Vec::new();

    for &blog_id in blog_ids {
        let site = SiteContext::network_site(blog_id, settings);
        match plans
            .iter_mut()
            .find(|plan| plan.uploads_root == site.uploads_root)
        {
            Some(plan) => plan.sites.push(site),
            None => plans.push(SweepPlan {
                label: String::new(),
                uploads_root: site.uploads_root.clone(),
                sites: vec![site],
                excluded_dirs: Vec::new(),
            }),
        }
    }

    let sites_dir = settings.uploads_dir.join("sites");
    let has_nested_sites = plans
        .iter()
        .any(|plan| plan.uploads_root.starts_with(&sites_dir));

    for plan in &mut plans {
        let ids: Vec<String> = plan.sites.iter().map(|s| s.blog_id.to_string()).collect();
        plan.label = if ids.len() == 1 {
            format!("site {}", ids[0])
        } else {
            format!("sites {}", ids.join(", "))
        };
        if has_nested_sites && plan.uploads_root == settings.uploads_dir {
            plan.excluded_dirs.push(sites_dir.clone());
        }
    }

    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use std::path::Path;

    fn settings(layout: UploadsLayout) -> Settings {
        Settings {
            uploads_dir: PathBuf::from("/srv/uploads"),
            credentials: Credentials {
                host: "localhost".to_string(),
                user: "wp".to_string(),
                password: String::new(),
                name: "wordpress".to_string(),
            },
            table_prefix: "wp_".to_string(),
            multisite: true,
            uploads_layout: layout,
            mysqldump_path: "mysqldump".to_string(),
            mysql_path: "mysql".to_string(),
            ignore_patterns: Vec::new(),
            allow_empty_dump: false,
        }
    }

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_main_site_pattern_skips_numbered_tables() {
        let site = SiteContext::network_site(1, &settings(UploadsLayout::PerSite));
        let pattern = site.table_pattern().unwrap();
        assert!(pattern.is_match("wp_posts"));
        assert!(pattern.is_match("wp_blogs"));
        assert!(!pattern.is_match("wp_2_posts"));
        assert!(!pattern.is_match("other_posts"));
    }

    #[test]
    fn test_site_two_prefix_does_not_match_site_twenty() {
        let site = SiteContext::network_site(2, &settings(UploadsLayout::PerSite));
        assert_eq!(site.table_prefix, "wp_2_");
        let pattern = site.table_pattern().unwrap();
        assert!(pattern.is_match("wp_2_postmeta"));
        assert!(!pattern.is_match("wp_20_posts"));
    }

    #[test]
    fn test_per_site_layout_plans() {
        let plans = plan_network(&settings(UploadsLayout::PerSite), &[1, 2, 3]);
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].uploads_root, Path::new("/srv/uploads"));
        assert_eq!(plans[0].excluded_dirs, vec![PathBuf::from("/srv/uploads/sites")]);
        assert_eq!(plans[1].uploads_root, Path::new("/srv/uploads/sites/2"));
        assert!(plans[1].excluded_dirs.is_empty());
        assert_eq!(plans[2].label, "site 3");
    }

    #[test]
    fn test_shared_layout_groups_sites() {
        let plans = plan_network(&settings(UploadsLayout::Shared), &[1, 2]);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].label, "sites 1, 2");
        assert!(plans[0].excluded_dirs.is_empty());

        let selection = plans[0]
            .select_tables(&tables(&["wp_posts", "wp_2_posts", "wp_3_posts", "legacy_log"]))
            .unwrap();
        assert_eq!(
            selection,
            TableSelection::Only(tables(&["wp_posts", "wp_2_posts"]))
        );
    }

    #[test]
    fn test_single_site_dumps_everything() {
        let plan = SweepPlan::single_site(&settings(UploadsLayout::PerSite));
        let selection = plan.select_tables(&tables(&["wp_posts"])).unwrap();
        assert_eq!(selection, TableSelection::All);
    }
}
