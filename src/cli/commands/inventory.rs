//! Inventory commands - hosts, groups, datacenters, reload and cache
//!
//! Every listing command goes through `Loader::load`, so a fresh cache
//! file answers without touching the network.

use super::{CommandContext, Runnable};
use anyhow::{bail, Result};
use clap::Parser;
use conductor_inventory::config::BackendSettings;
use conductor_inventory::inventory::{CacheStore, Inventory, InventoryBackend, LoadSource};
use serde::Serialize;
use std::time::Duration;

/// Arguments for the hosts command
#[derive(Parser, Debug, Clone)]
pub struct HostsArgs {
    /// Only hosts referenced by this group
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Only hosts in this datacenter ("" selects hosts without one)
    #[arg(short = 'd', long)]
    pub datacenter: Option<String>,
}

/// Arguments for the groups command
#[derive(Parser, Debug, Clone)]
pub struct GroupsArgs {
    /// Only groups without a parent
    #[arg(long)]
    pub roots: bool,
}

/// Group information for output
#[derive(Debug, Clone, Serialize)]
pub struct GroupInfo {
    pub name: String,
    pub parent: String,
    pub hosts: Vec<String>,
}

/// Cache status for output
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub path: String,
    pub exists: bool,
    pub fresh: bool,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub age: Option<Duration>,
}

fn load(ctx: &CommandContext) -> Result<std::sync::Arc<Inventory>> {
    let loader = ctx.loader()?;
    let source = loader.load()?;
    ctx.output.info(&format!("inventory loaded from {}", source));
    Ok(loader.snapshot())
}

impl Runnable for HostsArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = load(ctx)?;

        let hosts: Vec<_> = match &self.group {
            Some(name) => match inventory.get_group(name) {
                Some(group) => inventory.group_hosts(group).collect(),
                None => bail!("Group '{}' not found in inventory", name),
            },
            None => inventory.hosts().iter().collect(),
        };
        let hosts: Vec<_> = hosts
            .into_iter()
            .filter(|h| {
                self.datacenter
                    .as_deref()
                    .map_or(true, |dc| h.datacenter_id == dc)
            })
            .collect();

        if ctx.output.is_json() {
            ctx.output.json(&hosts)?;
        } else {
            let rows: Vec<Vec<String>> = hosts
                .iter()
                .map(|h| vec![h.fqdn.clone(), h.group_id.clone(), h.datacenter_id.clone()])
                .collect();
            ctx.output.table(&["HOST", "GROUP", "DATACENTER"], &rows);
        }

        Ok(0)
    }
}

impl Runnable for GroupsArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = load(ctx)?;

        let groups: Vec<GroupInfo> = inventory
            .groups()
            .iter()
            .filter(|g| !self.roots || g.is_root())
            .map(|g| GroupInfo {
                name: g.name.clone(),
                parent: g.parent_id.clone(),
                hosts: inventory.group_hosts(g).map(|h| h.fqdn.clone()).collect(),
            })
            .collect();

        if ctx.output.is_json() {
            ctx.output.json(&groups)?;
        } else {
            let rows: Vec<Vec<String>> = groups
                .iter()
                .map(|g| vec![g.name.clone(), g.parent.clone(), g.hosts.len().to_string()])
                .collect();
            ctx.output.table(&["GROUP", "PARENT", "HOSTS"], &rows);
        }

        Ok(0)
    }
}

/// List datacenters
pub fn datacenters(ctx: &mut CommandContext) -> Result<i32> {
    let inventory = load(ctx)?;

    if ctx.output.is_json() {
        ctx.output.json(&inventory.datacenters())?;
    } else {
        let items: Vec<String> = inventory
            .datacenters()
            .iter()
            .map(|dc| format!("{} ({} hosts)", dc, inventory.hosts_in_datacenter(&dc.name).count()))
            .collect();
        ctx.output.list("Datacenters", &items);
    }

    Ok(0)
}

/// Force a refresh from the inventory service
pub fn reload(ctx: &mut CommandContext) -> Result<i32> {
    let loader = ctx.loader()?;
    let source = loader.reload()?;
    let inventory = loader.snapshot();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "source": source.to_string(),
            "hosts": inventory.host_count(),
            "groups": inventory.group_count(),
            "datacenters": inventory.datacenters().len(),
        }))?;
    } else {
        if source != LoadSource::Remote {
            ctx.output
                .warning("inventory service unavailable, serving the local cache");
        }
        println!(
            "Loaded {} hosts, {} groups from {}",
            inventory.host_count(),
            inventory.group_count(),
            source
        );
    }

    Ok(0)
}

/// Show cache location and freshness without loading anything
pub fn cache(ctx: &mut CommandContext) -> Result<i32> {
    let settings = BackendSettings::from_config(&ctx.config)?;
    let store = CacheStore::new(&settings.cache_dir, &settings.work_groups);

    let info = CacheInfo {
        path: store.path().display().to_string(),
        exists: store.path().exists(),
        fresh: store.is_fresh(settings.cache_ttl),
        ttl: settings.cache_ttl,
        age: store.age().map(|age| Duration::from_secs(age.as_secs())),
    };

    if ctx.output.is_json() {
        ctx.output.json(&info)?;
    } else {
        ctx.output.status("path", &info.path, info.exists);
        ctx.output.status(
            "ttl",
            &humantime_serde::re::humantime::format_duration(info.ttl).to_string(),
            true,
        );
        let age = match info.age {
            Some(age) => humantime_serde::re::humantime::format_duration(age).to_string(),
            None => "missing".to_string(),
        };
        ctx.output.status("age", &age, info.fresh);
        ctx.output
            .status("status", if info.fresh { "fresh" } else { "stale" }, info.fresh);
    }

    Ok(0)
}
