use std::path::PathBuf;

use anyhow::{Context, Result};
use extpack_registry::InstalledState;
use extpack_resolver::{DependencyPath, DependencyResolver, FailReason, ResolverConfig};
use semver::Version;

use crate::completion::write_completions_script;
use crate::config::{default_user_prefix, CliOverrides, ConfigFile, PrefixLayout, Settings};
use crate::metadata::{parse_resolve_spec, select_metadata_backend};
use crate::render::{
    current_output_style, format_info_lines, format_installed_lines, format_resolve_lines,
    ResolveReport,
};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let mut overrides = CliOverrides {
        registry_root: cli.registry_root,
        marketplace_url: cli.marketplace_url,
        platform_version: cli.platform_version,
        ignore_lib_conflicts: None,
        max_visits: None,
    };

    match cli.command {
        Commands::Resolve {
            spec,
            ignore_lib_conflicts,
            no_ignore_lib_conflicts,
            max_visits,
            json,
        } => {
            overrides.ignore_lib_conflicts =
                lib_conflict_override(ignore_lib_conflicts, no_ignore_lib_conflicts);
            overrides.max_visits = max_visits;
            let layout = prefix_layout(cli.prefix)?;
            let settings = load_settings(&layout, overrides)?;
            let outcome = resolve_request(&layout, &settings, &spec)?;
            let report = outcome.report();

            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .context("failed to serialize resolve report")?;
                println!("{rendered}");
            } else {
                for line in format_resolve_lines(current_output_style(), &report) {
                    println!("{line}");
                }
            }

            if !report.resolved {
                anyhow::bail!("cannot resolve {}@{}", outcome.id, outcome.version);
            }
        }
        Commands::Info { id } => {
            let layout = prefix_layout(cli.prefix)?;
            let settings = load_settings(&layout, overrides)?;
            let backend = select_metadata_backend(&settings)?;
            let versions = backend.extension_versions(&id)?;

            if versions.is_empty() {
                println!("No extension found: {id}");
            } else {
                for line in format_info_lines(&id, &versions) {
                    println!("{line}");
                }
            }
        }
        Commands::Search { query } => {
            let layout = prefix_layout(cli.prefix)?;
            let settings = load_settings(&layout, overrides)?;
            let backend = select_metadata_backend(&settings)?;
            let ids = backend.search_ids(query.trim())?;

            if ids.is_empty() {
                println!("No extensions found matching '{query}'");
            }
            for id in ids {
                println!("{id}");
            }
        }
        Commands::Installed => {
            let layout = prefix_layout(cli.prefix)?;
            let state = InstalledState::load(&layout.installed_state_path())?;

            if state.extensions.is_empty() {
                println!("No installed extensions");
            }
            for line in format_installed_lines(&state.extensions) {
                println!("{line}");
            }
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

pub(crate) fn lib_conflict_override(ignore: bool, no_ignore: bool) -> Option<bool> {
    match (ignore, no_ignore) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn prefix_layout(prefix: Option<PathBuf>) -> Result<PrefixLayout> {
    let prefix = match prefix {
        Some(prefix) => prefix,
        None => default_user_prefix()?,
    };
    Ok(PrefixLayout::new(prefix))
}

fn load_settings(layout: &PrefixLayout, overrides: CliOverrides) -> Result<Settings> {
    let file = ConfigFile::load(&layout.config_path())?;
    Ok(Settings::merge(overrides, file))
}

#[derive(Debug)]
pub(crate) struct ResolveOutcome {
    pub(crate) id: String,
    pub(crate) version: Version,
    pub(crate) results: Vec<DependencyPath>,
    pub(crate) fail_reasons: Vec<FailReason>,
    pub(crate) catalog_messages: Vec<String>,
}

impl ResolveOutcome {
    pub(crate) fn report(&self) -> ResolveReport<'_> {
        ResolveReport {
            id: &self.id,
            version: &self.version,
            resolved: !self.results.is_empty(),
            results: &self.results,
            fail_reasons: &self.fail_reasons,
            catalog_messages: &self.catalog_messages,
        }
    }
}

pub(crate) fn resolve_request(
    layout: &PrefixLayout,
    settings: &Settings,
    spec: &str,
) -> Result<ResolveOutcome> {
    let (id, version) = parse_resolve_spec(spec)?;
    let platform_version = settings.platform_version(layout)?;
    let backend = select_metadata_backend(settings)?;
    let installed = InstalledState::load(&layout.installed_state_path())?;
    tracing::debug!(
        catalog = %backend.describe(),
        prefix = %layout.prefix().display(),
        installed = installed.extensions.len(),
        "starting resolve"
    );

    let config = ResolverConfig::new(platform_version)
        .with_ignore_lib_conflicts(settings.ignore_lib_conflicts)
        .with_max_visits(settings.max_visits);
    let mut resolver = DependencyResolver::new(backend, config);
    resolver.set_installed_extensions(installed.into_extensions());
    resolver.resolve_dependencies(&id, &version);

    Ok(ResolveOutcome {
        catalog_messages: resolver.provider().catalog_messages(),
        results: resolver.results().map(<[DependencyPath]>::to_vec).unwrap_or_default(),
        fail_reasons: resolver.fail_reasons().to_vec(),
        id,
        version,
    })
}
