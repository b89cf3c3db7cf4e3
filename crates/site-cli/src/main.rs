//! `site-content`: operator commands for editable site content
//!
//! Talks to a PostgREST-style backend configured from flags or `SITE_*`
//! environment variables. Live updates are not used from the command line.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use site_content::{
    check_admin, probe_sync, ContentConfig, ContentKey, EditableContent, FallbackNode, SaveOutcome,
    SETUP_SQL,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;

use config::BackendSettings;

fn cli() -> Command {
    Command::new("site-content")
        .version(site_content::VERSION)
        .about("Inspect and edit site content slots")
        .subcommand_required(true)
        .arg(
            Arg::new("url")
                .long("url")
                .env("SITE_BACKEND_URL")
                .global(true)
                .help("Backend base URL"),
        )
        .arg(
            Arg::new("anon-key")
                .long("anon-key")
                .env("SITE_ANON_KEY")
                .hide_env_values(true)
                .global(true)
                .help("Public API key"),
        )
        .arg(
            Arg::new("access-token")
                .long("access-token")
                .env("SITE_ACCESS_TOKEN")
                .hide_env_values(true)
                .global(true)
                .help("User access token for row-level security"),
        )
        .arg(
            Arg::new("user-id")
                .long("user-id")
                .env("SITE_USER_ID")
                .global(true)
                .help("Signed-in user id; omit to act anonymously"),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .env("SITE_CACHE_PATH")
                .default_value(config::DEFAULT_CACHE_PATH)
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Local cache file"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .default_value("10")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("Request timeout in seconds"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("schema").about("Print the content table DDL"))
        .subcommand(Command::new("check-admin").about("Show the session's admin status"))
        .subcommand(Command::new("probe").about("Check that the content table accepts writes"))
        .subcommand(
            Command::new("show")
                .about("Resolve a slot the way a viewer would")
                .arg(Arg::new("key").required(true).help("Content key"))
                .arg(
                    Arg::new("fallback")
                        .long("fallback")
                        .default_value("")
                        .help("Fallback text shown when nothing is stored"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the slot view as JSON"),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Edit and save a slot")
                .arg(Arg::new("key").required(true).help("Content key"))
                .arg(Arg::new("text").required(true).help("New content")),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn key_arg(args: &ArgMatches) -> Result<ContentKey> {
    let raw = args.get_one::<String>("key").context("missing key")?;
    Ok(ContentKey::new(raw.as_str())?)
}

async fn show(settings: &BackendSettings, args: &ArgMatches) -> Result<()> {
    let key = key_arg(args)?;
    let fallback = FallbackNode::text(
        args.get_one::<String>("fallback")
            .cloned()
            .unwrap_or_default(),
    );
    let services = settings.services().await?;

    let slot = EditableContent::mount(key, &fallback, &services, &ContentConfig::default());
    let state = slot.settled().await;
    let view = slot.view();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.display_text(slot.fallback()));
        tracing::info!(source = ?state.source, editor = state.authorization.is_editor, "resolved");
    }
    Ok(())
}

async fn set(settings: &BackendSettings, args: &ArgMatches) -> Result<()> {
    let key = key_arg(args)?;
    let text = args.get_one::<String>("text").context("missing text")?;
    let services = settings.services().await?;

    let slot = EditableContent::mount(
        key.clone(),
        &FallbackNode::Empty,
        &services,
        &ContentConfig::default(),
    );
    slot.settled().await;
    slot.begin_edit()
        .with_context(|| format!("cannot edit {key}"))?;
    slot.update_draft(text.as_str())?;

    match slot.save().await? {
        SaveOutcome::Persisted => println!("saved {key}"),
        SaveOutcome::SavedLocally { advisory } => {
            println!("{advisory}");
            bail!("{key} was not stored remotely");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let settings = BackendSettings::from_matches(&matches);

    match matches.subcommand() {
        Some(("schema", _)) => println!("{SETUP_SQL}"),
        Some(("check-admin", _)) => {
            let session = settings.session();
            let store = settings.store()?;
            let status = check_admin(&session, &store).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Some(("probe", _)) => {
            let store = settings.store()?;
            let probe = probe_sync(&store).await?;
            println!("{}", serde_json::to_string_pretty(&probe)?);
            if !probe.cleaned_up {
                tracing::warn!(key = %probe.key, "remove the probe row manually");
            }
        }
        Some(("show", args)) => show(&settings, args).await?,
        Some(("set", args)) => set(&settings, args).await?,
        _ => bail!("no command given"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn show_takes_key_and_fallback() {
        let matches = cli()
            .try_get_matches_from(["site-content", "show", "hero-title", "--fallback", "Welcome"])
            .unwrap();
        let Some(("show", args)) = matches.subcommand() else {
            panic!("expected show");
        };
        assert_eq!(key_arg(args).unwrap().as_str(), "hero-title");
        assert_eq!(args.get_one::<String>("fallback").unwrap(), "Welcome");
    }

    #[test]
    fn invalid_key_is_rejected() {
        let matches = cli()
            .try_get_matches_from(["site-content", "set", "bad key!", "text"])
            .unwrap();
        let Some(("set", args)) = matches.subcommand() else {
            panic!("expected set");
        };
        assert!(key_arg(args).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["site-content"]).is_err());
    }
}
