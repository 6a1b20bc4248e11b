use anyhow::Result;
use clap::Parser;
use ctfd_config::env::vars;
use ctfd_config::secret;
use ctfd_config::{
    CacheBackend, Config, Environment, Resolver, SessionBackend, TrustedProxies, Variant,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ctfd_config=info,ctfd_cli=info")),
        )
        .init();

    let args = cli::Cli::parse();
    let base_dir = resolve_base_dir(args.base_dir)?;

    match args.command {
        cli::Command::Show(show) => run_show(&base_dir, &show),
        cli::Command::Check => run_check(&base_dir),
        cli::Command::Init => run_init(&base_dir),
    }
}

fn resolve_base_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match arg {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    Ok(dir.canonicalize().unwrap_or(dir))
}

fn run_show(base_dir: &Path, args: &cli::ShowArgs) -> Result<()> {
    let variant = if args.testing {
        Variant::Testing
    } else {
        Variant::Default
    };
    let config = effective_config(base_dir, variant)?;
    let rendered = match args.format {
        cli::OutputFormat::Json => serde_json::to_string_pretty(&config)?,
        cli::OutputFormat::Toml => toml::to_string_pretty(&config)?,
    };
    println!("{rendered}");
    Ok(())
}

/// Resolve like the server would at startup, but without writing anything:
/// an already-persisted key is picked up, a missing one stays the freshly
/// generated value.
fn effective_config(base_dir: &Path, variant: Variant) -> Result<Config> {
    let env = Environment::from_process();
    let external_key = env.get(vars::SECRET_KEY).is_some();
    let mut config = Resolver::new(env, base_dir).resolve(variant);
    if !external_key {
        if let Some(key) = secret::load(&Config::secret_key_path(base_dir))? {
            config.secret_key = key;
        }
    }
    Ok(config)
}

fn run_check(base_dir: &Path) -> Result<()> {
    let env = Environment::from_process();
    let config = Resolver::new(env.clone(), base_dir).resolve(Variant::Default);
    let mut warnings = 0usize;
    let mut errors = 0usize;

    for name in env.unrecognized() {
        println!("warning: unrecognized variable {name}");
        warnings += 1;
    }

    if let Some(key) = env.get(vars::SECRET_KEY) {
        if key.len() < 32 || secret::looks_like_placeholder(key) {
            println!(
                "error: CTFD_SECRET_KEY must be a strong random secret (at least 32 characters), never a placeholder"
            );
            errors += 1;
        }
    } else if !Config::secret_key_path(base_dir).is_file() {
        println!(
            "warning: no secret key configured; run `ctfd-cli init` so restarts and sibling workers share one"
        );
        warnings += 1;
    }

    if let Some(port) = env.get(vars::CACHE_PORT) {
        if port.parse::<u16>().is_err() {
            println!(
                "warning: CTFD_CACHE_PORT value '{port}' is not a port number; the redis client will reject it"
            );
            warnings += 1;
        }
    }

    if let SessionBackend::Redis(params) = &config.session {
        if params.host.is_none()
            && params.port.is_none()
            && params.password.is_none()
            && params.db.is_none()
        {
            println!(
                "warning: session backend is redis but no CTFD_CACHE_* connection variables are set"
            );
            warnings += 1;
        }
    }

    if let CacheBackend::Redis(params) = &config.cache {
        if params.url.is_none() && params.host.is_none() {
            println!(
                "warning: cache backend is redis but neither CTFD_CACHE_URL nor CTFD_CACHE_HOST is set"
            );
            warnings += 1;
        }
    }

    if let Err(err) = TrustedProxies::new(&config.trusted_proxies) {
        println!("error: trusted proxy patterns do not compile: {err}");
        errors += 1;
    }

    println!(
        "session backend: {}; cache backend: {}; database: {}",
        config.session.kind(),
        config.cache.kind(),
        config.database_uri
    );

    if errors > 0 {
        anyhow::bail!("configuration check failed ({errors} error(s), {warnings} warning(s))");
    }
    println!("configuration ok ({warnings} warning(s))");
    Ok(())
}

fn run_init(base_dir: &Path) -> Result<()> {
    fs::create_dir_all(base_dir)?;
    let config = Config::load(base_dir)?;
    config.ensure_runtime_dirs()?;
    tracing::info!("Initialized instance data under '{}'", base_dir.display());

    let key_path = Config::secret_key_path(base_dir);
    if key_path.is_file() {
        println!("secret key file: {}", key_path.display());
    } else {
        println!("secret key: provided via {}", vars::SECRET_KEY);
    }
    println!("upload folder: {}", config.upload_folder.display());
    if let SessionBackend::Filesystem = config.session {
        println!("session files: {}", config.session_file_dir.display());
    }
    Ok(())
}
