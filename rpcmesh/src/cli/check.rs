use rpcmesh_core::registry::duration_text;
use rpcmesh_core::{MeshConfig, MeshError};
use std::path::Path;

pub fn check(path: &Path, plain: bool) -> anyhow::Result<()> {
    match MeshConfig::from_file(path) {
        Ok(cfg) => {
            print_summary(&cfg);
            Ok(())
        }
        Err(err) => {
            print_config_error(&err, plain);
            std::process::exit(1);
        }
    }
}

fn print_summary(cfg: &MeshConfig) {
    let retry = &cfg.retry;
    let backoff = retry
        .to_retry_config()
        .map(|r| duration_text(r.total_backoff()))
        .unwrap_or_else(|_| "?".to_string());

    println!("✔ Config loaded successfully");
    println!("✔ registry {}", cfg.registry_address);
    println!(
        "✔ request timeout {}, cache ttl {}, {:?} balancing",
        duration_text(cfg.default_timeout()),
        duration_text(cfg.cache_ttl()),
        cfg.load_balancing
    );
    println!(
        "✔ retry: {} attempts, {}ms initial delay, x{} backoff ({} total wait{})",
        retry.max_attempts,
        retry.initial_delay_ms,
        retry.backoff_factor,
        backoff,
        if retry.only_transient {
            ", transient errors only"
        } else {
            ""
        }
    );
    println!(
        "✔ breaker: opens after {} failures, {} cooldown",
        cfg.breaker.failure_threshold,
        duration_text(cfg.breaker.to_params().cooldown)
    );
    println!(
        "✔ transport: {} idle per host (of {} overall), {} idle timeout",
        cfg.transport_config().idle_per_host_limit(),
        cfg.transport.max_idle_connections,
        duration_text(cfg.transport_config().idle_timeout)
    );

    match &cfg.service {
        Some(service) => {
            let info = service.to_service_info();
            println!(
                "✔ service {} as {} at {}:{}",
                info.name,
                info.instance_id(),
                info.address,
                info.port
            );
            if service.health_check.is_none() {
                println!("  (no [service.health_check]; the registry will not probe it)");
            }
        }
        None => println!("✔ no [service] section; `rpcmesh register` is unavailable"),
    }
}

fn print_config_error(err: &MeshError, plain: bool) {
    eprintln!("✘ {err}");
    if plain {
        return;
    }
    if let Some(hint) = config_error_hint(err) {
        eprintln!();
        eprintln!("{hint}");
    }
}

pub fn config_error_hint(err: &MeshError) -> Option<&'static str> {
    let MeshError::Config { message } = err else {
        return None;
    };

    if message.contains("failed to read") {
        Some(
            "Pass the config path explicitly:\n\
             \n\
             rpcmesh --config /etc/rpcmesh.toml check",
        )
    } else if message.contains("registry_address") {
        Some(
            "The registry address is host:port; the port follows the last colon.\n\
             \n\
             Example:\n\
             \n\
             registry_address = \"127.0.0.1:8500\"",
        )
    } else if message.contains("retry.") {
        Some(
            "Retry budgets need at least one attempt and a backoff factor of 1.0 or more.\n\
             \n\
             Example:\n\
             \n\
             [retry]\n\
             max_attempts = 3\n\
             initial_delay_ms = 100\n\
             backoff_factor = 2.0",
        )
    } else if message.contains("service.") {
        Some(
            "The [service] section describes this process as the registry should see it.\n\
             \n\
             Example:\n\
             \n\
             [service]\n\
             name = \"judge-api\"\n\
             address = \"10.0.0.7\"\n\
             port = 8080",
        )
    } else {
        None
    }
}
