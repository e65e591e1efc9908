use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 22] = [
        "RUST_LOG",
        "SPG_HOST",
        "SPG_PORT",
        "SPG_DATABASE_URL",
        "SPG_PUBLIC_URL",
        "SPG_SIGNATURE_HEADER",
        "SPG_DEFAULT_RAIL",
        "SPG_UNKNOWN_STATUS_POLICY",
        "SPG_POLL_LOOKUP",
        "SPG_ALIAS_TTL",
        "SPG_STATUS_TTL",
        "SPG_PAID_RETENTION",
        "SPG_CLAIM_TTL",
        "SPG_ORDER_RETENTION",
        "SPG_RAIL_TIMEOUT",
        "SPG_RETRY_ATTEMPTS",
        "SPG_SWEEP_INTERVAL",
        "SPG_MOLLIE_API_URL",
        "SPG_LNBITS_URL",
        "SPG_SATS_PER_EURO",
        "SPG_CATALOG_FILE",
        "SPG_FIELD_MAPPING_FILE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
